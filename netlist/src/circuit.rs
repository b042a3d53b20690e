use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{Connector, Device};

/// A converted module: devices keyed by generated id, connectors in emission order, and (for the
/// top module) the sub-circuits it and its descendants instantiate.
///
/// Device ids are assigned in insertion order, so the `devices` map preserves the deterministic
/// numbering produced by the converter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Circuit {
    pub devices: IndexMap<String, Device>,
    pub connectors: Vec<Connector>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub subcircuits: IndexMap<String, Circuit>,
}

impl Circuit {
    pub fn new() -> Self {
        Circuit::default()
    }

    pub fn device(&self, id: &str) -> Option<&Device> {
        self.devices.get(id)
    }

    /// Iterates over devices of the circuit itself, not including sub-circuits.
    pub fn devices(&self) -> impl Iterator<Item = (&str, &Device)> {
        self.devices.iter().map(|(id, device)| (id.as_str(), device))
    }
}
