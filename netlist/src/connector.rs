use serde::{Deserialize, Serialize};

/// One end of a connector: a device and one of its ports.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortRef {
    pub id: String,
    pub port: String,
}

impl PortRef {
    pub fn new(id: impl Into<String>, port: impl Into<String>) -> Self {
        PortRef { id: id.into(), port: port.into() }
    }
}

/// A line/column pair in an original source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextPosition {
    pub line: u32,
    pub column: u32,
}

/// A span in an original source file, as reported by the synthesizer's `src` attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcePosition {
    pub name: String,
    pub from: TextPosition,
    pub to: TextPosition,
}

/// A wire between two device ports. `name` is the display name of the underlying net, if it has
/// one; `source_positions` lists where the net was declared in the original sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connector {
    pub from: PortRef,
    pub to: PortRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_positions: Option<Vec<SourcePosition>>,
}
