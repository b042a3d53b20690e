use indexmap::IndexMap;
use serde::Deserialize;

use crate::{BitVector, ParamValue};

/// A parsed synthesizer output: a collection of named modules.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Netlist {
    #[serde(default)]
    pub creator: Option<String>,
    #[serde(default)]
    pub modules: IndexMap<String, Module>,
}

/// One module of the input design. All maps preserve declaration order, which drives the
/// deterministic numbering of the output devices.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Module {
    #[serde(default)]
    pub attributes: IndexMap<String, ParamValue>,
    #[serde(default)]
    pub ports: IndexMap<String, Port>,
    #[serde(default)]
    pub cells: IndexMap<String, Cell>,
    #[serde(default)]
    pub netnames: IndexMap<String, NetName>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Input,
    Output,
    Inout,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Input => "input",
            Direction::Output => "output",
            Direction::Inout => "inout",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Port {
    pub direction: Direction,
    pub bits: BitVector,
}

/// A cell instance: a primitive gate, arithmetic unit, register, memory, FSM, or an instance of
/// another module (when `kind` names one).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Cell {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub hide_name: u8,
    #[serde(default)]
    pub parameters: IndexMap<String, ParamValue>,
    #[serde(default)]
    pub attributes: IndexMap<String, ParamValue>,
    #[serde(default)]
    pub port_directions: IndexMap<String, Direction>,
    #[serde(default)]
    pub connections: IndexMap<String, BitVector>,
}

impl Cell {
    pub fn param(&self, name: &str) -> Option<&ParamValue> {
        self.parameters.get(name)
    }

    pub fn uint_param(&self, name: &str) -> Option<u64> {
        self.param(name).and_then(ParamValue::as_uint)
    }

    /// Reads a boolean parameter, falling back to `default` when absent or malformed.
    pub fn bool_param(&self, name: &str, default: bool) -> bool {
        self.param(name).and_then(ParamValue::as_bool).unwrap_or(default)
    }

    pub fn connection(&self, name: &str) -> Option<&BitVector> {
        self.connections.get(name)
    }
}

/// A symbolic net name with its attributes; `init` and `src` are the attributes the converter
/// cares about, everything else is tolerated and ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct NetName {
    #[serde(default)]
    pub hide_name: u8,
    pub bits: BitVector,
    #[serde(default)]
    pub attributes: IndexMap<String, ParamValue>,
}

impl NetName {
    pub fn is_hidden(&self) -> bool {
        self.hide_name != 0
    }

    pub fn init(&self) -> Option<&ParamValue> {
        self.attributes.get("init")
    }

    pub fn src(&self) -> Option<&str> {
        self.attributes.get("src").and_then(ParamValue::as_str)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_module() {
        let netlist: Netlist = serde_json::from_value(json!({
            "creator": "Yosys 0.38",
            "modules": {
                "top": {
                    "ports": {
                        "a": { "direction": "input", "bits": [2] },
                        "y": { "direction": "output", "bits": [3, "0"] },
                    },
                    "cells": {
                        "g": {
                            "type": "$not",
                            "parameters": { "A_WIDTH": 1, "Y_WIDTH": "01" },
                            "port_directions": { "A": "input", "Y": "output" },
                            "connections": { "A": [2], "Y": [3] },
                        },
                    },
                    "netnames": {
                        "a": { "hide_name": 0, "bits": [2], "attributes": { "src": "top.v:1.1-1.2" } },
                    },
                },
            },
        }))
        .unwrap();

        let module = &netlist.modules["top"];
        assert_eq!(module.ports["a"].direction, Direction::Input);
        assert_eq!(module.ports["y"].bits.len(), 2);
        let cell = &module.cells["g"];
        assert_eq!(cell.kind, "$not");
        assert_eq!(cell.uint_param("A_WIDTH"), Some(1));
        assert_eq!(cell.uint_param("Y_WIDTH"), Some(1));
        assert_eq!(module.netnames["a"].src(), Some("top.v:1.1-1.2"));
    }
}
