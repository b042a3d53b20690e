use indexmap::IndexMap;

use crate::Netlist;

type PortMap = IndexMap<String, String>;

const UNARY: &[(&str, &str)] = &[("A", "in"), ("Y", "out")];
const BINARY: &[(&str, &str)] = &[("A", "in1"), ("B", "in2"), ("Y", "out")];
const MUX: &[(&str, &str)] = &[("A", "in0"), ("B", "in1"), ("S", "sel"), ("Y", "out")];
const FSM: &[(&str, &str)] = &[("ARST", "arst"), ("CLK", "clk"), ("CTRL_IN", "in"), ("CTRL_OUT", "out")];

const UNARY_TYPES: &[&str] = &[
    "$not", "$neg", "$pos", "$reduce_and", "$reduce_or", "$reduce_xor", "$reduce_xnor", "$reduce_bool", "$logic_not",
];
const BINARY_TYPES: &[&str] = &[
    "$and", "$or", "$xor", "$xnor", "$add", "$sub", "$mul", "$div", "$mod", "$pow", "$eq", "$ne", "$eqx", "$nex",
    "$lt", "$le", "$gt", "$ge", "$shl", "$shr", "$sshl", "$sshr", "$shift", "$shiftx", "$logic_and", "$logic_or",
];

/// The register port vocabulary: each variant maps the subset of these it actually has.
const REGISTER_PORTS: &[(&str, &str)] = &[
    ("CLK", "clk"),
    ("EN", "en"),
    ("ARST", "arst"),
    ("SRST", "srst"),
    ("SET", "set"),
    ("CLR", "clr"),
    ("ALOAD", "aload"),
    ("AD", "ain"),
    ("D", "in"),
    ("Q", "out"),
];

const REGISTER_TYPES: &[(&str, &[&str])] = &[
    ("$dff", &["CLK", "D", "Q"]),
    ("$dffe", &["CLK", "EN", "D", "Q"]),
    ("$adff", &["CLK", "ARST", "D", "Q"]),
    ("$adffe", &["CLK", "EN", "ARST", "D", "Q"]),
    ("$sdff", &["CLK", "SRST", "D", "Q"]),
    ("$sdffe", &["CLK", "EN", "SRST", "D", "Q"]),
    ("$sdffce", &["CLK", "EN", "SRST", "D", "Q"]),
    ("$dlatch", &["EN", "D", "Q"]),
    ("$adlatch", &["EN", "ARST", "D", "Q"]),
    ("$dffsr", &["CLK", "SET", "CLR", "D", "Q"]),
    ("$dffsre", &["CLK", "EN", "SET", "CLR", "D", "Q"]),
    ("$aldff", &["CLK", "ALOAD", "AD", "D", "Q"]),
    ("$aldffe", &["CLK", "EN", "ALOAD", "AD", "D", "Q"]),
    ("$sr", &["SET", "CLR", "Q"]),
];

/// Maps every recognized cell type onto its display-level port names, and every user-defined
/// module onto the identity mapping over its own ports.
///
/// Cells with structural port fan-out (`$pmux`, `$mem`, `$mem_v2`, `$lut`) are deliberately
/// absent; their wiring is bespoke.
#[derive(Debug, Clone, Default)]
pub struct PortMaps {
    maps: IndexMap<String, PortMap>,
}

impl PortMaps {
    pub fn build(netlist: &Netlist) -> PortMaps {
        let mut maps = IndexMap::new();
        for celltype in UNARY_TYPES {
            maps.insert(celltype.to_string(), pairs(UNARY));
        }
        for celltype in BINARY_TYPES {
            maps.insert(celltype.to_string(), pairs(BINARY));
        }
        maps.insert("$mux".to_string(), pairs(MUX));
        for (celltype, ports) in REGISTER_TYPES {
            let map = REGISTER_PORTS
                .iter()
                .filter(|(port, _)| ports.contains(port))
                .map(|&(port, display)| (port.to_string(), display.to_string()))
                .collect();
            maps.insert(celltype.to_string(), map);
        }
        maps.insert("$fsm".to_string(), pairs(FSM));
        for (name, module) in &netlist.modules {
            let identity = module.ports.keys().map(|port| (port.clone(), port.clone())).collect();
            maps.insert(name.clone(), identity);
        }
        PortMaps { maps }
    }

    pub fn get(&self, celltype: &str) -> Option<&PortMap> {
        self.maps.get(celltype)
    }
}

fn pairs(table: &[(&str, &str)]) -> PortMap {
    table.iter().map(|&(port, display)| (port.to_string(), display.to_string())).collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_primitive_maps() {
        let maps = PortMaps::build(&Netlist::default());
        assert_eq!(maps.get("$add").unwrap()["B"], "in2");
        assert_eq!(maps.get("$mux").unwrap()["S"], "sel");
        assert_eq!(maps.get("$adff").unwrap()["ARST"], "arst");
        assert_eq!(maps.get("$aldffe").unwrap()["AD"], "ain");
        assert!(maps.get("$sr").unwrap().get("D").is_none());
        assert!(maps.get("$pmux").is_none());
        assert!(maps.get("$mem").is_none());
    }

    #[test]
    fn test_module_identity() {
        let netlist: Netlist = serde_json::from_value(json!({
            "modules": {
                "sub": {
                    "ports": {
                        "x": { "direction": "input", "bits": [2] },
                        "y": { "direction": "output", "bits": [3] },
                    },
                },
            },
        }))
        .unwrap();
        let maps = PortMaps::build(&netlist);
        assert_eq!(maps.get("sub").unwrap()["x"], "x");
        assert_eq!(maps.get("sub").unwrap()["y"], "y");
    }
}
