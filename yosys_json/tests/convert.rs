use schemview_netlist::{Circuit, Connector, Device, Transparency};
use schemview_yosys_json::{convert, ImportError, Netlist};
use serde_json::json;

fn parse(value: serde_json::Value) -> Netlist {
    serde_json::from_value(value).unwrap()
}

fn build(value: serde_json::Value) -> Circuit {
    convert(&parse(value)).unwrap()
}

fn find<'a>(circuit: &'a Circuit, tag: &str) -> (&'a str, &'a Device) {
    circuit
        .devices()
        .find(|(_, device)| device.type_tag() == tag)
        .unwrap_or_else(|| panic!("no {tag} device in {:?}", circuit.devices.keys().collect::<Vec<_>>()))
}

fn connector_to<'a>(circuit: &'a Circuit, id: &str, port: &str) -> &'a Connector {
    circuit
        .connectors
        .iter()
        .find(|connector| connector.to.id == id && connector.to.port == port)
        .unwrap_or_else(|| panic!("no connector into {id}.{port}"))
}

#[test]
fn test_binary_and() {
    let circuit = build(json!({
        "modules": {
            "top": {
                "ports": {
                    "a": { "direction": "input", "bits": [2] },
                    "b": { "direction": "input", "bits": [3] },
                    "y": { "direction": "output", "bits": [4] },
                },
                "cells": {
                    "g": {
                        "type": "$and",
                        "parameters": { "A_WIDTH": 1, "B_WIDTH": 1, "Y_WIDTH": 1 },
                        "port_directions": { "A": "input", "B": "input", "Y": "output" },
                        "connections": { "A": [2], "B": [3], "Y": [4] },
                    },
                },
            },
        },
    }));

    assert_eq!(circuit.devices.len(), 4);
    assert!(circuit.subcircuits.is_empty());
    let (and_id, device) = find(&circuit, "And");
    let Device::And(gate) = device else { unreachable!() };
    assert_eq!(gate.bits, 1);
    assert_eq!(circuit.connectors.len(), 3);
    assert_eq!(connector_to(&circuit, and_id, "in1").from.port, "out");
    assert_eq!(connector_to(&circuit, and_id, "in2").from.port, "out");
    let (output_id, _) = find(&circuit, "Output");
    assert_eq!(connector_to(&circuit, output_id, "in").from.id, and_id);
}

#[test]
fn test_adff_register() {
    let circuit = build(json!({
        "modules": {
            "top": {
                "ports": {
                    "clk": { "direction": "input", "bits": [2] },
                    "rst": { "direction": "input", "bits": [3] },
                    "d": { "direction": "input", "bits": [4, 5, 6, 7] },
                    "q": { "direction": "output", "bits": [8, 9, 10, 11] },
                },
                "cells": {
                    "reg": {
                        "type": "$adff",
                        "parameters": {
                            "WIDTH": 4,
                            "CLK_POLARITY": 1,
                            "ARST_POLARITY": 1,
                            "ARST_VALUE": "0000",
                        },
                        "port_directions": { "CLK": "input", "ARST": "input", "D": "input", "Q": "output" },
                        "connections": { "CLK": [2], "ARST": [3], "D": [4, 5, 6, 7], "Q": [8, 9, 10, 11] },
                    },
                },
                "netnames": {
                    "q": { "hide_name": 0, "bits": [8, 9, 10, 11], "attributes": { "init": "1010" } },
                },
            },
        },
    }));

    let inputs = circuit.devices().filter(|(_, device)| device.type_tag() == "Input").count();
    assert_eq!(inputs, 3);
    let (dff_id, device) = find(&circuit, "Dff");
    let Device::Dff(dff) = device else { unreachable!() };
    assert_eq!(dff.bits, 4);
    assert_eq!(dff.polarity.clock, Some(true));
    assert_eq!(dff.polarity.arst, Some(true));
    assert_eq!(dff.polarity.enable, None);
    assert_eq!(dff.arst_value.as_deref(), Some("0000"));
    assert_eq!(dff.initial.as_deref(), Some("1010"));
    assert_eq!(connector_to(&circuit, dff_id, "clk").from.port, "out");
    let out = circuit.connectors.iter().find(|connector| connector.from.id == dff_id).unwrap();
    assert_eq!(out.name.as_deref(), Some("q"));
}

#[test]
fn test_zero_extension_inference() {
    let circuit = build(json!({
        "modules": {
            "top": {
                "ports": {
                    "x": { "direction": "input", "bits": [2, 3, 4] },
                    "y": { "direction": "output", "bits": [2, 3, 4, "0"] },
                },
            },
        },
    }));

    let (extend_id, device) = find(&circuit, "ZeroExtend");
    let Device::ZeroExtend(extend) = device else { unreachable!() };
    assert_eq!(extend.extend.input, 3);
    assert_eq!(extend.extend.output, 4);
    let (input_id, _) = find(&circuit, "Input");
    let (output_id, _) = find(&circuit, "Output");
    assert_eq!(connector_to(&circuit, extend_id, "in").from.id, input_id);
    assert_eq!(connector_to(&circuit, output_id, "in").from.id, extend_id);
    assert_eq!(circuit.connectors.len(), 2);
}

#[test]
fn test_priority_mux() {
    let a: Vec<u64> = (10..18).collect();
    let b: Vec<u64> = (20..44).collect();
    let s: Vec<u64> = vec![50, 51, 52];
    let y: Vec<u64> = (60..68).collect();
    let circuit = build(json!({
        "modules": {
            "top": {
                "ports": {
                    "a": { "direction": "input", "bits": a },
                    "b": { "direction": "input", "bits": b },
                    "s": { "direction": "input", "bits": s },
                    "y": { "direction": "output", "bits": y },
                },
                "cells": {
                    "m": {
                        "type": "$pmux",
                        "parameters": { "WIDTH": 8, "S_WIDTH": 3 },
                        "port_directions": { "A": "input", "B": "input", "S": "input", "Y": "output" },
                        "connections": {
                            "A": (10..18).collect::<Vec<u64>>(),
                            "B": (20..44).collect::<Vec<u64>>(),
                            "S": [50, 51, 52],
                            "Y": (60..68).collect::<Vec<u64>>(),
                        },
                    },
                },
            },
        },
    }));

    let (mux_id, device) = find(&circuit, "Mux1Hot");
    let Device::Mux1Hot(mux) = device else { unreachable!() };
    assert_eq!(mux.bits.input, 8);
    assert_eq!(mux.bits.sel, 3);

    // A flows straight into in0; the B slices come in through BusSlice glue, high slice first.
    let (a_id, _) = find(&circuit, "Input");
    assert_eq!(connector_to(&circuit, mux_id, "in0").from.id, a_id);
    for (port, first) in [("in1", 16), ("in2", 8), ("in3", 0)] {
        let from = &connector_to(&circuit, mux_id, port).from;
        let Some(Device::BusSlice(slice)) = circuit.device(&from.id) else {
            panic!("expected a BusSlice feeding {port}");
        };
        assert_eq!(slice.slice.first, first);
        assert_eq!(slice.slice.count, 8);
        assert_eq!(slice.slice.total, 24);
    }
    // The reversed select is regrouped from single-bit slices.
    let sel_from = &connector_to(&circuit, mux_id, "sel").from;
    assert!(matches!(circuit.device(&sel_from.id), Some(Device::BusGroup(_))));
}

#[test]
fn test_rom_from_mem_init() {
    let init: String = (0..16).rev().map(|word| format!("{word:04b}")).collect();
    let circuit = build(json!({
        "modules": {
            "top": {
                "ports": {
                    "addr": { "direction": "input", "bits": [2, 3, 4, 5] },
                    "data": { "direction": "output", "bits": [6, 7, 8, 9] },
                },
                "cells": {
                    "rom": {
                        "type": "$mem",
                        "parameters": {
                            "WIDTH": 4,
                            "ABITS": 4,
                            "SIZE": 16,
                            "OFFSET": 0,
                            "RD_PORTS": 1,
                            "WR_PORTS": 0,
                            "RD_CLK_ENABLE": 0,
                            "RD_CLK_POLARITY": 1,
                            "RD_TRANSPARENT": 0,
                            "INIT": init,
                        },
                        "port_directions": {
                            "RD_ADDR": "input", "RD_DATA": "output", "RD_CLK": "input", "RD_EN": "input",
                        },
                        "connections": {
                            "RD_ADDR": [2, 3, 4, 5],
                            "RD_DATA": [6, 7, 8, 9],
                            "RD_CLK": ["x"],
                            "RD_EN": ["x"],
                        },
                    },
                },
            },
        },
    }));

    let (mem_id, device) = find(&circuit, "Memory");
    let Device::Memory(memory) = device else { unreachable!() };
    assert_eq!(memory.bits, 4);
    assert_eq!(memory.abits, 4);
    assert_eq!(memory.words, 16);
    assert_eq!(memory.offset, 0);
    assert_eq!(memory.wrports.len(), 0);
    assert_eq!(memory.rdports.len(), 1);
    let port = &memory.rdports[0];
    assert_eq!(port.clock_polarity, None);
    assert_eq!(port.enable_polarity, None);
    assert!(port.transparent.is_none());
    let memdata = memory.memdata.as_ref().unwrap();
    let expected: Vec<String> = (0..16).map(|word| format!("{word:04b}")).collect();
    assert_eq!(memdata, &expected);
    assert_eq!(connector_to(&circuit, mem_id, "rd0addr").from.port, "out");
    let (data_id, _) = find(&circuit, "Output");
    assert_eq!(connector_to(&circuit, data_id, "in").from.id, mem_id);
    assert_eq!(connector_to(&circuit, data_id, "in").from.port, "rd0data");
}

#[test]
fn test_hierarchy_top_selection() {
    let instance = |kind: &str| {
        json!({
            "type": kind,
            "port_directions": { "x": "input" },
            "connections": { "x": [2] },
        })
    };
    let circuit = build(json!({
        "modules": {
            "sub": {
                "ports": { "x": { "direction": "input", "bits": [2] } },
                "cells": { "u1": instance("leaf") },
            },
            "top": {
                "ports": { "x": { "direction": "input", "bits": [2] } },
                "cells": { "u0": instance("sub") },
            },
            "leaf": {
                "ports": { "x": { "direction": "input", "bits": [2] } },
            },
        },
    }));

    assert_eq!(circuit.subcircuits.keys().collect::<Vec<_>>(), ["leaf", "sub"]);
    let (_, device) = find(&circuit, "Subcircuit");
    let Device::Subcircuit(subcircuit) = device else { unreachable!() };
    assert_eq!(subcircuit.celltype, "sub");
    assert_eq!(subcircuit.label.as_deref(), Some("u0"));
    let (_, device) = find(&circuit.subcircuits["sub"], "Subcircuit");
    let Device::Subcircuit(subcircuit) = device else { unreachable!() };
    assert_eq!(subcircuit.celltype, "leaf");
}

#[test]
fn test_logic_and_reduces_wide_operand() {
    let circuit = build(json!({
        "modules": {
            "top": {
                "ports": {
                    "a": { "direction": "input", "bits": [2, 3] },
                    "b": { "direction": "input", "bits": [4] },
                    "y": { "direction": "output", "bits": [5] },
                },
                "cells": {
                    "g": {
                        "type": "$logic_and",
                        "parameters": { "A_WIDTH": 2, "B_WIDTH": 1, "Y_WIDTH": 1 },
                        "port_directions": { "A": "input", "B": "input", "Y": "output" },
                        "connections": { "A": [2, 3], "B": [4], "Y": [5] },
                    },
                },
            },
        },
    }));

    let (and_id, device) = find(&circuit, "And");
    let Device::And(gate) = device else { unreachable!() };
    assert_eq!(gate.bits, 1);
    let (reduce_id, device) = find(&circuit, "OrReduce");
    let Device::OrReduce(reduce) = device else { unreachable!() };
    assert_eq!(reduce.bits, 2);
    assert_eq!(connector_to(&circuit, and_id, "in1").from.id, reduce_id);
}

#[test]
fn test_bitwise_sign_extension() {
    let circuit = build(json!({
        "modules": {
            "top": {
                "ports": {
                    "a": { "direction": "input", "bits": [2, 3] },
                    "b": { "direction": "input", "bits": [4, 5, 6, 7] },
                    "y": { "direction": "output", "bits": [8, 9, 10, 11] },
                },
                "cells": {
                    "g": {
                        "type": "$xor",
                        "parameters": { "A_SIGNED": 1, "A_WIDTH": 2, "B_WIDTH": 4, "Y_WIDTH": 4 },
                        "port_directions": { "A": "input", "B": "input", "Y": "output" },
                        "connections": { "A": [2, 3], "B": [4, 5, 6, 7], "Y": [8, 9, 10, 11] },
                    },
                },
            },
        },
    }));

    let (xor_id, device) = find(&circuit, "Xor");
    let Device::Xor(gate) = device else { unreachable!() };
    assert_eq!(gate.bits, 4);
    let (extend_id, device) = find(&circuit, "SignExtend");
    let Device::SignExtend(extend) = device else { unreachable!() };
    assert_eq!(extend.extend.input, 2);
    assert_eq!(extend.extend.output, 4);
    assert_eq!(connector_to(&circuit, xor_id, "in1").from.id, extend_id);
}

#[test]
fn test_constant_replication() {
    let and_cell = |y: u64| {
        json!({
            "type": "$and",
            "parameters": { "A_WIDTH": 2, "B_WIDTH": 2, "Y_WIDTH": 2 },
            "port_directions": { "A": "input", "B": "input", "Y": "output" },
            "connections": { "A": [2, 3], "B": ["1", "0"], "Y": [y, y + 1] },
        })
    };
    let circuit = build(json!({
        "modules": {
            "top": {
                "ports": {
                    "a": { "direction": "input", "bits": [2, 3] },
                    "y0": { "direction": "output", "bits": [4, 5] },
                    "y1": { "direction": "output", "bits": [6, 7] },
                },
                "cells": { "g0": and_cell(4), "g1": and_cell(6) },
            },
        },
    }));

    let constants: Vec<&str> = circuit
        .devices()
        .filter(|(_, device)| device.is_constant())
        .map(|(id, _)| id)
        .collect();
    assert_eq!(constants.len(), 2, "the shared constant should be replicated");
    for id in &constants {
        let uses = circuit.connectors.iter().filter(|connector| connector.from.id == **id).count();
        assert_eq!(uses, 1);
    }
    let Some(Device::Constant(value)) = circuit.device(constants[0]) else { unreachable!() };
    assert_eq!(value.constant, "01");
}

#[test]
fn test_fsm_transition_table() {
    let circuit = build(json!({
        "modules": {
            "top": {
                "ports": {
                    "clk": { "direction": "input", "bits": [2] },
                    "rst": { "direction": "input", "bits": [3] },
                    "i": { "direction": "input", "bits": [4] },
                    "o": { "direction": "output", "bits": [5] },
                },
                "cells": {
                    "ctrl": {
                        "type": "$fsm",
                        "parameters": {
                            "NAME": "\\state",
                            "CLK_POLARITY": 1,
                            "ARST_POLARITY": 1,
                            "CTRL_IN_WIDTH": 1,
                            "CTRL_OUT_WIDTH": 1,
                            "STATE_BITS": 1,
                            "STATE_NUM": 2,
                            "STATE_NUM_LOG2": 1,
                            "STATE_RST": 0,
                            "TRANS_NUM": 2,
                            "TRANS_TABLE": "01111-10",
                        },
                        "port_directions": {
                            "CLK": "input", "ARST": "input", "CTRL_IN": "input", "CTRL_OUT": "output",
                        },
                        "connections": { "CLK": [2], "ARST": [3], "CTRL_IN": [4], "CTRL_OUT": [5] },
                    },
                },
            },
        },
    }));

    let (_, device) = find(&circuit, "FSM");
    let Device::Fsm(fsm) = device else { unreachable!() };
    assert_eq!(fsm.wirename, "state");
    assert_eq!(fsm.states, 2);
    assert_eq!(fsm.init_state, 0);
    assert_eq!(fsm.bits.input, 1);
    assert_eq!(fsm.bits.output, 1);
    assert_eq!(fsm.polarity.clock, Some(true));
    assert_eq!(fsm.polarity.arst, Some(true));
    assert_eq!(fsm.trans_table.len(), 2);
    assert_eq!(fsm.trans_table[0].state_in, 0);
    assert_eq!(fsm.trans_table[0].ctrl_in, "1");
    assert_eq!(fsm.trans_table[0].state_out, 1);
    assert_eq!(fsm.trans_table[0].ctrl_out, "1");
    assert_eq!(fsm.trans_table[1].state_in, 1);
    assert_eq!(fsm.trans_table[1].ctrl_in, "x", "don't-care control bits read as x");
    assert_eq!(fsm.trans_table[1].state_out, 1);
    assert_eq!(fsm.trans_table[1].ctrl_out, "0");
}

#[test]
fn test_mem_v2_ports() {
    let circuit = build(json!({
        "modules": {
            "top": {
                "ports": {
                    "clk": { "direction": "input", "bits": [2] },
                    "we": { "direction": "input", "bits": [3] },
                    "addr": { "direction": "input", "bits": [4, 5] },
                    "wdata": { "direction": "input", "bits": [6, 7] },
                    "rdata": { "direction": "output", "bits": [8, 9] },
                },
                "cells": {
                    "ram": {
                        "type": "$mem_v2",
                        "parameters": {
                            "WIDTH": 2,
                            "ABITS": 2,
                            "SIZE": 4,
                            "OFFSET": 0,
                            "RD_PORTS": 1,
                            "WR_PORTS": 1,
                            "RD_CLK_ENABLE": 1,
                            "RD_CLK_POLARITY": 1,
                            "RD_ARST_VALUE": "xx",
                            "RD_SRST_VALUE": "xx",
                            "RD_INIT_VALUE": "xx",
                            "RD_CE_OVER_SRST": 0,
                            "RD_TRANSPARENCY_MASK": 1,
                            "RD_COLLISION_X_MASK": 0,
                            "WR_CLK_ENABLE": 1,
                            "WR_CLK_POLARITY": 1,
                        },
                        "port_directions": {
                            "RD_ADDR": "input", "RD_DATA": "output", "RD_CLK": "input", "RD_EN": "input",
                            "RD_ARST": "input", "RD_SRST": "input",
                            "WR_ADDR": "input", "WR_DATA": "input", "WR_EN": "input", "WR_CLK": "input",
                        },
                        "connections": {
                            "RD_ADDR": [4, 5],
                            "RD_DATA": [8, 9],
                            "RD_CLK": [2],
                            "RD_EN": ["1"],
                            "RD_ARST": ["0"],
                            "RD_SRST": ["0"],
                            "WR_ADDR": [4, 5],
                            "WR_DATA": [6, 7],
                            "WR_EN": [3, 3],
                            "WR_CLK": [2],
                        },
                    },
                },
            },
        },
    }));

    let (mem_id, device) = find(&circuit, "Memory");
    let Device::Memory(memory) = device else { unreachable!() };
    assert_eq!(memory.rdports.len(), 1);
    assert_eq!(memory.wrports.len(), 1);
    let read = &memory.rdports[0];
    assert_eq!(read.clock_polarity, Some(true));
    assert_eq!(read.enable_polarity, None, "a constant-one enable is omitted");
    assert_eq!(read.arst_polarity, None);
    assert_eq!(read.srst_polarity, None);
    assert_eq!(read.transparent, Some(Transparency::PerPort(vec![true])));
    let write = &memory.wrports[0];
    assert_eq!(write.clock_polarity, Some(true));
    assert_eq!(write.enable_polarity, Some(true));
    assert_eq!(connector_to(&circuit, mem_id, "wr0en").from.port, "out");
    assert!(memory.memdata.is_none());
}

#[test]
fn test_multiple_drivers_rejected() {
    let result = convert(&parse(json!({
        "modules": {
            "top": {
                "ports": {
                    "a": { "direction": "input", "bits": [2] },
                    "y": { "direction": "output", "bits": [2] },
                },
                "cells": {
                    "g": {
                        "type": "$not",
                        "port_directions": { "A": "input", "Y": "output" },
                        "connections": { "A": [2], "Y": [2] },
                    },
                },
            },
        },
    })));
    assert!(matches!(result, Err(ImportError::MultipleDrivers { .. })));
}

#[test]
fn test_unknown_cell_type_rejected() {
    let result = convert(&parse(json!({
        "modules": {
            "top": {
                "cells": {
                    "g": { "type": "$frobnicate", "port_directions": {}, "connections": {} },
                },
            },
        },
    })));
    assert!(matches!(result, Err(ImportError::UnknownCellType { .. })));
}

#[test]
fn test_undriven_net_dropped() {
    let circuit = build(json!({
        "modules": {
            "top": {
                "ports": {
                    "y": { "direction": "output", "bits": [2] },
                },
            },
        },
    }));
    assert_eq!(circuit.devices.len(), 1);
    assert!(circuit.connectors.is_empty());
}

#[test]
fn test_deterministic_output() {
    let input = json!({
        "modules": {
            "top": {
                "ports": {
                    "a": { "direction": "input", "bits": [2, 3] },
                    "y": { "direction": "output", "bits": [4, 5] },
                },
                "cells": {
                    "g": {
                        "type": "$not",
                        "parameters": { "A_WIDTH": 2, "Y_WIDTH": 2 },
                        "port_directions": { "A": "input", "Y": "output" },
                        "connections": { "A": [2, 3], "Y": [4, 5] },
                    },
                },
            },
        },
    });
    let netlist = parse(input);
    let first = serde_json::to_string(&convert(&netlist).unwrap()).unwrap();
    let second = serde_json::to_string(&convert(&netlist).unwrap()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_empty_design() {
    let circuit = build(json!({ "modules": {} }));
    assert!(circuit.devices.is_empty());
    assert!(circuit.connectors.is_empty());
}
