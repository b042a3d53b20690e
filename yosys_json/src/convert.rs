use std::collections::HashMap;

use indexmap::IndexMap;
use log::{debug, warn};

use schemview_netlist::{
    BinaryArith, Circuit, Comparison, Connector, ConstValue, Device, Extend, ExtendWidths, FlipFlop, Fsm,
    FsmTransition, Gate, Group, Io, MemReadPort, MemWritePort, Memory, Mux, Polarity, PortRef, Shift, SignedBinary,
    SignedShift, Slice, SliceRange, SourcePosition, Subcircuit, TextPosition, Transparency, UnaryArith, WidthBinary,
    WidthCompare, WidthInOut, WidthMux,
};

use crate::cells::{ArithOp, BitwiseOp, CellKind, CompareOp, LogicOp, ReduceOp, RegisterShape, ShiftOp, UnaryArithOp};
use crate::depsort::instantiation_order;
use crate::{Bit, BitVector, Cell, Direction, ImportError, Logic, Module, Netlist, ParamValue, PortMaps};

/// Reads a synthesizer JSON netlist and converts it into a display netlist.
pub fn import(reader: impl std::io::Read) -> Result<Circuit, ImportError> {
    let netlist: Netlist = serde_json::from_reader(reader)?;
    convert(&netlist)
}

/// Converts an already-parsed design. Modules are converted sequentially in dependency order so
/// device numbering is deterministic; the top module receives all other modules as sub-circuits.
pub fn convert(netlist: &Netlist) -> Result<Circuit, ImportError> {
    let portmaps = PortMaps::build(netlist);
    let order = instantiation_order(netlist)?;
    debug!("converting {} modules", order.len());

    let mut converted: Vec<(String, Circuit)> = Vec::with_capacity(order.len());
    for name in order {
        let module = &netlist.modules[&name];
        debug!("converting module {name}");
        converted.push((name, convert_module(netlist, module, &portmaps)?));
    }
    let Some((_, mut top)) = converted.pop() else {
        return Ok(Circuit::new());
    };
    for (name, circuit) in converted {
        top.subcircuits.insert(name, circuit);
    }
    Ok(top)
}

fn convert_module(netlist: &Netlist, module: &Module, portmaps: &PortMaps) -> Result<Circuit, ImportError> {
    let mut converter = ModuleConverter::new(netlist, module, portmaps);
    converter.harvest_netnames();
    converter.add_io_devices()?;
    converter.lower_cells()?;
    converter.group_nets()?;
    converter.resolve_nets()?;
    converter.emit_connectors();
    Ok(converter.circuit)
}

/// A net under construction: the ports wired to one bit vector.
#[derive(Debug, Default)]
struct NetEntry {
    source: Option<PortRef>,
    targets: Vec<PortRef>,
    name: Option<String>,
    source_positions: Vec<SourcePosition>,
}

/// Where a single bit comes from: a primary device output port and the index within it.
#[derive(Debug, Clone)]
struct BitDriver {
    device: String,
    port: String,
    index: usize,
}

struct ModuleConverter<'a> {
    module: &'a Module,
    modules: &'a IndexMap<String, Module>,
    portmaps: &'a PortMaps,
    circuit: Circuit,
    /// Nets keyed by their full bit vector, in first-reference order.
    nets: IndexMap<BitVector, NetEntry>,
    /// Bit provenance. Populated only by primary sources; bus glue never overwrites it.
    drivers: HashMap<u64, BitDriver>,
    /// Full vector of every primary source port, for slice-parent lookup.
    port_bits: HashMap<String, HashMap<String, BitVector>>,
    /// Register initial values harvested from net-name `init` attributes, keyed by bit vector.
    init_values: HashMap<BitVector, ParamValue>,
    next_device: usize,
    next_bit: u64,
}

impl<'a> ModuleConverter<'a> {
    fn new(netlist: &'a Netlist, module: &'a Module, portmaps: &'a PortMaps) -> Self {
        let mut next_bit = 2;
        let mut note = |bits: &BitVector| {
            for id in bits.net_ids() {
                next_bit = next_bit.max(id + 1);
            }
        };
        for port in module.ports.values() {
            note(&port.bits);
        }
        for cell in module.cells.values() {
            for bits in cell.connections.values() {
                note(bits);
            }
        }
        for netname in module.netnames.values() {
            note(&netname.bits);
        }
        ModuleConverter {
            module,
            modules: &netlist.modules,
            portmaps,
            circuit: Circuit::new(),
            nets: IndexMap::new(),
            drivers: HashMap::new(),
            port_bits: HashMap::new(),
            init_values: HashMap::new(),
            next_device: 0,
            next_bit,
        }
    }

    fn add_device(&mut self, device: Device) -> String {
        let id = format!("dev{}", self.next_device);
        self.next_device += 1;
        self.circuit.devices.insert(id.clone(), device);
        id
    }

    fn add_source(&mut self, bits: &BitVector, device: &str, port: &str, primary: bool) -> Result<(), ImportError> {
        if bits.is_empty() {
            return Ok(());
        }
        let entry = self.nets.entry(bits.clone()).or_default();
        if entry.source.is_some() {
            let net = entry.name.clone().unwrap_or_else(|| bits.to_string());
            return Err(ImportError::MultipleDrivers { net });
        }
        entry.source = Some(PortRef::new(device, port));
        if primary {
            for (index, bit) in bits.iter().enumerate() {
                if let Bit::Net(id) = bit {
                    self.drivers.insert(id, BitDriver { device: device.to_string(), port: port.to_string(), index });
                }
            }
            self.port_bits.entry(device.to_string()).or_default().insert(port.to_string(), bits.clone());
        }
        Ok(())
    }

    fn add_target(&mut self, bits: &BitVector, device: &str, port: &str) {
        if bits.is_empty() {
            return;
        }
        self.nets.entry(bits.clone()).or_default().targets.push(PortRef::new(device, port));
    }

    /// Allocates a synthetic one-bit net, used to wire inserted reduction gates.
    fn fresh_net(&mut self) -> BitVector {
        let bit = Bit::Net(self.next_bit);
        self.next_bit += 1;
        std::iter::once(bit).collect()
    }

    /// Records display names, source positions and `init` attributes per bit vector.
    /// The first non-hidden name observed for a vector wins.
    fn harvest_netnames(&mut self) {
        let module = self.module;
        for (name, netname) in &module.netnames {
            if let Some(init) = netname.init() {
                self.init_values.entry(netname.bits.clone()).or_insert_with(|| init.clone());
            }
            if netname.is_hidden() {
                continue;
            }
            let entry = self.nets.entry(netname.bits.clone()).or_default();
            if entry.name.is_none() {
                entry.name = Some(name.clone());
            }
            if let Some(src) = netname.src() {
                entry.source_positions.extend(parse_source_positions(src));
            }
        }
    }

    /// Creates one Input or Output device per module port. Inputs are primary sources.
    fn add_io_devices(&mut self) -> Result<(), ImportError> {
        let module = self.module;
        for (order, (name, port)) in module.ports.iter().enumerate() {
            let io = Io { label: None, net: name.clone(), order, bits: port.bits.len() as u32, propagation: None };
            match port.direction {
                Direction::Input => {
                    let device = self.add_device(Device::Input(io));
                    self.add_source(&port.bits, &device, "out", true)?;
                }
                Direction::Output => {
                    let device = self.add_device(Device::Output(io));
                    self.add_target(&port.bits, &device, "in");
                }
                Direction::Inout => {
                    return Err(ImportError::InvalidDirection { port: name.clone(), direction: "inout".into() });
                }
            }
        }
        Ok(())
    }

    /// Lowers each cell in declaration order.
    fn lower_cells(&mut self) -> Result<(), ImportError> {
        let module = self.module;
        for (name, cell) in &module.cells {
            self.lower_cell(name, cell)?;
        }
        Ok(())
    }

    fn lower_cell(&mut self, name: &str, cell: &Cell) -> Result<(), ImportError> {
        let Some(kind) = CellKind::classify(&cell.kind) else {
            if self.modules.contains_key(&cell.kind) {
                return self.lower_subcircuit(name, cell);
            }
            return Err(ImportError::UnknownCellType { celltype: cell.kind.clone() });
        };
        kind.validate(name, cell)?;
        match kind {
            CellKind::Not => self.lower_not(name, cell),
            CellKind::UnaryArith(op) => self.lower_unary_arith(name, cell, op),
            CellKind::Reduce(op) => self.lower_reduce(name, cell, op),
            CellKind::Bitwise(op) => self.lower_bitwise(name, cell, op),
            CellKind::Arith(op) => self.lower_arith(name, cell, op),
            CellKind::Compare(op) => self.lower_compare(name, cell, op),
            CellKind::Shift(op) => self.lower_shift(name, cell, op),
            CellKind::Logic(op) => self.lower_logic(name, cell, op),
            CellKind::Mux => self.lower_mux(name, cell),
            CellKind::Pmux => self.lower_pmux(name, cell),
            CellKind::Register(shape) => self.lower_register(name, cell, shape),
            CellKind::Fsm => self.lower_fsm(name, cell),
            CellKind::Memory { v2 } => self.lower_memory(name, cell, v2),
            CellKind::Lut => self.lower_lut(name, cell),
        }
    }

    /// Wires a cell through the port-map table: inputs become net targets, outputs primary
    /// sources. `conns` is the cell's connection map, possibly with padded or reduced vectors.
    fn wire_cell(
        &mut self,
        device: &str,
        name: &str,
        cell: &Cell,
        conns: &IndexMap<String, BitVector>,
    ) -> Result<(), ImportError> {
        let portmaps = self.portmaps;
        let Some(portmap) = portmaps.get(&cell.kind) else {
            return Err(ImportError::UnknownCellType { celltype: cell.kind.clone() });
        };
        for (port, &direction) in &cell.port_directions {
            let Some(display) = portmap.get(port) else {
                return Err(ImportError::Structural {
                    celltype: cell.kind.clone(),
                    cell: name.to_string(),
                    reason: format!("unexpected port {port}"),
                });
            };
            let Some(bits) = conns.get(port) else {
                return Err(ImportError::MissingConnection {
                    celltype: cell.kind.clone(),
                    cell: name.to_string(),
                    port: port.clone(),
                });
            };
            match direction {
                Direction::Input => self.add_target(bits, device, display),
                Direction::Output => self.add_source(bits, device, display, true)?,
                Direction::Inout => {
                    return Err(ImportError::InvalidDirection { port: port.clone(), direction: "inout".into() });
                }
            }
        }
        Ok(())
    }

    /// Pads an input vector to `width`, materializing an extension device exactly when the
    /// padded vector is not entirely constant and has no source yet.
    fn pad_input(&mut self, bits: &BitVector, width: usize, signed: bool) -> Result<BitVector, ImportError> {
        if bits.len() >= width {
            return Ok(bits.clone());
        }
        let padded = if signed { bits.sext(width) } else { bits.zext(width) };
        let driven = self.nets.get(&padded).map_or(false, |net| net.source.is_some());
        if padded.is_const() || driven {
            return Ok(padded);
        }
        let extend = Extend { label: None, extend: ExtendWidths { input: bits.len() as u32, output: width as u32 } };
        let device =
            self.add_device(if signed { Device::SignExtend(extend) } else { Device::ZeroExtend(extend) });
        self.add_target(bits, &device, "in");
        self.add_source(&padded, &device, "out", false)?;
        Ok(padded)
    }

    /// Replaces a wider-than-one-bit output connection by its first bit, routing the full vector
    /// through an inserted zero extension. Used for devices whose real output is a single bit.
    fn zero_extend_output(
        &mut self,
        conns: &mut IndexMap<String, BitVector>,
        port: &str,
    ) -> Result<(), ImportError> {
        let Some(bits) = conns.get(port) else {
            return Ok(());
        };
        if bits.len() <= 1 {
            return Ok(());
        }
        let bits = bits.clone();
        let head = bits.slice(..1);
        let extend = Extend { label: None, extend: ExtendWidths { input: 1, output: bits.len() as u32 } };
        let device = self.add_device(Device::ZeroExtend(extend));
        self.add_target(&head, &device, "in");
        self.add_source(&bits, &device, "out", false)?;
        conns.insert(port.to_string(), head);
        Ok(())
    }

    /// Reduces a multi-bit operand of a boolean gate through an inserted `OrReduce`, wired to a
    /// synthetic one-bit net.
    fn reduce_input(&mut self, bits: &BitVector) -> Result<BitVector, ImportError> {
        if bits.len() <= 1 {
            return Ok(bits.clone());
        }
        let out = self.fresh_net();
        let device = self.add_device(Device::OrReduce(Gate { label: None, bits: bits.len() as u32 }));
        self.add_target(bits, &device, "in");
        self.add_source(&out, &device, "out", true)?;
        Ok(out)
    }

    fn lower_not(&mut self, name: &str, cell: &Cell) -> Result<(), ImportError> {
        let width = required(name, cell, "Y")?.len();
        let signed = cell.bool_param("A_SIGNED", false);
        let device = self.add_device(Device::Not(Gate { label: Some(name.to_string()), bits: width as u32 }));
        let mut conns = cell.connections.clone();
        let a = required(name, cell, "A")?.clone();
        conns.insert("A".into(), self.pad_input(&a, width, signed)?);
        self.wire_cell(&device, name, cell, &conns)
    }

    fn lower_unary_arith(&mut self, name: &str, cell: &Cell, op: UnaryArithOp) -> Result<(), ImportError> {
        let payload = UnaryArith {
            label: Some(name.to_string()),
            bits: WidthInOut {
                input: required(name, cell, "A")?.len() as u32,
                output: required(name, cell, "Y")?.len() as u32,
            },
            signed: cell.bool_param("A_SIGNED", false),
        };
        let device = self.add_device(match op {
            UnaryArithOp::Neg => Device::Negation(payload),
            UnaryArithOp::Pos => Device::UnaryPlus(payload),
        });
        self.wire_cell(&device, name, cell, &cell.connections.clone())
    }

    fn lower_reduce(&mut self, name: &str, cell: &Cell, op: ReduceOp) -> Result<(), ImportError> {
        let width = required(name, cell, "A")?.len();
        let gate = Gate { label: Some(name.to_string()), bits: width as u32 };
        // One-bit reductions degenerate into buffers and inverters.
        let device = self.add_device(if width == 1 {
            match op {
                ReduceOp::Xnor | ReduceOp::LogicNot => Device::Not(gate),
                _ => Device::Repeater(gate),
            }
        } else {
            match op {
                ReduceOp::And => Device::AndReduce(gate),
                ReduceOp::Or | ReduceOp::Bool => Device::OrReduce(gate),
                ReduceOp::Xor => Device::XorReduce(gate),
                ReduceOp::Xnor => Device::XnorReduce(gate),
                ReduceOp::LogicNot => Device::NorReduce(gate),
            }
        });
        let mut conns = cell.connections.clone();
        self.zero_extend_output(&mut conns, "Y")?;
        self.wire_cell(&device, name, cell, &conns)
    }

    fn lower_bitwise(&mut self, name: &str, cell: &Cell, op: BitwiseOp) -> Result<(), ImportError> {
        let width = required(name, cell, "Y")?.len();
        let gate = Gate { label: Some(name.to_string()), bits: width as u32 };
        let device = self.add_device(match op {
            BitwiseOp::And => Device::And(gate),
            BitwiseOp::Or => Device::Or(gate),
            BitwiseOp::Xor => Device::Xor(gate),
            BitwiseOp::Xnor => Device::Xnor(gate),
        });
        let mut conns = cell.connections.clone();
        for (port, param) in [("A", "A_SIGNED"), ("B", "B_SIGNED")] {
            let bits = required(name, cell, port)?.clone();
            conns.insert(port.into(), self.pad_input(&bits, width, cell.bool_param(param, false))?);
        }
        self.wire_cell(&device, name, cell, &conns)
    }

    fn lower_arith(&mut self, name: &str, cell: &Cell, op: ArithOp) -> Result<(), ImportError> {
        let payload = BinaryArith {
            label: Some(name.to_string()),
            bits: WidthBinary {
                in1: required(name, cell, "A")?.len() as u32,
                in2: required(name, cell, "B")?.len() as u32,
                output: required(name, cell, "Y")?.len() as u32,
            },
            signed: SignedBinary {
                in1: cell.bool_param("A_SIGNED", false),
                in2: cell.bool_param("B_SIGNED", false),
            },
        };
        let device = self.add_device(match op {
            ArithOp::Add => Device::Addition(payload),
            ArithOp::Sub => Device::Subtraction(payload),
            ArithOp::Mul => Device::Multiplication(payload),
            ArithOp::Div => Device::Division(payload),
            ArithOp::Mod => Device::Modulo(payload),
            ArithOp::Pow => Device::Power(payload),
        });
        self.wire_cell(&device, name, cell, &cell.connections.clone())
    }

    fn lower_compare(&mut self, name: &str, cell: &Cell, op: CompareOp) -> Result<(), ImportError> {
        let payload = Comparison {
            label: Some(name.to_string()),
            bits: WidthCompare {
                in1: required(name, cell, "A")?.len() as u32,
                in2: required(name, cell, "B")?.len() as u32,
            },
            signed: SignedBinary {
                in1: cell.bool_param("A_SIGNED", false),
                in2: cell.bool_param("B_SIGNED", false),
            },
        };
        let device = self.add_device(match op {
            CompareOp::Eq | CompareOp::Eqx => Device::Eq(payload),
            CompareOp::Ne | CompareOp::Nex => Device::Ne(payload),
            CompareOp::Lt => Device::Lt(payload),
            CompareOp::Le => Device::Le(payload),
            CompareOp::Gt => Device::Gt(payload),
            CompareOp::Ge => Device::Ge(payload),
        });
        let mut conns = cell.connections.clone();
        self.zero_extend_output(&mut conns, "Y")?;
        self.wire_cell(&device, name, cell, &conns)
    }

    fn lower_shift(&mut self, name: &str, cell: &Cell, op: ShiftOp) -> Result<(), ImportError> {
        let signed_a = cell.bool_param("A_SIGNED", false);
        let payload = Shift {
            label: Some(name.to_string()),
            bits: WidthBinary {
                in1: required(name, cell, "A")?.len() as u32,
                in2: required(name, cell, "B")?.len() as u32,
                output: required(name, cell, "Y")?.len() as u32,
            },
            signed: SignedShift {
                in1: signed_a,
                in2: matches!(op, ShiftOp::Shift | ShiftOp::Shiftx) && cell.bool_param("B_SIGNED", false),
                output: matches!(op, ShiftOp::Sshl | ShiftOp::Sshr) && signed_a,
            },
            fillx: op == ShiftOp::Shiftx,
        };
        let device = self.add_device(match op {
            ShiftOp::Shl | ShiftOp::Sshl => Device::ShiftLeft(payload),
            _ => Device::ShiftRight(payload),
        });
        self.wire_cell(&device, name, cell, &cell.connections.clone())
    }

    fn lower_logic(&mut self, name: &str, cell: &Cell, op: LogicOp) -> Result<(), ImportError> {
        let gate = Gate { label: Some(name.to_string()), bits: 1 };
        let device = self.add_device(match op {
            LogicOp::And => Device::And(gate),
            LogicOp::Or => Device::Or(gate),
        });
        let mut conns = cell.connections.clone();
        for port in ["A", "B"] {
            let bits = required(name, cell, port)?.clone();
            conns.insert(port.into(), self.reduce_input(&bits)?);
        }
        self.zero_extend_output(&mut conns, "Y")?;
        self.wire_cell(&device, name, cell, &conns)
    }

    fn lower_mux(&mut self, name: &str, cell: &Cell) -> Result<(), ImportError> {
        let payload = Mux {
            label: Some(name.to_string()),
            bits: WidthMux { input: required(name, cell, "Y")?.len() as u32, sel: 1 },
        };
        let device = self.add_device(Device::Mux(payload));
        self.wire_cell(&device, name, cell, &cell.connections.clone())
    }

    /// Dedicated wirer for the priority multiplexer: the select vector is reversed, and the
    /// packed B vector is cut into word-sized slices from the high end onto `in1`, `in2`, ….
    fn lower_pmux(&mut self, name: &str, cell: &Cell) -> Result<(), ImportError> {
        let a = required(name, cell, "A")?.clone();
        let b = required(name, cell, "B")?.clone();
        let s = required(name, cell, "S")?.clone();
        let y = required(name, cell, "Y")?.clone();
        let width = a.len();
        let select = s.len();
        let payload = Mux {
            label: Some(name.to_string()),
            bits: WidthMux { input: width as u32, sel: select as u32 },
        };
        let device = self.add_device(Device::Mux1Hot(payload));
        self.add_target(&a, &device, "in0");
        self.add_target(&s.reversed(), &device, "sel");
        for position in 0..select {
            let slice = b.slice((select - 1 - position) * width..(select - position) * width);
            self.add_target(&slice, &device, &format!("in{}", position + 1));
        }
        self.add_source(&y, &device, "out", true)
    }

    fn lower_register(&mut self, name: &str, cell: &Cell, shape: RegisterShape) -> Result<(), ImportError> {
        let q = required(name, cell, "Q")?.clone();
        let width = cell.uint_param("WIDTH").map(|value| value as usize).unwrap_or(q.len());
        let polarity = Polarity {
            clock: shape.clock.then(|| cell.bool_param("CLK_POLARITY", true)),
            enable: shape.enable.then(|| cell.bool_param("EN_POLARITY", true)),
            arst: shape.arst.then(|| cell.bool_param("ARST_POLARITY", true)),
            srst: shape.srst.then(|| cell.bool_param("SRST_POLARITY", true)),
            set: shape.set_clr.then(|| cell.bool_param("SET_POLARITY", true)),
            clr: shape.set_clr.then(|| cell.bool_param("CLR_POLARITY", true)),
            aload: shape.aload.then(|| cell.bool_param("ALOAD_POLARITY", true)),
        };
        let payload = FlipFlop {
            label: Some(name.to_string()),
            bits: width as u32,
            polarity,
            initial: self.init_values.get(&q).map(|value| value.to_bits_string(width)),
            arst_value: if shape.arst { cell.param("ARST_VALUE").map(|value| value.to_bits_string(width)) } else { None },
            srst_value: if shape.srst { cell.param("SRST_VALUE").map(|value| value.to_bits_string(width)) } else { None },
            enable_srst: shape.enable_srst,
            no_data: shape.no_data,
        };
        let device = self.add_device(Device::Dff(payload));
        self.wire_cell(&device, name, cell, &cell.connections.clone())
    }

    fn lower_fsm(&mut self, name: &str, cell: &Cell) -> Result<(), ImportError> {
        let in_width = cell.uint_param("CTRL_IN_WIDTH").unwrap_or(0) as usize;
        let out_width = cell.uint_param("CTRL_OUT_WIDTH").unwrap_or(0) as usize;
        let state_bits = cell.uint_param("STATE_NUM_LOG2").unwrap_or(0) as usize;
        let trans_num = cell.uint_param("TRANS_NUM").unwrap_or(0) as usize;
        let row = 2 * state_bits + in_width + out_width;
        let table = cell
            .param("TRANS_TABLE")
            .map(|value| value.to_bits_string(trans_num * row))
            .unwrap_or_else(|| "0".repeat(trans_num * row));
        let mut trans_table = Vec::with_capacity(trans_num);
        for index in 0..trans_num {
            let entry = &table[index * row..(index + 1) * row];
            let (state_in, entry) = entry.split_at(state_bits);
            let (ctrl_in, entry) = entry.split_at(in_width);
            let (state_out, ctrl_out) = entry.split_at(state_bits);
            trans_table.push(FsmTransition {
                state_in: bin_to_uint(state_in),
                ctrl_in: ctrl_in.replace('-', "x"),
                state_out: bin_to_uint(state_out),
                ctrl_out: ctrl_out.to_string(),
            });
        }
        let wirename = cell
            .param("NAME")
            .and_then(ParamValue::as_str)
            .map(|text| text.trim_start_matches('\\').to_string())
            .unwrap_or_else(|| name.to_string());
        let payload = Fsm {
            label: Some(name.to_string()),
            bits: WidthInOut { input: in_width as u32, output: out_width as u32 },
            polarity: Polarity {
                clock: Some(cell.bool_param("CLK_POLARITY", true)),
                arst: Some(cell.bool_param("ARST_POLARITY", true)),
                ..Polarity::default()
            },
            wirename,
            states: cell.uint_param("STATE_NUM").unwrap_or(0),
            init_state: cell.uint_param("STATE_RST").unwrap_or(0),
            trans_table,
        };
        let device = self.add_device(Device::Fsm(payload));
        self.wire_cell(&device, name, cell, &cell.connections.clone())
    }

    /// Dedicated wirer for memories: ADDR/DATA/EN/CLK/ARST/SRST vectors are cut into per-port
    /// segments bound to synthetic `rd<k>…`/`wr<k>…` port names.
    fn lower_memory(&mut self, name: &str, cell: &Cell, v2: bool) -> Result<(), ImportError> {
        let width = cell.uint_param("WIDTH").unwrap_or(1) as usize;
        let abits = cell.uint_param("ABITS").unwrap_or(0) as usize;
        let words = cell.uint_param("SIZE").unwrap_or(0);
        let offset = cell.uint_param("OFFSET").unwrap_or(0);
        let rd_count = cell.uint_param("RD_PORTS").unwrap_or(0) as usize;
        let wr_count = cell.uint_param("WR_PORTS").unwrap_or(0) as usize;

        // Port name, vector, and whether the memory drives it.
        let mut wiring: Vec<(String, BitVector, bool)> = Vec::new();
        let mask = |param: &str, index: usize| cell.param(param).map_or(false, |value| value.mask_bit(index));

        let mut rdports = Vec::with_capacity(rd_count);
        for index in 0..rd_count {
            let mut port = MemReadPort::default();
            if let Some(addr) = cell.connection("RD_ADDR") {
                wiring.push((format!("rd{index}addr"), addr.slice(index * abits..(index + 1) * abits), false));
            }
            if let Some(data) = cell.connection("RD_DATA") {
                wiring.push((format!("rd{index}data"), data.slice(index * width..(index + 1) * width), true));
            }
            if mask("RD_CLK_ENABLE", index) {
                port.clock_polarity = Some(mask("RD_CLK_POLARITY", index));
                if let Some(clk) = cell.connection("RD_CLK") {
                    wiring.push((format!("rd{index}clk"), clk.slice(index..index + 1), false));
                }
                if let Some(en) = cell.connection("RD_EN") {
                    let en = en.slice(index..index + 1);
                    if !is_const_ones(&en) {
                        port.enable_polarity = Some(true);
                        wiring.push((format!("rd{index}en"), en, false));
                    }
                }
            }
            if v2 {
                if let Some(value) = memory_word(cell, "RD_ARST_VALUE", index, width, rd_count) {
                    port.arst_polarity = Some(true);
                    port.arst_value = Some(value);
                    if let Some(arst) = cell.connection("RD_ARST") {
                        wiring.push((format!("rd{index}arst"), arst.slice(index..index + 1), false));
                    }
                }
                if let Some(value) = memory_word(cell, "RD_SRST_VALUE", index, width, rd_count) {
                    port.srst_polarity = Some(true);
                    port.srst_value = Some(value);
                    if mask("RD_CE_OVER_SRST", index) {
                        port.enable_srst = Some(true);
                    }
                    if let Some(srst) = cell.connection("RD_SRST") {
                        wiring.push((format!("rd{index}srst"), srst.slice(index..index + 1), false));
                    }
                }
                port.init_value = memory_word(cell, "RD_INIT_VALUE", index, width, rd_count);
                let transparent: Vec<bool> =
                    (0..wr_count).map(|wr| mask("RD_TRANSPARENCY_MASK", index * wr_count + wr)).collect();
                if transparent.iter().any(|&flag| flag) {
                    port.transparent = Some(Transparency::PerPort(transparent));
                }
                let collision: Vec<bool> =
                    (0..wr_count).map(|wr| mask("RD_COLLISION_X_MASK", index * wr_count + wr)).collect();
                if collision.iter().any(|&flag| flag) {
                    port.collision = Some(collision);
                }
            } else if mask("RD_TRANSPARENT", index) {
                port.transparent = Some(Transparency::All(true));
            }
            rdports.push(port);
        }

        let mut wrports = Vec::with_capacity(wr_count);
        for index in 0..wr_count {
            let mut port = MemWritePort::default();
            if let Some(addr) = cell.connection("WR_ADDR") {
                wiring.push((format!("wr{index}addr"), addr.slice(index * abits..(index + 1) * abits), false));
            }
            if let Some(data) = cell.connection("WR_DATA") {
                wiring.push((format!("wr{index}data"), data.slice(index * width..(index + 1) * width), false));
            }
            if mask("WR_CLK_ENABLE", index) {
                port.clock_polarity = Some(mask("WR_CLK_POLARITY", index));
                if let Some(clk) = cell.connection("WR_CLK") {
                    wiring.push((format!("wr{index}clk"), clk.slice(index..index + 1), false));
                }
            }
            if let Some(en) = cell.connection("WR_EN") {
                let en = en.slice(index * width..(index + 1) * width);
                if !is_const_ones(&en) {
                    port.enable_polarity = Some(true);
                    wiring.push((format!("wr{index}en"), en, false));
                }
            }
            wrports.push(port);
        }

        let memdata = cell.param("INIT").map(|init| decode_memdata(init, words as usize, width));
        let payload = Memory {
            label: Some(name.to_string()),
            bits: width as u32,
            abits: abits as u32,
            words,
            offset,
            rdports,
            wrports,
            memdata,
        };
        let device = self.add_device(Device::Memory(payload));
        for (port, bits, is_source) in wiring {
            if is_source {
                self.add_source(&bits, &device, &port, true)?;
            } else {
                self.add_target(&bits, &device, &port);
            }
        }
        Ok(())
    }

    /// A lookup table is a one-bit-wide asynchronous ROM over the reversed LUT payload.
    fn lower_lut(&mut self, name: &str, cell: &Cell) -> Result<(), ImportError> {
        let inputs = cell.uint_param("WIDTH").unwrap_or(0) as usize;
        let words = 1u64 << inputs;
        let table = cell
            .param("LUT")
            .map(|value| value.to_bits_string(words as usize))
            .unwrap_or_else(|| "0".repeat(words as usize));
        let memdata = table.chars().rev().map(|bit| bit.to_string()).collect();
        let payload = Memory {
            label: Some(name.to_string()),
            bits: 1,
            abits: inputs as u32,
            words,
            offset: 0,
            rdports: vec![MemReadPort::default()],
            wrports: Vec::new(),
            memdata: Some(memdata),
        };
        let device = self.add_device(Device::Memory(payload));
        let a = required(name, cell, "A")?.clone();
        let y = required(name, cell, "Y")?.clone();
        self.add_target(&a, &device, "rd0addr");
        self.add_source(&y, &device, "rd0data", true)
    }

    fn lower_subcircuit(&mut self, name: &str, cell: &Cell) -> Result<(), ImportError> {
        let payload = Subcircuit { label: Some(name.to_string()), celltype: cell.kind.clone() };
        let device = self.add_device(Device::Subcircuit(payload));
        self.wire_cell(&device, name, cell, &cell.connections.clone())
    }

    /// Partitions still-unsourced nets into runs of common provenance and inserts the
    /// bus-grouping or zero-extension glue that drives them. Nets appended while glue is inserted
    /// are processed in turn.
    fn group_nets(&mut self) -> Result<(), ImportError> {
        let mut index = 0;
        while index < self.nets.len() {
            let (bits, entry) = self.nets.get_index(index).unwrap();
            index += 1;
            if entry.source.is_some() || entry.targets.is_empty() {
                continue;
            }
            let bits = bits.clone();
            let runs = self.split_runs(&bits);
            if runs.len() < 2 {
                continue;
            }
            let last = runs.last().unwrap();
            if last.iter().all(|bit| bit == Bit::Const(Logic::Zero)) {
                let prefix_len = bits.len() - last.len();
                let prefix = bits.slice(..prefix_len);
                let extend =
                    Extend { label: None, extend: ExtendWidths { input: prefix_len as u32, output: bits.len() as u32 } };
                let device = self.add_device(Device::ZeroExtend(extend));
                self.add_source(&bits, &device, "out", false)?;
                self.add_target(&prefix, &device, "in");
            } else {
                let groups = runs.iter().map(|run| run.len() as u32).collect();
                let device = self.add_device(Device::BusGroup(Group { label: None, groups }));
                self.add_source(&bits, &device, "out", false)?;
                for (position, run) in runs.iter().enumerate() {
                    self.add_target(run, &device, &format!("in{position}"));
                }
            }
        }
        Ok(())
    }

    /// Two consecutive bits share a run iff both are constants, or both come from the same
    /// primary device port at consecutive indices.
    fn split_runs(&self, bits: &BitVector) -> Vec<BitVector> {
        let mut runs: Vec<BitVector> = Vec::new();
        for bit in bits.iter() {
            if let Some(run) = runs.last_mut() {
                if same_run(&self.drivers, run[run.len() - 1], bit) {
                    run.push(bit);
                    continue;
                }
            }
            runs.push(std::iter::once(bit).collect());
        }
        runs
    }

    /// Materializes constants and slices for the remaining unsourced nets; whatever is
    /// left is undriven and dropped with a warning.
    fn resolve_nets(&mut self) -> Result<(), ImportError> {
        let mut index = 0;
        while index < self.nets.len() {
            let (bits, entry) = self.nets.get_index(index).unwrap();
            index += 1;
            if entry.source.is_some() || entry.targets.is_empty() {
                continue;
            }
            let name = entry.name.clone();
            let bits = bits.clone();
            if let Some(constant) = bits.as_const_string() {
                let device = self.add_device(Device::Constant(ConstValue { label: None, constant }));
                self.add_source(&bits, &device, "out", false)?;
            } else if let Some((first, parent)) = self.slice_parent(&bits) {
                let slice = SliceRange { first: first as u32, count: bits.len() as u32, total: parent.len() as u32 };
                let device = self.add_device(Device::BusSlice(Slice { label: None, slice }));
                self.add_source(&bits, &device, "out", false)?;
                self.add_target(&parent, &device, "in");
            } else {
                warn!("dropping undriven net {}", name.unwrap_or_else(|| bits.to_string()));
            }
        }
        Ok(())
    }

    /// If every bit is a contiguous ascending range of one primary device port, returns the
    /// start offset and the port's full vector.
    fn slice_parent(&self, bits: &BitVector) -> Option<(usize, BitVector)> {
        let first = self.drivers.get(&bits[0].as_net_id()?)?;
        for (offset, bit) in bits.iter().enumerate() {
            let driver = self.drivers.get(&bit.as_net_id()?)?;
            if driver.device != first.device || driver.port != first.port || driver.index != first.index + offset {
                return None;
            }
        }
        let parent = self.port_bits.get(&first.device)?.get(&first.port)?.clone();
        Some((first.index, parent))
    }

    /// Emits one connector per (source, target) pair, in net order then target order.
    /// Constants feeding several targets are replicated so each Constant device is referenced by
    /// at most one connector.
    fn emit_connectors(&mut self) {
        let nets = std::mem::take(&mut self.nets);
        for (_, net) in &nets {
            let Some(source) = &net.source else { continue };
            let constant = match self.circuit.devices.get(&source.id) {
                Some(Device::Constant(value)) => Some(value.clone()),
                _ => None,
            };
            for (position, target) in net.targets.iter().enumerate() {
                let from = match &constant {
                    Some(value) if position > 0 => {
                        let id = self.add_device(Device::Constant(value.clone()));
                        PortRef::new(id, "out")
                    }
                    _ => source.clone(),
                };
                self.circuit.connectors.push(Connector {
                    from,
                    to: target.clone(),
                    name: net.name.clone(),
                    source_positions: (!net.source_positions.is_empty()).then(|| net.source_positions.clone()),
                });
            }
        }
    }
}

fn required<'a>(name: &str, cell: &'a Cell, port: &str) -> Result<&'a BitVector, ImportError> {
    cell.connection(port).ok_or_else(|| ImportError::MissingConnection {
        celltype: cell.kind.clone(),
        cell: name.to_string(),
        port: port.to_string(),
    })
}

fn same_run(drivers: &HashMap<u64, BitDriver>, previous: Bit, bit: Bit) -> bool {
    match (previous, bit) {
        (Bit::Const(_), Bit::Const(_)) => true,
        (Bit::Net(a), Bit::Net(b)) => match (drivers.get(&a), drivers.get(&b)) {
            (Some(left), Some(right)) => {
                left.device == right.device && left.port == right.port && right.index == left.index + 1
            }
            _ => false,
        },
        _ => false,
    }
}

fn is_const_ones(bits: &BitVector) -> bool {
    !bits.is_empty() && bits.iter().all(|bit| bit == Bit::Const(Logic::One))
}

fn bin_to_uint(text: &str) -> u64 {
    text.chars().fold(0, |value, c| (value << 1) | u64::from(c == '1'))
}

/// Reads word `index` of a per-read-port value parameter; `None` when the parameter is absent or
/// the word is entirely `x` (meaning the feature is unused for this port).
fn memory_word(cell: &Cell, param: &str, index: usize, width: usize, count: usize) -> Option<String> {
    let text = cell.param(param)?.to_bits_string(width * count);
    let word = &text[text.len() - (index + 1) * width..text.len() - index * width];
    if word.chars().all(|c| c == 'x') {
        None
    } else {
        Some(word.to_string())
    }
}

/// Slices an INIT parameter into per-address words, MSB-first, padding short payloads on the
/// high side with `x` or `0` depending on the payload's trailing character.
fn decode_memdata(init: &ParamValue, words: usize, width: usize) -> Vec<String> {
    let total = words * width;
    let raw = match init {
        ParamValue::Bits(text) => text.clone(),
        other => other.to_bits_string(total),
    };
    let text = if raw.len() >= total {
        raw[raw.len() - total..].to_string()
    } else {
        let pad = if raw.ends_with('x') { "x" } else { "0" };
        let mut padded = pad.repeat(total - raw.len());
        padded.push_str(&raw);
        padded
    };
    (0..words).map(|word| text[total - (word + 1) * width..total - word * width].to_string()).collect()
}

/// Parses a `src` attribute: `<file>:<line>.<col>-<line>.<col>` entries joined by `|`.
fn parse_source_positions(src: &str) -> Vec<SourcePosition> {
    src.split('|').filter_map(parse_source_position).collect()
}

fn parse_source_position(text: &str) -> Option<SourcePosition> {
    let (name, span) = text.rsplit_once(':')?;
    let (from, to) = span.split_once('-')?;
    Some(SourcePosition { name: name.to_string(), from: parse_text_position(from)?, to: parse_text_position(to)? })
}

fn parse_text_position(text: &str) -> Option<TextPosition> {
    let (line, column) = text.split_once('.')?;
    Some(TextPosition { line: line.parse().ok()?, column: column.parse().ok()? })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_source_positions() {
        let positions = parse_source_positions("top.v:3.1-3.14|lib/add.v:7.5-9.2");
        assert_eq!(positions.len(), 2);
        assert_eq!(positions[0].name, "top.v");
        assert_eq!(positions[0].from, TextPosition { line: 3, column: 1 });
        assert_eq!(positions[0].to, TextPosition { line: 3, column: 14 });
        assert_eq!(positions[1].name, "lib/add.v");
        assert_eq!(positions[1].from.line, 7);
    }

    #[test]
    fn test_parse_source_positions_malformed() {
        assert!(parse_source_positions("nonsense").is_empty());
    }

    #[test]
    fn test_decode_memdata() {
        let init = ParamValue::from("00011011");
        assert_eq!(decode_memdata(&init, 4, 2), ["11", "10", "01", "00"]);
    }

    #[test]
    fn test_decode_memdata_padding() {
        let init = ParamValue::from("1x");
        assert_eq!(decode_memdata(&init, 2, 2), ["1x", "xx"]);
        let init = ParamValue::from("10");
        assert_eq!(decode_memdata(&init, 2, 2), ["10", "00"]);
    }

    #[test]
    fn test_bin_to_uint() {
        assert_eq!(bin_to_uint(""), 0);
        assert_eq!(bin_to_uint("101"), 5);
        assert_eq!(bin_to_uint("x1"), 1);
    }
}
