use serde::{Deserialize, Serialize};

fn is_false(flag: &bool) -> bool {
    !*flag
}

/// Widths of a one-input, one-output device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidthInOut {
    #[serde(rename = "in")]
    pub input: u32,
    #[serde(rename = "out")]
    pub output: u32,
}

/// Widths of a two-input, one-output device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidthBinary {
    pub in1: u32,
    pub in2: u32,
    #[serde(rename = "out")]
    pub output: u32,
}

/// Widths of a comparison device; the output is always a single bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidthCompare {
    pub in1: u32,
    pub in2: u32,
}

/// Data and select widths of a multiplexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidthMux {
    #[serde(rename = "in")]
    pub input: u32,
    pub sel: u32,
}

/// Signedness of the two operands of an arithmetic or comparison device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedBinary {
    pub in1: bool,
    pub in2: bool,
}

/// Signedness of a shift device; `output` requests an arithmetic shift.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedShift {
    pub in1: bool,
    pub in2: bool,
    #[serde(rename = "out")]
    pub output: bool,
}

/// Input and output widths of an extension device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtendWidths {
    pub input: u32,
    pub output: u32,
}

/// Contiguous slice of a wider parent port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SliceRange {
    pub first: u32,
    pub count: u32,
    pub total: u32,
}

/// Active levels of the control inputs a register or FSM actually has.
///
/// Absent fields mean the device has no such input; present fields record whether the input is
/// active-high (`true`) or active-low (`false`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Polarity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clock: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arst: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub srst: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clr: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aload: Option<bool>,
}

/// An input or output control of the circuit. Ports `out` (for inputs) and `in` (for outputs).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Io {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub net: String,
    pub order: usize,
    pub bits: u32,
    /// Propagation delay; only meaningful for clock generators.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub propagation: Option<u32>,
}

/// A constant driver. The payload is MSB-first and may contain `x`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub constant: String,
}

/// A simple gate with equal-width ports: bitwise gates (ports `in`/`in1`/`in2`, `out`) and
/// reductions (where `bits` is the input width and the output is one bit).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub bits: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnaryArith {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub bits: WidthInOut,
    pub signed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryArith {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub bits: WidthBinary,
    pub signed: SignedBinary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comparison {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub bits: WidthCompare,
    pub signed: SignedBinary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shift {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub bits: WidthBinary,
    pub signed: SignedShift,
    /// Shift in `x` instead of zeros or sign bits.
    #[serde(default, skip_serializing_if = "is_false")]
    pub fillx: bool,
}

/// A multiplexer; `Mux` has a binary select, `Mux1Hot` a one-hot select over `in1..inN`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mux {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub bits: WidthMux,
}

/// A register of any flavor: d-flip-flops, latches and set-reset cells all lower to this,
/// with the control-input set described by `polarity`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlipFlop {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub bits: u32,
    pub polarity: Polarity,
    /// Power-up value, MSB-first, `x` allowed. Same width as `bits`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arst_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub srst_value: Option<String>,
    /// The synchronous reset only fires while the enable is active.
    #[serde(default, skip_serializing_if = "is_false")]
    pub enable_srst: bool,
    /// Set-reset cell without a data input.
    #[serde(default, skip_serializing_if = "is_false")]
    pub no_data: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FsmTransition {
    pub state_in: u64,
    pub ctrl_in: String,
    pub state_out: u64,
    pub ctrl_out: String,
}

/// A finite-state machine with a flattened transition table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fsm {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub bits: WidthInOut,
    pub polarity: Polarity,
    pub wirename: String,
    pub states: u64,
    pub init_state: u64,
    pub trans_table: Vec<FsmTransition>,
}

/// Read-port transparency: a single flag (legacy memories) or a per-write-port mask.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Transparency {
    All(bool),
    PerPort(Vec<bool>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemReadPort {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clock_polarity: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_polarity: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arst_polarity: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub srst_polarity: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_srst: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arst_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub srst_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transparent: Option<Transparency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collision: Option<Vec<bool>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemWritePort {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clock_polarity: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_polarity: Option<bool>,
}

/// A memory array with synthetic per-port connections `rd<k>addr`, `rd<k>data`, `wr<k>addr`, ….
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memory {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub bits: u32,
    pub abits: u32,
    pub words: u64,
    pub offset: u64,
    pub rdports: Vec<MemReadPort>,
    pub wrports: Vec<MemWritePort>,
    /// Initial contents, one MSB-first word per address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memdata: Option<Vec<String>>,
}

/// Bus grouping/ungrouping glue; `groups` lists the widths of the partial buses in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub groups: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slice {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub slice: SliceRange,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extend {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub extend: ExtendWidths,
}

/// An instance of another module, connected through its own port names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subcircuit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub celltype: String,
}

/// A display device. The serialized form carries the variant name in a `type` field; the set of
/// type tags is closed and fixed by the viewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Device {
    Input(Io),
    Output(Io),
    Clock(Io),
    Button(Io),
    Lamp(Io),
    NumEntry(Io),
    NumDisplay(Io),
    Display7(Io),
    Constant(ConstValue),
    Not(Gate),
    Repeater(Gate),
    And(Gate),
    Nand(Gate),
    Or(Gate),
    Nor(Gate),
    Xor(Gate),
    Xnor(Gate),
    AndReduce(Gate),
    NandReduce(Gate),
    OrReduce(Gate),
    NorReduce(Gate),
    XorReduce(Gate),
    XnorReduce(Gate),
    Negation(UnaryArith),
    UnaryPlus(UnaryArith),
    Addition(BinaryArith),
    Subtraction(BinaryArith),
    Multiplication(BinaryArith),
    Division(BinaryArith),
    Modulo(BinaryArith),
    Power(BinaryArith),
    ShiftLeft(Shift),
    ShiftRight(Shift),
    Lt(Comparison),
    Le(Comparison),
    Eq(Comparison),
    Ne(Comparison),
    Gt(Comparison),
    Ge(Comparison),
    Mux(Mux),
    Mux1Hot(Mux),
    Dff(FlipFlop),
    Memory(Memory),
    #[serde(rename = "FSM")]
    Fsm(Fsm),
    BusGroup(Group),
    BusUngroup(Group),
    BusSlice(Slice),
    ZeroExtend(Extend),
    SignExtend(Extend),
    Subcircuit(Subcircuit),
}

impl Device {
    /// The serialized type tag of this device.
    pub fn type_tag(&self) -> &'static str {
        match self {
            Device::Input(_) => "Input",
            Device::Output(_) => "Output",
            Device::Clock(_) => "Clock",
            Device::Button(_) => "Button",
            Device::Lamp(_) => "Lamp",
            Device::NumEntry(_) => "NumEntry",
            Device::NumDisplay(_) => "NumDisplay",
            Device::Display7(_) => "Display7",
            Device::Constant(_) => "Constant",
            Device::Not(_) => "Not",
            Device::Repeater(_) => "Repeater",
            Device::And(_) => "And",
            Device::Nand(_) => "Nand",
            Device::Or(_) => "Or",
            Device::Nor(_) => "Nor",
            Device::Xor(_) => "Xor",
            Device::Xnor(_) => "Xnor",
            Device::AndReduce(_) => "AndReduce",
            Device::NandReduce(_) => "NandReduce",
            Device::OrReduce(_) => "OrReduce",
            Device::NorReduce(_) => "NorReduce",
            Device::XorReduce(_) => "XorReduce",
            Device::XnorReduce(_) => "XnorReduce",
            Device::Negation(_) => "Negation",
            Device::UnaryPlus(_) => "UnaryPlus",
            Device::Addition(_) => "Addition",
            Device::Subtraction(_) => "Subtraction",
            Device::Multiplication(_) => "Multiplication",
            Device::Division(_) => "Division",
            Device::Modulo(_) => "Modulo",
            Device::Power(_) => "Power",
            Device::ShiftLeft(_) => "ShiftLeft",
            Device::ShiftRight(_) => "ShiftRight",
            Device::Lt(_) => "Lt",
            Device::Le(_) => "Le",
            Device::Eq(_) => "Eq",
            Device::Ne(_) => "Ne",
            Device::Gt(_) => "Gt",
            Device::Ge(_) => "Ge",
            Device::Mux(_) => "Mux",
            Device::Mux1Hot(_) => "Mux1Hot",
            Device::Dff(_) => "Dff",
            Device::Memory(_) => "Memory",
            Device::Fsm(_) => "FSM",
            Device::BusGroup(_) => "BusGroup",
            Device::BusUngroup(_) => "BusUngroup",
            Device::BusSlice(_) => "BusSlice",
            Device::ZeroExtend(_) => "ZeroExtend",
            Device::SignExtend(_) => "SignExtend",
            Device::Subcircuit(_) => "Subcircuit",
        }
    }

    pub fn is_constant(&self) -> bool {
        matches!(self, Device::Constant(_))
    }
}
