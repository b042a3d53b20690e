use crate::{BitVector, Cell, Direction, ImportError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryArithOp {
    Neg,
    Pos,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReduceOp {
    And,
    Or,
    Xor,
    Xnor,
    Bool,
    LogicNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitwiseOp {
    And,
    Or,
    Xor,
    Xnor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Eqx,
    Nex,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftOp {
    Shl,
    Shr,
    Sshl,
    Sshr,
    Shift,
    Shiftx,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    And,
    Or,
}

/// Which control inputs a register variant carries. Every variant lowers to the same display
/// device; the shape picks the polarity fields, the connections to expect, and the asserts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegisterShape {
    pub clock: bool,
    pub enable: bool,
    pub arst: bool,
    pub srst: bool,
    pub set_clr: bool,
    pub aload: bool,
    /// Synchronous reset gated by the enable.
    pub enable_srst: bool,
    /// Level-sensitive: the enable is a latch gate, there is no clock.
    pub latch: bool,
    /// Set-reset cell without a data input.
    pub no_data: bool,
}

/// The closed taxonomy of primitive cell types the converter recognizes. Cell types outside this
/// set either name a user-defined module (and become sub-circuit instances) or are an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    /// Bitwise complement; the input is padded to the output width.
    Not,
    UnaryArith(UnaryArithOp),
    Reduce(ReduceOp),
    /// Bitwise binary gates; both inputs are padded to the output width.
    Bitwise(BitwiseOp),
    Arith(ArithOp),
    Compare(CompareOp),
    Shift(ShiftOp),
    /// Boolean gates over reduced operands.
    Logic(LogicOp),
    Mux,
    /// Fan-in priority multiplexer with a one-hot select.
    Pmux,
    Register(RegisterShape),
    Fsm,
    Memory { v2: bool },
    Lut,
}

impl CellKind {
    /// Maps a synthesizer cell-type string onto the taxonomy; `None` for anything unknown.
    pub fn classify(celltype: &str) -> Option<CellKind> {
        use RegisterShape as Reg;
        let reg = |shape: Reg| Some(CellKind::Register(shape));
        match celltype {
            "$not" => Some(CellKind::Not),
            "$neg" => Some(CellKind::UnaryArith(UnaryArithOp::Neg)),
            "$pos" => Some(CellKind::UnaryArith(UnaryArithOp::Pos)),
            "$reduce_and" => Some(CellKind::Reduce(ReduceOp::And)),
            "$reduce_or" => Some(CellKind::Reduce(ReduceOp::Or)),
            "$reduce_xor" => Some(CellKind::Reduce(ReduceOp::Xor)),
            "$reduce_xnor" => Some(CellKind::Reduce(ReduceOp::Xnor)),
            "$reduce_bool" => Some(CellKind::Reduce(ReduceOp::Bool)),
            "$logic_not" => Some(CellKind::Reduce(ReduceOp::LogicNot)),
            "$and" => Some(CellKind::Bitwise(BitwiseOp::And)),
            "$or" => Some(CellKind::Bitwise(BitwiseOp::Or)),
            "$xor" => Some(CellKind::Bitwise(BitwiseOp::Xor)),
            "$xnor" => Some(CellKind::Bitwise(BitwiseOp::Xnor)),
            "$add" => Some(CellKind::Arith(ArithOp::Add)),
            "$sub" => Some(CellKind::Arith(ArithOp::Sub)),
            "$mul" => Some(CellKind::Arith(ArithOp::Mul)),
            "$div" => Some(CellKind::Arith(ArithOp::Div)),
            "$mod" => Some(CellKind::Arith(ArithOp::Mod)),
            "$pow" => Some(CellKind::Arith(ArithOp::Pow)),
            "$eq" => Some(CellKind::Compare(CompareOp::Eq)),
            "$ne" => Some(CellKind::Compare(CompareOp::Ne)),
            "$eqx" => Some(CellKind::Compare(CompareOp::Eqx)),
            "$nex" => Some(CellKind::Compare(CompareOp::Nex)),
            "$lt" => Some(CellKind::Compare(CompareOp::Lt)),
            "$le" => Some(CellKind::Compare(CompareOp::Le)),
            "$gt" => Some(CellKind::Compare(CompareOp::Gt)),
            "$ge" => Some(CellKind::Compare(CompareOp::Ge)),
            "$shl" => Some(CellKind::Shift(ShiftOp::Shl)),
            "$shr" => Some(CellKind::Shift(ShiftOp::Shr)),
            "$sshl" => Some(CellKind::Shift(ShiftOp::Sshl)),
            "$sshr" => Some(CellKind::Shift(ShiftOp::Sshr)),
            "$shift" => Some(CellKind::Shift(ShiftOp::Shift)),
            "$shiftx" => Some(CellKind::Shift(ShiftOp::Shiftx)),
            "$logic_and" => Some(CellKind::Logic(LogicOp::And)),
            "$logic_or" => Some(CellKind::Logic(LogicOp::Or)),
            "$mux" => Some(CellKind::Mux),
            "$pmux" => Some(CellKind::Pmux),
            "$dff" => reg(Reg { clock: true, ..Reg::default() }),
            "$dffe" => reg(Reg { clock: true, enable: true, ..Reg::default() }),
            "$adff" => reg(Reg { clock: true, arst: true, ..Reg::default() }),
            "$adffe" => reg(Reg { clock: true, enable: true, arst: true, ..Reg::default() }),
            "$sdff" => reg(Reg { clock: true, srst: true, ..Reg::default() }),
            "$sdffe" => reg(Reg { clock: true, enable: true, srst: true, ..Reg::default() }),
            "$sdffce" => reg(Reg { clock: true, enable: true, srst: true, enable_srst: true, ..Reg::default() }),
            "$dlatch" => reg(Reg { enable: true, latch: true, ..Reg::default() }),
            "$adlatch" => reg(Reg { enable: true, arst: true, latch: true, ..Reg::default() }),
            "$dffsr" => reg(Reg { clock: true, set_clr: true, ..Reg::default() }),
            "$dffsre" => reg(Reg { clock: true, enable: true, set_clr: true, ..Reg::default() }),
            "$aldff" => reg(Reg { clock: true, aload: true, ..Reg::default() }),
            "$aldffe" => reg(Reg { clock: true, enable: true, aload: true, ..Reg::default() }),
            "$sr" => reg(Reg { set_clr: true, no_data: true, ..Reg::default() }),
            "$fsm" => Some(CellKind::Fsm),
            "$mem" => Some(CellKind::Memory { v2: false }),
            "$mem_v2" => Some(CellKind::Memory { v2: true }),
            "$lut" => Some(CellKind::Lut),
            _ => None,
        }
    }

    /// Asserts the structural width and direction invariants of the cell class.
    pub fn validate(&self, name: &str, cell: &Cell) -> Result<(), ImportError> {
        let check = CellCheck { name, cell };
        match *self {
            CellKind::Not | CellKind::UnaryArith(_) | CellKind::Reduce(_) => {
                check.input_width_param("A", "A_WIDTH")?;
                check.output_width_param("Y", "Y_WIDTH")
            }
            CellKind::Bitwise(_) | CellKind::Arith(_) | CellKind::Compare(_) | CellKind::Shift(_)
            | CellKind::Logic(_) => {
                check.input_width_param("A", "A_WIDTH")?;
                check.input_width_param("B", "B_WIDTH")?;
                check.output_width_param("Y", "Y_WIDTH")
            }
            CellKind::Mux => {
                let width = check.required("Y")?.len();
                check.input("A", width)?;
                check.input("B", width)?;
                check.input("S", 1)?;
                check.output("Y", width)
            }
            CellKind::Pmux => {
                let width = check.required("A")?.len();
                let select = check.required("S")?.len();
                if let Some(param) = cell.uint_param("WIDTH") {
                    check.expect(param as usize == width, "WIDTH does not match the A connection")?;
                }
                if let Some(param) = cell.uint_param("S_WIDTH") {
                    check.expect(param as usize == select, "S_WIDTH does not match the S connection")?;
                }
                check.input("B", width * select)?;
                check.output("Y", width)
            }
            CellKind::Register(shape) => {
                let width = match cell.uint_param("WIDTH") {
                    Some(value) => value as usize,
                    None => check.required("Q")?.len(),
                };
                check.output("Q", width)?;
                if !shape.no_data {
                    check.input("D", width)?;
                }
                if shape.clock {
                    check.input("CLK", 1)?;
                }
                if shape.enable {
                    check.input("EN", 1)?;
                }
                if shape.arst {
                    check.input("ARST", 1)?;
                }
                if shape.srst {
                    check.input("SRST", 1)?;
                }
                if shape.aload {
                    check.input("ALOAD", 1)?;
                    check.input("AD", width)?;
                }
                if shape.set_clr {
                    check.input("SET", width)?;
                    check.input("CLR", width)?;
                }
                Ok(())
            }
            CellKind::Fsm => {
                check.input("CLK", 1)?;
                check.input("ARST", 1)?;
                check.input("CTRL_IN", check.uint("CTRL_IN_WIDTH", 0) as usize)?;
                check.output("CTRL_OUT", check.uint("CTRL_OUT_WIDTH", 0) as usize)
            }
            CellKind::Memory { v2 } => {
                let width = check.uint("WIDTH", 1) as usize;
                let abits = check.uint("ABITS", 0) as usize;
                let rd = check.uint("RD_PORTS", 0) as usize;
                let wr = check.uint("WR_PORTS", 0) as usize;
                check.input_if_present("RD_ADDR", rd * abits)?;
                check.output_if_present("RD_DATA", rd * width)?;
                check.input_if_present("RD_CLK", rd)?;
                check.input_if_present("RD_EN", rd)?;
                check.input_if_present("WR_ADDR", wr * abits)?;
                check.input_if_present("WR_DATA", wr * width)?;
                check.input_if_present("WR_EN", wr * width)?;
                check.input_if_present("WR_CLK", wr)?;
                if v2 {
                    check.input_if_present("RD_ARST", rd)?;
                    check.input_if_present("RD_SRST", rd)?;
                }
                Ok(())
            }
            CellKind::Lut => {
                check.input("A", check.uint("WIDTH", 0) as usize)?;
                check.output("Y", 1)
            }
        }
    }
}

/// Validation context for one cell; wraps the error plumbing so the checks above read as a list
/// of assertions.
struct CellCheck<'a> {
    name: &'a str,
    cell: &'a Cell,
}

impl<'a> CellCheck<'a> {
    fn structural(&self, reason: impl Into<String>) -> ImportError {
        ImportError::Structural {
            celltype: self.cell.kind.clone(),
            cell: self.name.to_string(),
            reason: reason.into(),
        }
    }

    fn expect(&self, condition: bool, reason: &str) -> Result<(), ImportError> {
        if condition {
            Ok(())
        } else {
            Err(self.structural(reason))
        }
    }

    fn required(&self, port: &str) -> Result<&'a BitVector, ImportError> {
        self.cell.connection(port).ok_or_else(|| ImportError::MissingConnection {
            celltype: self.cell.kind.clone(),
            cell: self.name.to_string(),
            port: port.to_string(),
        })
    }

    fn uint(&self, param: &str, default: u64) -> u64 {
        self.cell.uint_param(param).unwrap_or(default)
    }

    fn direction(&self, port: &str, expected: Direction) -> Result<(), ImportError> {
        match self.cell.port_directions.get(port) {
            Some(&direction) if direction != expected => {
                Err(self.structural(format!("port {port} should be an {}", expected.as_str())))
            }
            _ => Ok(()),
        }
    }

    fn width(&self, port: &str, expected: usize) -> Result<(), ImportError> {
        let bits = self.required(port)?;
        self.expect(
            bits.len() == expected,
            &format!("port {port} is {} bits wide, expected {expected}", bits.len()),
        )
    }

    fn input(&self, port: &str, expected: usize) -> Result<(), ImportError> {
        self.direction(port, Direction::Input)?;
        self.width(port, expected)
    }

    fn output(&self, port: &str, expected: usize) -> Result<(), ImportError> {
        self.direction(port, Direction::Output)?;
        self.width(port, expected)
    }

    fn input_if_present(&self, port: &str, expected: usize) -> Result<(), ImportError> {
        match self.cell.connection(port) {
            Some(_) => self.input(port, expected),
            None => Ok(()),
        }
    }

    fn output_if_present(&self, port: &str, expected: usize) -> Result<(), ImportError> {
        match self.cell.connection(port) {
            Some(_) => self.output(port, expected),
            None => Ok(()),
        }
    }

    /// Checks a data port against its width parameter when the parameter is present.
    fn width_param(&self, port: &str, param: &str) -> Result<(), ImportError> {
        match self.cell.uint_param(param) {
            Some(expected) => self.width(port, expected as usize),
            None => self.required(port).map(|_| ()),
        }
    }

    fn input_width_param(&self, port: &str, param: &str) -> Result<(), ImportError> {
        self.direction(port, Direction::Input)?;
        self.width_param(port, param)
    }

    fn output_width_param(&self, port: &str, param: &str) -> Result<(), ImportError> {
        self.direction(port, Direction::Output)?;
        self.width_param(port, param)
    }
}
