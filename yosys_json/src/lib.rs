//! This library converts Yosys JSON netlists into schemview display netlists.
//!
//! The synthesizer's per-module JSON describes cells and bit-level wiring; [`convert`] rewrites
//! each module into a graph of display devices connected by named multi-bit nets, reconstructing
//! net identity across cell boundaries, inserting the bus grouping/slicing/extension glue that
//! makes multi-bit connectivity first-class, and assembling the modules into one hierarchical
//! [`Circuit`] with sub-circuits ordered by instantiation.
//!
//! [`Circuit`]: schemview_netlist::Circuit

mod bits;
mod cells;
mod convert;
mod depsort;
mod error;
mod input;
mod param;
mod portmap;

pub use bits::{Bit, BitVector, Logic};
pub use cells::{
    ArithOp, BitwiseOp, CellKind, CompareOp, LogicOp, ReduceOp, RegisterShape, ShiftOp, UnaryArithOp,
};
pub use convert::{convert, import};
pub use depsort::instantiation_order;
pub use error::ImportError;
pub use input::{Cell, Direction, Module, NetName, Netlist, Port};
pub use param::ParamValue;
pub use portmap::PortMaps;
