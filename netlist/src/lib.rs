//! This library provides the in-memory form of the schemview display netlist.
//!
//! A [`Circuit`] is a graph of [`Device`]s connected by [`Connector`]s, plus a map of named
//! sub-circuits. Devices carry a closed vocabulary of type tags understood by the interactive
//! schematic viewer; connectors name the multi-bit nets between device ports. The representation
//! serializes directly to the viewer's JSON format.

mod circuit;
mod connector;
mod device;
mod ioui;

pub use circuit::Circuit;
pub use connector::{Connector, PortRef, SourcePosition, TextPosition};
pub use device::{
    BinaryArith, Comparison, ConstValue, Device, Extend, ExtendWidths, FlipFlop, Fsm, FsmTransition, Gate, Group, Io,
    Memory, MemReadPort, MemWritePort, Mux, Polarity, Shift, SignedBinary, SignedShift, Slice, SliceRange, Subcircuit,
    Transparency, UnaryArith, WidthBinary, WidthCompare, WidthInOut, WidthMux,
};
pub use ioui::{promote_io_devices, CLOCK_PROPAGATION};
