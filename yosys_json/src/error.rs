use std::error::Error;
use std::fmt::{self, Display};

/// An error produced while importing a synthesizer netlist.
#[derive(Debug)]
pub enum ImportError {
    /// The input is not valid synthesizer JSON.
    Json(serde_json::Error),
    /// A cell's connection widths or port directions contradict its parameters.
    Structural { celltype: String, cell: String, reason: String },
    /// A cell listed a port in its direction map without a matching connection.
    MissingConnection { celltype: String, cell: String, port: String },
    /// Two sources were wired to the same bit-vector net.
    MultipleDrivers { net: String },
    /// A cell type with no substitution, no bespoke wirer, and no matching module.
    UnknownCellType { celltype: String },
    /// A port direction other than input or output where one of those was required.
    InvalidDirection { port: String, direction: String },
    /// The module instantiation graph contains a cycle.
    HierarchyCycle { module: String },
}

impl Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportError::Json(error) => write!(f, "malformed input: {error}"),
            ImportError::Structural { celltype, cell, reason } => {
                write!(f, "invalid {celltype} cell {cell}: {reason}")
            }
            ImportError::MissingConnection { celltype, cell, port } => {
                write!(f, "{celltype} cell {cell} has no connection for port {port}")
            }
            ImportError::MultipleDrivers { net } => write!(f, "multiple drivers for net {net}"),
            ImportError::UnknownCellType { celltype } => write!(f, "unknown cell type {celltype}"),
            ImportError::InvalidDirection { port, direction } => {
                write!(f, "invalid direction {direction} for port {port}")
            }
            ImportError::HierarchyCycle { module } => {
                write!(f, "module hierarchy contains a cycle through {module}")
            }
        }
    }
}

impl Error for ImportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ImportError::Json(error) => Some(error),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ImportError {
    fn from(error: serde_json::Error) -> Self {
        ImportError::Json(error)
    }
}
