//! Process compilation errors.

use std::error::Error;
use std::fmt;

use kmc_core::{InputError, ProcessId};

/// Errors raised while compiling processes against a lattice.
#[derive(Clone, Debug, PartialEq)]
pub enum CompileError {
    /// A process record is malformed.
    Input {
        /// The offending process.
        process: ProcessId,
        /// What was wrong with it.
        source: InputError,
    },
    /// A process's offsets do not fit the precomputed neighbourhood.
    PatternMismatch {
        /// The offending process.
        process: ProcessId,
        /// Which offset failed and why.
        reason: String,
    },
    /// Configuration-level input error (cutoff, occupancy mode).
    Setup(InputError),
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input { process, source } => write!(f, "process {process}: {source}"),
            Self::PatternMismatch { process, reason } => {
                write!(f, "process {process} does not fit the lattice: {reason}")
            }
            Self::Setup(e) => write!(f, "{e}"),
        }
    }
}

impl Error for CompileError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Input { source, .. } => Some(source),
            Self::Setup(e) => Some(e),
            Self::PatternMismatch { .. } => None,
        }
    }
}

impl From<InputError> for CompileError {
    fn from(e: InputError) -> Self {
        Self::Setup(e)
    }
}
