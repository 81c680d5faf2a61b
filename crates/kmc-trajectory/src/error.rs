//! Error types for trajectory output and parsing.

use std::fmt;
use std::io;

/// Errors raised while writing or reading trajectories.
#[derive(Debug)]
pub enum TrajectoryError {
    /// An I/O error occurred during read or write.
    Io(io::Error),
    /// A trajectory file could not be parsed.
    Malformed {
        /// 1-based line number, or 0 for whole-file problems.
        line: usize,
        /// Human-readable description of what went wrong.
        detail: String,
    },
    /// The sink cannot represent the frame it was given.
    Unsupported {
        /// Why.
        reason: String,
    },
}

impl TrajectoryError {
    pub(crate) fn malformed(line: usize, detail: impl Into<String>) -> Self {
        Self::Malformed {
            line,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for TrajectoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Malformed { line, detail } => {
                write!(f, "malformed trajectory at line {line}: {detail}")
            }
            Self::Unsupported { reason } => write!(f, "unsupported: {reason}"),
        }
    }
}

impl std::error::Error for TrajectoryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for TrajectoryError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// Sinks report through `io::Error`; non-IO variants become
/// `InvalidData` with the original error attached.
impl From<TrajectoryError> for io::Error {
    fn from(e: TrajectoryError) -> Self {
        match e {
            TrajectoryError::Io(e) => e,
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}
