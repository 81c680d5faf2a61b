//! Input validation errors.
//!
//! Raised while turning input records into engine objects. Never
//! produced from inside the step loop.

use std::error::Error;
use std::fmt;

/// A malformed input record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputError {
    /// A record field has the wrong shape or an out-of-range value.
    Invalid {
        /// Which record (or record field) was rejected.
        what: String,
        /// Human-readable description of the failure.
        reason: String,
    },
    /// A type name is not in the declared set of possible types.
    UnknownType {
        /// The offending name.
        name: String,
    },
    /// The JSON document could not be parsed.
    Parse {
        /// Parser message, including line and column.
        reason: String,
    },
}

impl InputError {
    /// Shorthand for [`InputError::Invalid`].
    pub fn invalid(what: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            what: what.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid { what, reason } => write!(f, "invalid {what}: {reason}"),
            Self::UnknownType { name } => {
                write!(f, "type '{name}' is not in the set of possible types")
            }
            Self::Parse { reason } => write!(f, "could not parse input: {reason}"),
        }
    }
}

impl Error for InputError {}

impl From<serde_json::Error> for InputError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse {
            reason: e.to_string(),
        }
    }
}
