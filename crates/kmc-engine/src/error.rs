//! Error types of model construction, the step function and the run loop.

use std::error::Error;
use std::fmt;
use std::io;

use kmc_core::{InputError, ProcessId};
use kmc_process::CompileError;

use crate::driver::RunSummary;

// ── StepError ──────────────────────────────────────────────────────

/// A fatal error inside one step.
#[derive(Clone, Debug, PartialEq)]
pub enum StepError {
    /// A custom rate calculator returned a non-positive or non-finite
    /// rate.
    PluginContract {
        /// Calculator name.
        calculator: String,
        /// Process being enabled.
        process: ProcessId,
        /// Centre site.
        site: usize,
        /// The offending value: the calculator's return, or the combined
        /// rate if that overflowed.
        rate: f64,
    },
}

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PluginContract {
                calculator,
                process,
                site,
                rate,
            } => write!(
                f,
                "rate calculator '{calculator}' returned rate {rate} for process {process} at site {site}"
            ),
        }
    }
}

impl Error for StepError {}

// ── ModelError ─────────────────────────────────────────────────────

/// Errors building a [`LatticeModel`](crate::LatticeModel).
#[derive(Clone, Debug, PartialEq)]
pub enum ModelError {
    /// Malformed input records.
    Input(InputError),
    /// A process failed to compile.
    Compile(CompileError),
    /// A rate calculator broke its contract while enabling the initial
    /// events.
    Step(StepError),
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input(e) => write!(f, "invalid input: {e}"),
            Self::Compile(e) => write!(f, "process compilation failed: {e}"),
            Self::Step(e) => write!(f, "initial rate evaluation failed: {e}"),
        }
    }
}

impl Error for ModelError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Input(e) => Some(e),
            Self::Compile(e) => Some(e),
            Self::Step(e) => Some(e),
        }
    }
}

impl From<InputError> for ModelError {
    fn from(e: InputError) -> Self {
        Self::Input(e)
    }
}

impl From<CompileError> for ModelError {
    fn from(e: CompileError) -> Self {
        Self::Compile(e)
    }
}

impl From<StepError> for ModelError {
    fn from(e: StepError) -> Self {
        Self::Step(e)
    }
}

// ── RunError ───────────────────────────────────────────────────────

/// Why a run was aborted.
#[derive(Debug)]
pub enum RunErrorKind {
    /// Control parameters failed validation.
    Input(InputError),
    /// The step function failed.
    Step(StepError),
    /// A trajectory sink failed twice in a row.
    Sink {
        /// Sink name.
        sink: String,
        /// The second failure.
        source: io::Error,
    },
}

impl fmt::Display for RunErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input(e) => write!(f, "invalid control parameters: {e}"),
            Self::Step(e) => write!(f, "{e}"),
            Self::Sink { sink, source } => write!(f, "trajectory sink '{sink}' failed: {source}"),
        }
    }
}

/// A fatal run error, with how far the run got.
///
/// Analyses have been finalized and the final barrier reached by the time
/// this is returned.
#[derive(Debug)]
pub struct RunError {
    /// The underlying failure.
    pub kind: RunErrorKind,
    /// State of the run at the failure.
    pub summary: RunSummary,
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "run aborted at step {} (t = {}): {}",
            self.summary.steps, self.summary.time, self.kind
        )
    }
}

impl Error for RunError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.kind {
            RunErrorKind::Input(e) => Some(e),
            RunErrorKind::Step(e) => Some(e),
            RunErrorKind::Sink { source, .. } => Some(source),
        }
    }
}
