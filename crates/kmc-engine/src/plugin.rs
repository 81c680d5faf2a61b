//! Plugin capabilities consumed by the run loop.
//!
//! Analyses, breakers and trajectory sinks are trait objects borrowed by
//! [`Plugins`](crate::Plugins) for the duration of a run. They see the
//! model only through read-only views handed to their callbacks.

use std::io::{self, Write};

use kmc_core::{ProcessId, TypeTable};
use kmc_lattice::Lattice;

use crate::configuration::{Configuration, ParticleMove};

/// Read-only state handed to analyses and breakers.
#[derive(Clone, Copy, Debug)]
pub struct StepView<'a> {
    /// Simulation time after the step.
    pub time: f64,
    /// Steps taken in this run (0 at setup).
    pub step: u64,
    /// Waiting time of the step that just fired (0 at setup).
    pub dt: f64,
    /// The event that just fired.
    pub last_event: Option<(ProcessId, usize)>,
    /// Current configuration.
    pub configuration: &'a Configuration,
    /// The lattice.
    pub lattice: &'a Lattice,
    /// Type names.
    pub types: &'a TypeTable,
    /// Tracked moves of the step that just fired.
    pub moves: &'a [ParticleMove],
}

/// A trajectory frame.
#[derive(Clone, Copy, Debug)]
pub struct Frame<'a> {
    /// Simulation time.
    pub time: f64,
    /// Steps taken in this run.
    pub step: u64,
    /// Configuration to record.
    pub configuration: &'a Configuration,
    /// The lattice.
    pub lattice: &'a Lattice,
    /// Type names.
    pub types: &'a TypeTable,
}

/// An on-the-fly analysis.
///
/// `setup` is called once with the initial state, `register_step` every
/// `analysis_interval` steps, and `finalize` once when the run ends, in
/// registration order, whatever the exit reason.
pub trait Analysis {
    /// Name for logging and error reports.
    fn name(&self) -> &str;

    /// Observe the initial state.
    fn setup(&mut self, view: &StepView<'_>);

    /// Observe the state after a step.
    fn register_step(&mut self, view: &StepView<'_>);

    /// Close accumulators at the end of the run.
    fn finalize(&mut self) {}

    /// Write the results as plain text columns.
    fn write_results(&self, out: &mut dyn Write) -> io::Result<()>;
}

/// A stop condition evaluated every [`interval`](Breaker::interval)
/// steps.
pub trait Breaker {
    /// Name, reported in the exit reason.
    fn name(&self) -> &str;

    /// Evaluate every this many steps. Default: 1.
    fn interval(&self) -> u64 {
        1
    }

    /// Observe the initial state.
    fn setup(&mut self, _view: &StepView<'_>) {}

    /// Whether the run should stop now.
    fn evaluate(&mut self, view: &StepView<'_>) -> bool;
}

/// A destination for trajectory frames.
///
/// Only the master rank records frames. A failed `record` or `flush` is
/// retried once before the run is aborted.
pub trait TrajectorySink {
    /// Name for logging and error reports.
    fn name(&self) -> &str;

    /// Record one frame. May buffer.
    fn record(&mut self, frame: &Frame<'_>) -> io::Result<()>;

    /// Write out everything buffered.
    fn flush(&mut self) -> io::Result<()>;
}
