//! Test utilities and mock plugins for lattice KMC development.
//!
//! [`fixtures`] builds the standard model records used across the
//! workspace tests. The mocks here implement the engine's plugin traits
//! and record what they were told:
//!
//! - [`RecordingAnalysis`]: every callback, in order.
//! - [`CountingBreaker`]: stops after N evaluations.
//! - [`MemorySink`]: frames as label vectors.
//! - [`FailingSink`]: fails a configurable number of writes.
//! - [`ConstantRate`]: a rate calculator returning a fixed value.
//!
//! [`view_of`] builds a [`StepView`] of a model for driving plugins by
//! hand.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::io::{self, Write};

use kmc_core::{Occupancy, ProcessId};
use kmc_engine::{Analysis, Breaker, Frame, LatticeModel, StepView, TrajectorySink};
use kmc_process::{RateCalculator, RateContext, RatePolicy};

/// One analysis callback, as seen by [`RecordingAnalysis`].
#[derive(Clone, Debug, PartialEq)]
pub enum Callback {
    Setup { time: f64 },
    Step { step: u64, time: f64, event: Option<(ProcessId, usize)> },
    Finalize,
}

/// Records every callback it receives.
#[derive(Debug, Default)]
pub struct RecordingAnalysis {
    pub calls: Vec<Callback>,
}

impl RecordingAnalysis {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `register_step` calls.
    pub fn step_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, Callback::Step { .. }))
            .count()
    }

    pub fn finalized(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, Callback::Finalize))
            .count()
    }
}

impl Analysis for RecordingAnalysis {
    fn name(&self) -> &str {
        "recording"
    }

    fn setup(&mut self, view: &StepView<'_>) {
        self.calls.push(Callback::Setup { time: view.time });
    }

    fn register_step(&mut self, view: &StepView<'_>) {
        self.calls.push(Callback::Step {
            step: view.step,
            time: view.time,
            event: view.last_event,
        });
    }

    fn finalize(&mut self) {
        self.calls.push(Callback::Finalize);
    }

    fn write_results(&self, out: &mut dyn Write) -> io::Result<()> {
        for c in &self.calls {
            if let Callback::Step { step, time, .. } = c {
                writeln!(out, "{step} {time:.17e}")?;
            }
        }
        Ok(())
    }
}

/// Asks to stop on its N-th evaluation.
#[derive(Debug)]
pub struct CountingBreaker {
    pub stop_after: u64,
    pub interval: u64,
    pub evaluations: u64,
}

impl CountingBreaker {
    pub fn new(stop_after: u64, interval: u64) -> Self {
        Self {
            stop_after,
            interval,
            evaluations: 0,
        }
    }
}

impl Breaker for CountingBreaker {
    fn name(&self) -> &str {
        "counting"
    }

    fn interval(&self) -> u64 {
        self.interval
    }

    fn evaluate(&mut self, _view: &StepView<'_>) -> bool {
        self.evaluations += 1;
        self.evaluations >= self.stop_after
    }
}

/// A recorded frame.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedFrame {
    pub step: u64,
    pub time: f64,
    pub labels: Vec<Occupancy>,
}

/// Keeps every frame in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub frames: Vec<RecordedFrame>,
    pub flushes: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TrajectorySink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    fn record(&mut self, frame: &Frame<'_>) -> io::Result<()> {
        self.frames.push(RecordedFrame {
            step: frame.step,
            time: frame.time,
            labels: frame.configuration.labels(frame.types),
        });
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flushes += 1;
        Ok(())
    }
}

/// Fails its first `failures` record calls, then succeeds.
#[derive(Debug)]
pub struct FailingSink {
    pub failures: usize,
    pub attempts: usize,
    pub recorded: usize,
}

impl FailingSink {
    pub fn new(failures: usize) -> Self {
        Self {
            failures,
            attempts: 0,
            recorded: 0,
        }
    }
}

impl TrajectorySink for FailingSink {
    fn name(&self) -> &str {
        "failing"
    }

    fn record(&mut self, _frame: &Frame<'_>) -> io::Result<()> {
        self.attempts += 1;
        if self.attempts <= self.failures {
            return Err(io::Error::other("disk full"));
        }
        self.recorded += 1;
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Returns the same value for every event.
#[derive(Debug, Clone, Copy)]
pub struct ConstantRate {
    pub value: f64,
    pub policy: RatePolicy,
}

impl ConstantRate {
    pub fn replace(value: f64) -> Self {
        Self {
            value,
            policy: RatePolicy::Replace,
        }
    }
}

impl RateCalculator for ConstantRate {
    fn name(&self) -> &str {
        "constant"
    }

    fn policy(&self) -> RatePolicy {
        self.policy
    }

    fn rate(&self, _ctx: &RateContext<'_>) -> f64 {
        self.value
    }
}

/// A view of `model` as the run loop would hand it to plugins.
pub fn view_of(
    model: &LatticeModel,
    step: u64,
    dt: f64,
    last_event: Option<(ProcessId, usize)>,
) -> StepView<'_> {
    StepView {
        time: model.time(),
        step,
        dt,
        last_event,
        configuration: model.configuration(),
        lattice: model.lattice(),
        types: model.types(),
        moves: &[],
    }
}
