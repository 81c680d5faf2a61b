//! The run loop.
//!
//! [`LatticeModel::run`] composes the step function with the plugins:
//!
//! 1. Validate the control parameters and settle the seed.
//! 2. `setup` every analysis and breaker on the initial state, dump
//!    step 0, barrier.
//! 3. Step until `number_of_steps`, no enabled events, a breaker, or the
//!    time limit. After each step: analyses every `analysis_interval`,
//!    frames every `dump_interval` (and on `dump_time_interval`
//!    crossings), breakers at their own interval.
//! 4. `finalize` every analysis, flush every sink, barrier.
//!
//! A fatal error finalizes the analyses and reaches the final barrier
//! before it is returned.

use std::io;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use tracing::{info, warn};

use kmc_core::{KmcRng, MpiFacade, ProcessId};

use crate::config::ControlParameters;
use crate::configuration::ParticleMove;
use crate::error::{RunError, RunErrorKind};
use crate::metrics::RunMetrics;
use crate::model::LatticeModel;
use crate::plugin::{Analysis, Breaker, Frame, StepView, TrajectorySink};

// ── ExitReason ─────────────────────────────────────────────────────

/// Why a run stopped normally.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExitReason {
    /// All requested steps were taken.
    Completed,
    /// The total rate reached zero.
    NoEnabledEvents,
    /// A breaker asked to stop.
    Breaker {
        /// The breaker's name.
        name: String,
    },
    /// Simulation time passed the time limit.
    TimeLimit,
}

impl ExitReason {
    /// Stable identifier of the reason.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::NoEnabledEvents => "no-enabled-events",
            Self::Breaker { .. } => "breaker",
            Self::TimeLimit => "time-limit",
        }
    }
}

/// Outcome of a run.
#[derive(Clone, Debug, PartialEq)]
pub struct RunSummary {
    /// Steps taken in this run.
    pub steps: u64,
    /// Simulation time at the end.
    pub time: f64,
    /// Why the run stopped.
    pub reason: ExitReason,
    /// The seed actually used.
    pub seed: u64,
    /// Counters accumulated by the model.
    pub metrics: RunMetrics,
}

// ── Plugins ────────────────────────────────────────────────────────

/// The analyses, breakers and sinks taking part in a run.
///
/// Plugins are borrowed, so the caller keeps ownership and reads results
/// after [`LatticeModel::run`] returns.
#[derive(Default)]
pub struct Plugins<'a> {
    analyses: Vec<&'a mut dyn Analysis>,
    breakers: Vec<&'a mut dyn Breaker>,
    sinks: Vec<&'a mut dyn TrajectorySink>,
}

impl<'a> Plugins<'a> {
    /// No plugins.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an analysis. Analyses are called in registration order.
    pub fn analysis(mut self, a: &'a mut dyn Analysis) -> Self {
        self.analyses.push(a);
        self
    }

    /// Register a breaker.
    pub fn breaker(mut self, b: &'a mut dyn Breaker) -> Self {
        self.breakers.push(b);
        self
    }

    /// Register a trajectory sink.
    pub fn sink(mut self, s: &'a mut dyn TrajectorySink) -> Self {
        self.sinks.push(s);
        self
    }
}

fn wall_clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_nanos() as u64)
}

fn with_retry<F>(name: &str, retries: &mut u64, mut op: F) -> io::Result<()>
where
    F: FnMut() -> io::Result<()>,
{
    match op() {
        Ok(()) => Ok(()),
        Err(first) => {
            warn!(sink = name, error = %first, "trajectory sink failed, retrying once");
            op()?;
            *retries += 1;
            Ok(())
        }
    }
}

impl LatticeModel {
    fn view<'v>(
        &'v self,
        step: u64,
        dt: f64,
        last: Option<(ProcessId, usize)>,
        moves: &'v [ParticleMove],
    ) -> StepView<'v> {
        StepView {
            time: self.time(),
            step,
            dt,
            last_event: last,
            configuration: self.configuration(),
            lattice: self.lattice(),
            types: self.types(),
            moves,
        }
    }

    fn dump(
        &mut self,
        sinks: &mut [&mut dyn TrajectorySink],
        step: u64,
        mpi: &dyn MpiFacade,
    ) -> Result<(), RunErrorKind> {
        if !mpi.is_master() {
            return Ok(());
        }
        let mut retries = 0;
        let frame = Frame {
            time: self.time(),
            step,
            configuration: self.configuration(),
            lattice: self.lattice(),
            types: self.types(),
        };
        for sink in sinks.iter_mut() {
            let name = sink.name().to_string();
            with_retry(&name, &mut retries, || sink.record(&frame))
                .map_err(|source| RunErrorKind::Sink { sink: name, source })?;
        }
        let m = self.metrics_mut();
        m.frames_dumped += 1;
        m.sink_retries += retries;
        Ok(())
    }

    fn summary(&self, steps: u64, reason: ExitReason, seed: u64) -> RunSummary {
        RunSummary {
            steps,
            time: self.time(),
            reason,
            seed,
            metrics: self.metrics().clone(),
        }
    }

    /// Run the simulation.
    ///
    /// Once the control parameters validate, every analysis is finalized
    /// exactly once, whether the run completes or fails. Only the master
    /// rank records frames; every rank reaches the same barriers.
    pub fn run(
        &mut self,
        control: &ControlParameters,
        plugins: Plugins<'_>,
        mpi: &dyn MpiFacade,
    ) -> Result<RunSummary, RunError> {
        let Plugins {
            mut analyses,
            mut breakers,
            mut sinks,
        } = plugins;
        let started = Instant::now();

        if let Err(e) = control.validate() {
            return Err(RunError {
                kind: RunErrorKind::Input(e),
                summary: self.summary(0, ExitReason::Completed, control.seed.unwrap_or(0)),
            });
        }
        let seed = mpi.broadcast_seed(control.seed.unwrap_or_else(wall_clock_seed));
        let mut rng = KmcRng::new(control.rng_type, seed);
        self.set_time(control.start_time);

        info!(
            seed,
            steps = control.number_of_steps,
            sites = self.configuration().site_count(),
            processes = self.matcher().process_count(),
            total_rate = self.total_rate(),
            "run starting"
        );

        {
            let view = self.view(0, 0.0, None, &[]);
            for a in analyses.iter_mut() {
                a.setup(&view);
            }
            for b in breakers.iter_mut() {
                b.setup(&view);
            }
        }
        mpi.barrier();

        let mut taken = 0u64;
        let outcome = self.run_loop(
            control,
            &mut rng,
            &mut analyses,
            &mut breakers,
            &mut sinks,
            mpi,
            &mut taken,
        );

        for a in analyses.iter_mut() {
            a.finalize();
        }
        let flushed = match outcome {
            Ok(reason) => {
                let mut retries = 0;
                let mut flushed = Ok(reason);
                if mpi.is_master() {
                    for sink in sinks.iter_mut() {
                        let name = sink.name().to_string();
                        if let Err(source) = with_retry(&name, &mut retries, || sink.flush()) {
                            flushed = Err(RunErrorKind::Sink { sink: name, source });
                            break;
                        }
                    }
                }
                self.metrics_mut().sink_retries += retries;
                flushed
            }
            Err(kind) => Err(kind),
        };
        mpi.barrier();
        self.metrics_mut().total_us += started.elapsed().as_micros() as u64;

        match flushed {
            Ok(reason) => {
                info!(
                    reason = reason.as_str(),
                    steps = taken,
                    time = self.time(),
                    "run finished"
                );
                Ok(self.summary(taken, reason, seed))
            }
            Err(kind) => {
                warn!(error = %kind, steps = taken, "run aborted");
                Err(RunError {
                    kind,
                    summary: self.summary(taken, ExitReason::Completed, seed),
                })
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn run_loop(
        &mut self,
        control: &ControlParameters,
        rng: &mut KmcRng,
        analyses: &mut [&mut dyn Analysis],
        breakers: &mut [&mut dyn Breaker],
        sinks: &mut [&mut dyn TrajectorySink],
        mpi: &dyn MpiFacade,
        taken: &mut u64,
    ) -> Result<ExitReason, RunErrorKind> {
        self.dump(sinks, 0, mpi)?;
        let mut next_dump_time = control
            .dump_time_interval
            .map(|dt| control.start_time + dt);

        if self.total_rate() <= 0.0 {
            return Ok(ExitReason::NoEnabledEvents);
        }

        for n in 1..=control.number_of_steps {
            let Some(out) = self.step(rng).map_err(RunErrorKind::Step)? else {
                return Ok(ExitReason::NoEnabledEvents);
            };
            *taken = n;

            let mut dump = n % control.dump_interval == 0;
            if let (Some(next), Some(interval)) =
                (next_dump_time.as_mut(), control.dump_time_interval)
            {
                while self.time() >= *next {
                    *next += interval;
                    dump = true;
                }
            }

            let view = self.view(n, out.dt, Some((out.process, out.site)), &out.moves);
            if n % control.analysis_interval == 0 {
                for a in analyses.iter_mut() {
                    a.register_step(&view);
                }
            }
            let mut stop = None;
            for b in breakers.iter_mut() {
                if n % b.interval().max(1) == 0 && b.evaluate(&view) {
                    stop = Some(b.name().to_string());
                    break;
                }
            }

            if dump {
                self.dump(sinks, n, mpi)?;
            }
            if let Some(name) = stop {
                info!(breaker = %name, step = n, "breaker stopped the run");
                return Ok(ExitReason::Breaker { name });
            }
            if control.time_limit.is_some_and(|limit| self.time() > limit) {
                return Ok(ExitReason::TimeLimit);
            }
        }
        Ok(ExitReason::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_reasons_have_stable_names() {
        assert_eq!(ExitReason::Completed.as_str(), "completed");
        assert_eq!(ExitReason::NoEnabledEvents.as_str(), "no-enabled-events");
        assert_eq!(ExitReason::Breaker { name: "x".into() }.as_str(), "breaker");
        assert_eq!(ExitReason::TimeLimit.as_str(), "time-limit");
    }

    #[test]
    fn plugins_start_empty() {
        let p = Plugins::new();
        assert!(p.analyses.is_empty() && p.breakers.is_empty() && p.sinks.is_empty());
    }
}
