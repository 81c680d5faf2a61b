//! The lattice kinetic Monte Carlo engine.
//!
//! [`LatticeModel`] owns the compiled processes, the mutable
//! [`Configuration`] and the [`EnabledEvents`] bookkeeping, and advances
//! the simulation one event at a time with the rejection-free (BKL)
//! algorithm. [`LatticeModel::run`] drives the step loop, feeding
//! [`Analysis`] plugins, evaluating [`Breaker`]s and dumping frames to
//! [`TrajectorySink`]s.
//!
//! # One step
//!
//! 1. Draw `dt = -ln(U1) / R` for the total rate `R`.
//! 2. Draw `U2 ∈ [0, R)`, walk the per-process tree, pick a site.
//! 3. Plan the firing and re-query every process on the neighbourhoods
//!    of the changed sites against the planned occupation.
//! 4. If every new rate is valid, apply the firing and the event
//!    changes; otherwise leave the model as it was.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod configuration;
pub mod driver;
pub mod error;
pub mod events;
pub mod metrics;
pub mod model;
mod overlay;
pub mod plugin;
pub mod rates;

pub use config::ControlParameters;
pub use configuration::{Configuration, ParticleMove};
pub use driver::{ExitReason, Plugins, RunSummary};
pub use error::{ModelError, RunError, RunErrorKind, StepError};
pub use events::EnabledEvents;
pub use metrics::RunMetrics;
pub use model::{LatticeModel, StepOutcome};
pub use plugin::{Analysis, Breaker, Frame, StepView, TrajectorySink};
pub use rates::RateTable;
