//! Reference analyses and breakers for the lattice KMC engine.
//!
//! Every type here implements [`kmc_engine::Analysis`] or
//! [`kmc_engine::Breaker`] and is registered through
//! [`kmc_engine::Plugins`]:
//!
//! - [`OnTheFlyMsd`]: mean-squared displacement of one particle type,
//!   binned by lag time over a reservoir of past positions.
//! - [`TimeStepDistribution`]: normalized histogram of waiting times.
//! - [`ProcessStatistics`]: firing counts per process and time window,
//!   optionally per site.
//! - [`Composition`]: mean particle count per type and time window.
//! - [`TypeExhausted`]: stops a run once a type has no particles left.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod breakers;
pub mod composition;
pub mod msd;
pub mod process_stats;
pub mod timestep;
mod window;

pub use breakers::TypeExhausted;
pub use composition::{Composition, CompositionWindow};
pub use msd::{MsdBin, OnTheFlyMsd, OnTheFlyMsdBuilder};
pub use process_stats::{ProcessStatistics, ProcessWindow};
pub use timestep::{TimeStepBin, TimeStepDistribution};
