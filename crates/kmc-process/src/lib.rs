//! Local processes and the pattern matcher.
//!
//! A [`Process`] is a pattern-based site rewrite: offsets around a centre,
//! the content required before firing, the content written after, the
//! tracked particle moves, the basis sites it may fire at, and a rate
//! constant. The [`Matcher`] compiles every process against a
//! [`NeighbourTable`](kmc_lattice::NeighbourTable), decides whether a
//! process matches at a site, and plans the [`Firing`] that applies it.
//!
//! Custom rates are supplied through the [`RateCalculator`] capability.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod firing;
pub mod matcher;
pub mod process;
pub mod rate;
pub mod view;
pub mod wildcards;

pub use error::CompileError;
pub use firing::{Change, Firing, PlannedMove, SiteWrite};
pub use matcher::Matcher;
pub use process::{Move, Pattern, Process, TypeCounts};
pub use rate::{RateCalculator, RateContext, RatePolicy};
pub use view::OccupancyView;
