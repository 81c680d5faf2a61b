//! Lattice geometry for kinetic Monte Carlo simulations.
//!
//! A [`Lattice`] tiles a [`UnitCell`] (three cell vectors, K basis points)
//! `ra × rb × rc` times with per-axis periodicity, and numbers every site
//! densely. A [`NeighbourTable`] pins, for every site, the ordered list of
//! sites within a shell radius; process patterns are compiled against the
//! same ordering, defined once in [`order`].
//!
//! # Site numbering
//!
//! `site = ((i * rb + j) * rc + k) * K + b` for cell `(i, j, k)` and basis
//! index `b`.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod lattice;
pub mod neighbourhood;
pub mod order;
pub mod unit_cell;

#[cfg(test)]
pub(crate) mod compliance;

pub use lattice::Lattice;
pub use neighbourhood::{NeighbourOffset, NeighbourTable, NO_SITE};
pub use order::{quantize, radial_distance, LocalKey, QuantizedOffset, QUANTUM};
pub use unit_cell::UnitCell;
