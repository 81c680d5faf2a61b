//! Core types and traits for the lattice kinetic Monte Carlo engine.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the vocabulary shared by every other crate in the workspace: dense
//! type codes, identifiers, the input records consumed at setup, the
//! error taxonomy for input validation, the seedable RNG, the MPI
//! facade, and the Fenwick tree behind weighted event sampling.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod fenwick;
pub mod id;
pub mod mpi;
pub mod records;
pub mod rng;
pub mod types;

pub use error::InputError;
pub use fenwick::FenwickTree;
pub use id::{ParticleId, ProcessId, TypeCode};
pub use mpi::{MpiFacade, SingleProcess};
pub use records::{
    ConfigurationRecord, InteractionsRecord, LatticeRecord, ModelRecord, MoveVector, Occupancy,
    ProcessRecord, UnitCellRecord, UpdateEntry,
};
pub use rng::{KmcRng, RngType};
pub use types::TypeTable;

/// A point or displacement in three dimensions.
pub type Vec3 = [f64; 3];
