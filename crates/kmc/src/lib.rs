//! A lattice kinetic Monte Carlo engine.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all sub-crates. For most users, adding `kmc` as a single dependency is
//! sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use kmc::prelude::*;
//!
//! // One site flipping between U and D.
//! let json = r#"{
//!     "lattice": {
//!         "unit_cell": {
//!             "cell_vectors": [[1,0,0],[0,1,0],[0,0,1]],
//!             "basis_points": [[0,0,0]]
//!         },
//!         "repetitions": [1, 1, 1],
//!         "periodic": [true, true, true]
//!     },
//!     "configuration": { "types": ["U"], "possible_types": ["U", "D"] },
//!     "interactions": {
//!         "processes": [
//!             { "coordinates": [[0,0,0]], "elements_before": ["U"],
//!               "elements_after": ["D"], "basis_sites": [0], "rate_constant": 1.0 },
//!             { "coordinates": [[0,0,0]], "elements_before": ["D"],
//!               "elements_after": ["U"], "basis_sites": [0], "rate_constant": 1.0 }
//!         ]
//!     }
//! }"#;
//! let record = ModelRecord::from_json(json).unwrap();
//! let mut model = LatticeModel::from_record(&record).unwrap();
//! let mut dist = TimeStepDistribution::new(0.1).unwrap();
//! let summary = model
//!     .run(
//!         &ControlParameters::new(100, 42),
//!         Plugins::new().analysis(&mut dist),
//!         &SingleProcess,
//!     )
//!     .unwrap();
//! assert_eq!(summary.reason, ExitReason::Completed);
//! assert_eq!(dist.samples(), 100);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `kmc-core` | Type table, ids, input records, RNG, MPI facade |
//! | [`lattice`] | `kmc-lattice` | Unit cell, lattice, neighbour tables |
//! | [`process`] | `kmc-process` | Processes, matcher, rate calculator trait |
//! | [`engine`] | `kmc-engine` | Configuration, events, the step and run loops |
//! | [`analysis`] | `kmc-analysis` | MSD, time-step distribution, statistics |
//! | [`trajectory`] | `kmc-trajectory` | Script and XYZ trajectory output |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod files;

pub use files::{load_control, load_model, load_record, write_results, LoadError};

/// Core types, input records, RNG and MPI facade (`kmc-core`).
pub use kmc_core as types;

/// Unit cell, lattice and neighbour tables (`kmc-lattice`).
pub use kmc_lattice as lattice;

/// Process compilation, matching and custom rates (`kmc-process`).
///
/// Implement [`process::RateCalculator`] to replace or add to the rate
/// constants of the processes.
pub use kmc_process as process;

/// The engine (`kmc-engine`).
///
/// [`engine::LatticeModel`] steps the simulation;
/// [`engine::LatticeModel::run`] drives it with plugins.
pub use kmc_engine as engine;

/// Reference analyses and breakers (`kmc-analysis`).
pub use kmc_analysis as analysis;

/// Trajectory sinks and readers (`kmc-trajectory`).
pub use kmc_trajectory as trajectory;

/// Common imports for typical usage.
///
/// ```rust
/// use kmc::prelude::*;
/// ```
pub mod prelude {
    // Inputs
    pub use kmc_core::{
        ConfigurationRecord, InteractionsRecord, LatticeRecord, ModelRecord, Occupancy,
        ProcessRecord, UnitCellRecord,
    };

    // Core types
    pub use kmc_core::{InputError, MpiFacade, ProcessId, RngType, SingleProcess, TypeCode};

    // Rates
    pub use kmc_process::{RateCalculator, RateContext, RatePolicy};

    // Engine
    pub use kmc_engine::{
        Analysis, Breaker, ControlParameters, ExitReason, LatticeModel, ModelError, Plugins,
        RunError, RunSummary, StepView, TrajectorySink,
    };

    // Analyses
    pub use kmc_analysis::{
        Composition, OnTheFlyMsd, ProcessStatistics, TimeStepDistribution, TypeExhausted,
    };

    // Trajectories
    pub use kmc_trajectory::{BufferPolicy, ScriptTrajectory, XyzTrajectory};

    // Files
    pub use crate::files::{load_control, load_model, load_record, write_results};
}
