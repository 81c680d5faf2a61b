//! Trajectory output for the lattice KMC engine.
//!
//! Two [`TrajectorySink`](kmc_engine::TrajectorySink) implementations
//! buffer frames in memory and write them out under a [`BufferPolicy`]:
//!
//! - [`ScriptTrajectory`]: a line-oriented script of assignments and
//!   `.append(...)` calls, one statement per line, with JSON literals.
//!   [`ScriptTrajectoryReader`] parses it back.
//! - [`XyzTrajectory`]: an extended XYZ format with per-atom ids,
//!   single-occupancy only.
//!
//! # Script format
//!
//! ```text
//! # KMC trajectory
//! version="2013.1.0"
//! creation_time="1700000000"
//! possible_types=["A","B"]
//! sites=[[0.0,0.0,0.0],[1.0,0.0,0.0]]
//! times=[]
//! steps=[]
//! types=[]
//! times.append(0.0)
//! steps.append(0)
//! types.append(["B","A"])
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod buffer;
pub mod error;
pub mod reader;
pub mod script;
pub mod xyz;

pub use buffer::BufferPolicy;
pub use error::TrajectoryError;
pub use reader::ScriptTrajectoryReader;
pub use script::ScriptTrajectory;
pub use xyz::XyzTrajectory;

/// Version string written to every script trajectory.
pub const SCRIPT_VERSION: &str = "2013.1.0";

/// First line of every XYZ trajectory.
pub const XYZ_HEADER: &str = "KMCLib XYZ FORMAT VERSION 2013.10.15";
