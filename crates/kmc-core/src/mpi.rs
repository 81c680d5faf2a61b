//! The process-group capability consumed by the driver.
//!
//! The engine itself is single-process. An SPMD wrapper supplies an
//! [`MpiFacade`] so that every rank draws the same seed, only the master
//! rank touches the filesystem, and all ranks meet at the same barriers.

/// Minimal collective operations the driver needs.
pub trait MpiFacade {
    /// Whether this rank writes to disk.
    fn is_master(&self) -> bool;

    /// Block until every rank reaches this point.
    fn barrier(&self);

    /// Distribute the master's seed to every rank and return it.
    fn broadcast_seed(&self, seed: u64) -> u64;

    /// This rank's index. Default: 0.
    fn rank(&self) -> usize {
        0
    }

    /// Number of ranks. Default: 1.
    fn size(&self) -> usize {
        1
    }
}

/// The trivial facade for a single process: always master, barriers are
/// no-ops, the seed is returned unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct SingleProcess;

impl MpiFacade for SingleProcess {
    fn is_master(&self) -> bool {
        true
    }

    fn barrier(&self) {}

    fn broadcast_seed(&self, seed: u64) -> u64 {
        seed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_process_is_master_of_one() {
        let mpi = SingleProcess;
        assert!(mpi.is_master());
        assert_eq!(mpi.rank(), 0);
        assert_eq!(mpi.size(), 1);
        assert_eq!(mpi.broadcast_seed(99), 99);
        mpi.barrier();
    }
}
