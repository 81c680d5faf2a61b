//! Firing plans.
//!
//! The matcher turns a chosen `(process, site)` into a [`Firing`]: the
//! full list of site changes and particle moves, resolved against the
//! current configuration. The configuration applies a plan in one call,
//! so no observer ever sees half of a firing.

use kmc_core::{ProcessId, TypeCode, Vec3};

/// A single-occupancy site rewrite.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SiteWrite {
    /// Site being rewritten.
    pub site: usize,
    /// Type found there before firing.
    pub before: TypeCode,
    /// Type written.
    pub after: TypeCode,
}

/// A tracked particle moving from one site to another.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlannedMove {
    /// Site the particle leaves.
    pub from: usize,
    /// Site the particle lands on.
    pub to: usize,
    /// Cartesian displacement.
    pub delta: Vec3,
}

/// The content change of a firing.
#[derive(Clone, Debug, PartialEq)]
pub enum Change {
    /// Single-occupancy rewrites and moves.
    Single {
        /// Sites whose type actually changes.
        writes: Vec<SiteWrite>,
        /// Tracked moves.
        moves: Vec<PlannedMove>,
    },
    /// Bucket count changes as `(site, type, delta)`.
    Bucket {
        /// Non-zero count changes.
        updates: Vec<(usize, TypeCode, i32)>,
    },
}

/// A fully resolved firing of one process at one site.
#[derive(Clone, Debug, PartialEq)]
pub struct Firing {
    /// The process that fires.
    pub process: ProcessId,
    /// The centre site.
    pub site: usize,
    /// What changes.
    pub change: Change,
}

impl Firing {
    /// The centre plus every site whose content changes, deduplicated, in
    /// plan order.
    pub fn affected_sites(&self) -> Vec<usize> {
        let mut out = vec![self.site];
        let mut push = |s: usize| {
            if !out.contains(&s) {
                out.push(s);
            }
        };
        match &self.change {
            Change::Single { writes, moves } => {
                writes.iter().for_each(|w| push(w.site));
                moves.iter().for_each(|m| {
                    push(m.from);
                    push(m.to);
                });
            }
            Change::Bucket { updates } => updates.iter().for_each(|u| push(u.0)),
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn affected_sites_are_deduplicated_centre_first() {
        let f = Firing {
            process: ProcessId(0),
            site: 4,
            change: Change::Single {
                writes: vec![
                    SiteWrite {
                        site: 4,
                        before: TypeCode(1),
                        after: TypeCode(2),
                    },
                    SiteWrite {
                        site: 5,
                        before: TypeCode(2),
                        after: TypeCode(1),
                    },
                ],
                moves: vec![PlannedMove {
                    from: 4,
                    to: 5,
                    delta: [1.0, 0.0, 0.0],
                }],
            },
        };
        assert_eq!(f.affected_sites(), vec![4, 5]);
    }

    #[test]
    fn bucket_updates_are_affected() {
        let f = Firing {
            process: ProcessId(0),
            site: 0,
            change: Change::Bucket {
                updates: vec![(0, TypeCode(1), -1), (3, TypeCode(1), 1)],
            },
        };
        assert_eq!(f.affected_sites(), vec![0, 3]);
    }
}
