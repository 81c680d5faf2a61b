//! A configuration seen through a planned, uncommitted firing.
//!
//! The step function evaluates the refreshed events against this view
//! first and commits the firing only once every rate is valid, so a
//! failing rate calculator leaves the configuration and the enabled
//! events untouched.

use kmc_core::TypeCode;
use kmc_process::{Change, OccupancyView};

use crate::configuration::Configuration;

pub(crate) struct Pending<'a> {
    base: &'a Configuration,
    change: &'a Change,
}

impl<'a> Pending<'a> {
    pub(crate) fn new(base: &'a Configuration, change: &'a Change) -> Self {
        Self { base, change }
    }
}

impl OccupancyView for Pending<'_> {
    fn type_at(&self, site: usize) -> TypeCode {
        match self.change {
            Change::Single { writes, .. } => writes
                .iter()
                .rev()
                .find(|w| w.site == site)
                .map_or_else(|| self.base.type_at(site), |w| w.after),
            Change::Bucket { updates } => {
                if !updates.iter().any(|u| u.0 == site) {
                    return self.base.type_at(site);
                }
                (1..self.base.type_code_count())
                    .map(|t| TypeCode(t as u16))
                    .find(|&t| self.count_at(site, t) > 0)
                    .unwrap_or(TypeCode::WILDCARD)
            }
        }
    }

    fn count_at(&self, site: usize, t: TypeCode) -> u32 {
        match self.change {
            Change::Single { .. } => u32::from(self.type_at(site) == t),
            Change::Bucket { updates } => {
                let delta: i64 = updates
                    .iter()
                    .filter(|u| u.0 == site && u.1 == t)
                    .map(|u| i64::from(u.2))
                    .sum();
                (i64::from(self.base.count_at(site, t)) + delta).max(0) as u32
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kmc_core::{ConfigurationRecord, Occupancy, ProcessId, TypeTable};
    use kmc_lattice::{Lattice, UnitCell};
    use kmc_process::{Firing, SiteWrite};

    const A: TypeCode = TypeCode(1);
    const V: TypeCode = TypeCode(2);

    fn chain(n: u32) -> Lattice {
        let cell = UnitCell::new(
            [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            vec![[0.0, 0.0, 0.0]],
        )
        .unwrap();
        Lattice::new(cell, [n, 1, 1], [true; 3]).unwrap()
    }

    fn config(types: Vec<Occupancy>, bucket: bool) -> Configuration {
        let n = types.len() as u32;
        let rec = ConfigurationRecord {
            types,
            possible_types: vec!["A".into(), "V".into()],
        };
        let table = TypeTable::new(["A", "V"]).unwrap();
        Configuration::from_record(&rec, &table, &chain(n), bucket).unwrap()
    }

    #[test]
    fn single_writes_show_through_and_commit_identically() {
        let mut c = config(vec!["A".into(), "V".into(), "A".into()], false);
        let firing = Firing {
            process: ProcessId(0),
            site: 0,
            change: Change::Single {
                writes: vec![
                    SiteWrite {
                        site: 0,
                        before: A,
                        after: V,
                    },
                    SiteWrite {
                        site: 1,
                        before: V,
                        after: A,
                    },
                ],
                moves: vec![],
            },
        };
        let seen: Vec<TypeCode> = {
            let view = Pending::new(&c, &firing.change);
            (0..3).map(|s| view.type_at(s)).collect()
        };
        assert_eq!(seen, vec![V, A, A]);
        assert_eq!(c.type_at(0), A);

        c.apply(&firing);
        let committed: Vec<TypeCode> = (0..3).map(|s| c.type_at(s)).collect();
        assert_eq!(seen, committed);
    }

    #[test]
    fn bucket_updates_shift_counts() {
        let c = config(
            vec![
                Occupancy::Many(vec!["A".into(), "V".into()]),
                Occupancy::Many(vec![]),
            ],
            true,
        );
        let change = Change::Bucket {
            updates: vec![(0, A, -1), (1, A, 1)],
        };
        let view = Pending::new(&c, &change);
        assert_eq!(view.count_at(0, A), 0);
        assert_eq!(view.type_at(0), V);
        assert_eq!(view.count_at(1, A), 1);
        assert_eq!(view.type_at(1), A);
        assert_eq!(c.count_at(1, A), 0);
    }
}
