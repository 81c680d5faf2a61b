//! The mutable lattice state.
//!
//! A [`Configuration`] holds the content of every site, the inverse index
//! from type to sites, and the table of tracked particles. Site content is
//! a tagged variant: one type per site, or a multiset of counts per site
//! in bucket mode.
//!
//! # Particle identity
//!
//! Single mode: every site holds one particle, vacancy species included,
//! and the initial ids are `0..N` in site order. A firing carries ids
//! along its moves; any other type change retires the old id and creates
//! a new one, so an id never changes type.
//!
//! Bucket mode: an id exists per `(site, type)` with a positive count. It
//! is created when the count becomes positive and retired when it returns
//! to zero.

use indexmap::{IndexMap, IndexSet};

use kmc_core::{ConfigurationRecord, InputError, Occupancy, ParticleId, TypeCode, TypeTable, Vec3};
use kmc_lattice::Lattice;
use kmc_process::{Change, Firing, OccupancyView};

/// A tracked particle displacement produced by one firing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParticleMove {
    /// The particle.
    pub id: ParticleId,
    /// Site it left.
    pub from: usize,
    /// Site it landed on.
    pub to: usize,
    /// Cartesian displacement.
    pub delta: Vec3,
}

#[derive(Clone, Debug, PartialEq)]
enum SiteContent {
    Single {
        types: Vec<TypeCode>,
        ids: Vec<ParticleId>,
    },
    Bucket {
        /// `[site * T + type]`
        counts: Vec<u32>,
        /// `[site * T + type]`, `Some` while the count is positive.
        ids: Vec<Option<ParticleId>>,
    },
}

/// Live particles only; ids are never reused.
#[derive(Clone, Debug, Default, PartialEq)]
struct Particles {
    next: u64,
    live: IndexMap<ParticleId, (TypeCode, Vec3)>,
}

impl Particles {
    fn create(&mut self, t: TypeCode, at: Vec3) -> ParticleId {
        let id = ParticleId(self.next);
        self.next += 1;
        self.live.insert(id, (t, at));
        id
    }

    fn retire(&mut self, id: ParticleId) {
        self.live.swap_remove(&id);
    }

    fn displace(&mut self, id: ParticleId, delta: Vec3) {
        if let Some((_, c)) = self.live.get_mut(&id) {
            for (x, d) in c.iter_mut().zip(delta) {
                *x += d;
            }
        }
    }
}

/// Site occupancy, inverse type index and particle table.
#[derive(Clone, Debug, PartialEq)]
pub struct Configuration {
    content: SiteContent,
    type_codes: usize,
    sites_of: Vec<IndexSet<usize>>,
    per_type: Vec<u64>,
    particles: Particles,
    site_coords: Vec<Vec3>,
}

impl Configuration {
    /// Build the initial configuration for `lattice`.
    ///
    /// In single mode every entry must be one declared type; in bucket
    /// mode an entry is a (possibly empty) list of declared types, and a
    /// single name counts as a one-element list.
    pub fn from_record(
        record: &ConfigurationRecord,
        types: &TypeTable,
        lattice: &Lattice,
        bucket: bool,
    ) -> Result<Self, InputError> {
        let n = lattice.site_count();
        if record.types.len() != n {
            return Err(InputError::invalid(
                "configuration",
                format!("{} entries for {} lattice sites", record.types.len(), n),
            ));
        }
        let t_count = types.code_count();
        let site_coords: Vec<Vec3> = (0..n).map(|s| lattice.coords(s)).collect();
        let mut sites_of = vec![IndexSet::new(); t_count];
        let mut per_type = vec![0u64; t_count];
        let mut particles = Particles::default();

        let content = if bucket {
            let mut counts = vec![0u32; n * t_count];
            for (site, occ) in record.types.iter().enumerate() {
                for name in occ.names() {
                    let t = types.code(name)?;
                    counts[site * t_count + t.index()] += 1;
                }
            }
            let mut ids = vec![None; n * t_count];
            for site in 0..n {
                for t in 1..t_count {
                    let c = counts[site * t_count + t];
                    if c > 0 {
                        let code = TypeCode(t as u16);
                        ids[site * t_count + t] = Some(particles.create(code, site_coords[site]));
                        sites_of[t].insert(site);
                        per_type[t] += u64::from(c);
                    }
                }
            }
            SiteContent::Bucket { counts, ids }
        } else {
            let mut site_types = Vec::with_capacity(n);
            let mut ids = Vec::with_capacity(n);
            for (site, occ) in record.types.iter().enumerate() {
                let Occupancy::One(name) = occ else {
                    return Err(InputError::invalid(
                        "configuration",
                        format!("site {site} holds a multiset in a single-occupancy model"),
                    ));
                };
                let t = types.code(name)?;
                site_types.push(t);
                ids.push(particles.create(t, site_coords[site]));
                sites_of[t.index()].insert(site);
                per_type[t.index()] += 1;
            }
            SiteContent::Single {
                types: site_types,
                ids,
            }
        };

        Ok(Self {
            content,
            type_codes: t_count,
            sites_of,
            per_type,
            particles,
            site_coords,
        })
    }

    /// Number of sites.
    pub fn site_count(&self) -> usize {
        self.site_coords.len()
    }

    /// Whether sites hold multisets.
    pub fn is_bucket(&self) -> bool {
        matches!(self.content, SiteContent::Bucket { .. })
    }

    /// Per-site types in single mode; `None` in bucket mode.
    pub fn types(&self) -> Option<&[TypeCode]> {
        match &self.content {
            SiteContent::Single { types, .. } => Some(types),
            SiteContent::Bucket { .. } => None,
        }
    }

    /// Number of type codes, wildcard included.
    pub(crate) fn type_code_count(&self) -> usize {
        self.type_codes
    }

    /// Check that `t` may be written at `site` and return the type there.
    pub(crate) fn check_type_write(
        &self,
        site: usize,
        t: TypeCode,
    ) -> Result<TypeCode, InputError> {
        if t.is_wildcard() || t.index() >= self.type_codes {
            return Err(InputError::invalid("type", format!("code {} is not a declared type", t.0)));
        }
        if site >= self.site_count() {
            return Err(InputError::invalid(
                "site",
                format!("{site} is out of range for {} sites", self.site_count()),
            ));
        }
        match &self.content {
            SiteContent::Single { types, .. } => Ok(types[site]),
            SiteContent::Bucket { .. } => Err(InputError::invalid(
                "set_type_at",
                "bucket configurations are changed through count updates",
            )),
        }
    }

    /// Overwrite the type at a site (single mode). The previous particle
    /// is retired and a new one created.
    pub fn set_type_at(&mut self, site: usize, t: TypeCode) -> Result<(), InputError> {
        let old = self.check_type_write(site, t)?;
        if old == t {
            return Ok(());
        }
        let SiteContent::Single { types, ids } = &mut self.content else {
            unreachable!("check_type_write rejects bucket configurations");
        };
        types[site] = t;
        self.sites_of[old.index()].swap_remove(&site);
        self.sites_of[t.index()].insert(site);
        self.per_type[old.index()] -= 1;
        self.per_type[t.index()] += 1;
        self.particles.retire(ids[site]);
        ids[site] = self.particles.create(t, self.site_coords[site]);
        Ok(())
    }

    /// Particle count per type code (index 0, the wildcard, is always 0).
    pub fn particles_per_type(&self) -> &[u64] {
        &self.per_type
    }

    /// Sites holding at least one particle of type `t`.
    pub fn sites_of_type(&self, t: TypeCode) -> &IndexSet<usize> {
        &self.sites_of[t.index()]
    }

    /// The particle at a site: the only one in single mode, the one of
    /// [`type_at`](OccupancyView::type_at) in bucket mode.
    pub fn id_at(&self, site: usize) -> Option<ParticleId> {
        match &self.content {
            SiteContent::Single { ids, .. } => Some(ids[site]),
            SiteContent::Bucket { ids, .. } => {
                let t = self.type_at(site);
                if t.is_wildcard() {
                    None
                } else {
                    ids[site * self.type_codes + t.index()]
                }
            }
        }
    }

    /// Every particle at a site, in type order.
    pub fn ids_at(&self, site: usize) -> Vec<ParticleId> {
        match &self.content {
            SiteContent::Single { ids, .. } => vec![ids[site]],
            SiteContent::Bucket { ids, .. } => ids
                [site * self.type_codes..(site + 1) * self.type_codes]
                .iter()
                .flatten()
                .copied()
                .collect(),
        }
    }

    /// Live particles of type `t`, in inverse-index order.
    pub fn ids_of_type(&self, t: TypeCode) -> impl Iterator<Item = ParticleId> + '_ {
        let width = self.type_codes;
        self.sites_of[t.index()]
            .iter()
            .filter_map(move |&site| match &self.content {
                SiteContent::Single { ids, .. } => Some(ids[site]),
                SiteContent::Bucket { ids, .. } => ids[site * width + t.index()],
            })
    }

    /// Number of particle ids ever issued.
    pub fn ids_issued(&self) -> u64 {
        self.particles.next
    }

    /// Number of live particles.
    pub fn particle_count(&self) -> usize {
        self.particles.live.len()
    }

    /// Unwrapped cartesian position of every live particle.
    pub fn id_coords(&self) -> impl Iterator<Item = (ParticleId, Vec3)> + '_ {
        self.particles.live.iter().map(|(&id, &(_, c))| (id, c))
    }

    /// Type of every live particle.
    pub fn id_types(&self) -> impl Iterator<Item = (ParticleId, TypeCode)> + '_ {
        self.particles.live.iter().map(|(&id, &(t, _))| (id, t))
    }

    /// Unwrapped cartesian position of a live particle.
    pub fn coords_of(&self, id: ParticleId) -> Option<Vec3> {
        self.particles.live.get(&id).map(|&(_, c)| c)
    }

    /// Type of a live particle.
    pub fn type_of(&self, id: ParticleId) -> Option<TypeCode> {
        self.particles.live.get(&id).map(|&(t, _)| t)
    }

    /// Whether an id is still in the configuration.
    pub fn is_alive(&self, id: ParticleId) -> bool {
        self.particles.live.contains_key(&id)
    }

    /// Cartesian coordinate of a site.
    pub fn site_coords(&self, site: usize) -> Vec3 {
        self.site_coords[site]
    }

    /// Output label of a site.
    pub fn label(&self, site: usize, types: &TypeTable) -> Occupancy {
        match &self.content {
            SiteContent::Single { types: ts, .. } => {
                Occupancy::One(types.name(ts[site]).to_string())
            }
            SiteContent::Bucket { counts, .. } => {
                let row = &counts[site * self.type_codes..(site + 1) * self.type_codes];
                Occupancy::Many(
                    row.iter()
                        .enumerate()
                        .flat_map(|(t, &c)| {
                            let name = types.name(TypeCode(t as u16)).to_string();
                            std::iter::repeat_n(name, c as usize)
                        })
                        .collect(),
                )
            }
        }
    }

    /// Output labels of every site, in site order.
    pub fn labels(&self, types: &TypeTable) -> Vec<Occupancy> {
        (0..self.site_count()).map(|s| self.label(s, types)).collect()
    }

    /// Apply a planned firing in one step and return the tracked moves.
    pub fn apply(&mut self, firing: &Firing) -> Vec<ParticleMove> {
        match &firing.change {
            Change::Single { writes, moves } => {
                let SiteContent::Single { types, ids } = &mut self.content else {
                    unreachable!("single-occupancy firing on a bucket configuration");
                };

                let carried: Vec<ParticleMove> = moves
                    .iter()
                    .map(|m| ParticleMove {
                        id: ids[m.from],
                        from: m.from,
                        to: m.to,
                        delta: m.delta,
                    })
                    .collect();

                let mut touched: IndexSet<usize> = writes.iter().map(|w| w.site).collect();
                for m in moves {
                    touched.insert(m.from);
                    touched.insert(m.to);
                }
                let old_ids: Vec<ParticleId> = touched.iter().map(|&s| ids[s]).collect();
                let old_types: Vec<TypeCode> = touched.iter().map(|&s| types[s]).collect();

                for w in writes {
                    let old = types[w.site];
                    if old == w.after {
                        continue;
                    }
                    types[w.site] = w.after;
                    self.sites_of[old.index()].swap_remove(&w.site);
                    self.sites_of[w.after.index()].insert(w.site);
                    self.per_type[old.index()] -= 1;
                    self.per_type[w.after.index()] += 1;
                }

                for mv in &carried {
                    ids[mv.to] = mv.id;
                    self.particles.displace(mv.id, mv.delta);
                }

                let moved_to: IndexSet<usize> = carried.iter().map(|m| m.to).collect();
                let moved_ids: IndexSet<ParticleId> = carried.iter().map(|m| m.id).collect();
                for (k, &site) in touched.iter().enumerate() {
                    if moved_to.contains(&site) {
                        continue;
                    }
                    let kept = !moved_ids.contains(&old_ids[k]) && old_types[k] == types[site];
                    if kept {
                        continue;
                    }
                    ids[site] = self.particles.create(types[site], self.site_coords[site]);
                }
                for &old in &old_ids {
                    if !moved_ids.contains(&old) && !touched.iter().any(|&s| ids[s] == old) {
                        self.particles.retire(old);
                    }
                }
                carried
            }
            Change::Bucket { updates } => {
                let SiteContent::Bucket { counts, ids } = &mut self.content else {
                    unreachable!("bucket firing on a single-occupancy configuration");
                };
                for &(site, t, delta) in updates {
                    let slot = site * self.type_codes + t.index();
                    let old = counts[slot];
                    let new = i64::from(old) + i64::from(delta);
                    debug_assert!(new >= 0, "bucket count at site {site} went negative");
                    let new = new.max(0) as u32;
                    counts[slot] = new;
                    let total = &mut self.per_type[t.index()];
                    *total = *total + u64::from(new) - u64::from(old);
                    if old == 0 && new > 0 {
                        ids[slot] = Some(self.particles.create(t, self.site_coords[site]));
                        self.sites_of[t.index()].insert(site);
                    } else if old > 0 && new == 0 {
                        if let Some(id) = ids[slot].take() {
                            self.particles.retire(id);
                        }
                        self.sites_of[t.index()].swap_remove(&site);
                    }
                }
                Vec::new()
            }
        }
    }
}

impl OccupancyView for Configuration {
    fn type_at(&self, site: usize) -> TypeCode {
        match &self.content {
            SiteContent::Single { types, .. } => types[site],
            SiteContent::Bucket { counts, .. } => counts
                [site * self.type_codes..(site + 1) * self.type_codes]
                .iter()
                .position(|&c| c > 0)
                .map_or(TypeCode::WILDCARD, |t| TypeCode(t as u16)),
        }
    }

    fn count_at(&self, site: usize, t: TypeCode) -> u32 {
        match &self.content {
            SiteContent::Single { types, .. } => u32::from(types[site] == t),
            SiteContent::Bucket { counts, .. } => counts[site * self.type_codes + t.index()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kmc_process::{PlannedMove, SiteWrite};
    use kmc_core::ProcessId;
    use kmc_lattice::UnitCell;

    fn chain(n: u32) -> Lattice {
        let cell = UnitCell::new(
            [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            vec![[0.0, 0.0, 0.0]],
        )
        .unwrap();
        Lattice::new(cell, [n, 1, 1], [true; 3]).unwrap()
    }

    fn types() -> TypeTable {
        TypeTable::new(["A", "V"]).unwrap()
    }

    const A: TypeCode = TypeCode(1);
    const V: TypeCode = TypeCode(2);

    fn single(names: &[&str]) -> Configuration {
        let rec = ConfigurationRecord {
            types: names.iter().map(|&n| n.into()).collect(),
            possible_types: vec!["A".into(), "V".into()],
        };
        Configuration::from_record(&rec, &types(), &chain(names.len() as u32), false).unwrap()
    }

    fn hop(from: usize, to: usize) -> Firing {
        Firing {
            process: ProcessId(0),
            site: from,
            change: Change::Single {
                writes: vec![
                    SiteWrite {
                        site: from,
                        before: A,
                        after: V,
                    },
                    SiteWrite {
                        site: to,
                        before: V,
                        after: A,
                    },
                ],
                moves: vec![PlannedMove {
                    from,
                    to,
                    delta: [1.0, 0.0, 0.0],
                }],
            },
        }
    }

    fn assert_consistent(c: &Configuration) {
        for site in 0..c.site_count() {
            let t = c.type_at(site);
            assert!(c.sites_of_type(t).contains(&site));
            let id = c.id_at(site).unwrap();
            assert!(c.is_alive(id));
            assert_eq!(c.type_of(id), Some(t));
        }
        let total: usize = c.sites_of.iter().map(IndexSet::len).sum();
        assert_eq!(total, c.site_count());
        assert_eq!(c.particle_count(), c.site_count());
    }

    #[test]
    fn initial_ids_follow_site_order() {
        let c = single(&["A", "V", "A"]);
        assert_eq!(c.id_at(0), Some(ParticleId(0)));
        assert_eq!(c.id_at(2), Some(ParticleId(2)));
        assert_eq!(c.particles_per_type(), &[0, 2, 1]);
        assert_consistent(&c);
    }

    #[test]
    fn hop_carries_the_id_and_its_position() {
        let mut c = single(&["A", "V", "A"]);
        let moves = c.apply(&hop(0, 1));
        assert_eq!(moves.len(), 1);
        assert_eq!(moves[0].id, ParticleId(0));
        assert_eq!(c.id_at(1), Some(ParticleId(0)));
        assert_eq!(c.coords_of(ParticleId(0)), Some([1.0, 0.0, 0.0]));
        assert_eq!(c.type_at(0), V);
        assert_eq!(c.type_at(1), A);
        // The vacancy left behind is a new particle; the old vacancy is gone.
        assert_eq!(c.id_at(0), Some(ParticleId(3)));
        assert!(!c.is_alive(ParticleId(1)));
        assert_eq!(c.particles_per_type(), &[0, 2, 1]);
        assert_eq!(c.ids_of_type(V).collect::<Vec<_>>(), vec![ParticleId(3)]);
        assert_consistent(&c);
    }

    #[test]
    fn unwrapped_coordinates_cross_the_boundary() {
        let mut c = single(&["V", "A"]);
        c.apply(&hop(1, 0));
        assert_eq!(c.id_at(0), Some(ParticleId(1)));
        assert_eq!(c.coords_of(ParticleId(1)), Some([2.0, 0.0, 0.0]));
    }

    #[test]
    fn type_change_without_move_retires_the_id() {
        let mut c = single(&["A", "V"]);
        let flip = Firing {
            process: ProcessId(0),
            site: 0,
            change: Change::Single {
                writes: vec![SiteWrite {
                    site: 0,
                    before: A,
                    after: V,
                }],
                moves: vec![],
            },
        };
        assert!(c.apply(&flip).is_empty());
        assert!(!c.is_alive(ParticleId(0)));
        assert_eq!(c.type_of(c.id_at(0).unwrap()), Some(V));
        assert_consistent(&c);
    }

    #[test]
    fn repeated_flips_keep_only_live_particles() {
        let mut c = single(&["A", "V"]);
        let flip = |site: usize, before: TypeCode, after: TypeCode| Firing {
            process: ProcessId(0),
            site,
            change: Change::Single {
                writes: vec![SiteWrite {
                    site,
                    before,
                    after,
                }],
                moves: vec![],
            },
        };
        for _ in 0..5_000 {
            c.apply(&flip(0, A, V));
            c.apply(&flip(0, V, A));
        }
        assert_eq!(c.ids_issued(), 10_002);
        assert_eq!(c.particle_count(), 2);
        assert_eq!(c.id_types().count(), 2);
        assert_eq!(c.id_coords().count(), 2);
        assert_consistent(&c);
    }

    #[test]
    fn set_type_at_updates_the_index() {
        let mut c = single(&["A", "A"]);
        c.set_type_at(1, V).unwrap();
        assert_eq!(c.sites_of_type(V).len(), 1);
        assert_eq!(c.particles_per_type(), &[0, 1, 1]);
        assert!(c.set_type_at(1, TypeCode::WILDCARD).is_err());
        assert_consistent(&c);
    }

    #[test]
    fn rejects_wrong_site_count_and_unknown_types() {
        let rec = ConfigurationRecord {
            types: vec!["A".into()],
            possible_types: vec!["A".into(), "V".into()],
        };
        assert!(Configuration::from_record(&rec, &types(), &chain(2), false).is_err());
        let rec = ConfigurationRecord {
            types: vec!["A".into(), "Q".into()],
            possible_types: vec!["A".into(), "V".into()],
        };
        assert!(Configuration::from_record(&rec, &types(), &chain(2), false).is_err());
    }

    #[test]
    fn bucket_counts_and_ids() {
        let rec = ConfigurationRecord {
            types: vec![
                Occupancy::Many(vec!["A".into(), "A".into(), "V".into()]),
                Occupancy::Many(vec![]),
            ],
            possible_types: vec!["A".into(), "V".into()],
        };
        let mut c = Configuration::from_record(&rec, &types(), &chain(2), true).unwrap();
        assert_eq!(c.count_at(0, A), 2);
        assert_eq!(c.type_at(1), TypeCode::WILDCARD);
        assert_eq!(c.id_at(1), None);
        assert_eq!(c.ids_at(0), vec![ParticleId(0), ParticleId(1)]);
        assert_eq!(
            c.label(0, &types()),
            Occupancy::Many(vec!["A".into(), "A".into(), "V".into()])
        );

        let firing = Firing {
            process: ProcessId(0),
            site: 0,
            change: Change::Bucket {
                updates: vec![(0, A, -2), (1, A, 2)],
            },
        };
        c.apply(&firing);
        assert_eq!(c.count_at(0, A), 0);
        assert_eq!(c.count_at(1, A), 2);
        assert!(!c.is_alive(ParticleId(0)));
        assert_eq!(c.coords_of(ParticleId(0)), None);
        assert_eq!(c.id_at(1), Some(ParticleId(2)));
        assert_eq!(c.particle_count(), 2);
        assert_eq!(c.particles_per_type(), &[0, 2, 1]);
        assert!(c.sites_of_type(A).contains(&1));
        assert!(!c.sites_of_type(A).contains(&0));
    }
}
