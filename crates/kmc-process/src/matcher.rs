//! The pattern matcher.
//!
//! Compiling a matcher fixes, for every process and every basis it may
//! fire at, the local neighbourhood index of each pattern position. After
//! that a match is a walk over at most M pinned neighbours, and planning a
//! firing is the same walk writing instead of comparing.

use smallvec::SmallVec;
use tracing::{debug, warn};

use kmc_core::{InputError, InteractionsRecord, ProcessId, TypeCode, TypeTable, Vec3};
use kmc_lattice::{radial_distance, Lattice, NeighbourTable, QUANTUM};

use crate::error::CompileError;
use crate::firing::{Change, Firing, PlannedMove, SiteWrite};
use crate::process::{Pattern, Process};
use crate::rate::RateContext;
use crate::view::OccupancyView;
use crate::wildcards::add_implicit_wildcards;

/// Local index of a wildcard position with no lattice site behind it.
const UNRESOLVED: u32 = u32::MAX;

/// Compiled processes bound to a lattice.
#[derive(Clone, Debug)]
pub struct Matcher {
    lattice: Lattice,
    table: NeighbourTable,
    processes: Vec<Process>,
    /// `[process * K + basis]`: local index per position, or `None` where
    /// the process cannot fire at that basis.
    local: Vec<Option<Box<[u32]>>>,
    /// Processes that can fire at each basis, in id order.
    by_basis: Vec<Vec<ProcessId>>,
    /// Cartesian displacement of each process move.
    move_deltas: Vec<Vec<Vec3>>,
    bucket: bool,
}

impl Matcher {
    /// Compile `interactions` against `lattice`.
    ///
    /// `bucket` is the occupancy mode of the configuration; every process
    /// must be of the same mode.
    pub fn compile(
        interactions: &InteractionsRecord,
        lattice: Lattice,
        types: &TypeTable,
        bucket: bool,
    ) -> Result<Self, CompileError> {
        let k = lattice.basis_count();
        let mut processes = Vec::with_capacity(interactions.processes.len());
        for (i, record) in interactions.processes.iter().enumerate() {
            let id = ProcessId(i as u32);
            let p = Process::compile(id, record, types, k)?;
            if p.is_bucket() != bucket {
                return Err(CompileError::Input {
                    process: id,
                    source: InputError::invalid(
                        "process",
                        if bucket {
                            "single-occupancy process in a bucket model"
                        } else {
                            "bucket process in a single-occupancy model"
                        },
                    ),
                });
            }
            processes.push(p);
        }

        if interactions.implicit_wildcards {
            add_implicit_wildcards(&mut processes, types.code_count());
        }

        let radius = match interactions.cutoff {
            Some(cutoff) => {
                if !(cutoff.is_finite() && cutoff >= 0.0) {
                    return Err(InputError::invalid(
                        "cutoff",
                        format!("must be finite and >= 0, got {cutoff}"),
                    )
                    .into());
                }
                for p in &processes {
                    if let Some(pos) = p
                        .positions()
                        .iter()
                        .find(|pos| radial_distance(pos) > cutoff + QUANTUM)
                    {
                        return Err(CompileError::PatternMismatch {
                            process: p.id(),
                            reason: format!("offset {pos:?} lies beyond the cutoff {cutoff}"),
                        });
                    }
                }
                cutoff
            }
            None => processes.iter().map(Process::reach).fold(0.0, f64::max),
        };

        let table = NeighbourTable::build(&lattice, radius)?;

        let mut local = Vec::with_capacity(processes.len() * k);
        let mut by_basis = vec![Vec::new(); k];
        for p in &processes {
            let mut first_failure = None;
            for (b, ids) in by_basis.iter_mut().enumerate() {
                if p.basis_sites().binary_search(&b).is_err() {
                    local.push(None);
                    continue;
                }
                match resolve(p, &table, b) {
                    Ok(indices) => {
                        ids.push(p.id());
                        local.push(Some(indices));
                    }
                    Err(offset) => {
                        warn!(
                            process = p.id().0,
                            basis = b,
                            ?offset,
                            "process can never match at this basis"
                        );
                        first_failure.get_or_insert((b, offset));
                        local.push(None);
                    }
                }
            }
            let fires_somewhere = local[local.len() - k..].iter().any(Option::is_some);
            if !fires_somewhere {
                let (b, offset) = first_failure.unwrap_or((0, [0.0; 3]));
                return Err(CompileError::PatternMismatch {
                    process: p.id(),
                    reason: format!("offset {offset:?} has no lattice site from basis {b}"),
                });
            }
        }

        let move_deltas = processes
            .iter()
            .map(|p| {
                p.moves()
                    .iter()
                    .map(|m| lattice.unit_cell().to_cartesian(&m.vector))
                    .collect()
            })
            .collect();

        debug!(
            processes = processes.len(),
            radius,
            bucket,
            "matcher compiled"
        );

        Ok(Self {
            lattice,
            table,
            processes,
            local,
            by_basis,
            move_deltas,
            bucket,
        })
    }

    /// The lattice the processes are bound to.
    pub fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    /// The neighbour table, with the radius the processes need.
    pub fn table(&self) -> &NeighbourTable {
        &self.table
    }

    /// Compiled processes in id order.
    pub fn processes(&self) -> &[Process] {
        &self.processes
    }

    /// One compiled process.
    pub fn process(&self, p: ProcessId) -> &Process {
        &self.processes[p.index()]
    }

    /// Number of processes.
    pub fn process_count(&self) -> usize {
        self.processes.len()
    }

    /// Whether the processes use bucket occupancy.
    pub fn is_bucket(&self) -> bool {
        self.bucket
    }

    /// Processes that may fire at `site`, in id order.
    pub fn processes_at(&self, site: usize) -> &[ProcessId] {
        &self.by_basis[self.lattice.basis(site)]
    }

    fn indices(&self, p: ProcessId, site: usize) -> Option<&[u32]> {
        let k = self.lattice.basis_count();
        self.local[p.index() * k + self.lattice.basis(site)].as_deref()
    }

    fn site_of(&self, site: usize, local: u32) -> Option<usize> {
        if local == UNRESOLVED {
            return None;
        }
        self.table.neighbour(site, local as usize)
    }

    /// Whether process `p` matches at `site`.
    pub fn matches<V: OccupancyView + ?Sized>(&self, p: ProcessId, site: usize, view: &V) -> bool {
        let Some(indices) = self.indices(p, site) else {
            return false;
        };
        match self.process(p).pattern() {
            Pattern::Single { before, .. } => {
                before.iter().zip(indices).all(|(&t, &local)| {
                    t.is_wildcard()
                        || self
                            .site_of(site, local)
                            .is_some_and(|s| view.type_at(s) == t)
                })
            }
            Pattern::Bucket { minimum, .. } => {
                minimum.iter().zip(indices).all(|(counts, &local)| {
                    if counts.iter().all(|&c| c == 0) {
                        return true;
                    }
                    let Some(s) = self.site_of(site, local) else {
                        return false;
                    };
                    counts.iter().enumerate().all(|(t, &c)| {
                        c <= 0 || view.count_at(s, TypeCode(t as u16)) >= c as u32
                    })
                })
            }
        }
    }

    /// Plan the firing of `p` at `site`. The caller guarantees the process
    /// matches there.
    pub fn plan_firing<V: OccupancyView + ?Sized>(
        &self,
        p: ProcessId,
        site: usize,
        view: &V,
    ) -> Firing {
        let process = self.process(p);
        let indices = self
            .indices(p, site)
            .expect("plan_firing called for a process that cannot fire at this basis");
        let change = match process.pattern() {
            Pattern::Single { after, .. } => {
                let mut writes = Vec::new();
                for (&t, &local) in after.iter().zip(indices) {
                    if t.is_wildcard() {
                        continue;
                    }
                    let Some(s) = self.site_of(site, local) else {
                        continue;
                    };
                    let current = view.type_at(s);
                    if current != t {
                        writes.push(SiteWrite {
                            site: s,
                            before: current,
                            after: t,
                        });
                    }
                }
                let moves = process
                    .moves()
                    .iter()
                    .zip(&self.move_deltas[p.index()])
                    .filter_map(|(m, &delta)| {
                        let from = self.site_of(site, indices[m.from])?;
                        let to = self.site_of(site, indices[m.to])?;
                        Some(PlannedMove { from, to, delta })
                    })
                    .collect();
                Change::Single { writes, moves }
            }
            Pattern::Bucket { update, .. } => {
                let mut updates = Vec::new();
                for (counts, &local) in update.iter().zip(indices) {
                    let Some(s) = self.site_of(site, local) else {
                        continue;
                    };
                    for (t, &d) in counts.iter().enumerate() {
                        if d != 0 {
                            updates.push((s, TypeCode(t as u16), d));
                        }
                    }
                }
                Change::Bucket { updates }
            }
        };
        Firing {
            process: p,
            site,
            change,
        }
    }

    /// Types currently at each pattern position of `p` centred on `site`;
    /// the wildcard past a non-periodic edge.
    pub fn local_types<V: OccupancyView + ?Sized>(
        &self,
        p: ProcessId,
        site: usize,
        view: &V,
    ) -> SmallVec<[TypeCode; 16]> {
        let Some(indices) = self.indices(p, site) else {
            return SmallVec::new();
        };
        indices
            .iter()
            .map(|&local| {
                self.site_of(site, local)
                    .map_or(TypeCode::WILDCARD, |s| view.type_at(s))
            })
            .collect()
    }

    /// Build the context a rate calculator sees for `p` at `site`.
    pub fn rate_context<'a, V: OccupancyView + ?Sized>(
        &'a self,
        p: ProcessId,
        site: usize,
        view: &V,
        types: &'a TypeTable,
    ) -> RateContext<'a> {
        let process = self.process(p);
        let before = self.local_types(p, site, view);
        let types_after = match process.pattern() {
            Pattern::Single { after, .. } => before
                .iter()
                .zip(after)
                .map(|(&now, &then)| types.name(if then.is_wildcard() { now } else { then }))
                .collect(),
            Pattern::Bucket { .. } => before.iter().map(|&t| types.name(t)).collect(),
        };
        RateContext {
            process: p,
            site,
            rate_constant: process.rate_constant(),
            coordinates: process.positions(),
            types_before: before.iter().map(|&t| types.name(t)).collect(),
            types_after,
            global_coordinate: self.lattice.coords(site),
        }
    }
}

/// Local indices of every position of `p` at basis `b`. A wildcard
/// position without a lattice site is tolerated; any other unresolved
/// offset is returned as the error.
fn resolve(p: &Process, table: &NeighbourTable, b: usize) -> Result<Box<[u32]>, Vec3> {
    p.positions()
        .iter()
        .enumerate()
        .map(|(i, pos)| match table.local_index(b, pos) {
            Some(local) => Ok(local as u32),
            None if is_wildcard(p.pattern(), i) => Ok(UNRESOLVED),
            None => Err(*pos),
        })
        .collect()
}

fn is_wildcard(pattern: &Pattern, i: usize) -> bool {
    match pattern {
        Pattern::Single { before, .. } => before[i].is_wildcard(),
        Pattern::Bucket { minimum, update } => {
            minimum[i].iter().all(|&c| c == 0) && update[i].iter().all(|&c| c == 0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kmc_core::{Occupancy, ProcessRecord};
    use kmc_lattice::UnitCell;

    fn chain(n: u32, periodic: bool) -> Lattice {
        let cell = UnitCell::new(
            [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            vec![[0.0, 0.0, 0.0]],
        )
        .unwrap();
        Lattice::new(cell, [n, 1, 1], [periodic, true, true]).unwrap()
    }

    fn hop(dx: f64) -> ProcessRecord {
        ProcessRecord {
            coordinates: vec![[0.0, 0.0, 0.0], [dx, 0.0, 0.0]],
            elements_before: vec!["A".into(), "V".into()],
            elements_after: Some(vec!["V".into(), "A".into()]),
            update: None,
            move_vectors: vec![(0, [dx, 0.0, 0.0])],
            basis_sites: vec![0],
            rate_constant: 1.0,
        }
    }

    fn interactions(processes: Vec<ProcessRecord>) -> InteractionsRecord {
        InteractionsRecord {
            processes,
            implicit_wildcards: true,
            cutoff: None,
        }
    }

    fn types() -> TypeTable {
        TypeTable::new(["A", "V"]).unwrap()
    }

    const A: TypeCode = TypeCode(1);
    const V: TypeCode = TypeCode(2);

    #[test]
    fn hop_matches_only_with_a_vacancy_ahead() {
        let m = Matcher::compile(&interactions(vec![hop(1.0)]), chain(4, true), &types(), false)
            .unwrap();
        let config = vec![A, V, A, A];
        assert!(m.matches(ProcessId(0), 0, &config));
        assert!(!m.matches(ProcessId(0), 1, &config));
        assert!(!m.matches(ProcessId(0), 2, &config));
        // Periodic wrap: site 3's right neighbour is site 0.
        assert!(!m.matches(ProcessId(0), 3, &config));
        let config = vec![V, A, A, A];
        assert!(m.matches(ProcessId(0), 3, &config));
    }

    #[test]
    fn non_periodic_edge_blocks_the_match() {
        let m = Matcher::compile(&interactions(vec![hop(1.0)]), chain(4, false), &types(), false)
            .unwrap();
        let config = vec![V, A, A, A];
        assert!(!m.matches(ProcessId(0), 3, &config));
    }

    #[test]
    fn plan_writes_and_moves() {
        let m = Matcher::compile(&interactions(vec![hop(1.0)]), chain(4, true), &types(), false)
            .unwrap();
        let config = vec![A, V, A, A];
        let firing = m.plan_firing(ProcessId(0), 0, &config);
        let Change::Single { writes, moves } = &firing.change else {
            panic!("single change expected");
        };
        assert_eq!(writes.len(), 2);
        assert!(writes.contains(&SiteWrite {
            site: 0,
            before: A,
            after: V
        }));
        assert!(writes.contains(&SiteWrite {
            site: 1,
            before: V,
            after: A
        }));
        assert_eq!(
            moves,
            &vec![PlannedMove {
                from: 0,
                to: 1,
                delta: [1.0, 0.0, 0.0]
            }]
        );
        assert_eq!(firing.affected_sites(), vec![0, 1]);
    }

    #[test]
    fn implicit_wildcards_keep_both_directions_matching() {
        let m = Matcher::compile(
            &interactions(vec![hop(1.0), hop(-1.0)]),
            chain(5, true),
            &types(),
            false,
        )
        .unwrap();
        assert_eq!(m.process(ProcessId(0)).len(), 3);
        assert_eq!(m.process(ProcessId(1)).len(), 3);
        let config = vec![V, A, V, A, A];
        assert!(m.matches(ProcessId(0), 1, &config));
        assert!(m.matches(ProcessId(1), 1, &config));
        assert!(!m.matches(ProcessId(1), 4, &config));
    }

    #[test]
    fn offset_beyond_cutoff_is_a_mismatch() {
        let mut inter = interactions(vec![hop(2.0)]);
        inter.cutoff = Some(1.0);
        let err = Matcher::compile(&inter, chain(6, true), &types(), false).unwrap_err();
        assert!(matches!(err, CompileError::PatternMismatch { .. }));
    }

    #[test]
    fn offset_off_the_lattice_is_a_mismatch() {
        let mut rec = hop(0.5);
        rec.move_vectors.clear();
        let err = Matcher::compile(&interactions(vec![rec]), chain(4, true), &types(), false)
            .unwrap_err();
        assert!(matches!(err, CompileError::PatternMismatch { .. }));
    }

    #[test]
    fn mixed_modes_are_rejected() {
        let err = Matcher::compile(&interactions(vec![hop(1.0)]), chain(4, true), &types(), true)
            .unwrap_err();
        assert!(matches!(err, CompileError::Input { .. }));
    }

    #[test]
    fn rate_context_reports_local_environment() {
        let m = Matcher::compile(&interactions(vec![hop(1.0)]), chain(4, true), &types(), false)
            .unwrap();
        let t = types();
        let config = vec![A, V, A, A];
        let ctx = m.rate_context(ProcessId(0), 0, &config, &t);
        assert_eq!(ctx.types_before.as_slice(), &["A", "V"]);
        assert_eq!(ctx.types_after.as_slice(), &["V", "A"]);
        assert_eq!(ctx.rate_constant, 1.0);
        assert_eq!(ctx.global_coordinate, [0.0, 0.0, 0.0]);
    }

    struct Buckets(Vec<Vec<u32>>);

    impl OccupancyView for Buckets {
        fn type_at(&self, site: usize) -> TypeCode {
            self.0[site]
                .iter()
                .position(|&c| c > 0)
                .map_or(TypeCode::WILDCARD, |t| TypeCode(t as u16))
        }

        fn count_at(&self, site: usize, t: TypeCode) -> u32 {
            self.0[site][t.index()]
        }
    }

    #[test]
    fn bucket_match_is_componentwise_domination() {
        let rec = ProcessRecord {
            coordinates: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]],
            elements_before: vec![Occupancy::Many(vec!["A".into(), "A".into()]), "*".into()],
            elements_after: None,
            update: Some(vec![vec![(-1, "A".to_string())], vec![(1, "A".to_string())]]),
            move_vectors: vec![],
            basis_sites: vec![0],
            rate_constant: 1.0,
        };
        let m = Matcher::compile(&interactions(vec![rec]), chain(3, true), &types(), true).unwrap();
        let occ = Buckets(vec![vec![0, 2, 0], vec![0, 1, 0], vec![0, 0, 0]]);
        assert!(m.matches(ProcessId(0), 0, &occ));
        assert!(!m.matches(ProcessId(0), 1, &occ));
        let firing = m.plan_firing(ProcessId(0), 0, &occ);
        assert_eq!(
            firing.change,
            Change::Bucket {
                updates: vec![(0, A, -1), (1, A, 1)]
            }
        );
    }
}
