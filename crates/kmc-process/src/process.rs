//! Compiled local processes.

use indexmap::IndexSet;
use smallvec::SmallVec;

use kmc_core::{InputError, Occupancy, ProcessId, ProcessRecord, TypeCode, TypeTable, Vec3};
use kmc_lattice::{quantize, LocalKey, QUANTUM};

use crate::error::CompileError;

/// Per-type signed counts, indexed by [`TypeCode::index`].
pub type TypeCounts = SmallVec<[i32; 8]>;

/// What a process requires and writes at each of its positions.
#[derive(Clone, Debug, PartialEq)]
pub enum Pattern {
    /// Single-occupancy rewrite: exact type before, exact type after.
    /// A wildcard before matches anything; a wildcard after leaves the
    /// site untouched.
    Single {
        /// Required type per position.
        before: Vec<TypeCode>,
        /// Written type per position.
        after: Vec<TypeCode>,
    },
    /// Bucket rewrite: minimum counts before, signed count changes after.
    Bucket {
        /// Minimum count of each type per position.
        minimum: Vec<TypeCounts>,
        /// Count change of each type per position.
        update: Vec<TypeCounts>,
    },
}

impl Pattern {
    /// Type tag used to order a position: the before-type, or for bucket
    /// patterns the lowest type with a non-zero minimum.
    fn tag(&self, position: usize) -> u32 {
        match self {
            Self::Single { before, .. } => u32::from(before[position].0),
            Self::Bucket { minimum, .. } => minimum[position]
                .iter()
                .position(|&c| c > 0)
                .map_or(0, |t| t as u32),
        }
    }

    fn permute(&mut self, order: &[usize]) {
        fn apply<T: Clone>(v: &mut Vec<T>, order: &[usize]) {
            *v = order.iter().map(|&i| v[i].clone()).collect();
        }
        match self {
            Self::Single { before, after } => {
                apply(before, order);
                apply(after, order);
            }
            Self::Bucket { minimum, update } => {
                apply(minimum, order);
                apply(update, order);
            }
        }
    }

    /// Append a position that accepts anything and changes nothing.
    pub(crate) fn push_wildcard(&mut self, type_codes: usize) {
        match self {
            Self::Single { before, after } => {
                before.push(TypeCode::WILDCARD);
                after.push(TypeCode::WILDCARD);
            }
            Self::Bucket { minimum, update } => {
                minimum.push(SmallVec::from_elem(0, type_codes));
                update.push(SmallVec::from_elem(0, type_codes));
            }
        }
    }
}

/// A tracked particle move between two positions of one process.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Move {
    /// Position the particle leaves.
    pub from: usize,
    /// Position the particle lands on.
    pub to: usize,
    /// Displacement in fractional units.
    pub vector: Vec3,
}

/// A validated process with its positions in canonical order.
///
/// Positions are sorted by [`LocalKey`] with the before-type as tag; the
/// centre (the origin) is therefore always position 0.
#[derive(Clone, Debug, PartialEq)]
pub struct Process {
    id: ProcessId,
    positions: Vec<Vec3>,
    pattern: Pattern,
    moves: Vec<Move>,
    basis_sites: Vec<usize>,
    rate_constant: f64,
}

fn invalid(id: ProcessId, reason: impl Into<String>) -> CompileError {
    CompileError::Input {
        process: id,
        source: InputError::invalid("process", reason),
    }
}

impl Process {
    /// Validate and compile a process record.
    pub fn compile(
        id: ProcessId,
        record: &ProcessRecord,
        types: &TypeTable,
        basis_count: usize,
    ) -> Result<Self, CompileError> {
        if !(record.rate_constant.is_finite() && record.rate_constant > 0.0) {
            return Err(invalid(
                id,
                format!("rate_constant must be positive and finite, got {}", record.rate_constant),
            ));
        }

        let m = record.coordinates.len();
        if m == 0 {
            return Err(invalid(id, "no coordinates"));
        }
        if record.coordinates.iter().flatten().any(|x| !x.is_finite()) {
            return Err(invalid(id, "non-finite coordinate"));
        }
        if quantize(&record.coordinates[0]) != [0; 3] {
            return Err(invalid(
                id,
                format!("first coordinate {:?} is not the origin", record.coordinates[0]),
            ));
        }
        let mut seen = IndexSet::with_capacity(m);
        for c in &record.coordinates {
            if !seen.insert(quantize(c)) {
                return Err(invalid(id, format!("duplicate coordinate {c:?}")));
            }
        }
        if record.elements_before.len() != m {
            return Err(invalid(
                id,
                format!(
                    "{} coordinates but {} elements_before",
                    m,
                    record.elements_before.len()
                ),
            ));
        }

        let mut basis_sites = record.basis_sites.clone();
        basis_sites.sort_unstable();
        basis_sites.dedup();
        if basis_sites.is_empty() {
            return Err(invalid(id, "basis_sites is empty"));
        }
        if let Some(&b) = basis_sites.iter().find(|&&b| b >= basis_count) {
            return Err(invalid(
                id,
                format!("basis site {b} out of range (lattice has {basis_count})"),
            ));
        }

        let resolve = |name: &str| {
            types
                .pattern_code(name)
                .map_err(|source| CompileError::Input { process: id, source })
        };

        let (pattern, moves) = if record.is_bucket() {
            (compile_bucket(id, record, types, &resolve)?, Vec::new())
        } else {
            let pattern = compile_single(id, record, &resolve)?;
            let moves = compile_moves(id, record, &pattern)?;
            (pattern, moves)
        };

        let mut process = Self {
            id,
            positions: record.coordinates.clone(),
            pattern,
            moves,
            basis_sites,
            rate_constant: record.rate_constant,
        };
        process.canonicalize();
        Ok(process)
    }

    /// Sort positions by [`LocalKey`] and remap move indices.
    pub(crate) fn canonicalize(&mut self) {
        let mut order: Vec<usize> = (0..self.positions.len()).collect();
        order.sort_by_key(|&i| LocalKey::new(&self.positions[i], self.pattern.tag(i)));
        let mut rank = vec![0; order.len()];
        for (new, &old) in order.iter().enumerate() {
            rank[old] = new;
        }
        self.positions = order.iter().map(|&i| self.positions[i]).collect();
        self.pattern.permute(&order);
        for mv in &mut self.moves {
            mv.from = rank[mv.from];
            mv.to = rank[mv.to];
        }
    }

    /// Append a wildcard position at `offset`.
    pub(crate) fn push_wildcard(&mut self, offset: Vec3, type_codes: usize) {
        self.positions.push(offset);
        self.pattern.push_wildcard(type_codes);
    }

    /// Process identifier.
    pub fn id(&self) -> ProcessId {
        self.id
    }

    /// Position offsets in fractional units, centre first.
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    /// Number of positions.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Always false; a process has at least its centre.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// The before/after pattern.
    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    /// Tracked moves.
    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    /// Sorted basis indices at which the process may fire.
    pub fn basis_sites(&self) -> &[usize] {
        &self.basis_sites
    }

    /// Rate constant.
    pub fn rate_constant(&self) -> f64 {
        self.rate_constant
    }

    /// Whether this is a bucket process.
    pub fn is_bucket(&self) -> bool {
        matches!(self.pattern, Pattern::Bucket { .. })
    }

    /// Largest position distance from the centre, in cell units.
    pub fn reach(&self) -> f64 {
        self.positions
            .iter()
            .map(kmc_lattice::radial_distance)
            .fold(0.0, f64::max)
    }
}

fn single_name(id: ProcessId, occ: &Occupancy, field: &str) -> Result<String, CompileError> {
    match occ {
        Occupancy::One(name) => Ok(name.clone()),
        Occupancy::Many(_) => Err(invalid(
            id,
            format!("{field} holds a multiset in a single-occupancy process"),
        )),
    }
}

fn compile_single<F>(
    id: ProcessId,
    record: &ProcessRecord,
    resolve: &F,
) -> Result<Pattern, CompileError>
where
    F: Fn(&str) -> Result<TypeCode, CompileError>,
{
    let after = record
        .elements_after
        .as_ref()
        .ok_or_else(|| invalid(id, "elements_after is missing"))?;
    if after.len() != record.coordinates.len() {
        return Err(invalid(
            id,
            format!(
                "{} coordinates but {} elements_after",
                record.coordinates.len(),
                after.len()
            ),
        ));
    }

    let mut before_codes = Vec::with_capacity(after.len());
    let mut after_codes = Vec::with_capacity(after.len());
    for (i, (b, a)) in record.elements_before.iter().zip(after).enumerate() {
        let b = resolve(&single_name(id, b, "elements_before")?)?;
        let a = resolve(&single_name(id, a, "elements_after")?)?;
        if b.is_wildcard() != a.is_wildcard() {
            return Err(invalid(
                id,
                format!("position {i}: a wildcard must appear both before and after"),
            ));
        }
        before_codes.push(b);
        after_codes.push(a);
    }
    Ok(Pattern::Single {
        before: before_codes,
        after: after_codes,
    })
}

fn compile_bucket<F>(
    id: ProcessId,
    record: &ProcessRecord,
    types: &TypeTable,
    resolve: &F,
) -> Result<Pattern, CompileError>
where
    F: Fn(&str) -> Result<TypeCode, CompileError>,
{
    if record.elements_after.is_some() {
        return Err(invalid(id, "bucket processes give update, not elements_after"));
    }
    if !record.move_vectors.is_empty() {
        return Err(invalid(id, "bucket processes cannot carry move vectors"));
    }
    let update = record
        .update
        .as_ref()
        .ok_or_else(|| invalid(id, "bucket process without update"))?;
    let m = record.coordinates.len();
    if update.len() != m {
        return Err(invalid(
            id,
            format!("{m} coordinates but {} update entries", update.len()),
        ));
    }

    let width = types.code_count();
    let mut minimum = Vec::with_capacity(m);
    for occ in &record.elements_before {
        let mut counts: TypeCounts = SmallVec::from_elem(0, width);
        for name in occ.names() {
            let code = resolve(name)?;
            if !code.is_wildcard() {
                counts[code.index()] += 1;
            }
        }
        minimum.push(counts);
    }

    let mut deltas = Vec::with_capacity(m);
    for (i, entries) in update.iter().enumerate() {
        let mut counts: TypeCounts = SmallVec::from_elem(0, width);
        for (delta, name) in entries {
            let code = types
                .code(name)
                .map_err(|source| CompileError::Input { process: id, source })?;
            counts[code.index()] += delta;
        }
        for t in 0..width {
            if minimum[i][t] + counts[t] < 0 {
                return Err(invalid(
                    id,
                    format!(
                        "position {i}: update removes more '{}' than elements_before guarantees",
                        types.name(TypeCode(t as u16))
                    ),
                ));
            }
        }
        deltas.push(counts);
    }
    Ok(Pattern::Bucket {
        minimum,
        update: deltas,
    })
}

fn compile_moves(
    id: ProcessId,
    record: &ProcessRecord,
    pattern: &Pattern,
) -> Result<Vec<Move>, CompileError> {
    let Pattern::Single { before, after } = pattern else {
        return Ok(Vec::new());
    };
    let lookup: IndexSet<_> = record.coordinates.iter().map(quantize).collect();
    let mut sources = IndexSet::new();
    let mut targets = IndexSet::new();
    let mut moves = Vec::with_capacity(record.move_vectors.len());

    for &(from, vector) in &record.move_vectors {
        if from >= record.coordinates.len() {
            return Err(invalid(id, format!("move vector index {from} out of range")));
        }
        if vector.iter().any(|x| !x.is_finite()) {
            return Err(invalid(id, format!("move vector {vector:?} is not finite")));
        }
        if vector.iter().all(|x| x.abs() < QUANTUM) {
            return Err(invalid(id, format!("move vector at position {from} is zero")));
        }
        let origin = record.coordinates[from];
        let landing = [
            origin[0] + vector[0],
            origin[1] + vector[1],
            origin[2] + vector[2],
        ];
        let to = lookup.get_index_of(&quantize(&landing)).ok_or_else(|| {
            invalid(
                id,
                format!("move from position {from} lands on {landing:?}, not a process position"),
            )
        })?;
        if before[from].is_wildcard() {
            return Err(invalid(id, format!("move from wildcard position {from}")));
        }
        if after[to] != before[from] {
            return Err(invalid(
                id,
                format!("move {from} -> {to} does not carry the type of position {from}"),
            ));
        }
        if !sources.insert(from) || !targets.insert(to) {
            return Err(invalid(id, format!("position {from} or {to} is used by two moves")));
        }
        moves.push(Move { from, to, vector });
    }
    Ok(moves)
}
