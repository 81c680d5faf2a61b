//! Standard model records.
//!
//! - [`ising_flip`]: one site flipping between `U` and `D`.
//! - [`chain_walker`]: one `B` in a periodic chain of `A`, hopping left
//!   and right.
//! - [`cubic_walker`]: one `B` in a periodic cubic box of `A`, six moves.
//! - [`vacancy_diffusion`]: `O`/`V` exchange on a cubic lattice.
//! - [`stuck`]: a model where no process can ever match.
//! - [`bucket_hop`]: bucket occupancy, units of `A` hopping along a chain.

use kmc_core::{
    ConfigurationRecord, InteractionsRecord, LatticeRecord, ModelRecord, Occupancy,
    ProcessRecord, UnitCellRecord, Vec3,
};

pub const ORIGIN: Vec3 = [0.0, 0.0, 0.0];

/// The six nearest-neighbour directions of a simple cubic lattice, in the
/// order +x, -x, +y, -y, +z, -z.
pub const CUBIC_DIRECTIONS: [Vec3; 6] = [
    [1.0, 0.0, 0.0],
    [-1.0, 0.0, 0.0],
    [0.0, 1.0, 0.0],
    [0.0, -1.0, 0.0],
    [0.0, 0.0, 1.0],
    [0.0, 0.0, -1.0],
];

pub fn cubic_cell() -> UnitCellRecord {
    UnitCellRecord {
        cell_vectors: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        basis_points: vec![ORIGIN],
    }
}

pub fn cubic_lattice(repetitions: [u32; 3]) -> LatticeRecord {
    LatticeRecord {
        unit_cell: cubic_cell(),
        repetitions,
        periodic: [true, true, true],
    }
}

/// A pairwise exchange: `mover` at the centre swaps with `host` at
/// `direction`, carrying its id along.
pub fn exchange(mover: &str, host: &str, direction: Vec3, rate: f64) -> ProcessRecord {
    ProcessRecord {
        coordinates: vec![ORIGIN, direction],
        elements_before: vec![mover.into(), host.into()],
        elements_after: Some(vec![host.into(), mover.into()]),
        update: None,
        move_vectors: vec![(0, direction)],
        basis_sites: vec![0],
        rate_constant: rate,
    }
}

/// A single-site rewrite.
pub fn flip(from: &str, to: &str, rate: f64) -> ProcessRecord {
    ProcessRecord {
        coordinates: vec![ORIGIN],
        elements_before: vec![from.into()],
        elements_after: Some(vec![to.into()]),
        update: None,
        move_vectors: vec![],
        basis_sites: vec![0],
        rate_constant: rate,
    }
}

fn model(
    lattice: LatticeRecord,
    types: Vec<&str>,
    possible: &[&str],
    processes: Vec<ProcessRecord>,
) -> ModelRecord {
    ModelRecord {
        lattice,
        configuration: ConfigurationRecord {
            types: types.into_iter().map(Into::into).collect(),
            possible_types: possible.iter().map(|s| s.to_string()).collect(),
        },
        interactions: InteractionsRecord {
            processes,
            implicit_wildcards: true,
            cutoff: None,
        },
    }
}

/// One site, `U -> D` and `D -> U` at rate 1.
pub fn ising_flip() -> ModelRecord {
    model(
        cubic_lattice([1, 1, 1]),
        vec!["U"],
        &["U", "D"],
        vec![flip("U", "D", 1.0), flip("D", "U", 1.0)],
    )
}

/// One `B` at site 0 of an `n`-site periodic chain of `A`, hopping +x at
/// `right` and -x at `left`.
pub fn chain_walker(n: u32, right: f64, left: f64) -> ModelRecord {
    let mut types = vec!["A"; n as usize];
    types[0] = "B";
    model(
        cubic_lattice([n, 1, 1]),
        types,
        &["A", "B"],
        vec![
            exchange("B", "A", CUBIC_DIRECTIONS[0], right),
            exchange("B", "A", CUBIC_DIRECTIONS[1], left),
        ],
    )
}

/// One `B` in an `n × n × n` periodic box of `A`, one exchange per
/// direction of [`CUBIC_DIRECTIONS`] with the given rates.
pub fn cubic_walker(n: u32, rates: [f64; 6]) -> ModelRecord {
    let mut types = vec!["A"; (n * n * n) as usize];
    types[0] = "B";
    let processes = CUBIC_DIRECTIONS
        .iter()
        .zip(rates)
        .map(|(&d, r)| exchange("B", "A", d, r))
        .collect();
    model(cubic_lattice([n, n, n]), types, &["A", "B"], processes)
}

/// Oxygen-vacancy exchange on an `n × n × n` box with a vacancy at every
/// site index divisible by `spacing`, one process per direction of
/// [`CUBIC_DIRECTIONS`].
pub fn vacancy_diffusion(n: u32, spacing: usize, rates: [f64; 6]) -> ModelRecord {
    let sites = (n * n * n) as usize;
    let types = (0..sites)
        .map(|s| if s % spacing == 0 { "V" } else { "O" })
        .collect();
    let processes = CUBIC_DIRECTIONS
        .iter()
        .zip(rates)
        .map(|(&d, r)| exchange("V", "O", d, r))
        .collect();
    model(cubic_lattice([n, n, n]), types, &["O", "V"], processes)
}

/// Every site is `A`; the only process needs a `B`.
pub fn stuck(n: u32) -> ModelRecord {
    model(
        cubic_lattice([n, 1, 1]),
        vec!["A"; n as usize],
        &["A", "B"],
        vec![flip("B", "A", 1.0)],
    )
}

/// Bucket mode on an `n`-site periodic chain: site 0 starts with two `A`,
/// every other site empty. One unit of `A` hops +x at rate 1.
pub fn bucket_hop(n: u32) -> ModelRecord {
    let mut types = vec![Occupancy::Many(vec![]); n as usize];
    types[0] = Occupancy::Many(vec!["A".into(), "A".into()]);
    ModelRecord {
        lattice: cubic_lattice([n, 1, 1]),
        configuration: ConfigurationRecord {
            types,
            possible_types: vec!["A".into(), "B".into()],
        },
        interactions: InteractionsRecord {
            processes: vec![ProcessRecord {
                coordinates: vec![ORIGIN, CUBIC_DIRECTIONS[0]],
                elements_before: vec![Occupancy::Many(vec!["A".into()]), "*".into()],
                elements_after: None,
                update: Some(vec![vec![(-1, "A".into())], vec![(1, "A".into())]]),
                move_vectors: vec![],
                basis_sites: vec![0],
                rate_constant: 1.0,
            }],
            implicit_wildcards: true,
            cutoff: None,
        },
    }
}
