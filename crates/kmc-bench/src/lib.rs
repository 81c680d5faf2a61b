//! Benchmark profiles for the lattice KMC engine.
//!
//! - [`vacancy_profile`]: oxygen-vacancy exchange on an `n³` cubic box
//! - [`bench_rng`]: the generator the benches draw from

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use kmc_core::{
    ConfigurationRecord, InteractionsRecord, KmcRng, LatticeRecord, ModelRecord, Occupancy,
    ProcessRecord, RngType, UnitCellRecord,
};

const DIRECTIONS: [[f64; 3]; 6] = [
    [1.0, 0.0, 0.0],
    [-1.0, 0.0, 0.0],
    [0.0, 1.0, 0.0],
    [0.0, -1.0, 0.0],
    [0.0, 0.0, 1.0],
    [0.0, 0.0, -1.0],
];

/// Oxygen-vacancy exchange on an `n × n × n` periodic cubic box, one
/// vacancy every `spacing` sites, six exchange processes at rate 1.
pub fn vacancy_profile(n: u32, spacing: usize) -> ModelRecord {
    let sites = (n * n * n) as usize;
    let types = (0..sites)
        .map(|s| Occupancy::from(if s % spacing == 0 { "V" } else { "O" }))
        .collect();
    let processes = DIRECTIONS
        .iter()
        .map(|&d| ProcessRecord {
            coordinates: vec![[0.0; 3], d],
            elements_before: vec!["V".into(), "O".into()],
            elements_after: Some(vec!["O".into(), "V".into()]),
            update: None,
            move_vectors: vec![(0, d)],
            basis_sites: vec![0],
            rate_constant: 1.0,
        })
        .collect();
    ModelRecord {
        lattice: LatticeRecord {
            unit_cell: UnitCellRecord {
                cell_vectors: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
                basis_points: vec![[0.0; 3]],
            },
            repetitions: [n; 3],
            periodic: [true; 3],
        },
        configuration: ConfigurationRecord {
            types,
            possible_types: vec!["O".into(), "V".into()],
        },
        interactions: InteractionsRecord {
            processes,
            implicit_wildcards: true,
            cutoff: None,
        },
    }
}

/// A fixed-seed generator.
pub fn bench_rng(seed: u64) -> KmcRng {
    KmcRng::new(RngType::ChaCha8, seed)
}
