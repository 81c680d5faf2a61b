//! Neighbour-table compliance helpers.
//!
//! Invariants every table must satisfy regardless of lattice shape.
//! Shared by the test modules of this crate.

use crate::lattice::Lattice;
use crate::neighbourhood::NeighbourTable;

/// Assert that `t in neighbours(s)` implies `s in neighbours(t)`.
pub fn assert_neighbours_symmetric(lattice: &Lattice, table: &NeighbourTable) {
    for s in 0..lattice.site_count() {
        for t in table.neighbours(s).flatten() {
            assert!(
                table.neighbours(t).flatten().any(|x| x == s),
                "{t} is a neighbour of {s}, but not vice versa"
            );
        }
    }
}

/// Assert that local index 0 is always the site itself.
pub fn assert_first_is_self(lattice: &Lattice, table: &NeighbourTable) {
    for s in 0..lattice.site_count() {
        assert_eq!(table.neighbour(s, 0), Some(s), "site {s}");
    }
}

/// Assert that shifting a fully periodic lattice by one cell along any
/// axis shifts every neighbourhood by the same cell.
pub fn assert_translation_invariant(lattice: &Lattice, table: &NeighbourTable) {
    assert!(lattice.periodic().iter().all(|&p| p));
    for s in 0..lattice.site_count() {
        let (cell, b) = lattice.cell_and_basis(s);
        for axis in 0..3 {
            let mut shifted_cell = cell.map(|c| c as i64);
            shifted_cell[axis] += 1;
            let shifted = lattice
                .site_index(shifted_cell, b)
                .expect("periodic lattice resolves every cell");
            for (n, m) in table.neighbours(s).zip(table.neighbours(shifted)) {
                let n = n.expect("periodic");
                let m = m.expect("periodic");
                let (nc, nb) = lattice.cell_and_basis(n);
                let mut expected = nc.map(|c| c as i64);
                expected[axis] += 1;
                assert_eq!(lattice.site_index(expected, nb), Some(m));
            }
        }
    }
}
