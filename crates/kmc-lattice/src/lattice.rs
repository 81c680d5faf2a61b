//! The periodic crystalline grid.

use kmc_core::records::LatticeRecord;
use kmc_core::{InputError, Vec3};

use crate::neighbourhood::NeighbourTable;
use crate::unit_cell::UnitCell;

/// A unit cell tiled `ra × rb × rc` times with per-axis periodicity.
///
/// Immutable after construction. Sites are numbered densely; see the
/// crate docs for the numbering.
#[derive(Clone, Debug, PartialEq)]
pub struct Lattice {
    unit_cell: UnitCell,
    repetitions: [u32; 3],
    periodic: [bool; 3],
    site_count: usize,
}

impl Lattice {
    /// Create a lattice.
    ///
    /// Returns `Err` if any repetition is zero or if the site count
    /// overflows the `u32` site encoding used by neighbour tables.
    pub fn new(
        unit_cell: UnitCell,
        repetitions: [u32; 3],
        periodic: [bool; 3],
    ) -> Result<Self, InputError> {
        if let Some(axis) = repetitions.iter().position(|&r| r == 0) {
            return Err(InputError::invalid(
                "lattice.repetitions",
                format!("repetition along axis {axis} must be positive, got 0"),
            ));
        }
        let site_count = repetitions
            .iter()
            .try_fold(unit_cell.basis_count(), |acc, &r| acc.checked_mul(r as usize))
            .filter(|&n| n < u32::MAX as usize)
            .ok_or_else(|| {
                InputError::invalid(
                    "lattice.repetitions",
                    format!("{repetitions:?} exceeds the maximum site count"),
                )
            })?;
        Ok(Self {
            unit_cell,
            repetitions,
            periodic,
            site_count,
        })
    }

    /// Build from an input record.
    pub fn from_record(record: &LatticeRecord) -> Result<Self, InputError> {
        let cell = UnitCell::from_record(&record.unit_cell)?;
        Self::new(cell, record.repetitions, record.periodic)
    }

    /// Number of sites, `ra * rb * rc * K`.
    pub fn site_count(&self) -> usize {
        self.site_count
    }

    /// Number of basis points per cell.
    pub fn basis_count(&self) -> usize {
        self.unit_cell.basis_count()
    }

    /// The repeated cell.
    pub fn unit_cell(&self) -> &UnitCell {
        &self.unit_cell
    }

    /// Repetitions along `a`, `b`, `c`.
    pub fn repetitions(&self) -> [u32; 3] {
        self.repetitions
    }

    /// Periodicity flags along `a`, `b`, `c`.
    pub fn periodic(&self) -> [bool; 3] {
        self.periodic
    }

    /// Basis index of a site.
    pub fn basis(&self, site: usize) -> usize {
        site % self.basis_count()
    }

    /// Cell indices and basis index of a site.
    pub fn cell_and_basis(&self, site: usize) -> ([u32; 3], usize) {
        let k = self.basis_count();
        let [_, rb, rc] = self.repetitions.map(|r| r as usize);
        let b = site % k;
        let cell = site / k;
        let c = cell % rc;
        let bj = (cell / rc) % rb;
        let a = cell / (rb * rc);
        ([a as u32, bj as u32, c as u32], b)
    }

    /// Site index of `basis` in cell `cell`.
    ///
    /// Cell indices may lie outside the box: periodic axes wrap, and an
    /// out-of-range index on a non-periodic axis yields `None`.
    pub fn site_index(&self, cell: [i64; 3], basis: usize) -> Option<usize> {
        let mut wrapped = [0usize; 3];
        for axis in 0..3 {
            let r = self.repetitions[axis] as i64;
            let c = cell[axis];
            wrapped[axis] = if self.periodic[axis] {
                c.rem_euclid(r) as usize
            } else if (0..r).contains(&c) {
                c as usize
            } else {
                return None;
            };
        }
        let [_, rb, rc] = self.repetitions.map(|r| r as usize);
        Some(((wrapped[0] * rb + wrapped[1]) * rc + wrapped[2]) * self.basis_count() + basis)
    }

    /// Fractional coordinates of a site, in cell units from the origin.
    pub fn fractional(&self, site: usize) -> Vec3 {
        let (cell, b) = self.cell_and_basis(site);
        let p = self.unit_cell.basis_points()[b];
        [
            cell[0] as f64 + p[0],
            cell[1] as f64 + p[1],
            cell[2] as f64 + p[2],
        ]
    }

    /// Cartesian coordinates of a site.
    pub fn coords(&self, site: usize) -> Vec3 {
        self.unit_cell.to_cartesian(&self.fractional(site))
    }

    /// Sites within radius `r` (cell units) of `site`, in local order.
    ///
    /// Builds a one-off table; callers stepping a simulation should keep a
    /// [`NeighbourTable`] instead.
    pub fn within_radius(&self, site: usize, r: f64) -> Result<Vec<usize>, InputError> {
        let table = NeighbourTable::build(self, r)?;
        Ok(table.neighbours(site).flatten().collect())
    }
}
