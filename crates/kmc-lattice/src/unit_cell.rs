//! The repeated cell of a crystalline lattice.

use kmc_core::records::UnitCellRecord;
use kmc_core::{InputError, Vec3};

/// Three cell vectors and K basis points in fractional coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct UnitCell {
    cell_vectors: [Vec3; 3],
    basis_points: Vec<Vec3>,
}

impl UnitCell {
    /// Create a unit cell, validating its shape.
    ///
    /// Returns `Err` if the cell vectors are degenerate or non-finite, if
    /// there are no basis points, if a basis component lies outside
    /// `[0, 1)`, or if two basis points coincide.
    pub fn new(cell_vectors: [Vec3; 3], basis_points: Vec<Vec3>) -> Result<Self, InputError> {
        if cell_vectors.iter().flatten().any(|v| !v.is_finite()) {
            return Err(InputError::invalid(
                "unit_cell.cell_vectors",
                "components must be finite",
            ));
        }
        let det = determinant(&cell_vectors);
        if det.abs() < 1e-12 {
            return Err(InputError::invalid(
                "unit_cell.cell_vectors",
                format!("cell vectors are linearly dependent (det = {det})"),
            ));
        }
        if basis_points.is_empty() {
            return Err(InputError::invalid(
                "unit_cell.basis_points",
                "at least one basis point is required",
            ));
        }
        for (i, p) in basis_points.iter().enumerate() {
            if p.iter().any(|&c| !c.is_finite() || !(0.0..1.0).contains(&c)) {
                return Err(InputError::invalid(
                    "unit_cell.basis_points",
                    format!("basis point {i} = {p:?} has a component outside [0, 1)"),
                ));
            }
        }
        for i in 0..basis_points.len() {
            for j in 0..i {
                let d = sub(&basis_points[i], &basis_points[j]);
                if norm(&d) < 1e-9 {
                    return Err(InputError::invalid(
                        "unit_cell.basis_points",
                        format!("basis points {j} and {i} coincide"),
                    ));
                }
            }
        }
        Ok(Self {
            cell_vectors,
            basis_points,
        })
    }

    /// Build from an input record.
    pub fn from_record(record: &UnitCellRecord) -> Result<Self, InputError> {
        Self::new(record.cell_vectors, record.basis_points.clone())
    }

    /// Cell vectors `a`, `b`, `c`.
    pub fn cell_vectors(&self) -> &[Vec3; 3] {
        &self.cell_vectors
    }

    /// Basis points in fractional coordinates.
    pub fn basis_points(&self) -> &[Vec3] {
        &self.basis_points
    }

    /// Number of basis points, K.
    pub fn basis_count(&self) -> usize {
        self.basis_points.len()
    }

    /// Map a fractional vector to cartesian units.
    pub fn to_cartesian(&self, frac: &Vec3) -> Vec3 {
        let [a, b, c] = &self.cell_vectors;
        [
            frac[0] * a[0] + frac[1] * b[0] + frac[2] * c[0],
            frac[0] * a[1] + frac[1] * b[1] + frac[2] * c[1],
            frac[0] * a[2] + frac[1] * b[2] + frac[2] * c[2],
        ]
    }
}

fn determinant(m: &[Vec3; 3]) -> f64 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

pub(crate) fn sub(a: &Vec3, b: &Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

pub(crate) fn norm(v: &Vec3) -> f64 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}
