//! The global ordering of local offsets.
//!
//! Neighbourhood templates and compiled process patterns are both sorted
//! with [`LocalKey`]: radial distance first, then a type tag, then the
//! coordinates lexicographically. Every consumer that maps an offset to a
//! local index goes through this module, so implicit-wildcard compilation
//! sees one consistent order across all processes.
//!
//! Coordinates are quantized to [`QUANTUM`] before comparison, which makes
//! the order total and immune to rounding noise in `dc + b' - b`.

use kmc_core::Vec3;

/// Resolution at which fractional coordinates and distances are compared.
pub const QUANTUM: f64 = 1e-6;

/// A fractional offset quantized to [`QUANTUM`].
pub type QuantizedOffset = [i64; 3];

/// Quantize a fractional offset.
pub fn quantize(offset: &Vec3) -> QuantizedOffset {
    [q(offset[0]), q(offset[1]), q(offset[2])]
}

fn q(x: f64) -> i64 {
    (x / QUANTUM).round() as i64
}

/// Euclidean length of a fractional offset, in cell units.
pub fn radial_distance(offset: &Vec3) -> f64 {
    (offset[0] * offset[0] + offset[1] * offset[1] + offset[2] * offset[2]).sqrt()
}

/// Sort key for a local offset.
///
/// For lattice neighbours the tag is the basis index of the neighbour
/// site; for process positions it is the before-type code. Offsets within
/// one list are unique, so the coordinates always break remaining ties.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalKey {
    distance: i64,
    tag: u32,
    coords: QuantizedOffset,
}

impl LocalKey {
    /// Key for `offset` with the given tag.
    pub fn new(offset: &Vec3, tag: u32) -> Self {
        Self {
            distance: q(radial_distance(offset)),
            tag,
            coords: quantize(offset),
        }
    }

    /// The quantized coordinates, usable as a lookup key.
    pub fn coords(&self) -> QuantizedOffset {
        self.coords
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_dominates() {
        let near = LocalKey::new(&[0.0, 0.0, 1.0], 9);
        let far = LocalKey::new(&[1.0, 1.0, 0.0], 0);
        assert!(near < far);
    }

    #[test]
    fn tag_before_coordinates() {
        let a = LocalKey::new(&[1.0, 0.0, 0.0], 2);
        let b = LocalKey::new(&[-1.0, 0.0, 0.0], 1);
        assert!(b < a);
    }

    #[test]
    fn coordinates_break_ties_lexicographically() {
        let a = LocalKey::new(&[-1.0, 0.0, 0.0], 0);
        let b = LocalKey::new(&[0.0, -1.0, 0.0], 0);
        let c = LocalKey::new(&[0.0, 0.0, -1.0], 0);
        assert!(a < b && b < c);
    }

    #[test]
    fn rounding_noise_is_absorbed() {
        let a = LocalKey::new(&[0.5, 0.0, 0.0], 0);
        let b = LocalKey::new(&[0.5 + 1e-12, 0.0, -1e-13], 0);
        assert_eq!(a, b);
    }
}
