//! Read access to site occupancy, as the matcher needs it.

use kmc_core::TypeCode;

/// Read-only view of the current occupancy of every site.
///
/// Implemented by the engine's configuration; the matcher only ever
/// borrows it immutably.
pub trait OccupancyView {
    /// Type at a site. In bucket mode, the lowest-coded type present, or
    /// [`TypeCode::WILDCARD`] for an empty site.
    fn type_at(&self, site: usize) -> TypeCode;

    /// Number of particles of type `t` at a site. In single-occupancy
    /// mode this is 1 for the site's type and 0 otherwise.
    fn count_at(&self, site: usize, t: TypeCode) -> u32 {
        u32::from(self.type_at(site) == t)
    }
}

impl OccupancyView for [TypeCode] {
    fn type_at(&self, site: usize) -> TypeCode {
        self[site]
    }
}

impl OccupancyView for Vec<TypeCode> {
    fn type_at(&self, site: usize) -> TypeCode {
        self[site]
    }
}
