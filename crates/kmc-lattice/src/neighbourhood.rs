//! Precomputed per-site neighbourhoods.
//!
//! Every site of basis `b` shares one template: the ordered list of
//! `(cell delta, basis)` pairs whose fractional offset lies within the
//! shell radius. The table resolves each template entry to a concrete
//! site once, at construction, and pins the result. Entries that fall off
//! a non-periodic edge resolve to [`NO_SITE`].

use indexmap::IndexMap;
use kmc_core::{InputError, Vec3};

use crate::lattice::Lattice;
use crate::order::{quantize, radial_distance, LocalKey, QuantizedOffset, QUANTUM};

/// Sentinel for a template entry with no site behind it.
pub const NO_SITE: u32 = u32::MAX;

/// One entry of a basis template.
#[derive(Clone, Debug, PartialEq)]
pub struct NeighbourOffset {
    /// Fractional offset from the centre site.
    pub offset: Vec3,
    /// Cell displacement from the centre's cell.
    pub cell_delta: [i64; 3],
    /// Basis index of the neighbour.
    pub basis: usize,
    /// Position of this entry in the global local order.
    pub key: LocalKey,
}

/// Ordered neighbourhoods of every site within a fixed radius.
#[derive(Clone, Debug)]
pub struct NeighbourTable {
    radius: f64,
    templates: Vec<Vec<NeighbourOffset>>,
    lookup: Vec<IndexMap<QuantizedOffset, usize>>,
    starts: Vec<usize>,
    sites: Vec<u32>,
}

impl NeighbourTable {
    /// Compute neighbourhoods of radius `radius` (cell units) for every
    /// site of `lattice`.
    pub fn build(lattice: &Lattice, radius: f64) -> Result<Self, InputError> {
        if !radius.is_finite() || radius < 0.0 {
            return Err(InputError::invalid(
                "cutoff",
                format!("radius must be finite and >= 0, got {radius}"),
            ));
        }

        let templates: Vec<Vec<NeighbourOffset>> = (0..lattice.basis_count())
            .map(|b| basis_template(lattice, b, radius))
            .collect();
        let lookup = templates
            .iter()
            .map(|t| {
                t.iter()
                    .enumerate()
                    .map(|(i, e)| (e.key.coords(), i))
                    .collect()
            })
            .collect();

        let n = lattice.site_count();
        let mut starts = Vec::with_capacity(n + 1);
        let mut sites = Vec::new();
        for site in 0..n {
            starts.push(sites.len());
            let (cell, b) = lattice.cell_and_basis(site);
            for entry in &templates[b] {
                let target = [
                    cell[0] as i64 + entry.cell_delta[0],
                    cell[1] as i64 + entry.cell_delta[1],
                    cell[2] as i64 + entry.cell_delta[2],
                ];
                let resolved = lattice
                    .site_index(target, entry.basis)
                    .map_or(NO_SITE, |s| s as u32);
                sites.push(resolved);
            }
        }
        starts.push(sites.len());

        Ok(Self {
            radius,
            templates,
            lookup,
            starts,
            sites,
        })
    }

    /// The shell radius this table was built with.
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// The ordered template shared by all sites of `basis`.
    pub fn template(&self, basis: usize) -> &[NeighbourOffset] {
        &self.templates[basis]
    }

    /// Local index of a fractional offset in the template of `basis`, or
    /// `None` if no lattice site lies at that offset within the radius.
    pub fn local_index(&self, basis: usize, offset: &Vec3) -> Option<usize> {
        self.lookup[basis].get(&quantize(offset)).copied()
    }

    /// Resolved sites of a site's neighbourhood, [`NO_SITE`] where the
    /// template runs off a non-periodic edge.
    pub fn row(&self, site: usize) -> &[u32] {
        &self.sites[self.starts[site]..self.starts[site + 1]]
    }

    /// The neighbour at a local index, if it exists.
    pub fn neighbour(&self, site: usize, local: usize) -> Option<usize> {
        match self.row(site)[local] {
            NO_SITE => None,
            s => Some(s as usize),
        }
    }

    /// Iterate a site's neighbourhood in local order.
    pub fn neighbours(&self, site: usize) -> impl Iterator<Item = Option<usize>> + '_ {
        self.row(site)
            .iter()
            .map(|&s| (s != NO_SITE).then_some(s as usize))
    }
}

fn basis_template(lattice: &Lattice, basis: usize, radius: f64) -> Vec<NeighbourOffset> {
    let points = lattice.unit_cell().basis_points();
    let centre = points[basis];
    // Basis differences lie in (-1, 1), so one extra cell covers them.
    let reach = radius.ceil() as i64 + 1;
    let mut out = Vec::new();
    for di in -reach..=reach {
        for dj in -reach..=reach {
            for dk in -reach..=reach {
                for (b2, p) in points.iter().enumerate() {
                    let offset = [
                        di as f64 + p[0] - centre[0],
                        dj as f64 + p[1] - centre[1],
                        dk as f64 + p[2] - centre[2],
                    ];
                    if radial_distance(&offset) <= radius + QUANTUM {
                        out.push(NeighbourOffset {
                            offset,
                            cell_delta: [di, dj, dk],
                            basis: b2,
                            key: LocalKey::new(&offset, b2 as u32),
                        });
                    }
                }
            }
        }
    }
    out.sort_by_key(|e| e.key);
    out
}
