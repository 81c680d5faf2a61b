//! Implicit wildcard insertion.
//!
//! With implicit wildcards enabled, every process is padded to the union
//! of all process offsets: an offset used by some process but missing from
//! another becomes a wildcard position there. Padded processes are then
//! re-sorted with the same [`LocalKey`](kmc_lattice::LocalKey) order the
//! neighbourhood templates use, so there is one ordering for everything.

use indexmap::{IndexMap, IndexSet};
use kmc_core::Vec3;
use kmc_lattice::{quantize, QuantizedOffset};
use tracing::debug;

use crate::process::Process;

/// Pad every process to the union of all offsets. Returns the number of
/// wildcard positions inserted.
pub fn add_implicit_wildcards(processes: &mut [Process], type_codes: usize) -> usize {
    let mut union: IndexMap<QuantizedOffset, Vec3> = IndexMap::new();
    for p in processes.iter() {
        for pos in p.positions() {
            union.entry(quantize(pos)).or_insert(*pos);
        }
    }

    let mut inserted = 0;
    for p in processes.iter_mut() {
        let own: IndexSet<QuantizedOffset> = p.positions().iter().map(quantize).collect();
        let missing: Vec<Vec3> = union
            .iter()
            .filter(|(q, _)| !own.contains(*q))
            .map(|(_, v)| *v)
            .collect();
        if missing.is_empty() {
            continue;
        }
        inserted += missing.len();
        for offset in missing {
            p.push_wildcard(offset, type_codes);
        }
        p.canonicalize();
    }
    debug!(
        offsets = union.len(),
        inserted, "implicit wildcards compiled"
    );
    inserted
}
