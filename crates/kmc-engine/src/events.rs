//! The enabled-event bookkeeping.
//!
//! Events are grouped by process. Each group keeps the set of sites where
//! its process matches; with uniform rates the group total is the rate
//! constant times the group size, otherwise a slot-aligned Fenwick tree
//! holds one rate per site. An upper Fenwick tree over the group totals
//! selects a process in `O(log P)`, and the same draw then selects a site
//! inside the group.
//!
//! Insertion appends; removal swaps the last slot into the hole, so a
//! site's slot is only stable while no other site leaves its group.

use indexmap::IndexSet;
use tracing::debug;

use kmc_core::{FenwickTree, ProcessId};

/// Firings between two full re-summations of every tree.
pub const RESUM_INTERVAL: u32 = 4096;

#[derive(Clone, Debug)]
struct Group {
    sites: IndexSet<usize>,
    rates: Option<FenwickTree>,
    rate_constant: f64,
}

impl Group {
    fn total(&self) -> f64 {
        match &self.rates {
            Some(tree) => tree.total(),
            None => self.rate_constant * self.sites.len() as f64,
        }
    }
}

/// All currently enabled `(process, site)` events and their rates.
#[derive(Clone, Debug)]
pub struct EnabledEvents {
    groups: Vec<Group>,
    upper: FenwickTree,
    since_resum: u32,
}

impl EnabledEvents {
    /// Empty bookkeeping for processes with the given rate constants.
    /// With `per_site_rates`, every group tracks individual rates.
    pub fn new(rate_constants: &[f64], per_site_rates: bool) -> Self {
        let groups = rate_constants
            .iter()
            .map(|&rc| Group {
                sites: IndexSet::new(),
                rates: per_site_rates.then(FenwickTree::new),
                rate_constant: rc,
            })
            .collect();
        Self {
            groups,
            upper: FenwickTree::with_len(rate_constants.len()),
            since_resum: 0,
        }
    }

    /// Number of processes.
    pub fn process_count(&self) -> usize {
        self.groups.len()
    }

    /// Enable, update or disable `(p, site)`. `Some(rate)` enables the
    /// event with that rate (ignored for uniform groups); `None` disables
    /// it.
    pub fn set(&mut self, p: ProcessId, site: usize, rate: Option<f64>) {
        let g = &mut self.groups[p.index()];
        match rate {
            Some(r) => match g.sites.get_index_of(&site) {
                Some(slot) => match &mut g.rates {
                    Some(tree) => tree.set(slot, r),
                    None => return,
                },
                None => {
                    g.sites.insert(site);
                    if let Some(tree) = &mut g.rates {
                        tree.push(r);
                    }
                }
            },
            None => match g.sites.swap_remove_full(&site) {
                Some((slot, _)) => {
                    if let Some(tree) = &mut g.rates {
                        tree.swap_remove(slot);
                    }
                }
                None => return,
            },
        }
        let total = g.total();
        self.upper.set(p.index(), total);
    }

    /// Whether `(p, site)` is enabled.
    pub fn contains(&self, p: ProcessId, site: usize) -> bool {
        self.groups[p.index()].sites.contains(&site)
    }

    /// Rate of an enabled event.
    pub fn rate(&self, p: ProcessId, site: usize) -> Option<f64> {
        let g = &self.groups[p.index()];
        let slot = g.sites.get_index_of(&site)?;
        Some(match &g.rates {
            Some(tree) => tree.get(slot),
            None => g.rate_constant,
        })
    }

    /// Sites where `p` is enabled, in slot order.
    pub fn sites(&self, p: ProcessId) -> &IndexSet<usize> {
        &self.groups[p.index()].sites
    }

    /// Number of events enabled for `p`.
    pub fn count(&self, p: ProcessId) -> usize {
        self.groups[p.index()].sites.len()
    }

    /// Total number of enabled events.
    pub fn len(&self) -> usize {
        self.groups.iter().map(|g| g.sites.len()).sum()
    }

    /// Whether no event is enabled.
    pub fn is_empty(&self) -> bool {
        self.groups.iter().all(|g| g.sites.is_empty())
    }

    /// Summed rate of the events of `p`.
    pub fn process_total(&self, p: ProcessId) -> f64 {
        self.upper.get(p.index())
    }

    /// Summed rate of all enabled events.
    pub fn total(&self) -> f64 {
        self.upper.total()
    }

    /// Select the event at cumulative position `u ∈ [0, total)`.
    pub fn select(&self, u: f64) -> Option<(ProcessId, usize)> {
        let (p, rem) = self.upper.find(u)?;
        let g = &self.groups[p];
        if g.sites.is_empty() {
            return None;
        }
        let slot = match &g.rates {
            Some(tree) => tree.find(rem)?.0,
            None => ((rem / g.rate_constant) as usize).min(g.sites.len() - 1),
        };
        let site = *g.sites.get_index(slot)?;
        Some((ProcessId(p as u32), site))
    }

    /// Count a firing and re-sum every tree once per [`RESUM_INTERVAL`]
    /// firings, bounding floating-point drift in the incremental sums.
    pub fn record_firing(&mut self) {
        self.since_resum += 1;
        if self.since_resum >= RESUM_INTERVAL {
            self.resum();
        }
    }

    /// Recompute every tree from its stored weights.
    pub fn resum(&mut self) {
        let before = self.upper.total();
        for (p, g) in self.groups.iter_mut().enumerate() {
            if let Some(tree) = &mut g.rates {
                tree.rebuild();
            }
            self.upper.set(p, g.total());
        }
        self.upper.rebuild();
        self.since_resum = 0;
        debug!(before, after = self.upper.total(), "event totals re-summed");
    }

    /// Remove every event.
    pub fn clear(&mut self) {
        for g in &mut self.groups {
            g.sites.clear();
            if let Some(tree) = &mut g.rates {
                *tree = FenwickTree::new();
            }
        }
        self.upper = FenwickTree::with_len(self.groups.len());
        self.since_resum = 0;
    }
}
