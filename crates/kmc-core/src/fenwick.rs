//! Binary-indexed tree over non-negative weights.
//!
//! Backs the two-level enabled-event index: one tree across processes,
//! and one per process whose sites carry individual rates. Supports
//! O(log n) point update, prefix sum, append, swap-remove and weighted
//! search, with an O(n) rebuild that re-sums from the stored values to
//! shed accumulated rounding drift.

/// Fenwick tree with 0-based indexing that also keeps the raw values.
///
/// Node `i` holds the sum of `values[i & (i + 1) ..= i]`.
#[derive(Clone, Debug, Default)]
pub struct FenwickTree {
    tree: Vec<f64>,
    values: Vec<f64>,
}

impl FenwickTree {
    /// An empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// A tree of `len` zero weights.
    pub fn with_len(len: usize) -> Self {
        Self {
            tree: vec![0.0; len],
            values: vec![0.0; len],
        }
    }

    /// Build from explicit weights in O(n).
    pub fn from_values(values: Vec<f64>) -> Self {
        let mut t = Self {
            tree: Vec::new(),
            values,
        };
        t.rebuild();
        t
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the tree has no entries.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Weight at `index`.
    pub fn get(&self, index: usize) -> f64 {
        self.values[index]
    }

    /// All weights in index order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Replace the weight at `index`.
    pub fn set(&mut self, index: usize, value: f64) {
        let delta = value - self.values[index];
        self.values[index] = value;
        let n = self.tree.len();
        let mut j = index;
        while j < n {
            self.tree[j] += delta;
            j |= j + 1;
        }
    }

    /// Sum of the first `count` weights.
    pub fn prefix_sum(&self, count: usize) -> f64 {
        let mut s = 0.0;
        let mut i = count;
        while i > 0 {
            s += self.tree[i - 1];
            i &= i - 1;
        }
        s
    }

    /// Sum of all weights.
    pub fn total(&self) -> f64 {
        self.prefix_sum(self.len())
    }

    /// Append a weight at the end.
    pub fn push(&mut self, value: f64) {
        let n = self.values.len();
        let lo = n & (n + 1);
        let mut node = value;
        let mut i = n;
        while i > lo {
            node += self.tree[i - 1];
            i &= i - 1;
        }
        self.values.push(value);
        self.tree.push(node);
    }

    /// Remove the last weight.
    ///
    /// The last node covers only indices at or before itself, so no
    /// other node needs adjusting.
    pub fn pop(&mut self) -> Option<f64> {
        self.tree.pop();
        self.values.pop()
    }

    /// Remove the weight at `index`, moving the last weight into its slot.
    ///
    /// Mirrors `IndexSet::swap_remove_index` so a tree can stay aligned
    /// with the slot order of an index set.
    pub fn swap_remove(&mut self, index: usize) -> f64 {
        let last = self.values.len() - 1;
        let removed = self.values[index];
        if index != last {
            let moved = self.values[last];
            self.set(index, moved);
        }
        self.pop();
        removed
    }

    /// Locate the entry where the running sum first exceeds `u`.
    ///
    /// Returns the index and the remainder of `u` inside that entry, so a
    /// caller can refine the same draw within a lower level. If rounding
    /// pushes `u` past the total, the last positive entry is returned with
    /// its remainder clamped inside it. `None` if every weight is zero.
    pub fn find(&self, u: f64) -> Option<(usize, f64)> {
        let n = self.tree.len();
        if n == 0 {
            return None;
        }
        let mut pos = 0usize;
        let mut rem = u.max(0.0);
        let mut step = 1usize << (usize::BITS - 1 - n.leading_zeros());
        while step > 0 {
            let next = pos + step;
            if next <= n && self.tree[next - 1] <= rem {
                pos = next;
                rem -= self.tree[next - 1];
            }
            step >>= 1;
        }
        if pos < n && self.values[pos] > 0.0 {
            return Some((pos, rem.min(self.values[pos])));
        }
        // Drift past the end, or landed on a zero weight: fall back to the
        // last positive entry.
        let last = self.values.iter().rposition(|&v| v > 0.0)?;
        let value = self.values[last];
        Some((last, value * (1.0 - f64::EPSILON)))
    }

    /// Recompute every node from the stored weights.
    pub fn rebuild(&mut self) {
        let n = self.values.len();
        self.tree.clear();
        self.tree.extend_from_slice(&self.values);
        for i in 0..n {
            let j = i | (i + 1);
            if j < n {
                let carry = self.tree[i];
                self.tree[j] += carry;
            }
        }
    }
}
