//! On-the-fly mean-squared displacement.
//!
//! Every tracked particle keeps a circular reservoir of its last
//! `history_steps` (time, position) snapshots. At each callback the
//! current position is paired with every snapshot in the reservoir; a
//! pair with lag `Δt < t_max` contributes its squared displacement per
//! axis to bin `⌊Δt / (t_max / n_bins)⌋`. Positions are the unwrapped
//! cartesian coordinates the configuration keeps per particle id, so
//! periodic boundaries never fold a displacement.
//!
//! Constructed via the builder pattern: [`OnTheFlyMsd::builder`].

use std::collections::VecDeque;
use std::io::{self, Write};

use indexmap::IndexMap;
use tracing::debug;

use kmc_core::{InputError, ParticleId, TypeCode, TypeTable, Vec3};
use kmc_engine::{Analysis, StepView};

// ── Statistics ─────────────────────────────────────────────────────

/// Per-bin sums over contributing pairs.
#[derive(Clone, Copy, Debug, Default)]
struct Accumulator {
    /// Σ Δ² per axis.
    s2: [f64; 3],
    /// Σ Δ⁴ per axis.
    s4: [f64; 3],
    count: u64,
}

impl Accumulator {
    fn add(&mut self, d: [f64; 3]) {
        for k in 0..3 {
            let d2 = d[k] * d[k];
            self.s2[k] += d2;
            self.s4[k] += d2 * d2;
        }
        self.count += 1;
    }

    /// `Σx²/n − (Σx/n)²` for the samples `x = Δ²` of axis `k`.
    fn spread(&self, k: usize) -> f64 {
        let n = self.count as f64;
        let mean = self.s2[k] / n;
        (self.s4[k] / n - mean * mean).max(0.0)
    }

    /// Standard error of the bin mean: the sample deviation over `√n`.
    fn std_error(&self, k: usize) -> f64 {
        if self.count < 2 {
            return 0.0;
        }
        self.std_dev(k) / (self.count as f64).sqrt()
    }

    fn std_dev(&self, k: usize) -> f64 {
        if self.count < 2 {
            return 0.0;
        }
        let n = self.count as f64;
        (self.spread(k) * n / (n - 1.0)).sqrt()
    }
}

/// One row of MSD results.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MsdBin {
    /// Bin centre on the lag-time axis.
    pub time: f64,
    /// ⟨Δx²⟩, ⟨Δy²⟩, ⟨Δz²⟩.
    pub msd: [f64; 3],
    /// Pairs that contributed.
    pub count: u64,
    /// Standard deviation of the mean, per axis.
    pub std_error: [f64; 3],
    /// Sample standard deviation of the squared displacements, per axis.
    pub std_dev: [f64; 3],
}

impl MsdBin {
    /// ⟨Δr²⟩ over all three axes.
    pub fn xyz(&self) -> f64 {
        self.msd[0] + self.msd[1] + self.msd[2]
    }

    /// ⟨Δx²⟩ + ⟨Δy²⟩.
    pub fn xy(&self) -> f64 {
        self.msd[0] + self.msd[1]
    }

    /// ⟨Δx²⟩ + ⟨Δz²⟩.
    pub fn xz(&self) -> f64 {
        self.msd[0] + self.msd[2]
    }

    /// ⟨Δy²⟩ + ⟨Δz²⟩.
    pub fn yz(&self) -> f64 {
        self.msd[1] + self.msd[2]
    }
}

// ── OnTheFlyMsd ────────────────────────────────────────────────────

/// Mean-squared displacement of one particle type, accumulated during
/// the run.
#[derive(Debug)]
pub struct OnTheFlyMsd {
    track: TypeCode,
    track_name: String,
    history_steps: usize,
    n_bins: usize,
    t_max: f64,
    bin_width: f64,
    reservoirs: IndexMap<ParticleId, VecDeque<(f64, Vec3)>>,
    bins: Vec<Accumulator>,
}

/// Builder for [`OnTheFlyMsd`].
///
/// `track_type` is required. Defaults: `history_steps = 100`,
/// `n_bins = 100`, `t_max = 100.0`.
pub struct OnTheFlyMsdBuilder {
    track_type: Option<String>,
    history_steps: usize,
    n_bins: usize,
    t_max: f64,
}

impl OnTheFlyMsd {
    /// Create a new builder.
    pub fn builder() -> OnTheFlyMsdBuilder {
        OnTheFlyMsdBuilder {
            track_type: None,
            history_steps: 100,
            n_bins: 100,
            t_max: 100.0,
        }
    }

    /// The tracked type name.
    pub fn track_type(&self) -> &str {
        &self.track_name
    }

    /// Particles currently holding a reservoir.
    pub fn tracked(&self) -> usize {
        self.reservoirs.len()
    }

    /// Total pairs accumulated over all bins.
    pub fn pair_count(&self) -> u64 {
        self.bins.iter().map(|b| b.count).sum()
    }

    /// One row per bin, in lag-time order. Empty bins report zeros.
    pub fn results(&self) -> Vec<MsdBin> {
        self.bins
            .iter()
            .enumerate()
            .map(|(b, acc)| {
                let n = acc.count as f64;
                let mean = |k: usize| if acc.count == 0 { 0.0 } else { acc.s2[k] / n };
                MsdBin {
                    time: (b as f64 + 0.5) * self.bin_width,
                    msd: [mean(0), mean(1), mean(2)],
                    count: acc.count,
                    std_error: [acc.std_error(0), acc.std_error(1), acc.std_error(2)],
                    std_dev: [acc.std_dev(0), acc.std_dev(1), acc.std_dev(2)],
                }
            })
            .collect()
    }

    fn observe(&mut self, view: &StepView<'_>) {
        let config = view.configuration;
        let now = view.time;
        let history = self.history_steps;

        self.reservoirs.retain(|&id, _| config.is_alive(id));
        for id in config.ids_of_type(self.track) {
            let Some(pos) = config.coords_of(id) else {
                continue;
            };
            let reservoir = self
                .reservoirs
                .entry(id)
                .or_insert_with(|| VecDeque::with_capacity(history));
            for &(then, old) in reservoir.iter() {
                let lag = now - then;
                if lag >= self.t_max {
                    continue;
                }
                let b = ((lag / self.bin_width) as usize).min(self.n_bins - 1);
                self.bins[b].add([pos[0] - old[0], pos[1] - old[1], pos[2] - old[2]]);
            }
            if reservoir.len() == history {
                reservoir.pop_front();
            }
            reservoir.push_back((now, pos));
        }
    }
}

impl OnTheFlyMsdBuilder {
    /// Particle type to follow.
    pub fn track_type(mut self, name: impl Into<String>) -> Self {
        self.track_type = Some(name.into());
        self
    }

    /// Reservoir depth per particle, in callbacks.
    pub fn history_steps(mut self, steps: usize) -> Self {
        self.history_steps = steps;
        self
    }

    /// Number of lag-time bins.
    pub fn n_bins(mut self, n: usize) -> Self {
        self.n_bins = n;
        self
    }

    /// Longest lag time binned.
    pub fn t_max(mut self, t: f64) -> Self {
        self.t_max = t;
        self
    }

    /// Build against the model's type table.
    ///
    /// Fails if `track_type` is missing or not a possible type, or a
    /// numeric parameter is out of range.
    pub fn build(self, types: &TypeTable) -> Result<OnTheFlyMsd, InputError> {
        let track_name = self
            .track_type
            .ok_or_else(|| InputError::invalid("track_type", "track_type is required"))?;
        let track = types.code(&track_name)?;
        if self.history_steps == 0 {
            return Err(InputError::invalid("history_steps", "must be >= 1"));
        }
        if self.n_bins == 0 {
            return Err(InputError::invalid("n_bins", "must be >= 1"));
        }
        if !(self.t_max.is_finite() && self.t_max > 0.0) {
            return Err(InputError::invalid(
                "t_max",
                format!("must be finite and > 0, got {}", self.t_max),
            ));
        }
        Ok(OnTheFlyMsd {
            track,
            track_name,
            history_steps: self.history_steps,
            n_bins: self.n_bins,
            t_max: self.t_max,
            bin_width: self.t_max / self.n_bins as f64,
            reservoirs: IndexMap::new(),
            bins: vec![Accumulator::default(); self.n_bins],
        })
    }
}

impl Analysis for OnTheFlyMsd {
    fn name(&self) -> &str {
        "on-the-fly-msd"
    }

    fn setup(&mut self, view: &StepView<'_>) {
        self.reservoirs.clear();
        self.bins.fill(Accumulator::default());
        self.observe(view);
    }

    fn register_step(&mut self, view: &StepView<'_>) {
        self.observe(view);
    }

    fn finalize(&mut self) {
        debug!(
            track_type = %self.track_name,
            tracked = self.reservoirs.len(),
            pairs = self.pair_count(),
            "msd finalized"
        );
    }

    /// Columns: `t_mid msd_x msd_y msd_z count σ_x σ_y σ_z σtot_x
    /// σtot_y σtot_z`.
    fn write_results(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(
            out,
            "# time msd_x msd_y msd_z count std_err_x std_err_y std_err_z std_dev_x std_dev_y std_dev_z"
        )?;
        for row in self.results() {
            writeln!(
                out,
                "{} {} {} {} {} {} {} {} {} {} {}",
                row.time,
                row.msd[0],
                row.msd[1],
                row.msd[2],
                row.count,
                row.std_error[0],
                row.std_error[1],
                row.std_error[2],
                row.std_dev[0],
                row.std_dev[1],
                row.std_dev[2],
            )?;
        }
        Ok(())
    }
}
