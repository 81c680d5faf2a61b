//! Histogram of waiting times between analysis callbacks.

use std::io::{self, Write};

use kmc_core::InputError;
use kmc_engine::{Analysis, StepView};

/// One histogram bin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimeStepBin {
    /// Bin centre, `(i + 0.5) · β`.
    pub time: f64,
    /// Raw count.
    pub count: u64,
    /// Count divided by the total, once finalized.
    pub normalized: f64,
}

/// Distribution of `Δt` between consecutive callbacks, with bin size β.
///
/// The histogram starts empty and grows with 10% headroom whenever a
/// `Δt` lands past its end.
#[derive(Debug)]
pub struct TimeStepDistribution {
    bin_size: f64,
    last_time: f64,
    counts: Vec<u64>,
    normalized: Vec<f64>,
}

impl TimeStepDistribution {
    /// A distribution with bin size `bin_size`, which must be finite and
    /// positive.
    pub fn new(bin_size: f64) -> Result<Self, InputError> {
        if !(bin_size.is_finite() && bin_size > 0.0) {
            return Err(InputError::invalid(
                "time_interval",
                format!("bin size must be finite and > 0, got {bin_size}"),
            ));
        }
        Ok(Self {
            bin_size,
            last_time: 0.0,
            counts: Vec::new(),
            normalized: Vec::new(),
        })
    }

    /// Bin size β.
    pub fn bin_size(&self) -> f64 {
        self.bin_size
    }

    /// Samples recorded so far.
    pub fn samples(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// All bins. `normalized` is zero until [`Analysis::finalize`].
    pub fn results(&self) -> Vec<TimeStepBin> {
        self.counts
            .iter()
            .enumerate()
            .map(|(i, &count)| TimeStepBin {
                time: (i as f64 + 0.5) * self.bin_size,
                count,
                normalized: self.normalized.get(i).copied().unwrap_or(0.0),
            })
            .collect()
    }

    fn record(&mut self, dt: f64) {
        let bin = (dt / self.bin_size).floor().max(0.0) as usize;
        if bin >= self.counts.len() {
            let wanted = bin + 1;
            let grown = wanted + wanted.div_ceil(10);
            self.counts.resize(grown, 0);
        }
        self.counts[bin] += 1;
    }
}

impl Analysis for TimeStepDistribution {
    fn name(&self) -> &str {
        "time-step-distribution"
    }

    fn setup(&mut self, view: &StepView<'_>) {
        self.last_time = view.time;
        self.counts.clear();
        self.normalized.clear();
    }

    fn register_step(&mut self, view: &StepView<'_>) {
        let dt = view.time - self.last_time;
        self.last_time = view.time;
        self.record(dt);
    }

    fn finalize(&mut self) {
        let total = self.samples();
        self.normalized = if total == 0 {
            vec![0.0; self.counts.len()]
        } else {
            self.counts
                .iter()
                .map(|&c| c as f64 / total as f64)
                .collect()
        };
    }

    fn write_results(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "# time count normalized")?;
        for bin in self.results() {
            writeln!(out, "{} {} {}", bin.time, bin.count, bin.normalized)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bin_size_must_be_positive() {
        assert!(TimeStepDistribution::new(0.0).is_err());
        assert!(TimeStepDistribution::new(f64::INFINITY).is_err());
        assert!(TimeStepDistribution::new(0.1).is_ok());
    }

    #[test]
    fn histogram_grows_with_headroom() {
        let mut d = TimeStepDistribution::new(1.0).unwrap();
        d.record(0.5);
        assert_eq!(d.counts.len(), 2);
        d.record(19.5);
        // 20 bins needed, 10% headroom on top.
        assert_eq!(d.counts.len(), 22);
        d.record(21.0);
        assert_eq!(d.counts.len(), 22);
        assert_eq!(d.counts[0], 1);
        assert_eq!(d.counts[19], 1);
        assert_eq!(d.counts[21], 1);
    }

    #[test]
    fn finalize_normalizes_to_one() {
        let mut d = TimeStepDistribution::new(0.5).unwrap();
        for dt in [0.1, 0.2, 0.7, 1.6] {
            d.record(dt);
        }
        d.finalize();
        let rows = d.results();
        let sum: f64 = rows.iter().map(|b| b.normalized).sum();
        assert!((sum - 1.0).abs() < 1e-12);
        assert_eq!(rows[0].count, 2);
        assert_eq!(rows[0].normalized, 0.5);
        assert_eq!(rows[0].time, 0.25);
        assert_eq!(rows[3].time, 1.75);
    }

    #[test]
    fn empty_histogram_finalizes_cleanly() {
        let mut d = TimeStepDistribution::new(0.5).unwrap();
        d.finalize();
        assert!(d.results().is_empty());
        let mut out = Vec::new();
        d.write_results(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "# time count normalized\n");
    }
}
