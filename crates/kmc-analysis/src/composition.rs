//! Mean particle count per type over time windows.

use std::io::{self, Write};

use kmc_core::InputError;
use kmc_engine::{Analysis, StepView};

use crate::window;

/// Composition averaged over one time window.
#[derive(Clone, Debug, PartialEq)]
pub struct CompositionWindow {
    /// Window start time.
    pub start: f64,
    /// Callbacks that fell in the window.
    pub samples: u64,
    /// Mean count per declared type, in declaration order.
    pub mean: Vec<f64>,
    /// `mean` divided by its sum.
    pub fraction: Vec<f64>,
}

#[derive(Clone, Debug, Default)]
struct Sums {
    samples: u64,
    counts: Vec<u64>,
}

/// Samples `particles_per_type` at setup and every callback, averaging
/// per window of length τ measured from the setup time.
#[derive(Debug)]
pub struct Composition {
    window: f64,
    start: f64,
    names: Vec<String>,
    windows: Vec<Sums>,
}

impl Composition {
    /// Average over windows of length `window`.
    pub fn new(window: f64) -> Result<Self, InputError> {
        Ok(Self {
            window: window::check_length("composition", window)?,
            start: 0.0,
            names: Vec::new(),
            windows: Vec::new(),
        })
    }

    /// Declared type names, captured at setup.
    pub fn type_names(&self) -> &[String] {
        &self.names
    }

    /// Windows seen so far. Windows without samples are skipped.
    pub fn results(&self) -> Vec<CompositionWindow> {
        self.windows
            .iter()
            .enumerate()
            .filter(|(_, s)| s.samples > 0)
            .map(|(w, s)| {
                let mean: Vec<f64> = s
                    .counts
                    .iter()
                    .map(|&c| c as f64 / s.samples as f64)
                    .collect();
                let total: f64 = mean.iter().sum();
                let fraction = mean
                    .iter()
                    .map(|&m| if total > 0.0 { m / total } else { 0.0 })
                    .collect();
                CompositionWindow {
                    start: self.start + w as f64 * self.window,
                    samples: s.samples,
                    mean,
                    fraction,
                }
            })
            .collect()
    }

    fn sample(&mut self, view: &StepView<'_>) {
        let per_type = view.configuration.particles_per_type();
        let w = window::index(self.start, self.window, view.time);
        let sums = window::slot(&mut self.windows, w);
        if sums.counts.is_empty() {
            sums.counts.resize(self.names.len(), 0);
        }
        // Declared codes are 1..=n; code 0 is the wildcard.
        for (i, c) in sums.counts.iter_mut().enumerate() {
            *c += per_type[i + 1];
        }
        sums.samples += 1;
    }
}

impl Analysis for Composition {
    fn name(&self) -> &str {
        "composition"
    }

    fn setup(&mut self, view: &StepView<'_>) {
        self.start = view.time;
        self.names = view.types.declared().map(|(_, n)| n.to_string()).collect();
        self.windows.clear();
        self.sample(view);
    }

    fn register_step(&mut self, view: &StepView<'_>) {
        self.sample(view);
    }

    fn write_results(&self, out: &mut dyn Write) -> io::Result<()> {
        write!(out, "# time samples")?;
        for n in &self.names {
            write!(out, " {n}")?;
        }
        writeln!(out)?;
        for w in self.results() {
            write!(out, "{} {}", w.start, w.samples)?;
            for f in &w.fraction {
                write!(out, " {f}")?;
            }
            writeln!(out)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kmc_engine::LatticeModel;
    use kmc_test_utils::fixtures::ising_flip;
    use kmc_test_utils::view_of;

    #[test]
    fn window_must_be_positive() {
        assert!(Composition::new(-1.0).is_err());
    }

    #[test]
    fn averages_per_window() {
        let mut model = LatticeModel::from_record(&ising_flip()).unwrap();
        let mut c = Composition::new(1.0).unwrap();
        c.setup(&view_of(&model, 0, 0.0, None));
        model.set_type_at(0, "D").unwrap();
        model.set_time(0.5);
        c.register_step(&view_of(&model, 1, 0.5, None));
        model.set_time(2.5);
        c.register_step(&view_of(&model, 2, 2.0, None));

        assert_eq!(c.type_names(), &["U".to_string(), "D".to_string()]);
        let rows = c.results();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].samples, 2);
        assert_eq!(rows[0].mean, vec![0.5, 0.5]);
        assert_eq!(rows[0].fraction, vec![0.5, 0.5]);
        assert_eq!(rows[1].start, 2.0);
        assert_eq!(rows[1].fraction, vec![0.0, 1.0]);
    }
}
