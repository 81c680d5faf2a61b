//! Firing counts per process, time window and site.

use std::io::{self, Write};

use tracing::debug;

use kmc_core::{InputError, ProcessId};
use kmc_engine::{Analysis, StepView};

use crate::window;

/// Firings of the processes of interest within one time window.
#[derive(Clone, Debug, PartialEq)]
pub struct ProcessWindow {
    /// Window start time.
    pub start: f64,
    /// Firings per process of interest, in the order they were given.
    pub counts: Vec<u64>,
}

/// Counts firings of selected processes per window of length τ,
/// measured from the time at `setup`.
///
/// With [`per_site`](Self::per_site) enabled it also counts firings per
/// centre site; [`site_rates`](Self::site_rates) divides those by the
/// elapsed simulation time once the run is finalized.
#[derive(Debug)]
pub struct ProcessStatistics {
    processes: Vec<ProcessId>,
    window: f64,
    per_site: bool,
    start: f64,
    last_time: f64,
    windows: Vec<Vec<u64>>,
    site_counts: Vec<u64>,
    site_rates: Option<Vec<f64>>,
}

impl ProcessStatistics {
    /// Track `processes` over windows of length `window`.
    ///
    /// The process list must be non-empty without repeats; the window
    /// must be finite and positive.
    pub fn new(processes: Vec<ProcessId>, window: f64) -> Result<Self, InputError> {
        let window = window::check_length("process_statistics", window)?;
        if processes.is_empty() {
            return Err(InputError::invalid(
                "process_statistics",
                "at least one process is required",
            ));
        }
        for (i, p) in processes.iter().enumerate() {
            if processes[..i].contains(p) {
                return Err(InputError::invalid(
                    "process_statistics",
                    format!("process {} listed twice", p.index()),
                ));
            }
        }
        Ok(Self {
            processes,
            window,
            per_site: false,
            start: 0.0,
            last_time: 0.0,
            windows: Vec::new(),
            site_counts: Vec::new(),
            site_rates: None,
        })
    }

    /// Also count firings per site.
    pub fn per_site(mut self, on: bool) -> Self {
        self.per_site = on;
        self
    }

    /// The processes of interest.
    pub fn processes(&self) -> &[ProcessId] {
        &self.processes
    }

    /// Windows seen so far, in time order. Windows with no firing of a
    /// process of interest report zeros.
    pub fn windows(&self) -> Vec<ProcessWindow> {
        self.windows
            .iter()
            .enumerate()
            .map(|(w, counts)| ProcessWindow {
                start: self.start + w as f64 * self.window,
                counts: if counts.is_empty() {
                    vec![0; self.processes.len()]
                } else {
                    counts.clone()
                },
            })
            .collect()
    }

    /// Total firings per process of interest.
    pub fn totals(&self) -> Vec<u64> {
        let mut totals = vec![0; self.processes.len()];
        for counts in &self.windows {
            for (t, c) in totals.iter_mut().zip(counts) {
                *t += c;
            }
        }
        totals
    }

    /// Raw per-site counts (empty unless per-site counting is on).
    pub fn site_counts(&self) -> &[u64] {
        &self.site_counts
    }

    /// Per-site firing rates, available after finalize when per-site
    /// counting is on.
    pub fn site_rates(&self) -> Option<&[f64]> {
        self.site_rates.as_deref()
    }
}

impl Analysis for ProcessStatistics {
    fn name(&self) -> &str {
        "process-statistics"
    }

    fn setup(&mut self, view: &StepView<'_>) {
        self.start = view.time;
        self.last_time = view.time;
        self.windows.clear();
        self.site_rates = None;
        self.site_counts = if self.per_site {
            vec![0; view.configuration.site_count()]
        } else {
            Vec::new()
        };
    }

    fn register_step(&mut self, view: &StepView<'_>) {
        self.last_time = view.time;
        let Some((process, site)) = view.last_event else {
            return;
        };
        let Some(k) = self.processes.iter().position(|&p| p == process) else {
            return;
        };
        let w = window::index(self.start, self.window, view.time);
        let counts = window::slot(&mut self.windows, w);
        if counts.is_empty() {
            counts.resize(self.processes.len(), 0);
        }
        counts[k] += 1;
        if let Some(c) = self.site_counts.get_mut(site) {
            *c += 1;
        }
    }

    fn finalize(&mut self) {
        if self.per_site {
            let elapsed = self.last_time - self.start;
            self.site_rates = Some(
                self.site_counts
                    .iter()
                    .map(|&c| if elapsed > 0.0 { c as f64 / elapsed } else { 0.0 })
                    .collect(),
            );
        }
        debug!(
            windows = self.windows.len(),
            firings = self.totals().iter().sum::<u64>(),
            "process statistics finalized"
        );
    }

    /// One row per window: start time, then the count of each process
    /// of interest.
    fn write_results(&self, out: &mut dyn Write) -> io::Result<()> {
        write!(out, "# time")?;
        for p in &self.processes {
            write!(out, " process_{}", p.index())?;
        }
        writeln!(out)?;
        for w in self.windows() {
            write!(out, "{}", w.start)?;
            for c in &w.counts {
                write!(out, " {c}")?;
            }
            writeln!(out)?;
        }
        Ok(())
    }
}
