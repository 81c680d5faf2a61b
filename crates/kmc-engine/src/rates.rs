//! Rate evaluation for enabled events.

use indexmap::IndexMap;
use smallvec::SmallVec;

use kmc_core::{ProcessId, TypeCode, TypeTable};
use kmc_process::{Matcher, OccupancyView, RateCalculator};

use crate::error::StepError;
use crate::metrics::RunMetrics;

type MemoKey = (ProcessId, SmallVec<[TypeCode; 16]>);

/// Source of event rates: the process rate constants, or a custom
/// calculator with an optional memo.
pub struct RateTable {
    calculator: Option<Box<dyn RateCalculator>>,
    memo: IndexMap<MemoKey, f64>,
}

impl std::fmt::Debug for RateTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateTable")
            .field("calculator", &self.calculator.as_ref().map(|c| c.name()))
            .field("memo", &self.memo.len())
            .finish()
    }
}

impl RateTable {
    /// Every event fires at its process's rate constant.
    pub fn uniform() -> Self {
        Self {
            calculator: None,
            memo: IndexMap::new(),
        }
    }

    /// Rates come from `calculator`.
    pub fn custom(calculator: Box<dyn RateCalculator>) -> Self {
        Self {
            calculator: Some(calculator),
            memo: IndexMap::new(),
        }
    }

    /// Whether rates vary per event.
    pub fn is_custom(&self) -> bool {
        self.calculator.is_some()
    }

    /// Number of memoised rates.
    pub fn memo_len(&self) -> usize {
        self.memo.len()
    }

    /// Rate of process `p` at `site`, which the caller has checked
    /// matches in `config`.
    pub fn rate<V: OccupancyView + ?Sized>(
        &mut self,
        matcher: &Matcher,
        p: ProcessId,
        site: usize,
        config: &V,
        types: &TypeTable,
        metrics: &mut RunMetrics,
    ) -> Result<f64, StepError> {
        let rate_constant = matcher.process(p).rate_constant();
        let Some(calc) = &self.calculator else {
            return Ok(rate_constant);
        };

        let key = if calc.cache_rates() {
            let key = (p, matcher.local_types(p, site, config));
            if let Some(&r) = self.memo.get(&key) {
                metrics.rate_cache_hits += 1;
                return Ok(r);
            }
            Some(key)
        } else {
            None
        };

        let ctx = matcher.rate_context(p, site, config, types);
        let value = calc.rate(&ctx);
        metrics.rate_evaluations += 1;
        let rate = calc.policy().combine(rate_constant, value);
        for v in [value, rate] {
            if !(v.is_finite() && v > 0.0) {
                return Err(StepError::PluginContract {
                    calculator: calc.name().to_string(),
                    process: p,
                    site,
                    rate: v,
                });
            }
        }
        if let Some(key) = key {
            self.memo.insert(key, rate);
        }
        Ok(rate)
    }
}
