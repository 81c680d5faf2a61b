//! The lattice model and its step function.

use tracing::{debug, info};

use kmc_core::{KmcRng, ModelRecord, ProcessId, TypeCode, TypeTable};
use kmc_lattice::Lattice;
use kmc_process::{Change, Matcher, OccupancyView, RateCalculator, SiteWrite};

use crate::configuration::{Configuration, ParticleMove};
use crate::error::{ModelError, StepError};
use crate::events::EnabledEvents;
use crate::metrics::RunMetrics;
use crate::overlay::Pending;
use crate::rates::RateTable;

/// Event changes computed but not yet applied.
type Staged = Vec<(ProcessId, usize, Option<f64>)>;

/// What one step did.
#[derive(Clone, Debug, PartialEq)]
pub struct StepOutcome {
    /// Waiting time drawn for this step.
    pub dt: f64,
    /// The process that fired.
    pub process: ProcessId,
    /// Its centre site.
    pub site: usize,
    /// Tracked particle moves.
    pub moves: Vec<ParticleMove>,
}

/// Compiled processes, configuration and enabled events of one
/// simulation.
///
/// The model is the only owner of its mutable state; the step function
/// is the only mutator once the model is built.
#[derive(Debug)]
pub struct LatticeModel {
    types: TypeTable,
    matcher: Matcher,
    configuration: Configuration,
    events: EnabledEvents,
    rates: RateTable,
    metrics: RunMetrics,
    time: f64,
    steps: u64,
    /// Last refresh generation that visited each site.
    stamps: Vec<u32>,
    generation: u32,
}

impl LatticeModel {
    /// Build a model whose events fire at their process rate constants.
    pub fn from_record(record: &ModelRecord) -> Result<Self, ModelError> {
        Self::build(record, RateTable::uniform())
    }

    /// Build a model whose rates come from `calculator`.
    pub fn with_rate_calculator(
        record: &ModelRecord,
        calculator: Box<dyn RateCalculator>,
    ) -> Result<Self, ModelError> {
        Self::build(record, RateTable::custom(calculator))
    }

    fn build(record: &ModelRecord, rates: RateTable) -> Result<Self, ModelError> {
        let types = TypeTable::new(record.configuration.possible_types.iter().cloned())?;
        let lattice = Lattice::from_record(&record.lattice)?;
        let bucket = record.is_bucket();
        let configuration =
            Configuration::from_record(&record.configuration, &types, &lattice, bucket)?;
        let matcher = Matcher::compile(&record.interactions, lattice, &types, bucket)?;

        let rate_constants: Vec<f64> = matcher
            .processes()
            .iter()
            .map(|p| p.rate_constant())
            .collect();
        let events = EnabledEvents::new(&rate_constants, rates.is_custom());
        let n = configuration.site_count();

        let mut model = Self {
            types,
            matcher,
            configuration,
            events,
            rates,
            metrics: RunMetrics::default(),
            time: 0.0,
            steps: 0,
            stamps: vec![0; n],
            generation: 0,
        };
        model.rebuild_events()?;
        info!(
            sites = n,
            processes = model.matcher.process_count(),
            radius = model.matcher.table().radius(),
            enabled = model.events.len(),
            total_rate = model.events.total(),
            bucket,
            "lattice model built"
        );
        Ok(model)
    }

    // ── Accessors ──────────────────────────────────────────────────

    /// Type names and codes.
    pub fn types(&self) -> &TypeTable {
        &self.types
    }

    /// The lattice.
    pub fn lattice(&self) -> &Lattice {
        self.matcher.lattice()
    }

    /// Compiled processes.
    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    /// Current configuration.
    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    /// Enabled events.
    pub fn events(&self) -> &EnabledEvents {
        &self.events
    }

    /// Sum of all enabled event rates.
    pub fn total_rate(&self) -> f64 {
        self.events.total()
    }

    /// Simulation time.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Set the simulation time.
    pub fn set_time(&mut self, time: f64) {
        self.time = time;
    }

    /// Steps fired since the model was built.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Cumulative counters.
    pub fn metrics(&self) -> &RunMetrics {
        &self.metrics
    }

    pub(crate) fn metrics_mut(&mut self) -> &mut RunMetrics {
        &mut self.metrics
    }

    // ── Mutation ───────────────────────────────────────────────────

    /// Overwrite a site's type (single mode) and refresh the events
    /// around it. On error nothing changes.
    pub fn set_type_at(&mut self, site: usize, name: &str) -> Result<(), ModelError> {
        let t = self.types.code(name)?;
        let old = self.configuration.check_type_write(site, t)?;
        if old == t {
            return Ok(());
        }
        let change = Change::Single {
            writes: vec![SiteWrite {
                site,
                before: old,
                after: t,
            }],
            moves: Vec::new(),
        };
        let staged = {
            let (mut refresher, configuration) = self.split();
            refresher.stage(&[site], &Pending::new(configuration, &change))?
        };
        self.configuration.set_type_at(site, t)?;
        self.commit(staged);
        Ok(())
    }

    /// Fire one event.
    ///
    /// Returns `Ok(None)` without drawing when no event is enabled. The
    /// refreshed rates are evaluated before the firing is committed, so
    /// on error the configuration, events, time and step count are as
    /// before the call (the two draws are still consumed).
    pub fn step(&mut self, rng: &mut KmcRng) -> Result<Option<StepOutcome>, StepError> {
        let total = self.events.total();
        if !(total > 0.0) {
            return Ok(None);
        }
        let dt = rng.exponential(total);
        let u = rng.uniform_below(total);
        let Some((process, site)) = self.events.select(u) else {
            return Ok(None);
        };

        let firing = self.matcher.plan_firing(process, site, &self.configuration);
        let staged = {
            let (mut refresher, configuration) = self.split();
            let view = Pending::new(configuration, &firing.change);
            refresher.stage(&firing.affected_sites(), &view)?
        };
        let moves = self.configuration.apply(&firing);
        self.commit(staged);
        self.events.record_firing();

        self.time += dt;
        self.steps += 1;
        self.metrics.steps += 1;
        Ok(Some(StepOutcome {
            dt,
            process,
            site,
            moves,
        }))
    }

    fn split(&mut self) -> (Refresher<'_>, &Configuration) {
        let Self {
            types,
            matcher,
            configuration,
            events,
            rates,
            metrics,
            stamps,
            generation,
            ..
        } = self;
        let refresher = Refresher {
            matcher,
            types,
            events,
            rates,
            metrics,
            stamps,
            generation,
        };
        (refresher, &*configuration)
    }

    fn commit(&mut self, staged: Staged) {
        for (p, site, rate) in staged {
            self.events.set(p, site, rate);
        }
    }

    /// Drop and recompute every enabled event from scratch.
    pub fn rebuild_events(&mut self) -> Result<(), StepError> {
        self.events.clear();
        for s in 0..self.configuration.site_count() {
            for &p in self.matcher.processes_at(s) {
                self.metrics.matcher_queries += 1;
                if self.matcher.matches(p, s, &self.configuration) {
                    let rate = self.rates.rate(
                        &self.matcher,
                        p,
                        s,
                        &self.configuration,
                        &self.types,
                        &mut self.metrics,
                    )?;
                    self.events.set(p, s, Some(rate));
                }
            }
        }
        debug!(enabled = self.events.len(), "enabled events rebuilt");
        Ok(())
    }

    /// Type name at a site.
    pub fn type_name_at(&self, site: usize) -> &str {
        self.types.name(self.configuration.type_at(site))
    }

    /// Per-type counts keyed by name, declared types only.
    pub fn composition(&self) -> Vec<(&str, u64)> {
        let counts = self.configuration.particles_per_type();
        self.types
            .declared()
            .map(|(t, name): (TypeCode, &str)| (name, counts[t.index()]))
            .collect()
    }
}

/// The parts of a model an event refresh reads or counts into, borrowed
/// apart from the configuration.
struct Refresher<'m> {
    matcher: &'m Matcher,
    types: &'m TypeTable,
    events: &'m EnabledEvents,
    rates: &'m mut RateTable,
    metrics: &'m mut RunMetrics,
    stamps: &'m mut [u32],
    generation: &'m mut u32,
}

impl Refresher<'_> {
    /// Re-query every process centred within the neighbourhood of any
    /// site in `changed`, as seen through `view`, and return the event
    /// changes without applying them.
    fn stage<V: OccupancyView + ?Sized>(
        &mut self,
        changed: &[usize],
        view: &V,
    ) -> Result<Staged, StepError> {
        *self.generation = self.generation.wrapping_add(1);
        if *self.generation == 0 {
            self.stamps.fill(0);
            *self.generation = 1;
        }
        let generation = *self.generation;
        let matcher = self.matcher;
        let table = matcher.table();
        let mut staged = Vec::new();
        for &a in changed {
            for s in table.neighbours(a).flatten() {
                if self.stamps[s] == generation {
                    continue;
                }
                self.stamps[s] = generation;
                for &p in matcher.processes_at(s) {
                    self.metrics.matcher_queries += 1;
                    let enabled = self.events.contains(p, s);
                    let rate = if matcher.matches(p, s, view) {
                        if enabled && !self.rates.is_custom() {
                            continue;
                        }
                        Some(self.rates.rate(matcher, p, s, view, self.types, self.metrics)?)
                    } else if enabled {
                        None
                    } else {
                        continue;
                    };
                    staged.push((p, s, rate));
                }
            }
        }
        Ok(staged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kmc_core::{
        ConfigurationRecord, InteractionsRecord, LatticeRecord, ProcessRecord, RngType,
        UnitCellRecord,
    };
    use kmc_process::{RateContext, RatePolicy};
    use proptest::prelude::*;

    fn chain_record(types: &[&str], processes: Vec<ProcessRecord>) -> ModelRecord {
        ModelRecord {
            lattice: LatticeRecord {
                unit_cell: UnitCellRecord {
                    cell_vectors: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
                    basis_points: vec![[0.0, 0.0, 0.0]],
                },
                repetitions: [types.len() as u32, 1, 1],
                periodic: [true, true, true],
            },
            configuration: ConfigurationRecord {
                types: types.iter().map(|&t| t.into()).collect(),
                possible_types: vec!["A".into(), "V".into()],
            },
            interactions: InteractionsRecord {
                processes,
                implicit_wildcards: true,
                cutoff: None,
            },
        }
    }

    fn hop(dx: f64, rate: f64) -> ProcessRecord {
        ProcessRecord {
            coordinates: vec![[0.0, 0.0, 0.0], [dx, 0.0, 0.0]],
            elements_before: vec!["A".into(), "V".into()],
            elements_after: Some(vec!["V".into(), "A".into()]),
            update: None,
            move_vectors: vec![(0, [dx, 0.0, 0.0])],
            basis_sites: vec![0],
            rate_constant: rate,
        }
    }

    /// Recompute the enabled set from scratch and compare.
    fn assert_events_fresh(model: &LatticeModel) {
        let m = model.matcher();
        let mut expected = 0.0;
        for s in 0..model.configuration().site_count() {
            for &p in m.processes_at(s) {
                let on = m.matches(p, s, model.configuration());
                assert_eq!(on, model.events().contains(p, s), "process {p} site {s}");
                if on {
                    expected += model.events().rate(p, s).unwrap();
                }
            }
        }
        assert!((model.total_rate() - expected).abs() < 1e-9);
    }

    #[test]
    fn initial_events_match_the_configuration() {
        let record = chain_record(&["A", "V", "A", "A"], vec![hop(1.0, 1.0), hop(-1.0, 2.0)]);
        let model = LatticeModel::from_record(&record).unwrap();
        // Site 0 can hop right, site 2 can hop left.
        assert!(model.events().contains(ProcessId(0), 0));
        assert!(model.events().contains(ProcessId(1), 2));
        assert_eq!(model.events().len(), 2);
        assert!((model.total_rate() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn step_advances_time_and_moves_the_vacancy() {
        let record = chain_record(&["A", "V", "A", "A"], vec![hop(1.0, 1.0), hop(-1.0, 1.0)]);
        let mut model = LatticeModel::from_record(&record).unwrap();
        let mut rng = KmcRng::new(RngType::ChaCha8, 5);
        let out = model.step(&mut rng).unwrap().unwrap();
        assert!(out.dt > 0.0);
        assert_eq!(model.time(), out.dt);
        assert_eq!(model.steps(), 1);
        assert_eq!(out.moves.len(), 1);
        assert_eq!(model.configuration().sites_of_type(TypeCode(2)).len(), 1);
        assert_events_fresh(&model);
    }

    #[test]
    fn stuck_model_returns_none() {
        let record = chain_record(&["A", "A", "A"], vec![hop(1.0, 1.0)]);
        let mut model = LatticeModel::from_record(&record).unwrap();
        assert_eq!(model.total_rate(), 0.0);
        let mut rng = KmcRng::new(RngType::ChaCha8, 5);
        assert_eq!(model.step(&mut rng).unwrap(), None);
        assert_eq!(model.steps(), 0);
    }

    #[test]
    fn set_type_at_refreshes_events() {
        let record = chain_record(&["A", "A", "A"], vec![hop(1.0, 1.0)]);
        let mut model = LatticeModel::from_record(&record).unwrap();
        model.set_type_at(1, "V").unwrap();
        assert!(model.events().contains(ProcessId(0), 0));
        assert_events_fresh(&model);
        assert!(model.set_type_at(1, "Q").is_err());
    }

    struct Doubler;

    impl RateCalculator for Doubler {
        fn name(&self) -> &str {
            "doubler"
        }
        fn rate(&self, ctx: &RateContext<'_>) -> f64 {
            2.0 * ctx.rate_constant
        }
        fn cache_rates(&self) -> bool {
            true
        }
    }

    struct Broken;

    impl RateCalculator for Broken {
        fn name(&self) -> &str {
            "broken"
        }
        fn policy(&self) -> RatePolicy {
            RatePolicy::Additive
        }
        fn rate(&self, _ctx: &RateContext<'_>) -> f64 {
            -10.0
        }
    }

    struct Lowering;

    impl RateCalculator for Lowering {
        fn name(&self) -> &str {
            "lowering"
        }
        fn policy(&self) -> RatePolicy {
            RatePolicy::Additive
        }
        fn rate(&self, _ctx: &RateContext<'_>) -> f64 {
            -0.5
        }
    }

    #[test]
    fn additive_negative_value_is_rejected_even_when_the_sum_is_positive() {
        let err = LatticeModel::with_rate_calculator(
            &chain_record(&["A", "V"], vec![hop(1.0, 1.0)]),
            Box::new(Lowering),
        )
        .unwrap_err();
        match err {
            ModelError::Step(StepError::PluginContract {
                calculator, rate, ..
            }) => {
                assert_eq!(calculator, "lowering");
                assert_eq!(rate, -0.5);
            }
            other => panic!("expected a plugin contract error, got {other:?}"),
        }
    }

    /// Valid for the first `limit` evaluations, NaN afterwards.
    struct FailsAfter {
        limit: u32,
        calls: std::cell::Cell<u32>,
    }

    impl RateCalculator for FailsAfter {
        fn name(&self) -> &str {
            "fails-after"
        }
        fn rate(&self, _ctx: &RateContext<'_>) -> f64 {
            let n = self.calls.get() + 1;
            self.calls.set(n);
            if n > self.limit { f64::NAN } else { 1.0 }
        }
    }

    fn snapshot(model: &LatticeModel) -> (Vec<String>, Vec<(ProcessId, usize, f64)>) {
        let types = (0..model.configuration().site_count())
            .map(|s| model.type_name_at(s).to_string())
            .collect();
        let mut events = Vec::new();
        for s in 0..model.configuration().site_count() {
            for &p in model.matcher().processes_at(s) {
                if let Some(r) = model.events().rate(p, s) {
                    events.push((p, s, r));
                }
            }
        }
        (types, events)
    }

    #[test]
    fn failed_refresh_leaves_the_model_unchanged() {
        let record = chain_record(&["A", "V", "A", "A"], vec![hop(1.0, 1.0), hop(-1.0, 1.0)]);
        // Construction evaluates the two initial events; the first step's
        // refresh needs a third evaluation.
        let calc = FailsAfter {
            limit: 2,
            calls: std::cell::Cell::new(0),
        };
        let mut model = LatticeModel::with_rate_calculator(&record, Box::new(calc)).unwrap();
        let before = snapshot(&model);
        let total = model.total_rate();

        let mut rng = KmcRng::new(RngType::ChaCha8, 5);
        let err = model.step(&mut rng).unwrap_err();
        assert!(
            matches!(err, StepError::PluginContract { ref calculator, .. } if calculator == "fails-after"),
            "{err:?}"
        );
        assert_eq!(snapshot(&model), before);
        assert_eq!(model.total_rate(), total);
        assert_eq!(model.steps(), 0);
        assert_eq!(model.time(), 0.0);
        assert_events_fresh(&model);

        // A failed overwrite leaves the model alone too.
        let err = model.set_type_at(3, "V").unwrap_err();
        assert!(matches!(err, ModelError::Step(StepError::PluginContract { .. })));
        assert_eq!(snapshot(&model), before);
        assert_events_fresh(&model);
    }

    #[test]
    fn custom_rates_replace_and_memoise() {
        let model = LatticeModel::with_rate_calculator(
            &chain_record(&["A", "V", "A", "V"], vec![hop(1.0, 1.5)]),
            Box::new(Doubler),
        )
        .unwrap();
        assert!((model.total_rate() - 6.0).abs() < 1e-12);
        assert_eq!(model.metrics().rate_evaluations, 1);
        assert_eq!(model.metrics().rate_cache_hits, 1);
    }

    #[test]
    fn broken_calculator_is_a_plugin_contract_error() {
        let err = LatticeModel::with_rate_calculator(
            &chain_record(&["A", "V"], vec![hop(1.0, 1.0)]),
            Box::new(Broken),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ModelError::Step(StepError::PluginContract { .. })
        ));
    }

    #[test]
    fn composition_lists_declared_types() {
        let record = chain_record(&["A", "V", "A"], vec![hop(1.0, 1.0)]);
        let model = LatticeModel::from_record(&record).unwrap();
        assert_eq!(model.composition(), vec![("A", 2), ("V", 1)]);
        assert_eq!(model.type_name_at(1), "V");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn events_stay_fresh_and_particles_are_conserved(
            seed in any::<u64>(),
            steps in 1usize..60,
            layout in prop::collection::vec(prop::bool::ANY, 6..12),
        ) {
            let names: Vec<&str> = layout.iter().map(|&v| if v { "V" } else { "A" }).collect();
            let mut model = LatticeModel::from_record(
                &chain_record(&names, vec![hop(1.0, 1.0), hop(-1.0, 0.7)]),
            ).unwrap();
            let before = model.configuration().particles_per_type().to_vec();
            let mut rng = KmcRng::new(RngType::ChaCha8, seed);
            for _ in 0..steps {
                let Some(out) = model.step(&mut rng).unwrap() else { break };
                for mv in &out.moves {
                    let c = model.configuration();
                    prop_assert_eq!(c.id_at(mv.to), Some(mv.id));
                    prop_assert_eq!(c.type_of(mv.id), Some(c.type_at(mv.to)));
                }
            }
            assert_events_fresh(&model);
            prop_assert_eq!(model.configuration().particles_per_type(), before.as_slice());
        }
    }
}
