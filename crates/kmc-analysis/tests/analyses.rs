//! Statistical behaviour of the analyses on full runs.

use kmc_analysis::{
    Composition, MsdBin, OnTheFlyMsd, ProcessStatistics, TimeStepDistribution, TypeExhausted,
};
use kmc_core::{ProcessId, SingleProcess};
use kmc_engine::{Analysis, ControlParameters, ExitReason, LatticeModel, Plugins};
use kmc_test_utils::fixtures::{chain_walker, cubic_walker, flip, ising_flip, vacancy_diffusion};

fn msd_for(
    model: &LatticeModel,
    track: &str,
    history: usize,
    n_bins: usize,
    t_max: f64,
) -> OnTheFlyMsd {
    OnTheFlyMsd::builder()
        .track_type(track)
        .history_steps(history)
        .n_bins(n_bins)
        .t_max(t_max)
        .build(model.types())
        .unwrap()
}

/// `D` from `⟨Δ²⟩ = 2Dt` by least squares through the origin, each bin
/// weighted by `1/σ²`.
fn fit_diffusion(rows: &[MsdBin], axis: usize) -> f64 {
    let (num, den) = rows
        .iter()
        .filter(|r| r.count >= 2 && r.std_error[axis] > 0.0)
        .fold((0.0, 0.0), |(num, den), r| {
            let w = 1.0 / (r.std_error[axis] * r.std_error[axis]);
            (num + w * r.time * r.msd[axis], den + w * r.time * r.time)
        });
    num / (2.0 * den)
}

fn walk(steps: u64) -> Vec<MsdBin> {
    let mut model = LatticeModel::from_record(&chain_walker(1000, 1.0, 1.0)).unwrap();
    let mut msd = msd_for(&model, "B", 200, 20, 20.0);
    model
        .run(
            &ControlParameters::new(steps, 20130904),
            Plugins::new().analysis(&mut msd),
            &SingleProcess,
        )
        .unwrap();
    msd.results()
}

#[test]
fn one_dimensional_walk_grows_as_two_d_t() {
    let rows = walk(40_000);
    for row in &rows {
        assert!(row.msd.iter().all(|m| m.is_finite()));
        assert_eq!(row.msd[1], 0.0);
        assert_eq!(row.msd[2], 0.0);
        if row.count >= 2 {
            assert!(row.std_error[0] > 0.0, "bin at {} has no spread", row.time);
        }
    }
    // D = 1: ⟨Δx²⟩ = 2t.
    for row in rows.iter().filter(|r| r.time > 2.0 && r.time < 10.0) {
        let ratio = row.msd[0] / (2.0 * row.time);
        assert!((ratio - 1.0).abs() < 0.15, "t {} msd {}", row.time, row.msd[0]);
    }
}

#[test]
fn error_of_the_mean_shrinks_as_one_over_root_pairs() {
    // The shorter run is a prefix of the longer one, with about a quarter
    // of the pairs in every bin.
    let short = walk(10_000);
    let long = walk(40_000);
    for (s, l) in short.iter().zip(&long).filter(|(s, _)| s.time < 10.0) {
        assert!(l.count > 3 * s.count, "bin at {}", s.time);
        let shrink = s.std_error[0] / l.std_error[0];
        let expected = (l.count as f64 / s.count as f64).sqrt();
        assert!(
            (shrink / expected - 1.0).abs() < 0.12,
            "bin at {}: σ shrank {shrink:.3}, √n grew {expected:.3}",
            s.time
        );
        let total = l.std_dev[0] / (l.count as f64).sqrt();
        assert!((l.std_error[0] - total).abs() <= 1e-12 * total);
    }
}

#[test]
fn drifting_vacancy_spreads_fastest_along_the_bias() {
    let mut model = LatticeModel::from_record(&vacancy_diffusion(
        10,
        1000,
        [1.0, 1.0, 1.0, 1.0, 0.9, 1.1],
    ))
    .unwrap();
    assert_eq!(model.configuration().particles_per_type()[2], 1);
    let mut msd = msd_for(&model, "V", 200, 100, 100.0);
    model
        .run(
            &ControlParameters::new(300_000, 1994669),
            Plugins::new().analysis(&mut msd),
            &SingleProcess,
        )
        .unwrap();

    let rows = msd.results();
    assert!(rows.iter().all(|r| r.msd.iter().all(|m| m.is_finite())));
    let late: Vec<_> = rows[20..30].iter().filter(|r| r.count > 0).collect();
    assert!(!late.is_empty());
    let mean = |k: usize| late.iter().map(|r| r.msd[k]).sum::<f64>() / late.len() as f64;
    let t = late.iter().map(|r| r.time).sum::<f64>() / late.len() as f64;
    // Unbiased axes: 2t. The z axis adds the drift term (0.2 t)².
    for k in 0..2 {
        let ratio = mean(k) / (2.0 * t);
        assert!((ratio - 1.0).abs() < 0.3, "axis {k} ratio {ratio}");
    }
    assert!(mean(2) > mean(0));
    assert!(mean(2) > mean(1));
    // Roughly linear: doubling the lag roughly doubles the x MSD.
    let early = rows[10].msd[0];
    let later = rows[21].msd[0];
    assert!(later / early > 1.5 && later / early < 2.7);

    // Regression values for this seed with the ChaCha8 stream.
    let expected = [
        (0..16, [1.0258522932914098, 1.0362486146177128, 1.2361740342857321]),
        (16..30, [1.0105761246253182, 0.9955841341203846, 1.5209233442335555]),
    ];
    for (bins, d) in expected {
        for (k, want) in d.into_iter().enumerate() {
            let got = fit_diffusion(&rows[bins.clone()], k);
            assert!((got - want).abs() < 1e-9, "bins {bins:?} axis {k}: D = {got}");
        }
    }
}

#[test]
fn waiting_times_are_exponential() {
    let rates = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6];
    let total: f64 = rates.iter().sum();
    let mut model = LatticeModel::from_record(&cubic_walker(10, rates)).unwrap();
    assert!((model.total_rate() - total).abs() < 1e-12);
    let beta = 0.001;
    let mut dist = TimeStepDistribution::new(beta).unwrap();
    model
        .run(
            &ControlParameters::new(1_000_000, 2013),
            Plugins::new().analysis(&mut dist),
            &SingleProcess,
        )
        .unwrap();

    assert_eq!(dist.samples(), 1_000_000);
    let bins = dist.results();
    let covered: f64 = bins
        .iter()
        .map(|b| (b.normalized - total * beta * (-total * b.time).exp()).abs())
        .sum();
    let end = bins.len() as f64 * beta;
    // Analytic mass past the last bin.
    let tail = (-total * end).exp();
    assert!(covered + tail < 0.05, "L1 error {}", covered + tail);
}

#[test]
fn firing_frequency_matches_rate_share() {
    let mut model = LatticeModel::from_record(&chain_walker(50, 1.0, 0.5)).unwrap();
    let mut stats = ProcessStatistics::new(vec![ProcessId(0), ProcessId(1)], 100.0)
        .unwrap()
        .per_site(true);
    let summary = model
        .run(
            &ControlParameters::new(30_000, 7),
            Plugins::new().analysis(&mut stats),
            &SingleProcess,
        )
        .unwrap();

    let totals = stats.totals();
    assert_eq!(totals.iter().sum::<u64>(), 30_000);
    let right = totals[0] as f64 / summary.time;
    let left = totals[1] as f64 / summary.time;
    assert!((right - 1.0).abs() < 0.05, "right {right}");
    assert!((left - 0.5).abs() < 0.05, "left {left}");
    let site_total: f64 = stats.site_rates().unwrap().iter().sum();
    assert!((site_total - 1.5).abs() < 0.05);
}

#[test]
fn composition_follows_a_flipping_site() {
    let mut model = LatticeModel::from_record(&ising_flip()).unwrap();
    let mut comp = Composition::new(1000.0).unwrap();
    model
        .run(
            &ControlParameters::new(100_000, 5),
            Plugins::new().analysis(&mut comp),
            &SingleProcess,
        )
        .unwrap();
    let rows = comp.results();
    assert!(!rows.is_empty());
    let up: f64 = rows.iter().map(|r| r.fraction[0] * r.samples as f64).sum::<f64>()
        / rows.iter().map(|r| r.samples as f64).sum::<f64>();
    assert!((up - 0.5).abs() < 0.02, "up fraction {up}");
}

#[test]
fn exhausted_type_stops_the_run() {
    // U decays irreversibly into D.
    let mut record = ising_flip();
    record.interactions.processes = vec![flip("U", "D", 1.0)];
    let mut model = LatticeModel::from_record(&record).unwrap();
    let mut breaker = TypeExhausted::new("U", model.types()).unwrap();
    let summary = model
        .run(
            &ControlParameters::new(10, 1),
            Plugins::new().breaker(&mut breaker),
            &SingleProcess,
        )
        .unwrap();
    assert_eq!(
        summary.reason,
        ExitReason::Breaker {
            name: "type-exhausted:U".into()
        }
    );
    assert_eq!(summary.steps, 1);
}

#[test]
fn results_replay_bit_for_bit() {
    let run = || {
        let mut model = LatticeModel::from_record(&chain_walker(100, 1.0, 1.0)).unwrap();
        let mut msd = msd_for(&model, "B", 50, 10, 10.0);
        let mut dist = TimeStepDistribution::new(0.01).unwrap();
        model
            .run(
                &ControlParameters::new(2000, 1994669),
                Plugins::new().analysis(&mut msd).analysis(&mut dist),
                &SingleProcess,
            )
            .unwrap();
        let mut out = Vec::new();
        msd.write_results(&mut out).unwrap();
        dist.write_results(&mut out).unwrap();
        out
    };
    assert_eq!(run(), run());
}
