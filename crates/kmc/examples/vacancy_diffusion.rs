//! Vacancy diffusion on a simple cubic oxygen lattice.
//!
//! ```text
//! RUST_LOG=info cargo run -p kmc --example vacancy_diffusion [model.json] [out_dir]
//! ```
//!
//! Without a model file a 10×10×10 box with one vacancy is built in code.
//! Results go to `out_dir` (default: `kmc-output`).

use std::error::Error;
use std::path::PathBuf;

use kmc::prelude::*;
use tracing_subscriber::EnvFilter;

const DIRECTIONS: [[f64; 3]; 6] = [
    [1.0, 0.0, 0.0],
    [-1.0, 0.0, 0.0],
    [0.0, 1.0, 0.0],
    [0.0, -1.0, 0.0],
    [0.0, 0.0, 1.0],
    [0.0, 0.0, -1.0],
];

fn built_in_model() -> ModelRecord {
    let n = 10;
    let mut types = vec![Occupancy::from("O"); n * n * n];
    types[0] = Occupancy::from("V");
    let rates = [1.0, 1.0, 1.0, 1.0, 0.9, 1.1];
    let processes = DIRECTIONS
        .iter()
        .zip(rates)
        .map(|(&d, rate)| ProcessRecord {
            coordinates: vec![[0.0; 3], d],
            elements_before: vec!["V".into(), "O".into()],
            elements_after: Some(vec!["O".into(), "V".into()]),
            update: None,
            move_vectors: vec![(0, d)],
            basis_sites: vec![0],
            rate_constant: rate,
        })
        .collect();
    ModelRecord {
        lattice: LatticeRecord {
            unit_cell: UnitCellRecord {
                cell_vectors: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
                basis_points: vec![[0.0; 3]],
            },
            repetitions: [n as u32; 3],
            periodic: [true; 3],
        },
        configuration: ConfigurationRecord {
            types,
            possible_types: vec!["O".into(), "V".into()],
        },
        interactions: InteractionsRecord {
            processes,
            implicit_wildcards: true,
            cutoff: None,
        },
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let record = match args.next() {
        Some(path) => load_record(path)?,
        None => built_in_model(),
    };
    let out_dir = PathBuf::from(args.next().unwrap_or_else(|| "kmc-output".into()));
    std::fs::create_dir_all(&out_dir)?;

    let mut model = LatticeModel::from_record(&record)?;
    let mut msd = OnTheFlyMsd::builder()
        .track_type("V")
        .history_steps(200)
        .n_bins(100)
        .t_max(100.0)
        .build(model.types())?;
    let mut dist = TimeStepDistribution::new(0.01)?;
    let processes = (0..model.matcher().process_count() as u32)
        .map(ProcessId)
        .collect();
    let mut stats = ProcessStatistics::new(processes, 100.0)?;
    let mut sink = ScriptTrajectory::create(out_dir.join("trajectory.traj"))?;

    let mut control = ControlParameters::new(300_000, 1994669);
    control.dump_interval = 10_000;
    let summary = model.run(
        &control,
        Plugins::new()
            .analysis(&mut msd)
            .analysis(&mut dist)
            .analysis(&mut stats)
            .sink(&mut sink),
        &SingleProcess,
    )?;

    write_results(&msd, out_dir.join("msd.txt"), &SingleProcess)?;
    write_results(&dist, out_dir.join("time_steps.txt"), &SingleProcess)?;
    write_results(&stats, out_dir.join("process_statistics.txt"), &SingleProcess)?;

    println!(
        "{} after {} steps, t = {:.3}, seed {}",
        summary.reason.as_str(),
        summary.steps,
        summary.time,
        summary.seed
    );
    for row in msd.results().iter().step_by(10) {
        println!(
            "t = {:6.2}  <dx2> = {:8.3}  <dy2> = {:8.3}  <dz2> = {:8.3}",
            row.time, row.msd[0], row.msd[1], row.msd[2]
        );
    }
    Ok(())
}
