use std::cell::Cell;
use std::fs;

use kmc::prelude::*;
use kmc::LoadError;
use kmc_test_utils::fixtures::chain_walker;

#[test]
fn model_round_trips_through_a_json_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    let record = chain_walker(10, 1.0, 0.5);
    fs::write(&path, record.to_json().unwrap()).unwrap();

    assert_eq!(load_record(&path).unwrap(), record);
    let model = load_model(&path).unwrap();
    assert_eq!(model.configuration().site_count(), 10);
    assert!((model.total_rate() - 1.5).abs() < 1e-12);
}

#[test]
fn load_errors_say_what_went_wrong() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.json");
    assert!(matches!(load_model(&missing), Err(LoadError::Io { .. })));

    let garbage = dir.path().join("garbage.json");
    fs::write(&garbage, "{ not json").unwrap();
    assert!(matches!(
        load_model(&garbage),
        Err(LoadError::Input(InputError::Parse { .. }))
    ));

    // Parses, but B is not a possible type.
    let mut record = chain_walker(4, 1.0, 1.0);
    record.configuration.possible_types = vec!["A".into()];
    let invalid = dir.path().join("invalid.json");
    fs::write(&invalid, record.to_json().unwrap()).unwrap();
    assert!(matches!(load_model(&invalid), Err(LoadError::Model(_))));
}

#[test]
fn control_defaults_fill_missing_fields() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("control.json");
    fs::write(&path, r#"{ "number_of_steps": 500, "seed": 7 }"#).unwrap();
    let control = load_control(&path).unwrap();
    assert_eq!(control.number_of_steps, 500);
    assert_eq!(control.seed, Some(7));
    assert_eq!(control.dump_interval, 1);
    assert_eq!(control.rng_type, RngType::ChaCha8);

    fs::write(&path, r#"{ "number_of_steps": 5, "dump_interval": 0 }"#).unwrap();
    assert!(matches!(load_control(&path), Err(LoadError::Input(_))));
}

struct Worker(Cell<usize>);

impl MpiFacade for Worker {
    fn is_master(&self) -> bool {
        false
    }

    fn barrier(&self) {
        self.0.set(self.0.get() + 1);
    }

    fn broadcast_seed(&self, seed: u64) -> u64 {
        seed
    }

    fn rank(&self) -> usize {
        1
    }

    fn size(&self) -> usize {
        2
    }
}

#[test]
fn only_the_master_writes_results() {
    let dir = tempfile::tempdir().unwrap();
    let mut model = LatticeModel::from_record(&chain_walker(10, 1.0, 1.0)).unwrap();
    let mut dist = TimeStepDistribution::new(0.5).unwrap();
    model
        .run(
            &ControlParameters::new(50, 3),
            Plugins::new().analysis(&mut dist),
            &SingleProcess,
        )
        .unwrap();

    let master = dir.path().join("master.txt");
    assert!(write_results(&dist, &master, &SingleProcess).unwrap());
    let text = fs::read_to_string(&master).unwrap();
    assert!(text.starts_with("# time count normalized\n"));

    let worker = dir.path().join("worker.txt");
    assert!(!write_results(&dist, &worker, &Worker(Cell::new(0))).unwrap());
    assert!(!worker.exists());
}
