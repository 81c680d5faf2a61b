//! Run control parameters.

use serde::{Deserialize, Serialize};

use kmc_core::{InputError, RngType};

/// How long to run and how often to observe.
///
/// Deserialisable from JSON; absent fields take their defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlParameters {
    /// Number of events to fire. Default: 0.
    pub number_of_steps: u64,
    /// Dump a trajectory frame every this many steps. Default: 1.
    pub dump_interval: u64,
    /// Call analyses every this many steps. Default: 1.
    pub analysis_interval: u64,
    /// RNG seed. `None`: derived from the wall clock and broadcast.
    pub seed: Option<u64>,
    /// Generator variant. Default: [`RngType::ChaCha8`].
    pub rng_type: RngType,
    /// Simulation time at step 0. Default: 0.0.
    pub start_time: f64,
    /// Stop once simulation time exceeds this.
    pub time_limit: Option<f64>,
    /// Also dump whenever simulation time crosses a multiple of this.
    pub dump_time_interval: Option<f64>,
}

impl Default for ControlParameters {
    fn default() -> Self {
        Self {
            number_of_steps: 0,
            dump_interval: 1,
            analysis_interval: 1,
            seed: None,
            rng_type: RngType::default(),
            start_time: 0.0,
            time_limit: None,
            dump_time_interval: None,
        }
    }
}

impl ControlParameters {
    /// Parameters for `steps` steps with default intervals and a seed.
    pub fn new(steps: u64, seed: u64) -> Self {
        Self {
            number_of_steps: steps,
            seed: Some(seed),
            ..Self::default()
        }
    }

    /// Check the interval and time fields.
    pub fn validate(&self) -> Result<(), InputError> {
        if self.dump_interval == 0 {
            return Err(InputError::invalid("dump_interval", "must be >= 1"));
        }
        if self.analysis_interval == 0 {
            return Err(InputError::invalid("analysis_interval", "must be >= 1"));
        }
        if !self.start_time.is_finite() {
            return Err(InputError::invalid(
                "start_time",
                format!("must be finite, got {}", self.start_time),
            ));
        }
        if let Some(limit) = self.time_limit {
            if !limit.is_finite() || limit < self.start_time {
                return Err(InputError::invalid(
                    "time_limit",
                    format!("must be finite and >= start_time, got {limit}"),
                ));
            }
        }
        if let Some(dt) = self.dump_time_interval {
            if !(dt.is_finite() && dt > 0.0) {
                return Err(InputError::invalid(
                    "dump_time_interval",
                    format!("must be positive and finite, got {dt}"),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(ControlParameters::default().validate().is_ok());
    }

    #[test]
    fn zero_intervals_are_rejected() {
        let mut c = ControlParameters::new(10, 1);
        c.dump_interval = 0;
        assert!(c.validate().is_err());
        let mut c = ControlParameters::new(10, 1);
        c.analysis_interval = 0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn time_fields_are_checked() {
        let mut c = ControlParameters::new(10, 1);
        c.start_time = 5.0;
        c.time_limit = Some(1.0);
        assert!(c.validate().is_err());
        let mut c = ControlParameters::new(10, 1);
        c.dump_time_interval = Some(0.0);
        assert!(c.validate().is_err());
    }

    #[test]
    fn deserialises_with_defaults() {
        let c: ControlParameters =
            serde_json::from_str(r#"{"number_of_steps": 300000, "seed": 1994669}"#).unwrap();
        assert_eq!(c.number_of_steps, 300000);
        assert_eq!(c.seed, Some(1994669));
        assert_eq!(c.dump_interval, 1);
        assert_eq!(c.rng_type, RngType::ChaCha8);
    }
}
