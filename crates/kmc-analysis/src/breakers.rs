//! Reference breakers.

use kmc_core::{InputError, TypeCode, TypeTable};
use kmc_engine::{Breaker, StepView};

/// Stops the run once no particle of a given type is left.
#[derive(Debug)]
pub struct TypeExhausted {
    name: String,
    code: TypeCode,
    interval: u64,
}

impl TypeExhausted {
    /// Watch `type_name`, checked every step.
    pub fn new(type_name: &str, types: &TypeTable) -> Result<Self, InputError> {
        Ok(Self {
            name: format!("type-exhausted:{type_name}"),
            code: types.code(type_name)?,
            interval: 1,
        })
    }

    /// Check every `interval` steps instead.
    pub fn with_interval(mut self, interval: u64) -> Result<Self, InputError> {
        if interval == 0 {
            return Err(InputError::invalid("breaker interval", "must be >= 1"));
        }
        self.interval = interval;
        Ok(self)
    }
}

impl Breaker for TypeExhausted {
    fn name(&self) -> &str {
        &self.name
    }

    fn interval(&self) -> u64 {
        self.interval
    }

    fn evaluate(&mut self, view: &StepView<'_>) -> bool {
        view.configuration.particles_per_type()[self.code.index()] == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kmc_engine::LatticeModel;
    use kmc_test_utils::fixtures::ising_flip;
    use kmc_test_utils::view_of;

    #[test]
    fn fires_when_the_type_disappears() {
        let mut model = LatticeModel::from_record(&ising_flip()).unwrap();
        let mut b = TypeExhausted::new("U", model.types()).unwrap();
        assert_eq!(b.name(), "type-exhausted:U");
        assert!(!b.evaluate(&view_of(&model, 0, 0.0, None)));
        model.set_type_at(0, "D").unwrap();
        assert!(b.evaluate(&view_of(&model, 1, 0.0, None)));
    }

    #[test]
    fn rejects_unknown_types_and_zero_interval() {
        let model = LatticeModel::from_record(&ising_flip()).unwrap();
        assert!(TypeExhausted::new("Q", model.types()).is_err());
        let b = TypeExhausted::new("D", model.types()).unwrap();
        assert!(b.with_interval(0).is_err());
    }
}
