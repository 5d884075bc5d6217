use rand::Rng;
use rand_chacha::ChaCha8Rng;

use loadsmith_core::ConfigError;

use crate::generators::{GeneratorRegistry, ValueGenerator};
use crate::params::{ParamKind, ParamSpec, Params};
use crate::value::GeneratedValue;

const CONSTANT_PARAMS: &[ParamSpec] = &[ParamSpec::new("value", ParamKind::Scalar)];
const ONE_OF_PARAMS: &[ParamSpec] = &[ParamSpec::new("values", ParamKind::List)];

pub fn register(registry: &mut GeneratorRegistry) {
    registry.register("Constant", CONSTANT_PARAMS, Constant::build);
    registry.register("OneOf", ONE_OF_PARAMS, OneOf::build);
}

/// Returns the same configured value for every row.
struct Constant {
    value: GeneratedValue,
}

impl Constant {
    fn build(params: &Params<'_>, _rng: ChaCha8Rng) -> Result<Box<dyn ValueGenerator>, ConfigError> {
        Ok(Box::new(Self {
            value: params.scalar(0)?,
        }))
    }
}

impl ValueGenerator for Constant {
    fn id(&self) -> &'static str {
        "Constant"
    }

    fn next_value(&mut self) -> GeneratedValue {
        self.value.clone()
    }
}

/// Uniform pick from a fixed list.
struct OneOf {
    values: Vec<GeneratedValue>,
    rng: ChaCha8Rng,
}

impl OneOf {
    fn build(params: &Params<'_>, rng: ChaCha8Rng) -> Result<Box<dyn ValueGenerator>, ConfigError> {
        Ok(Box::new(Self {
            values: params.list(0)?,
            rng,
        }))
    }
}

impl ValueGenerator for OneOf {
    fn id(&self) -> &'static str {
        "OneOf"
    }

    fn next_value(&mut self) -> GeneratedValue {
        let index = self.rng.random_range(0..self.values.len());
        self.values[index].clone()
    }
}
