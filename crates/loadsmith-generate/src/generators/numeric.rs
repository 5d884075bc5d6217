use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

use loadsmith_core::ConfigError;

use crate::generators::{GeneratorRegistry, ValueGenerator};
use crate::params::{ParamKind, ParamSpec, Params};
use crate::value::GeneratedValue;

const MAX_DECIMALS: i64 = 15;

const INT_RANGE_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("lower", ParamKind::Int),
    ParamSpec::new("upper", ParamKind::Int),
];
const FLOAT_RANGE_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("min", ParamKind::Number),
    ParamSpec::new("max", ParamKind::Number),
    ParamSpec::new("decimals", ParamKind::Int),
];
const NORMAL_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("center", ParamKind::Number),
    ParamSpec::new("deviation", ParamKind::Number),
];

pub fn register(registry: &mut GeneratorRegistry) {
    registry.register("PrimaryIntGen", INT_RANGE_PARAMS, PrimaryIntGen::build);
    registry.register("RandomInt", INT_RANGE_PARAMS, RandomInt::build);
    registry.register("RandomFloat", FLOAT_RANGE_PARAMS, RandomFloat::build);
    registry.register("RandomNormalFloat", NORMAL_PARAMS, RandomNormalFloat::build);
    registry.register("RandomBoolean", &[], RandomBoolean::build);
}

fn int_bounds(params: &Params<'_>) -> Result<(i64, i64), ConfigError> {
    let lower = params.int(0)?;
    let upper = params.int(1)?;
    if lower > upper {
        return Err(params.invalid(1, "upper must be >= lower"));
    }
    Ok((lower, upper))
}

/// Sequential keys `lower..=upper`, wrapping back to `lower`.
struct PrimaryIntGen {
    lower: i64,
    upper: i64,
    next: i64,
}

impl PrimaryIntGen {
    fn build(params: &Params<'_>, _rng: ChaCha8Rng) -> Result<Box<dyn ValueGenerator>, ConfigError> {
        let (lower, upper) = int_bounds(params)?;
        Ok(Box::new(Self {
            lower,
            upper,
            next: lower,
        }))
    }
}

impl ValueGenerator for PrimaryIntGen {
    fn id(&self) -> &'static str {
        "PrimaryIntGen"
    }

    fn next_value(&mut self) -> GeneratedValue {
        let value = self.next;
        self.next = if value >= self.upper {
            self.lower
        } else {
            value + 1
        };
        GeneratedValue::Int(value)
    }
}

struct RandomInt {
    lower: i64,
    upper: i64,
    rng: ChaCha8Rng,
}

impl RandomInt {
    fn build(params: &Params<'_>, rng: ChaCha8Rng) -> Result<Box<dyn ValueGenerator>, ConfigError> {
        let (lower, upper) = int_bounds(params)?;
        Ok(Box::new(Self { lower, upper, rng }))
    }
}

impl ValueGenerator for RandomInt {
    fn id(&self) -> &'static str {
        "RandomInt"
    }

    fn next_value(&mut self) -> GeneratedValue {
        GeneratedValue::Int(self.rng.random_range(self.lower..=self.upper))
    }
}

struct RandomFloat {
    min: f64,
    max: f64,
    scale: f64,
    rng: ChaCha8Rng,
}

impl RandomFloat {
    fn build(params: &Params<'_>, rng: ChaCha8Rng) -> Result<Box<dyn ValueGenerator>, ConfigError> {
        let min = params.number(0)?;
        let max = params.number(1)?;
        let decimals = params.int(2)?;
        if !min.is_finite() || !max.is_finite() || min > max {
            return Err(params.invalid(1, "max must be >= min"));
        }
        if !(max - min).is_finite() {
            return Err(params.invalid(1, "max - min must be a finite number"));
        }
        if !(0..=MAX_DECIMALS).contains(&decimals) {
            return Err(params.invalid(2, format!("decimals must be within 0..={MAX_DECIMALS}")));
        }
        Ok(Box::new(Self {
            min,
            max,
            scale: 10f64.powi(decimals as i32),
            rng,
        }))
    }
}

impl ValueGenerator for RandomFloat {
    fn id(&self) -> &'static str {
        "RandomFloat"
    }

    fn next_value(&mut self) -> GeneratedValue {
        let raw = self.rng.random_range(self.min..=self.max);
        let rounded = ((raw * self.scale).round() / self.scale).clamp(self.min, self.max);
        GeneratedValue::Float(rounded)
    }
}

/// Gaussian sample around `center`.
struct RandomNormalFloat {
    normal: Normal<f64>,
    rng: ChaCha8Rng,
}

impl RandomNormalFloat {
    fn build(params: &Params<'_>, rng: ChaCha8Rng) -> Result<Box<dyn ValueGenerator>, ConfigError> {
        let center = params.number(0)?;
        let deviation = params.number(1)?;
        if !center.is_finite() {
            return Err(params.invalid(0, "mean must be a finite number"));
        }
        if !deviation.is_finite() || deviation < 0.0 {
            return Err(params.invalid(1, "deviation must be a finite number >= 0"));
        }
        let normal = Normal::new(center, deviation)
            .map_err(|err| params.invalid(1, format!("invalid deviation: {err}")))?;
        Ok(Box::new(Self { normal, rng }))
    }
}

impl ValueGenerator for RandomNormalFloat {
    fn id(&self) -> &'static str {
        "RandomNormalFloat"
    }

    fn next_value(&mut self) -> GeneratedValue {
        GeneratedValue::Float(self.normal.sample(&mut self.rng))
    }
}

struct RandomBoolean {
    rng: ChaCha8Rng,
}

impl RandomBoolean {
    fn build(_params: &Params<'_>, rng: ChaCha8Rng) -> Result<Box<dyn ValueGenerator>, ConfigError> {
        Ok(Box::new(Self { rng }))
    }
}

impl ValueGenerator for RandomBoolean {
    fn id(&self) -> &'static str {
        "RandomBoolean"
    }

    fn next_value(&mut self) -> GeneratedValue {
        GeneratedValue::Bool(self.rng.random_bool(0.5))
    }
}
