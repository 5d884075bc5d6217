use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use loadsmith_core::ConfigError;

use crate::generators::{GeneratorRegistry, ValueGenerator};
use crate::params::{ParamKind, ParamSpec, Params};
use crate::value::GeneratedValue;

const DATE_RANGE_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("start", ParamKind::Date),
    ParamSpec::new("end", ParamKind::Date),
];
const TIMESTAMP_RANGE_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("start", ParamKind::Timestamp),
    ParamSpec::new("end", ParamKind::Timestamp),
];

pub fn register(registry: &mut GeneratorRegistry) {
    registry.register("RandomDate", DATE_RANGE_PARAMS, RandomDate::build);
    registry.register("RandomTimestamp", TIMESTAMP_RANGE_PARAMS, RandomTimestamp::build);
}

struct RandomDate {
    start: NaiveDate,
    span_days: i64,
    rng: ChaCha8Rng,
}

impl RandomDate {
    fn build(params: &Params<'_>, rng: ChaCha8Rng) -> Result<Box<dyn ValueGenerator>, ConfigError> {
        let start = params.date(0)?;
        let end = params.date(1)?;
        if start > end {
            return Err(params.invalid(1, "end must not precede start"));
        }
        Ok(Box::new(Self {
            start,
            span_days: (end - start).num_days(),
            rng,
        }))
    }
}

impl ValueGenerator for RandomDate {
    fn id(&self) -> &'static str {
        "RandomDate"
    }

    fn next_value(&mut self) -> GeneratedValue {
        let offset = self.rng.random_range(0..=self.span_days);
        GeneratedValue::Date(self.start + Duration::days(offset))
    }
}

/// Uniform timestamp with second precision.
struct RandomTimestamp {
    start: NaiveDateTime,
    span_seconds: i64,
    rng: ChaCha8Rng,
}

impl RandomTimestamp {
    fn build(params: &Params<'_>, rng: ChaCha8Rng) -> Result<Box<dyn ValueGenerator>, ConfigError> {
        let start = params.timestamp(0)?;
        let end = params.timestamp(1)?;
        if start > end {
            return Err(params.invalid(1, "end must not precede start"));
        }
        Ok(Box::new(Self {
            start,
            span_seconds: (end - start).num_seconds(),
            rng,
        }))
    }
}

impl ValueGenerator for RandomTimestamp {
    fn id(&self) -> &'static str {
        "RandomTimestamp"
    }

    fn next_value(&mut self) -> GeneratedValue {
        let offset = self.rng.random_range(0..=self.span_seconds);
        GeneratedValue::Timestamp(self.start + Duration::seconds(offset))
    }
}
