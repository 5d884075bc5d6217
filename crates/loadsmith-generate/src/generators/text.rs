use rand::Rng;
use rand_chacha::ChaCha8Rng;

use loadsmith_core::ConfigError;

use crate::generators::{GeneratorRegistry, ValueGenerator};
use crate::params::{ParamKind, ParamSpec, Params};
use crate::value::GeneratedValue;

const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &[u8] = b"0123456789";

const LENGTH_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("minLen", ParamKind::Int),
    ParamSpec::new("maxLen", ParamKind::Int),
];

pub fn register(registry: &mut GeneratorRegistry) {
    registry.register("RandomAString", LENGTH_PARAMS, |params, rng| {
        RandomString::build(params, rng, "RandomAString", LETTERS)
    });
    registry.register("RandomNString", LENGTH_PARAMS, |params, rng| {
        RandomString::build(params, rng, "RandomNString", DIGITS)
    });
    registry.register("RandomUUID", &[], RandomUuid::build);
}

/// Random text drawn from a fixed charset.
struct RandomString {
    id: &'static str,
    charset: &'static [u8],
    min_len: usize,
    max_len: usize,
    rng: ChaCha8Rng,
}

impl RandomString {
    fn build(
        params: &Params<'_>,
        rng: ChaCha8Rng,
        id: &'static str,
        charset: &'static [u8],
    ) -> Result<Box<dyn ValueGenerator>, ConfigError> {
        let min_len = params.non_negative(0)?;
        let max_len = params.non_negative(1)?;
        if min_len > max_len {
            return Err(params.invalid(1, "maxLen must be >= minLen"));
        }
        Ok(Box::new(Self {
            id,
            charset,
            min_len,
            max_len,
            rng,
        }))
    }
}

impl ValueGenerator for RandomString {
    fn id(&self) -> &'static str {
        self.id
    }

    fn next_value(&mut self) -> GeneratedValue {
        let len = self.rng.random_range(self.min_len..=self.max_len);
        GeneratedValue::Text(random_chars(&mut self.rng, self.charset, len))
    }
}

/// `len` characters sampled uniformly from `charset`.
pub fn random_chars(rng: &mut impl Rng, charset: &[u8], len: usize) -> String {
    (0..len)
        .map(|_| charset[rng.random_range(0..charset.len())] as char)
        .collect()
}

/// Random alphabetic text of exactly `len` characters.
pub fn random_letters(rng: &mut impl Rng, len: usize) -> String {
    random_chars(rng, LETTERS, len)
}

struct RandomUuid {
    rng: ChaCha8Rng,
}

impl RandomUuid {
    fn build(_params: &Params<'_>, rng: ChaCha8Rng) -> Result<Box<dyn ValueGenerator>, ConfigError> {
        Ok(Box::new(Self { rng }))
    }
}

impl ValueGenerator for RandomUuid {
    fn id(&self) -> &'static str {
        "RandomUUID"
    }

    fn next_value(&mut self) -> GeneratedValue {
        let bytes: [u8; 16] = self.rng.random();
        GeneratedValue::Uuid(uuid::Builder::from_random_bytes(bytes).into_uuid())
    }
}
