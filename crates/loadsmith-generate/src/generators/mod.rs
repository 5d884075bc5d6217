use std::collections::BTreeMap;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde_json::Value;
use tracing::debug;

use loadsmith_core::ConfigError;

use crate::params::{ParamSpec, Params, validate_params};
use crate::value::GeneratedValue;

pub mod choice;
pub mod numeric;
pub mod temporal;
pub mod text;

/// Stateful producer bound to one physical column.
///
/// Instances own their random state and are never shared between columns.
pub trait ValueGenerator: Send {
    fn id(&self) -> &'static str;

    /// Produce the value for the next row.
    fn next_value(&mut self) -> GeneratedValue;
}

/// Constructor invoked with validated parameters and a private rng.
pub type GeneratorConstructor =
    fn(&Params<'_>, ChaCha8Rng) -> Result<Box<dyn ValueGenerator>, ConfigError>;

#[derive(Clone, Copy)]
struct GeneratorEntry {
    params: &'static [ParamSpec],
    construct: GeneratorConstructor,
}

/// Closed mapping from generator name to constructor.
#[derive(Clone)]
pub struct GeneratorRegistry {
    entries: BTreeMap<&'static str, GeneratorEntry>,
}

impl Default for GeneratorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for GeneratorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratorRegistry")
            .field("ids", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl GeneratorRegistry {
    /// Registry with every built-in generator.
    pub fn new() -> Self {
        let mut registry = Self {
            entries: BTreeMap::new(),
        };
        choice::register(&mut registry);
        numeric::register(&mut registry);
        text::register(&mut registry);
        temporal::register(&mut registry);
        registry
    }

    pub fn register(
        &mut self,
        id: &'static str,
        params: &'static [ParamSpec],
        construct: GeneratorConstructor,
    ) {
        self.entries.insert(id, GeneratorEntry { params, construct });
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Registered generator names in sorted order.
    pub fn ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }

    /// Declared positional parameters of a generator.
    pub fn signature(&self, id: &str) -> Option<&'static [ParamSpec]> {
        self.entries.get(id).map(|entry| entry.params)
    }

    /// Resolve `name` + `params` into a generator seeded with `seed`.
    pub fn build(
        &self,
        name: &str,
        params: &[Value],
        seed: u64,
    ) -> Result<Box<dyn ValueGenerator>, ConfigError> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| ConfigError::UnknownGenerator {
                name: name.to_string(),
            })?;
        let params = validate_params(name, params, entry.params)?;
        let generator = (entry.construct)(&params, ChaCha8Rng::seed_from_u64(seed))?;
        debug!(generator = name, seed, "generator built");
        Ok(generator)
    }

    /// Check a rule's generator without keeping the instance.
    pub fn validate(&self, name: &str, params: &[Value]) -> Result<(), ConfigError> {
        self.build(name, params, 0).map(|_| ())
    }
}
