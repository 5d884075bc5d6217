//! Value generator dispatch for Loadsmith.
//!
//! A column names a generator and a positional parameter list; the
//! [`GeneratorRegistry`] resolves that pair into a stateful
//! [`ValueGenerator`] that yields one value per call. Parameters are checked
//! when the generator is built, so a malformed rule fails before any row is
//! produced.

pub mod generators;
pub mod params;
pub mod value;

pub use generators::{GeneratorRegistry, ValueGenerator};
pub use value::GeneratedValue;
