//! Application configuration module
//!
//! Handles environment-driven settings and application-wide constants.

mod constants;
mod settings;

pub use constants::*;
pub use settings::{CacheKind, Config, ConfigError, Environment};
