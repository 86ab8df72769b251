//! Configuration management.
//!
//! This module provides the configuration surface of the system:
//! immutable-at-startup sections with spec defaults, a validation
//! framework with path-aware error messages, and a file loader supporting
//! YAML, TOML, and JSON with `BALLAST_*` environment variable overrides.
//!
//! # Example
//!
//! ```
//! use ballast_core::config::{BallastConfig, Validatable};
//!
//! let mut config = BallastConfig::default();
//! config.apply_env_overrides();
//! config.validate().unwrap();
//! ```

mod ballast_config;
mod loader;
/// Validation utilities for configuration values.
pub mod validation;

pub use ballast_config::{BallastConfig, BrokerConfig, MarketConfig, PortfolioConfig};
pub use loader::{ConfigFormat, ConfigLoader};
pub use validation::{EnvOverride, ValidationContext, Validator};

use crate::error::ConfigError;

/// Trait for configuration structures that can validate themselves.
pub trait Validatable {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns the first `ConfigError` found.
    fn validate(&self) -> Result<(), ConfigError>;
}
