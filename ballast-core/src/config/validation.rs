//! Configuration validation utilities.
//!
//! Provides path-aware validation contexts for descriptive error messages
//! and helpers for applying environment variable overrides.

use crate::error::ConfigError;

/// Result type for validation operations.
pub type ValidationResult = Result<(), ConfigError>;

/// Context for validation operations.
///
/// Tracks the current path in the configuration tree for better error
/// messages.
#[derive(Debug, Clone, Default)]
pub struct ValidationContext {
    /// Current path in the configuration (e.g., "broker.rollback_max_attempts").
    path: Vec<String>,
    /// Collected validation errors.
    errors: Vec<ConfigError>,
}

impl ValidationContext {
    /// Creates a new validation context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enters a new section in the configuration.
    pub fn enter(&mut self, section: impl Into<String>) {
        self.path.push(section.into());
    }

    /// Exits the current section.
    pub fn exit(&mut self) {
        self.path.pop();
    }

    /// Returns the current path as a dot-separated string.
    #[must_use]
    pub fn current_path(&self) -> String {
        self.path.join(".")
    }

    /// Adds a validation error.
    pub fn add_error(&mut self, error: ConfigError) {
        self.errors.push(error);
    }

    /// Returns true if there are no validation errors.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Consumes the context and returns the first error, if any.
    pub fn into_result(self) -> ValidationResult {
        self.errors.into_iter().next().map_or(Ok(()), Err)
    }

    /// Creates an invalid value error with the current path context.
    #[must_use]
    pub fn invalid_value(
        &self,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> ConfigError {
        let field_name = field.into();
        let full_field = if self.path.is_empty() {
            field_name
        } else {
            format!("{}.{}", self.current_path(), field_name)
        };
        ConfigError::InvalidValue {
            field: full_field,
            reason: reason.into(),
        }
    }
}

/// Validator for configuration values.
///
/// Provides a fluent API for validating configuration fields.
#[derive(Debug)]
pub struct Validator<'a> {
    ctx: &'a mut ValidationContext,
}

impl<'a> Validator<'a> {
    /// Creates a new validator with the given context.
    pub fn new(ctx: &'a mut ValidationContext) -> Self {
        Self { ctx }
    }

    /// Validates that a numeric value is within a range (inclusive).
    pub fn in_range<T: PartialOrd + std::fmt::Display>(
        &mut self,
        field: &str,
        value: &T,
        min: &T,
        max: &T,
    ) -> &mut Self {
        if value < min || value > max {
            self.ctx.add_error(self.ctx.invalid_value(
                field,
                format!("Value {value} must be between {min} and {max}"),
            ));
        }
        self
    }

    /// Validates that a numeric value is positive.
    pub fn positive<T: PartialOrd + Default + std::fmt::Display>(
        &mut self,
        field: &str,
        value: &T,
    ) -> &mut Self {
        if *value <= T::default() {
            self.ctx.add_error(
                self.ctx
                    .invalid_value(field, format!("Value {value} must be positive")),
            );
        }
        self
    }

    /// Validates using a custom predicate.
    pub fn custom<F>(&mut self, field: &str, predicate: F, error_msg: &str) -> &mut Self
    where
        F: FnOnce() -> bool,
    {
        if !predicate() {
            self.ctx.add_error(self.ctx.invalid_value(field, error_msg));
        }
        self
    }
}

/// Environment variable helper for applying overrides.
pub struct EnvOverride;

impl EnvOverride {
    /// Applies an environment variable override to a numeric value.
    pub fn apply_number<T: std::str::FromStr>(var_name: &str, target: &mut T) {
        if let Ok(value) = std::env::var(var_name) {
            if let Ok(parsed) = value.parse() {
                *target = parsed;
            }
        }
    }

    /// Applies an environment variable override to a decimal value.
    pub fn apply_decimal(var_name: &str, target: &mut rust_decimal::Decimal) {
        if let Ok(value) = std::env::var(var_name) {
            if let Ok(parsed) = value.parse() {
                *target = parsed;
            }
        }
    }

    /// Applies an environment variable override (in whole seconds) to a
    /// duration value.
    pub fn apply_duration_secs(var_name: &str, target: &mut std::time::Duration) {
        if let Ok(value) = std::env::var(var_name) {
            if let Ok(parsed) = value.parse::<u64>() {
                *target = std::time::Duration::from_secs(parsed);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_context_path() {
        let mut ctx = ValidationContext::new();
        assert_eq!(ctx.current_path(), "");

        ctx.enter("broker");
        assert_eq!(ctx.current_path(), "broker");

        ctx.enter("limits");
        assert_eq!(ctx.current_path(), "broker.limits");

        ctx.exit();
        assert_eq!(ctx.current_path(), "broker");
    }

    #[test]
    fn test_validation_context_errors() {
        let mut ctx = ValidationContext::new();
        assert!(ctx.is_valid());

        ctx.add_error(ConfigError::missing_field("test"));
        assert!(!ctx.is_valid());
        assert!(ctx.into_result().is_err());
    }

    #[test]
    fn test_validator_in_range() {
        let mut ctx = ValidationContext::new();
        Validator::new(&mut ctx).in_range("attempts", &3u32, &1, &10);
        assert!(ctx.is_valid());

        let mut ctx = ValidationContext::new();
        Validator::new(&mut ctx).in_range("attempts", &0u32, &1, &10);
        assert!(!ctx.is_valid());
    }

    #[test]
    fn test_validator_positive() {
        let mut ctx = ValidationContext::new();
        Validator::new(&mut ctx).positive("threshold", &0i64);
        assert!(!ctx.is_valid());
    }

    #[test]
    fn test_invalid_value_includes_path() {
        let mut ctx = ValidationContext::new();
        ctx.enter("market");
        let error = ctx.invalid_value("min_price", "must be positive");
        assert!(error.to_string().contains("market.min_price"));
    }

    #[test]
    fn test_env_override_missing_var_keeps_value() {
        let mut value = 42u32;
        EnvOverride::apply_number("BALLAST_NONEXISTENT_VAR_12345", &mut value);
        assert_eq!(value, 42);
    }
}
