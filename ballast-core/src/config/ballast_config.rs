//! Ballast system configuration structures.
//!
//! Process-wide thresholds and limits, immutable at startup. Defaults
//! follow the system's operating parameters; every value can be overridden
//! from a config file or a `BALLAST_*` environment variable.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::validation::{EnvOverride, ValidationContext, Validator};
use super::Validatable;
use crate::error::ConfigError;

/// Main Ballast system configuration.
///
/// # Example YAML
///
/// ```yaml
/// market:
///   min_price: 0.01
///   max_price: 1000000
///   price_change_alert_threshold: 0.01
///
/// broker:
///   max_quantity: 1000000
///   rollback_max_attempts: 3
///
/// portfolio:
///   rebalance_deviation_threshold: 0.02
///   rebalance_lock_ttl: 6h
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BallastConfig {
    /// Market-level price bounds and alerting.
    #[serde(default)]
    pub market: MarketConfig,

    /// Broker execution limits and rollback policy.
    #[serde(default)]
    pub broker: BrokerConfig,

    /// Portfolio investment bounds and rebalancing thresholds.
    #[serde(default)]
    pub portfolio: PortfolioConfig,
}

impl Validatable for BallastConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let mut ctx = ValidationContext::new();

        ctx.enter("market");
        self.market.validate_with_context(&mut ctx);
        ctx.exit();

        ctx.enter("broker");
        self.broker.validate_with_context(&mut ctx);
        ctx.exit();

        ctx.enter("portfolio");
        self.portfolio.validate_with_context(&mut ctx);
        ctx.exit();

        ctx.into_result()
    }
}

impl BallastConfig {
    /// Applies environment variable overrides to the configuration.
    ///
    /// Variables are prefixed with `BALLAST_` and name the section and
    /// field, e.g. `BALLAST_PORTFOLIO_REBALANCE_DEVIATION_THRESHOLD=0.05`.
    pub fn apply_env_overrides(&mut self) {
        self.market.apply_env_overrides("BALLAST_MARKET");
        self.broker.apply_env_overrides("BALLAST_BROKER");
        self.portfolio.apply_env_overrides("BALLAST_PORTFOLIO");
    }
}

/// Market configuration: price bounds and the dispatch threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Lower bound for stock prices; updates below it are rejected.
    #[serde(default = "default_min_price")]
    pub min_price: Decimal,

    /// Upper bound for stock prices.
    #[serde(default = "default_max_price")]
    pub max_price: Decimal,

    /// Minimum `|Δprice / price|` that triggers registry dispatch.
    ///
    /// Price drift below this never reaches the portfolios; it exists to
    /// avoid dispatching rebalance evaluations for sub-noise moves.
    #[serde(default = "default_price_change_alert_threshold")]
    pub price_change_alert_threshold: Decimal,
}

fn default_min_price() -> Decimal {
    Decimal::new(1, 2) // 0.01
}

fn default_max_price() -> Decimal {
    Decimal::new(1_000_000, 0)
}

fn default_price_change_alert_threshold() -> Decimal {
    Decimal::new(1, 2) // 0.01 = 1%
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            min_price: default_min_price(),
            max_price: default_max_price(),
            price_change_alert_threshold: default_price_change_alert_threshold(),
        }
    }
}

impl MarketConfig {
    fn validate_with_context(&self, ctx: &mut ValidationContext) {
        let mut validator = Validator::new(ctx);
        validator
            .positive("min_price", &self.min_price)
            .positive("max_price", &self.max_price)
            .custom(
                "max_price",
                || self.max_price > self.min_price,
                "max_price must exceed min_price",
            )
            .in_range(
                "price_change_alert_threshold",
                &self.price_change_alert_threshold,
                &Decimal::ZERO,
                &Decimal::ONE,
            );
    }

    fn apply_env_overrides(&mut self, prefix: &str) {
        EnvOverride::apply_decimal(&format!("{prefix}_MIN_PRICE"), &mut self.min_price);
        EnvOverride::apply_decimal(&format!("{prefix}_MAX_PRICE"), &mut self.max_price);
        EnvOverride::apply_decimal(
            &format!("{prefix}_PRICE_CHANGE_ALERT_THRESHOLD"),
            &mut self.price_change_alert_threshold,
        );
    }
}

/// Broker configuration: execution limits and the rollback retry policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Per-order quantity ceiling.
    #[serde(default = "default_max_quantity")]
    pub max_quantity: Decimal,

    /// Per-operation retry budget during rollback.
    #[serde(default = "default_rollback_max_attempts")]
    pub rollback_max_attempts: u32,

    /// Delay between rollback retry attempts.
    #[serde(with = "humantime_serde", default = "default_rollback_retry_delay")]
    pub rollback_retry_delay: Duration,

    /// Simulated or transport execution delay applied to each order.
    #[serde(with = "humantime_serde", default)]
    pub execution_delay: Duration,
}

fn default_max_quantity() -> Decimal {
    Decimal::new(1_000_000, 0)
}

fn default_rollback_max_attempts() -> u32 {
    3
}

fn default_rollback_retry_delay() -> Duration {
    Duration::from_secs(1)
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            max_quantity: default_max_quantity(),
            rollback_max_attempts: default_rollback_max_attempts(),
            rollback_retry_delay: default_rollback_retry_delay(),
            execution_delay: Duration::ZERO,
        }
    }
}

impl BrokerConfig {
    fn validate_with_context(&self, ctx: &mut ValidationContext) {
        let mut validator = Validator::new(ctx);
        validator
            .positive("max_quantity", &self.max_quantity)
            .in_range("rollback_max_attempts", &self.rollback_max_attempts, &1, &10);
    }

    fn apply_env_overrides(&mut self, prefix: &str) {
        EnvOverride::apply_decimal(&format!("{prefix}_MAX_QUANTITY"), &mut self.max_quantity);
        EnvOverride::apply_number(
            &format!("{prefix}_ROLLBACK_MAX_ATTEMPTS"),
            &mut self.rollback_max_attempts,
        );
        EnvOverride::apply_duration_secs(
            &format!("{prefix}_ROLLBACK_RETRY_DELAY_SECS"),
            &mut self.rollback_retry_delay,
        );
    }
}

/// Portfolio configuration: investment bounds and rebalancing thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioConfig {
    /// Lower bound on a portfolio's initial cash investment (USD).
    #[serde(default = "default_min_investment")]
    pub min_investment: Decimal,

    /// Upper bound on a portfolio's initial cash investment (USD).
    #[serde(default = "default_max_portfolio_value")]
    pub max_portfolio_value: Decimal,

    /// Minimum max-deviation required before a rebalance issues trades.
    ///
    /// The single most important cost control: deviations below this gate
    /// produce no orders, preventing rebalance amplification from price
    /// jitter.
    #[serde(default = "default_rebalance_deviation_threshold")]
    pub rebalance_deviation_threshold: Decimal,

    /// Stuck-lock takeover interval. A rebalance lock held longer than
    /// this is treated as abandoned and taken over by the next caller.
    #[serde(with = "humantime_serde", default = "default_rebalance_lock_ttl")]
    pub rebalance_lock_ttl: Duration,
}

fn default_min_investment() -> Decimal {
    Decimal::ONE
}

fn default_max_portfolio_value() -> Decimal {
    Decimal::new(10_000_000, 0)
}

fn default_rebalance_deviation_threshold() -> Decimal {
    Decimal::new(2, 2) // 0.02 = 2%
}

fn default_rebalance_lock_ttl() -> Duration {
    Duration::from_secs(6 * 60 * 60)
}

impl Default for PortfolioConfig {
    fn default() -> Self {
        Self {
            min_investment: default_min_investment(),
            max_portfolio_value: default_max_portfolio_value(),
            rebalance_deviation_threshold: default_rebalance_deviation_threshold(),
            rebalance_lock_ttl: default_rebalance_lock_ttl(),
        }
    }
}

impl PortfolioConfig {
    fn validate_with_context(&self, ctx: &mut ValidationContext) {
        let mut validator = Validator::new(ctx);
        validator
            .positive("min_investment", &self.min_investment)
            .positive("max_portfolio_value", &self.max_portfolio_value)
            .custom(
                "max_portfolio_value",
                || self.max_portfolio_value > self.min_investment,
                "max_portfolio_value must exceed min_investment",
            )
            .in_range(
                "rebalance_deviation_threshold",
                &self.rebalance_deviation_threshold,
                &Decimal::ZERO,
                &Decimal::ONE,
            )
            .custom(
                "rebalance_lock_ttl",
                || !self.rebalance_lock_ttl.is_zero(),
                "rebalance_lock_ttl must be positive",
            );
    }

    fn apply_env_overrides(&mut self, prefix: &str) {
        EnvOverride::apply_decimal(&format!("{prefix}_MIN_INVESTMENT"), &mut self.min_investment);
        EnvOverride::apply_decimal(
            &format!("{prefix}_MAX_PORTFOLIO_VALUE"),
            &mut self.max_portfolio_value,
        );
        EnvOverride::apply_decimal(
            &format!("{prefix}_REBALANCE_DEVIATION_THRESHOLD"),
            &mut self.rebalance_deviation_threshold,
        );
        EnvOverride::apply_duration_secs(
            &format!("{prefix}_REBALANCE_LOCK_TTL_SECS"),
            &mut self.rebalance_lock_ttl,
        );
    }
}
