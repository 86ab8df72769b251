//! Validated portfolio configuration.

use std::collections::HashSet;
use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::warn;

use ballast_core::config::PortfolioConfig;
use ballast_core::error::PortfolioError;
use ballast_core::scale::percent_tick;
use ballast_core::types::{Amount, Weight};

use crate::stock::Stock;

/// One target slot: a stock and its intended fraction of the portfolio.
#[derive(Clone)]
pub struct StockAllocation {
    /// The stock to allocate.
    pub stock: Arc<Stock>,
    /// Target fraction of the portfolio's total value.
    pub weight: Weight,
}

impl StockAllocation {
    /// Creates a new allocation slot.
    #[must_use]
    pub fn new(stock: Arc<Stock>, weight: Weight) -> Self {
        Self { stock, weight }
    }
}

/// Fully-validated configuration a [`crate::Portfolio`] is built from.
///
/// Validation enforces:
/// - a non-empty name
/// - an initial investment within the configured bounds
/// - at least one allocation, with unique symbols
/// - allocation weights summing to exactly 1 at the percentage scale
///
/// A sum that misses 1 by at most one tick at the percentage scale is
/// repaired by adjusting the largest allocation (with a warning); anything
/// further off is rejected.
pub struct PortfolioSpec {
    name: String,
    initial_investment: Amount,
    allocations: Vec<StockAllocation>,
}

impl PortfolioSpec {
    /// Validates and builds a portfolio specification.
    ///
    /// # Errors
    ///
    /// Returns the first `PortfolioError` found in the order listed above.
    pub fn new(
        name: impl Into<String>,
        initial_investment: Amount,
        allocations: Vec<StockAllocation>,
        config: &PortfolioConfig,
    ) -> Result<Self, PortfolioError> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(PortfolioError::EmptyName);
        }

        let investment = initial_investment.as_decimal();
        if investment < config.min_investment || investment > config.max_portfolio_value {
            return Err(PortfolioError::InvestmentOutOfRange {
                amount: investment,
                min: config.min_investment,
                max: config.max_portfolio_value,
            });
        }

        if allocations.is_empty() {
            return Err(PortfolioError::NoAllocations);
        }

        let mut seen = HashSet::new();
        for allocation in &allocations {
            if !seen.insert(allocation.stock.symbol().clone()) {
                return Err(PortfolioError::DuplicateSymbol {
                    symbol: allocation.stock.symbol().clone(),
                });
            }
        }

        let allocations = Self::normalize_weights(allocations)?;

        Ok(Self {
            name,
            initial_investment,
            allocations,
        })
    }

    /// Returns the portfolio name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the initial cash investment.
    #[must_use]
    pub fn initial_investment(&self) -> Amount {
        self.initial_investment
    }

    /// Returns the allocation slots.
    #[must_use]
    pub fn allocations(&self) -> &[StockAllocation] {
        &self.allocations
    }

    pub(crate) fn into_parts(self) -> (String, Amount, Vec<StockAllocation>) {
        (self.name, self.initial_investment, self.allocations)
    }

    /// Enforces the sum-to-one invariant, repairing a one-tick rounding
    /// residue by adjusting the largest allocation.
    fn normalize_weights(
        mut allocations: Vec<StockAllocation>,
    ) -> Result<Vec<StockAllocation>, PortfolioError> {
        let sum: Decimal = allocations.iter().map(|a| a.weight.as_decimal()).sum();
        let residue = sum - Decimal::ONE;

        if residue.is_zero() {
            return Ok(allocations);
        }
        if residue.abs() > percent_tick() {
            return Err(PortfolioError::AllocationSum { sum });
        }

        let largest = allocations
            .iter()
            .enumerate()
            .max_by_key(|(_, a)| a.weight)
            .map(|(i, _)| i)
            .unwrap_or(0);

        let adjusted = allocations[largest].weight.as_decimal() - residue;
        let adjusted =
            Weight::new(adjusted).map_err(|_| PortfolioError::AllocationSum { sum })?;

        warn!(
            symbol = %allocations[largest].stock.symbol(),
            from = %allocations[largest].weight,
            to = %adjusted,
            "Adjusted largest allocation so weights sum exactly to 1"
        );
        allocations[largest].weight = adjusted;
        Ok(allocations)
    }
}
