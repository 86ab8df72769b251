//! Symbol type for representing ticker identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ValidationError;

/// Number of characters in a valid ticker symbol.
pub const SYMBOL_LEN: usize = 4;

/// Symbol type - used for representing ticker identifiers.
///
/// Wraps a `String` value with validation: a symbol is exactly four
/// uppercase ASCII letters (`A`-`Z`), e.g. `"AAPL"` or `"MSFT"`.
///
/// # Examples
///
/// ```
/// use ballast_core::types::Symbol;
///
/// let symbol = Symbol::new("AAPL").unwrap();
/// assert_eq!(symbol.as_str(), "AAPL");
/// assert!(Symbol::new("aapl").is_err());
/// assert!(Symbol::new("TOOLONG").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    /// Creates a new `Symbol` from a string.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::EmptySymbol` if the string is empty.
    /// Returns `ValidationError::InvalidSymbol` if the string is not exactly
    /// four uppercase ASCII letters.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        if s.is_empty() {
            return Err(ValidationError::EmptySymbol);
        }
        if s.len() != SYMBOL_LEN || !s.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(ValidationError::InvalidSymbol {
                symbol: s,
                expected_len: SYMBOL_LEN,
            });
        }
        Ok(Self(s))
    }

    /// Creates a new `Symbol` without validation.
    ///
    /// # Safety
    ///
    /// The caller must ensure the value is a valid symbol format.
    #[must_use]
    pub fn new_unchecked(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the symbol as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if this symbol satisfies the format rule.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.0.len() == SYMBOL_LEN && self.0.chars().all(|c| c.is_ascii_uppercase())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Symbol {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<Symbol> for String {
    fn from(symbol: Symbol) -> Self {
        symbol.0
    }
}
