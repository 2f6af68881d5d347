//! Error types for the numeric and identity primitives

use thiserror::Error;

/// Failure to construct or combine a [`crate::Price`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The input could not be represented as a price
    #[error("Invalid price '{value}': {reason}")]
    Invalid {
        /// The offending input as text
        value: String,
        /// Why the input was rejected
        reason: String,
    },
}

impl PriceError {
    pub(crate) fn invalid(value: impl ToString, reason: impl Into<String>) -> Self {
        Self::Invalid {
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Failure to construct or combine a [`crate::Quantity`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuantityError {
    /// The input could not be represented as a quantity
    #[error("Invalid quantity '{value}': {reason}")]
    Invalid {
        /// The offending input as text
        value: String,
        /// Why the input was rejected
        reason: String,
    },
}

impl QuantityError {
    pub(crate) fn invalid(value: impl ToString, reason: impl Into<String>) -> Self {
        Self::Invalid {
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Failure to construct or combine [`crate::Money`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    /// The amount could not be represented
    #[error("Invalid money amount '{value}': {reason}")]
    Invalid {
        /// The offending input as text
        value: String,
        /// Why the input was rejected
        reason: String,
    },

    /// Arithmetic across two different currencies
    #[error("Currency mismatch: {left} vs {right}")]
    CurrencyMismatch {
        /// Currency code of the left operand
        left: String,
        /// Currency code of the right operand
        right: String,
    },

    /// Unknown currency code
    #[error("Unknown currency '{code}'")]
    UnknownCurrency {
        /// The code that was not found in the registry
        code: String,
    },
}

/// Failure to parse or validate an identifier
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentifierError {
    /// Empty or whitespace-only value
    #[error("{kind} cannot be empty")]
    Empty {
        /// Identifier type name
        kind: &'static str,
    },

    /// Value failed a format rule
    #[error("Invalid {kind} '{value}': {reason}")]
    Malformed {
        /// Identifier type name
        kind: &'static str,
        /// The rejected value
        value: String,
        /// Which rule failed
        reason: &'static str,
    },
}
