//! Currency definitions and the built-in registry

use std::{
    fmt,
    hash::{Hash, Hasher},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use ustr::Ustr;

use crate::{enums::CurrencyType, error::MoneyError};

/// A currency code with its native precision.
///
/// Equality and hashing are by `code` only.
#[derive(Clone, Copy, Serialize, Deserialize)]
pub struct Currency {
    /// Currency code such as `USD` or `BTC`
    pub code: Ustr,
    /// Decimal places used for amounts in this currency
    pub precision: u8,
    /// ISO 4217 numeric code, zero for non-ISO currencies
    pub iso4217: u16,
    /// Human readable name
    pub name: Ustr,
    /// Classification of the currency
    pub currency_type: CurrencyType,
}

impl Currency {
    /// Creates a currency definition
    #[must_use]
    pub fn new(
        code: &str,
        precision: u8,
        iso4217: u16,
        name: &str,
        currency_type: CurrencyType,
    ) -> Self {
        Self {
            code: Ustr::from(code),
            precision,
            iso4217,
            name: Ustr::from(name),
            currency_type,
        }
    }

    /// Looks up a registered currency by code
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::UnknownCurrency`] when the code is not registered.
    pub fn from_code(code: &str) -> Result<Self, MoneyError> {
        let currency = match code {
            "AUD" => Self::new("AUD", 2, 36, "Australian dollar", CurrencyType::Fiat),
            "CAD" => Self::new("CAD", 2, 124, "Canadian dollar", CurrencyType::Fiat),
            "CHF" => Self::new("CHF", 2, 756, "Swiss franc", CurrencyType::Fiat),
            "EUR" => Self::new("EUR", 2, 978, "Euro", CurrencyType::Fiat),
            "GBP" => Self::new("GBP", 2, 826, "British pound", CurrencyType::Fiat),
            "INR" => Self::new("INR", 2, 356, "Indian rupee", CurrencyType::Fiat),
            "JPY" => Self::new("JPY", 0, 392, "Japanese yen", CurrencyType::Fiat),
            "USD" => Self::new("USD", 2, 840, "United States dollar", CurrencyType::Fiat),
            "BTC" => Self::new("BTC", 8, 0, "Bitcoin", CurrencyType::Crypto),
            "ETH" => Self::new("ETH", 8, 0, "Ether", CurrencyType::Crypto),
            "SOL" => Self::new("SOL", 8, 0, "Solana", CurrencyType::Crypto),
            "USDC" => Self::new("USDC", 8, 0, "USD Coin", CurrencyType::Crypto),
            "USDT" => Self::new("USDT", 8, 0, "Tether", CurrencyType::Crypto),
            "XAU" => Self::new("XAU", 2, 959, "Gold (one troy ounce)", CurrencyType::CommodityBacked),
            _ => {
                return Err(MoneyError::UnknownCurrency {
                    code: code.to_string(),
                });
            }
        };
        Ok(currency)
    }

    /// Australian dollar
    #[allow(non_snake_case)]
    #[must_use]
    pub fn AUD() -> Self {
        Self::new("AUD", 2, 36, "Australian dollar", CurrencyType::Fiat)
    }

    /// United States dollar
    #[allow(non_snake_case)]
    #[must_use]
    pub fn USD() -> Self {
        Self::new("USD", 2, 840, "United States dollar", CurrencyType::Fiat)
    }

    /// Tether
    #[allow(non_snake_case)]
    #[must_use]
    pub fn USDT() -> Self {
        Self::new("USDT", 8, 0, "Tether", CurrencyType::Crypto)
    }

    /// Bitcoin
    #[allow(non_snake_case)]
    #[must_use]
    pub fn BTC() -> Self {
        Self::new("BTC", 8, 0, "Bitcoin", CurrencyType::Crypto)
    }

    /// Ether
    #[allow(non_snake_case)]
    #[must_use]
    pub fn ETH() -> Self {
        Self::new("ETH", 8, 0, "Ether", CurrencyType::Crypto)
    }
}

impl PartialEq for Currency {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code
    }
}

impl Eq for Currency {}

impl Hash for Currency {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.code.hash(state);
    }
}

impl FromStr for Currency {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s.trim())
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code)
    }
}

impl fmt::Debug for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Currency({}, precision={})", self.code, self.precision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_lookup() {
        let usd: Currency = "USD".parse().unwrap();
        assert_eq!(usd.precision, 2);
        assert_eq!(usd, Currency::USD());
    }

    #[test]
    fn test_equality_by_code() {
        let custom = Currency::new("USD", 4, 0, "other", CurrencyType::Fiat);
        assert_eq!(custom, Currency::USD());
    }

    #[test]
    fn test_unknown_code() {
        assert!(matches!(
            "ZZZ".parse::<Currency>(),
            Err(MoneyError::UnknownCurrency { .. })
        ));
    }
}
