//! Interned identifiers
//!
//! Every identifier wraps a [`Ustr`], so equality and hashing compare a pointer and
//! constructing an already-seen value does not allocate.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use ustr::Ustr;

use crate::error::IdentifierError;

fn check_valid(kind: &'static str, value: &str) -> Result<(), IdentifierError> {
    if value.trim().is_empty() {
        return Err(IdentifierError::Empty { kind });
    }
    if value.chars().any(char::is_whitespace) {
        return Err(IdentifierError::Malformed {
            kind,
            value: value.to_string(),
            reason: "contains whitespace",
        });
    }
    Ok(())
}

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Ustr);

        impl $name {
            /// Validates and interns `value`
            ///
            /// # Errors
            ///
            /// Returns [`IdentifierError`] for empty values or values containing whitespace.
            pub fn new(value: &str) -> Result<Self, IdentifierError> {
                check_valid(stringify!($name), value)?;
                Ok(Self(Ustr::from(value)))
            }

            /// Interned string value
            #[must_use]
            pub const fn inner(&self) -> Ustr {
                self.0
            }

            /// String slice of the value
            #[must_use]
            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }
        }

        impl FromStr for $name {
            type Err = IdentifierError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        /// Interns without validation; intended for literals
        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(Ustr::from(value))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}('{}')", stringify!($name), self.0)
            }
        }
    };
}

identifier!(
    /// Ticker or native symbol of an instrument
    Symbol
);
identifier!(
    /// Trading venue or exchange
    Venue
);
identifier!(
    /// Trader instance owning strategies
    TraderId
);
identifier!(
    /// Strategy that created an order
    StrategyId
);
identifier!(
    /// Data or execution client (venue adapter)
    ClientId
);
identifier!(
    /// Venue account
    AccountId
);
identifier!(
    /// Order identifier assigned locally
    ClientOrderId
);
identifier!(
    /// Order identifier assigned by the venue
    VenueOrderId
);
identifier!(
    /// Venue trade (match) identifier
    TradeId
);
identifier!(
    /// Position identifier
    PositionId
);
identifier!(
    /// Execution algorithm
    ExecAlgorithmId
);
identifier!(
    /// Contingent order list
    OrderListId
);

/// Instrument identifier composed as `"{symbol}.{venue}"`
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstrumentId {
    /// Instrument symbol
    pub symbol: Symbol,
    /// Listing venue
    pub venue: Venue,
}

impl InstrumentId {
    /// Composes an instrument ID
    #[must_use]
    pub const fn new(symbol: Symbol, venue: Venue) -> Self {
        Self { symbol, venue }
    }
}

impl FromStr for InstrumentId {
    type Err = IdentifierError;

    /// Splits on the last `.` so symbols may themselves contain dots
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((symbol, venue)) = s.rsplit_once('.') else {
            return Err(IdentifierError::Malformed {
                kind: "InstrumentId",
                value: s.to_string(),
                reason: "missing '.' separator",
            });
        };
        Ok(Self {
            symbol: Symbol::new(symbol)?,
            venue: Venue::new(venue)?,
        })
    }
}

/// Interns without validation; intended for literals such as `"AUD/USD.SIM"`
impl From<&str> for InstrumentId {
    fn from(value: &str) -> Self {
        let (symbol, venue) = value.rsplit_once('.').unwrap_or((value, ""));
        Self {
            symbol: Symbol::from(symbol),
            venue: Venue::from(venue),
        }
    }
}

impl fmt::Display for InstrumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.symbol, self.venue)
    }
}

impl fmt::Debug for InstrumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InstrumentId('{self}')")
    }
}

impl Serialize for InstrumentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for InstrumentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instrument_id_parse() {
        let id: InstrumentId = "ETHUSDT-PERP.BINANCE".parse().unwrap();
        assert_eq!(id.symbol.as_str(), "ETHUSDT-PERP");
        assert_eq!(id.venue.as_str(), "BINANCE");
        assert_eq!(id.to_string(), "ETHUSDT-PERP.BINANCE");
    }

    #[test]
    fn test_instrument_id_splits_on_last_dot() {
        let id: InstrumentId = "BRK.B.XNYS".parse().unwrap();
        assert_eq!(id.symbol.as_str(), "BRK.B");
        assert_eq!(id.venue.as_str(), "XNYS");
    }

    #[test]
    fn test_instrument_id_from_literal_matches_parse() {
        let id = InstrumentId::from("BRK.B.XNYS");
        assert_eq!(id, "BRK.B.XNYS".parse::<InstrumentId>().unwrap());
        assert_eq!(InstrumentId::from("AUD/USD.SIM").to_string(), "AUD/USD.SIM");
    }

    #[test]
    fn test_instrument_id_requires_separator() {
        assert!("AAPL".parse::<InstrumentId>().is_err());
        assert!("AAPL.".parse::<InstrumentId>().is_err());
    }

    #[test]
    fn test_empty_identifier_rejected() {
        assert!(matches!(
            TraderId::new(""),
            Err(IdentifierError::Empty { kind: "TraderId" })
        ));
        assert!(StrategyId::new("S 1").is_err());
    }

    #[test]
    fn test_interned_equality() {
        assert_eq!(ClientOrderId::from("O-1"), ClientOrderId::new("O-1").unwrap());
    }

    #[test]
    fn test_instrument_id_serde_as_string() {
        let id: InstrumentId = "AAPL.XNAS".parse().unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"AAPL.XNAS\"");
        let back: InstrumentId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
