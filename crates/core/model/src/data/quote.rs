//! Top-of-book quote

use std::fmt;

use common::{InstrumentId, Price, PriceType, Quantity, UnixNanos};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::HasTsInit;
use crate::error::{ModelError, ModelResult};

/// Best bid and ask with sizes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuoteTick {
    /// Quoted instrument
    pub instrument_id: InstrumentId,
    /// Best bid
    pub bid_price: Price,
    /// Best ask
    pub ask_price: Price,
    /// Size at the best bid
    pub bid_size: Quantity,
    /// Size at the best ask
    pub ask_size: Quantity,
    /// Venue event time
    pub ts_event: UnixNanos,
    /// Local receipt time
    pub ts_init: UnixNanos,
}

impl QuoteTick {
    /// Creates a quote
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::PrecisionMismatch`] when bid and ask prices (or sizes) carry
    /// different precisions.
    pub fn new(
        instrument_id: InstrumentId,
        bid_price: Price,
        ask_price: Price,
        bid_size: Quantity,
        ask_size: Quantity,
        ts_event: UnixNanos,
        ts_init: UnixNanos,
    ) -> ModelResult<Self> {
        if bid_price.precision != ask_price.precision {
            return Err(ModelError::PrecisionMismatch {
                field: "bid_price/ask_price",
                left: bid_price.precision,
                right: ask_price.precision,
            });
        }
        if bid_size.precision != ask_size.precision {
            return Err(ModelError::PrecisionMismatch {
                field: "bid_size/ask_size",
                left: bid_size.precision,
                right: ask_size.precision,
            });
        }
        Ok(Self {
            instrument_id,
            bid_price,
            ask_price,
            bid_size,
            ask_size,
            ts_event,
            ts_init,
        })
    }

    /// Price for the given price type; `Mid` is rounded to one extra decimal place
    #[must_use]
    pub fn extract_price(&self, price_type: PriceType) -> Option<Price> {
        match price_type {
            PriceType::Bid => Some(self.bid_price),
            PriceType::Ask => Some(self.ask_price),
            PriceType::Mid => {
                let mid = (self.bid_price.as_decimal() + self.ask_price.as_decimal())
                    / Decimal::TWO;
                Price::from_decimal_dp(mid, self.bid_price.precision + 1).ok()
            }
            PriceType::Last | PriceType::Mark => None,
        }
    }

    /// Size for the given price type; `Mid` averages both sides
    #[must_use]
    pub fn extract_size(&self, price_type: PriceType) -> Option<Quantity> {
        match price_type {
            PriceType::Bid => Some(self.bid_size),
            PriceType::Ask => Some(self.ask_size),
            PriceType::Mid => {
                let mid = (self.bid_size.as_decimal() + self.ask_size.as_decimal())
                    / Decimal::TWO;
                Quantity::from_decimal_dp(mid, self.bid_size.precision + 1).ok()
            }
            PriceType::Last | PriceType::Mark => None,
        }
    }
}

impl HasTsInit for QuoteTick {
    fn ts_init(&self) -> UnixNanos {
        self.ts_init
    }
}

impl fmt::Display for QuoteTick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{},{},{}",
            self.instrument_id,
            self.bid_price,
            self.ask_price,
            self.bid_size,
            self.ask_size,
            self.ts_event
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_quote() -> QuoteTick {
        QuoteTick::new(
            "EURUSD.SIM".parse().unwrap(),
            "1.0000".parse().unwrap(),
            "1.0001".parse().unwrap(),
            "100".parse().unwrap(),
            "200".parse().unwrap(),
            UnixNanos::from(1),
            UnixNanos::from(2),
        )
        .unwrap()
    }

    #[test]
    fn test_extract_mid() {
        let quote = create_test_quote();
        assert_eq!(
            quote.extract_price(PriceType::Mid).unwrap().to_string(),
            "1.00005"
        );
        assert_eq!(quote.extract_size(PriceType::Mid).unwrap().to_string(), "150.0");
        assert!(quote.extract_price(PriceType::Last).is_none());
    }

    #[test]
    fn test_precision_mismatch_rejected() {
        let result = QuoteTick::new(
            "EURUSD.SIM".parse().unwrap(),
            "1.00".parse().unwrap(),
            "1.0001".parse().unwrap(),
            "100".parse().unwrap(),
            "200".parse().unwrap(),
            UnixNanos::default(),
            UnixNanos::default(),
        );
        assert!(matches!(result, Err(ModelError::PrecisionMismatch { .. })));
    }
}
