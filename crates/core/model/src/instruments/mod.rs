//! Instrument definitions
//!
//! Every variant wraps an [`InstrumentCore`] with the fields all venues share and adds its
//! own classification data. The [`Instrument`] trait exposes both through one interface
//! and carries the precision-aware conversions used by the data engine.

pub mod any;
pub mod betting;
pub mod crypto;
pub mod derivatives;
pub mod spot;
#[cfg(any(test, feature = "stubs"))]
pub mod stubs;

use common::{
    AssetClass, Currency, InstrumentClass, InstrumentId, Money, OptionKind, Price, Quantity,
    Symbol, UnixNanos, Venue,
};
use rust_decimal::{Decimal, RoundingStrategy, prelude::FromPrimitive};
use serde::{Deserialize, Serialize};
use ustr::Ustr;

use crate::error::{ModelError, ModelResult};

pub use any::InstrumentAny;
pub use betting::{Betting, BinaryOption};
pub use crypto::{CryptoFuture, CryptoOption, CryptoPerpetual};
pub use derivatives::{ContractTerms, FuturesContract, FuturesSpread, OptionContract, OptionSpread};
pub use spot::{CurrencyPair, Equity};

/// Fields shared by every instrument variant
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InstrumentCore {
    /// Instrument identifier
    pub id: InstrumentId,
    /// Symbol as used by the venue
    pub raw_symbol: Symbol,
    /// Currency prices are quoted in
    pub quote_currency: Currency,
    /// Decimal places for prices
    pub price_precision: u8,
    /// Decimal places for quantities
    pub size_precision: u8,
    /// Minimum price change
    pub price_increment: Price,
    /// Minimum quantity change
    pub size_increment: Quantity,
    /// Contract multiplier
    pub multiplier: Quantity,
    /// Standard lot size
    pub lot_size: Option<Quantity>,
    /// Largest order quantity
    pub max_quantity: Option<Quantity>,
    /// Smallest order quantity
    pub min_quantity: Option<Quantity>,
    /// Largest order notional
    pub max_notional: Option<Money>,
    /// Smallest order notional
    pub min_notional: Option<Money>,
    /// Highest valid price
    pub max_price: Option<Price>,
    /// Lowest valid price
    pub min_price: Option<Price>,
    /// Initial margin rate
    pub margin_init: Decimal,
    /// Maintenance margin rate
    pub margin_maint: Decimal,
    /// Maker fee rate
    pub maker_fee: Decimal,
    /// Taker fee rate
    pub taker_fee: Decimal,
    /// Venue definition time
    pub ts_event: UnixNanos,
    /// Local receipt time
    pub ts_init: UnixNanos,
}

impl InstrumentCore {
    /// Creates core fields with precisions taken from the increments.
    ///
    /// Optional limits and rates start empty; set them with the `with_*` methods and
    /// finish with [`InstrumentCore::validate`] (variant constructors do this).
    #[must_use]
    pub fn new(
        id: InstrumentId,
        raw_symbol: Symbol,
        quote_currency: Currency,
        price_increment: Price,
        size_increment: Quantity,
        ts_event: UnixNanos,
        ts_init: UnixNanos,
    ) -> Self {
        Self {
            id,
            raw_symbol,
            quote_currency,
            price_precision: price_increment.precision,
            size_precision: size_increment.precision,
            price_increment,
            size_increment,
            multiplier: Quantity {
                raw: 1_000_000_000,
                precision: 0,
            },
            lot_size: None,
            max_quantity: None,
            min_quantity: None,
            max_notional: None,
            min_notional: None,
            max_price: None,
            min_price: None,
            margin_init: Decimal::ZERO,
            margin_maint: Decimal::ZERO,
            maker_fee: Decimal::ZERO,
            taker_fee: Decimal::ZERO,
            ts_event,
            ts_init,
        }
    }

    /// Sets the contract multiplier
    #[must_use]
    pub fn with_multiplier(mut self, multiplier: Quantity) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Sets the lot size
    #[must_use]
    pub fn with_lot_size(mut self, lot_size: Quantity) -> Self {
        self.lot_size = Some(lot_size);
        self
    }

    /// Sets order quantity limits
    #[must_use]
    pub fn with_quantity_limits(mut self, min: Option<Quantity>, max: Option<Quantity>) -> Self {
        self.min_quantity = min;
        self.max_quantity = max;
        self
    }

    /// Sets order notional limits
    #[must_use]
    pub fn with_notional_limits(mut self, min: Option<Money>, max: Option<Money>) -> Self {
        self.min_notional = min;
        self.max_notional = max;
        self
    }

    /// Sets price limits
    #[must_use]
    pub fn with_price_limits(mut self, min: Option<Price>, max: Option<Price>) -> Self {
        self.min_price = min;
        self.max_price = max;
        self
    }

    /// Sets margin rates
    #[must_use]
    pub fn with_margins(mut self, init: Decimal, maint: Decimal) -> Self {
        self.margin_init = init;
        self.margin_maint = maint;
        self
    }

    /// Sets fee rates
    #[must_use]
    pub fn with_fees(mut self, maker: Decimal, taker: Decimal) -> Self {
        self.maker_fee = maker;
        self.taker_fee = taker;
        self
    }

    /// Checks the definition is internally consistent
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidInstrument`] naming the first violated rule.
    pub fn validate(&self) -> ModelResult<()> {
        if !self.price_increment.is_positive() {
            return Err(self.invalid("price_increment not positive"));
        }
        if !self.size_increment.is_positive() {
            return Err(self.invalid("size_increment not positive"));
        }
        if self.price_increment.precision != self.price_precision {
            return Err(self.invalid("price_precision != price_increment.precision"));
        }
        if self.size_increment.precision != self.size_precision {
            return Err(self.invalid("size_precision != size_increment.precision"));
        }
        if !self.multiplier.is_positive() {
            return Err(self.invalid("multiplier not positive"));
        }
        if self.margin_init.is_sign_negative() || self.margin_maint.is_sign_negative() {
            return Err(self.invalid("margin negative"));
        }
        if self.lot_size.is_some_and(|lot| !lot.is_positive()) {
            return Err(self.invalid("lot_size not positive"));
        }
        if self.max_quantity.is_some_and(|q| !q.is_positive()) {
            return Err(self.invalid("max_quantity not positive"));
        }
        if self.max_notional.is_some_and(|n| n.raw <= 0) {
            return Err(self.invalid("max_notional not positive"));
        }
        if self.min_notional.is_some_and(|n| n.raw < 0) {
            return Err(self.invalid("min_notional negative"));
        }
        for price in [self.max_price, self.min_price].into_iter().flatten() {
            if price.precision != self.price_precision {
                return Err(self.invalid("price limit precision != price_precision"));
            }
        }
        if let (Some(min), Some(max)) = (self.min_price, self.max_price) {
            if min > max {
                return Err(self.invalid("min_price exceeds max_price"));
            }
        }
        Ok(())
    }

    pub(crate) fn invalid(&self, reason: impl Into<String>) -> ModelError {
        ModelError::InvalidInstrument {
            instrument_id: self.id.to_string(),
            reason: reason.into(),
        }
    }
}

/// Common interface over all instrument variants
pub trait Instrument {
    /// Shared definition fields
    fn core(&self) -> &InstrumentCore;
    /// Broad asset class
    fn asset_class(&self) -> AssetClass;
    /// Contract structure
    fn instrument_class(&self) -> InstrumentClass;

    /// Base currency for pairs and crypto derivatives
    fn base_currency(&self) -> Option<Currency> {
        None
    }
    /// Currency P&L settles in
    fn settlement_currency(&self) -> Currency {
        self.quote_currency()
    }
    /// Whether the contract is quoted inverse (sized in quote, settled in base)
    fn is_inverse(&self) -> bool {
        false
    }
    /// Underlying asset code
    fn underlying(&self) -> Option<Ustr> {
        None
    }
    /// Put or call for options
    fn option_kind(&self) -> Option<OptionKind> {
        None
    }
    /// Strike for options
    fn strike_price(&self) -> Option<Price> {
        None
    }
    /// Listing time for expiring contracts
    fn activation_ns(&self) -> Option<UnixNanos> {
        None
    }
    /// Expiry time for expiring contracts
    fn expiration_ns(&self) -> Option<UnixNanos> {
        None
    }

    /// Instrument identifier
    fn id(&self) -> InstrumentId {
        self.core().id
    }
    /// Symbol part of the identifier
    fn symbol(&self) -> Symbol {
        self.core().id.symbol
    }
    /// Venue part of the identifier
    fn venue(&self) -> Venue {
        self.core().id.venue
    }
    /// Symbol as used by the venue
    fn raw_symbol(&self) -> Symbol {
        self.core().raw_symbol
    }
    /// Currency prices are quoted in
    fn quote_currency(&self) -> Currency {
        self.core().quote_currency
    }
    /// Currency used for commissions and notional
    fn cost_currency(&self) -> Currency {
        if self.is_inverse() {
            self.base_currency().unwrap_or_else(|| self.quote_currency())
        } else {
            self.quote_currency()
        }
    }
    /// Whether the settlement currency differs from the base currency
    fn is_quanto(&self) -> bool {
        self.base_currency()
            .is_some_and(|base| base != self.settlement_currency())
    }
    /// Decimal places for prices
    fn price_precision(&self) -> u8 {
        self.core().price_precision
    }
    /// Decimal places for quantities
    fn size_precision(&self) -> u8 {
        self.core().size_precision
    }
    /// Minimum price change
    fn price_increment(&self) -> Price {
        self.core().price_increment
    }
    /// Minimum quantity change
    fn size_increment(&self) -> Quantity {
        self.core().size_increment
    }
    /// Contract multiplier
    fn multiplier(&self) -> Quantity {
        self.core().multiplier
    }
    /// Definition time used for last-writer-wins caching
    fn ts_event(&self) -> UnixNanos {
        self.core().ts_event
    }
    /// Local receipt time
    fn ts_init(&self) -> UnixNanos {
        self.core().ts_init
    }

    /// Rounds `value` half-even to the price precision
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidInstrument`] if the value is not representable.
    fn make_price(&self, value: f64) -> ModelResult<Price> {
        let decimal = Decimal::from_f64(value)
            .ok_or_else(|| self.core().invalid(format!("price {value} not representable")))?;
        Price::from_decimal_dp(decimal, self.price_precision())
            .map_err(|e| self.core().invalid(e.to_string()))
    }

    /// Rounds `value` to the size precision, toward zero when `round_down` is set and
    /// half-even otherwise
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidInstrument`] if the value is not representable or a
    /// positive value rounds to zero.
    fn make_qty(&self, value: f64, round_down: bool) -> ModelResult<Quantity> {
        let decimal = Decimal::from_f64(value)
            .ok_or_else(|| self.core().invalid(format!("quantity {value} not representable")))?;
        let strategy = if round_down {
            RoundingStrategy::ToZero
        } else {
            RoundingStrategy::MidpointNearestEven
        };
        let rounded = decimal.round_dp_with_strategy(u32::from(self.size_precision()), strategy);
        if decimal.is_sign_positive() && !decimal.is_zero() && rounded.is_zero() {
            return Err(self
                .core()
                .invalid(format!("quantity {value} rounded to zero")));
        }
        Quantity::from_decimal_dp(rounded, self.size_precision())
            .map_err(|e| self.core().invalid(e.to_string()))
    }

    /// Notional value of `quantity` at `price`.
    ///
    /// Linear: `qty * multiplier * price` in the quote currency. Inverse:
    /// `qty * multiplier / price` in the base currency, or the raw quantity in the quote
    /// currency when `use_quote_for_inverse` is set.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidInstrument`] for a zero price on an inverse
    /// instrument, a missing base currency or an amount that does not fit.
    fn calculate_notional_value(
        &self,
        quantity: Quantity,
        price: Price,
        use_quote_for_inverse: bool,
    ) -> ModelResult<Money> {
        let qty = quantity.as_decimal() * self.multiplier().as_decimal();
        let (amount, currency) = if self.is_inverse() {
            if use_quote_for_inverse {
                (quantity.as_decimal(), self.quote_currency())
            } else {
                if price.is_zero() {
                    return Err(self.core().invalid("zero price for inverse notional"));
                }
                let base = self
                    .base_currency()
                    .ok_or_else(|| self.core().invalid("inverse instrument without base currency"))?;
                (qty / price.as_decimal(), base)
            }
        } else {
            (qty * price.as_decimal(), self.quote_currency())
        };
        Money::from_decimal(amount, currency).map_err(|e| self.core().invalid(e.to_string()))
    }

    /// Converts a quote-denominated quantity to base units at `last_px`, rounded half-even
    /// to the size precision
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidInstrument`] for a non-positive price.
    fn get_base_quantity(&self, quantity: Quantity, last_px: Price) -> ModelResult<Quantity> {
        if !last_px.is_positive() {
            return Err(self
                .core()
                .invalid(format!("cannot convert quote quantity at price {last_px}")));
        }
        let base = quantity.as_decimal() / last_px.as_decimal();
        Quantity::from_decimal_dp(base, self.size_precision())
            .map_err(|e| self.core().invalid(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{stubs::*, *};

    #[rstest]
    #[case(1.5, false, "1.500000")]
    #[case(1.2345678, false, "1.234568")]
    #[case(1.2345679, true, "1.234567")]
    #[case(0.000123, false, "0.000123")]
    fn test_make_qty(#[case] value: f64, #[case] round_down: bool, #[case] expected: &str) {
        let instrument = btcusdt_binance();
        let qty = instrument.make_qty(value, round_down).unwrap();
        assert_eq!(qty.to_string(), expected);
    }

    #[rstest]
    fn test_make_qty_rounds_to_zero_is_error() {
        let instrument = audusd_sim();
        assert!(instrument.make_qty(0.4, false).is_err());
        assert_eq!(instrument.make_qty(0.0, false).unwrap(), Quantity::zero(0));
    }

    #[rstest]
    fn test_make_price() {
        let instrument = audusd_sim();
        assert_eq!(instrument.make_price(0.800_005_1).unwrap().to_string(), "0.80001");
    }

    #[rstest]
    fn test_notional_linear() {
        let instrument = btcusdt_binance();
        let notional = instrument
            .calculate_notional_value(
                "2".parse().unwrap(),
                "50000.00".parse().unwrap(),
                false,
            )
            .unwrap();
        assert_eq!(notional.as_decimal(), Decimal::from(100_000));
        assert_eq!(notional.currency, Currency::USDT());
    }

    #[rstest]
    fn test_notional_inverse() {
        let instrument = xbtusd_bitmex();
        let notional = instrument
            .calculate_notional_value("100000".parse().unwrap(), "50000.0".parse().unwrap(), false)
            .unwrap();
        assert_eq!(notional.as_decimal(), Decimal::from(2));
        assert_eq!(notional.currency, Currency::BTC());
        assert_eq!(instrument.cost_currency(), Currency::BTC());
    }

    #[rstest]
    fn test_get_base_quantity() {
        let instrument = ethusdt_perp_binance();
        let qty = instrument
            .get_base_quantity("1000".parse().unwrap(), "2500.00".parse().unwrap())
            .unwrap();
        assert_eq!(qty.to_string(), "0.400");
        assert!(instrument
            .get_base_quantity("1000".parse().unwrap(), Price::zero(2))
            .is_err());
    }

    #[rstest]
    fn test_validate_rejects_inverted_price_limits() {
        let core = audusd_sim()
            .core
            .with_price_limits(Some("2.00000".parse().unwrap()), Some("1.00000".parse().unwrap()));
        assert!(matches!(
            core.validate(),
            Err(ModelError::InvalidInstrument { .. })
        ));
    }

    #[rstest]
    fn test_is_quanto() {
        assert!(!ethusdt_perp_binance().is_quanto());
        assert!(!audusd_sim().is_quanto());
    }
}
