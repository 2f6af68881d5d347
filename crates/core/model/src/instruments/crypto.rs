//! Crypto derivatives

use common::{AssetClass, Currency, InstrumentClass, OptionKind, Price, UnixNanos};
use serde::{Deserialize, Serialize};
use ustr::Ustr;

use super::{Instrument, InstrumentCore};
use crate::error::ModelResult;

/// A perpetual swap, linear or inverse
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CryptoPerpetual {
    /// Shared fields
    pub core: InstrumentCore,
    /// Base currency
    pub base_currency: Currency,
    /// Settlement currency
    pub settlement_currency: Currency,
    /// Inverse contracts are sized in quote and settled in base
    pub is_inverse: bool,
}

impl CryptoPerpetual {
    /// Creates a validated perpetual
    ///
    /// # Errors
    ///
    /// Returns an error if the core definition is invalid.
    pub fn new(
        core: InstrumentCore,
        base_currency: Currency,
        settlement_currency: Currency,
        is_inverse: bool,
    ) -> ModelResult<Self> {
        core.validate()?;
        Ok(Self {
            core,
            base_currency,
            settlement_currency,
            is_inverse,
        })
    }
}

impl Instrument for CryptoPerpetual {
    fn core(&self) -> &InstrumentCore {
        &self.core
    }
    fn asset_class(&self) -> AssetClass {
        AssetClass::Cryptocurrency
    }
    fn instrument_class(&self) -> InstrumentClass {
        InstrumentClass::Swap
    }
    fn base_currency(&self) -> Option<Currency> {
        Some(self.base_currency)
    }
    fn settlement_currency(&self) -> Currency {
        self.settlement_currency
    }
    fn is_inverse(&self) -> bool {
        self.is_inverse
    }
}

/// A dated crypto future
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CryptoFuture {
    /// Shared fields
    pub core: InstrumentCore,
    /// Underlying currency
    pub underlying: Currency,
    /// Settlement currency
    pub settlement_currency: Currency,
    /// Inverse contracts are sized in quote and settled in base
    pub is_inverse: bool,
    /// Listing time
    pub activation_ns: UnixNanos,
    /// Expiry time
    pub expiration_ns: UnixNanos,
}

impl CryptoFuture {
    /// Creates a validated future
    ///
    /// # Errors
    ///
    /// Returns an error if the core definition is invalid or it expires before listing.
    pub fn new(
        core: InstrumentCore,
        underlying: Currency,
        settlement_currency: Currency,
        is_inverse: bool,
        activation_ns: UnixNanos,
        expiration_ns: UnixNanos,
    ) -> ModelResult<Self> {
        core.validate()?;
        if expiration_ns < activation_ns {
            return Err(core.invalid("expiration before activation"));
        }
        Ok(Self {
            core,
            underlying,
            settlement_currency,
            is_inverse,
            activation_ns,
            expiration_ns,
        })
    }
}

impl Instrument for CryptoFuture {
    fn core(&self) -> &InstrumentCore {
        &self.core
    }
    fn asset_class(&self) -> AssetClass {
        AssetClass::Cryptocurrency
    }
    fn instrument_class(&self) -> InstrumentClass {
        InstrumentClass::Future
    }
    fn base_currency(&self) -> Option<Currency> {
        Some(self.underlying)
    }
    fn settlement_currency(&self) -> Currency {
        self.settlement_currency
    }
    fn is_inverse(&self) -> bool {
        self.is_inverse
    }
    fn underlying(&self) -> Option<Ustr> {
        Some(self.underlying.code)
    }
    fn activation_ns(&self) -> Option<UnixNanos> {
        Some(self.activation_ns)
    }
    fn expiration_ns(&self) -> Option<UnixNanos> {
        Some(self.expiration_ns)
    }
}

/// A crypto option
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CryptoOption {
    /// Shared fields
    pub core: InstrumentCore,
    /// Underlying currency
    pub underlying: Currency,
    /// Settlement currency
    pub settlement_currency: Currency,
    /// Inverse contracts are sized in quote and settled in base
    pub is_inverse: bool,
    /// Put or call
    pub option_kind: OptionKind,
    /// Strike
    pub strike_price: Price,
    /// Listing time
    pub activation_ns: UnixNanos,
    /// Expiry time
    pub expiration_ns: UnixNanos,
}

impl CryptoOption {
    /// Creates a validated option
    ///
    /// # Errors
    ///
    /// Returns an error if the core definition is invalid or it expires before listing.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        core: InstrumentCore,
        underlying: Currency,
        settlement_currency: Currency,
        is_inverse: bool,
        option_kind: OptionKind,
        strike_price: Price,
        activation_ns: UnixNanos,
        expiration_ns: UnixNanos,
    ) -> ModelResult<Self> {
        core.validate()?;
        if expiration_ns < activation_ns {
            return Err(core.invalid("expiration before activation"));
        }
        Ok(Self {
            core,
            underlying,
            settlement_currency,
            is_inverse,
            option_kind,
            strike_price,
            activation_ns,
            expiration_ns,
        })
    }
}

impl Instrument for CryptoOption {
    fn core(&self) -> &InstrumentCore {
        &self.core
    }
    fn asset_class(&self) -> AssetClass {
        AssetClass::Cryptocurrency
    }
    fn instrument_class(&self) -> InstrumentClass {
        InstrumentClass::Option
    }
    fn base_currency(&self) -> Option<Currency> {
        Some(self.underlying)
    }
    fn settlement_currency(&self) -> Currency {
        self.settlement_currency
    }
    fn is_inverse(&self) -> bool {
        self.is_inverse
    }
    fn underlying(&self) -> Option<Ustr> {
        Some(self.underlying.code)
    }
    fn option_kind(&self) -> Option<OptionKind> {
        Some(self.option_kind)
    }
    fn strike_price(&self) -> Option<Price> {
        Some(self.strike_price)
    }
    fn activation_ns(&self) -> Option<UnixNanos> {
        Some(self.activation_ns)
    }
    fn expiration_ns(&self) -> Option<UnixNanos> {
        Some(self.expiration_ns)
    }
}
