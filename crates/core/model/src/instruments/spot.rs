//! Spot instruments

use common::{AssetClass, Currency, CurrencyType, InstrumentClass};
use serde::{Deserialize, Serialize};
use ustr::Ustr;

use super::{Instrument, InstrumentCore};
use crate::error::ModelResult;

/// A spot currency pair, fiat or crypto
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CurrencyPair {
    /// Shared fields
    pub core: InstrumentCore,
    /// Base currency of the pair
    pub base_currency: Currency,
}

impl CurrencyPair {
    /// Creates a validated currency pair
    ///
    /// # Errors
    ///
    /// Returns an error if the core definition is invalid.
    pub fn new(core: InstrumentCore, base_currency: Currency) -> ModelResult<Self> {
        core.validate()?;
        Ok(Self {
            core,
            base_currency,
        })
    }
}

impl Instrument for CurrencyPair {
    fn core(&self) -> &InstrumentCore {
        &self.core
    }

    fn asset_class(&self) -> AssetClass {
        let is_fiat = |c: Currency| c.currency_type == CurrencyType::Fiat;
        if is_fiat(self.base_currency) && is_fiat(self.core.quote_currency) {
            AssetClass::FX
        } else {
            AssetClass::Cryptocurrency
        }
    }

    fn instrument_class(&self) -> InstrumentClass {
        InstrumentClass::Spot
    }

    fn base_currency(&self) -> Option<Currency> {
        Some(self.base_currency)
    }
}

/// A listed equity
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Equity {
    /// Shared fields
    pub core: InstrumentCore,
    /// ISIN, when known
    pub isin: Option<Ustr>,
}

impl Equity {
    /// Creates a validated equity
    ///
    /// # Errors
    ///
    /// Returns an error if the core definition is invalid.
    pub fn new(core: InstrumentCore, isin: Option<Ustr>) -> ModelResult<Self> {
        core.validate()?;
        Ok(Self { core, isin })
    }
}

impl Instrument for Equity {
    fn core(&self) -> &InstrumentCore {
        &self.core
    }

    fn asset_class(&self) -> AssetClass {
        AssetClass::Equity
    }

    fn instrument_class(&self) -> InstrumentClass {
        InstrumentClass::Spot
    }
}
