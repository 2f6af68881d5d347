//! Exchange-listed futures and options

use common::{AssetClass, InstrumentClass, OptionKind, Price, UnixNanos};
use serde::{Deserialize, Serialize};
use ustr::Ustr;

use super::{Instrument, InstrumentCore};
use crate::error::ModelResult;

/// Listing window and venue shared by dated contracts
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractTerms {
    /// Asset class of the underlying
    pub asset_class: AssetClass,
    /// Listing exchange (MIC)
    pub exchange: Option<Ustr>,
    /// Underlying symbol
    pub underlying: Ustr,
    /// Listing time
    pub activation_ns: UnixNanos,
    /// Expiry time
    pub expiration_ns: UnixNanos,
}

impl ContractTerms {
    fn check(&self, core: &InstrumentCore) -> ModelResult<()> {
        if self.expiration_ns < self.activation_ns {
            return Err(core.invalid("expiration before activation"));
        }
        Ok(())
    }
}

macro_rules! dated_contract {
    ($name:ident, $class:expr) => {
        impl Instrument for $name {
            fn core(&self) -> &InstrumentCore {
                &self.core
            }
            fn asset_class(&self) -> AssetClass {
                self.terms.asset_class
            }
            fn instrument_class(&self) -> InstrumentClass {
                $class
            }
            fn underlying(&self) -> Option<Ustr> {
                Some(self.terms.underlying)
            }
            fn activation_ns(&self) -> Option<UnixNanos> {
                Some(self.terms.activation_ns)
            }
            fn expiration_ns(&self) -> Option<UnixNanos> {
                Some(self.terms.expiration_ns)
            }
            dated_contract!(@option $name);
        }
    };
    (@option OptionContract) => {
        fn option_kind(&self) -> Option<OptionKind> {
            Some(self.option_kind)
        }
        fn strike_price(&self) -> Option<Price> {
            Some(self.strike_price)
        }
    };
    (@option $other:ident) => {};
}

/// A dated futures contract
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FuturesContract {
    /// Shared fields
    pub core: InstrumentCore,
    /// Listing terms
    pub terms: ContractTerms,
}

impl FuturesContract {
    /// Creates a validated futures contract
    ///
    /// # Errors
    ///
    /// Returns an error if the definition is invalid.
    pub fn new(core: InstrumentCore, terms: ContractTerms) -> ModelResult<Self> {
        core.validate()?;
        terms.check(&core)?;
        Ok(Self { core, terms })
    }
}

/// A calendar or inter-commodity futures spread
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FuturesSpread {
    /// Shared fields
    pub core: InstrumentCore,
    /// Listing terms
    pub terms: ContractTerms,
    /// Venue strategy code
    pub strategy_type: Ustr,
}

impl FuturesSpread {
    /// Creates a validated futures spread
    ///
    /// # Errors
    ///
    /// Returns an error if the definition is invalid.
    pub fn new(core: InstrumentCore, terms: ContractTerms, strategy_type: Ustr) -> ModelResult<Self> {
        core.validate()?;
        terms.check(&core)?;
        Ok(Self {
            core,
            terms,
            strategy_type,
        })
    }
}

/// A listed option
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OptionContract {
    /// Shared fields
    pub core: InstrumentCore,
    /// Listing terms
    pub terms: ContractTerms,
    /// Put or call
    pub option_kind: OptionKind,
    /// Strike
    pub strike_price: Price,
}

impl OptionContract {
    /// Creates a validated option contract
    ///
    /// # Errors
    ///
    /// Returns an error if the definition is invalid or the strike precision differs.
    pub fn new(
        core: InstrumentCore,
        terms: ContractTerms,
        option_kind: OptionKind,
        strike_price: Price,
    ) -> ModelResult<Self> {
        core.validate()?;
        terms.check(&core)?;
        if strike_price.precision != core.price_precision {
            return Err(core.invalid("strike_price precision != price_precision"));
        }
        Ok(Self {
            core,
            terms,
            option_kind,
            strike_price,
        })
    }
}

/// A multi-leg option strategy
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OptionSpread {
    /// Shared fields
    pub core: InstrumentCore,
    /// Listing terms
    pub terms: ContractTerms,
    /// Venue strategy code
    pub strategy_type: Ustr,
}

impl OptionSpread {
    /// Creates a validated option spread
    ///
    /// # Errors
    ///
    /// Returns an error if the definition is invalid.
    pub fn new(core: InstrumentCore, terms: ContractTerms, strategy_type: Ustr) -> ModelResult<Self> {
        core.validate()?;
        terms.check(&core)?;
        Ok(Self {
            core,
            terms,
            strategy_type,
        })
    }
}

dated_contract!(FuturesContract, InstrumentClass::Future);
dated_contract!(FuturesSpread, InstrumentClass::FuturesSpread);
dated_contract!(OptionContract, InstrumentClass::Option);
dated_contract!(OptionSpread, InstrumentClass::OptionSpread);
