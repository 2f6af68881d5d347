//! Betting and binary-outcome instruments

use common::{AssetClass, InstrumentClass, UnixNanos};
use serde::{Deserialize, Serialize};
use ustr::Ustr;

use super::{Instrument, InstrumentCore};
use crate::error::ModelResult;

/// One selection in a betting market
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Betting {
    /// Shared fields
    pub core: InstrumentCore,
    /// Event type, e.g. `Horse Racing`
    pub event_type_name: Ustr,
    /// Venue market identifier
    pub market_id: Ustr,
    /// Market type, e.g. `WIN`
    pub market_type: Ustr,
    /// Venue selection identifier
    pub selection_id: u64,
    /// Selection name
    pub selection_name: Ustr,
    /// Scheduled market start
    pub market_start_ns: UnixNanos,
}

impl Betting {
    /// Creates a validated betting instrument
    ///
    /// # Errors
    ///
    /// Returns an error if the core definition is invalid.
    pub fn new(
        core: InstrumentCore,
        event_type_name: Ustr,
        market_id: Ustr,
        market_type: Ustr,
        selection_id: u64,
        selection_name: Ustr,
        market_start_ns: UnixNanos,
    ) -> ModelResult<Self> {
        core.validate()?;
        Ok(Self {
            core,
            event_type_name,
            market_id,
            market_type,
            selection_id,
            selection_name,
            market_start_ns,
        })
    }
}

impl Instrument for Betting {
    fn core(&self) -> &InstrumentCore {
        &self.core
    }
    fn asset_class(&self) -> AssetClass {
        AssetClass::Alternative
    }
    fn instrument_class(&self) -> InstrumentClass {
        InstrumentClass::SportsBetting
    }
    fn activation_ns(&self) -> Option<UnixNanos> {
        Some(self.market_start_ns)
    }
}

/// A contract paying a fixed amount on one outcome
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BinaryOption {
    /// Shared fields
    pub core: InstrumentCore,
    /// Asset class of the underlying event
    pub asset_class: AssetClass,
    /// Outcome this contract pays on
    pub outcome: Option<Ustr>,
    /// Market description
    pub description: Option<Ustr>,
    /// Listing time
    pub activation_ns: UnixNanos,
    /// Resolution time
    pub expiration_ns: UnixNanos,
}

impl BinaryOption {
    /// Creates a validated binary option
    ///
    /// # Errors
    ///
    /// Returns an error if the definition is invalid or it expires before listing.
    pub fn new(
        core: InstrumentCore,
        asset_class: AssetClass,
        outcome: Option<Ustr>,
        description: Option<Ustr>,
        activation_ns: UnixNanos,
        expiration_ns: UnixNanos,
    ) -> ModelResult<Self> {
        core.validate()?;
        if expiration_ns < activation_ns {
            return Err(core.invalid("expiration before activation"));
        }
        Ok(Self {
            core,
            asset_class,
            outcome,
            description,
            activation_ns,
            expiration_ns,
        })
    }
}

impl Instrument for BinaryOption {
    fn core(&self) -> &InstrumentCore {
        &self.core
    }
    fn asset_class(&self) -> AssetClass {
        self.asset_class
    }
    fn instrument_class(&self) -> InstrumentClass {
        InstrumentClass::BinaryOption
    }
    fn activation_ns(&self) -> Option<UnixNanos> {
        Some(self.activation_ns)
    }
    fn expiration_ns(&self) -> Option<UnixNanos> {
        Some(self.expiration_ns)
    }
}
