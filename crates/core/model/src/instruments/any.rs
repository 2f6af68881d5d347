//! Sum type over all instrument variants

use common::{AssetClass, Currency, InstrumentClass, OptionKind, Price, UnixNanos};
use serde::{Deserialize, Serialize};
use ustr::Ustr;

use super::{
    Betting, BinaryOption, CryptoFuture, CryptoOption, CryptoPerpetual, CurrencyPair, Equity,
    FuturesContract, FuturesSpread, Instrument, InstrumentCore, OptionContract, OptionSpread,
};

/// Any instrument definition
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum InstrumentAny {
    Betting(Betting),
    BinaryOption(BinaryOption),
    CryptoFuture(CryptoFuture),
    CryptoOption(CryptoOption),
    CryptoPerpetual(CryptoPerpetual),
    CurrencyPair(CurrencyPair),
    Equity(Equity),
    FuturesContract(FuturesContract),
    FuturesSpread(FuturesSpread),
    OptionContract(OptionContract),
    OptionSpread(OptionSpread),
}

macro_rules! delegate {
    ($self:ident, $inner:ident => $body:expr) => {
        match $self {
            Self::Betting($inner) => $body,
            Self::BinaryOption($inner) => $body,
            Self::CryptoFuture($inner) => $body,
            Self::CryptoOption($inner) => $body,
            Self::CryptoPerpetual($inner) => $body,
            Self::CurrencyPair($inner) => $body,
            Self::Equity($inner) => $body,
            Self::FuturesContract($inner) => $body,
            Self::FuturesSpread($inner) => $body,
            Self::OptionContract($inner) => $body,
            Self::OptionSpread($inner) => $body,
        }
    };
}

impl Instrument for InstrumentAny {
    fn core(&self) -> &InstrumentCore {
        delegate!(self, i => i.core())
    }
    fn asset_class(&self) -> AssetClass {
        delegate!(self, i => i.asset_class())
    }
    fn instrument_class(&self) -> InstrumentClass {
        delegate!(self, i => i.instrument_class())
    }
    fn base_currency(&self) -> Option<Currency> {
        delegate!(self, i => i.base_currency())
    }
    fn settlement_currency(&self) -> Currency {
        delegate!(self, i => i.settlement_currency())
    }
    fn is_inverse(&self) -> bool {
        delegate!(self, i => i.is_inverse())
    }
    fn underlying(&self) -> Option<Ustr> {
        delegate!(self, i => i.underlying())
    }
    fn option_kind(&self) -> Option<OptionKind> {
        delegate!(self, i => i.option_kind())
    }
    fn strike_price(&self) -> Option<Price> {
        delegate!(self, i => i.strike_price())
    }
    fn activation_ns(&self) -> Option<UnixNanos> {
        delegate!(self, i => i.activation_ns())
    }
    fn expiration_ns(&self) -> Option<UnixNanos> {
        delegate!(self, i => i.expiration_ns())
    }
}

macro_rules! into_any {
    ($($variant:ident),*) => {
        $(
            impl From<$variant> for InstrumentAny {
                fn from(value: $variant) -> Self {
                    Self::$variant(value)
                }
            }
        )*
    };
}

into_any!(
    Betting,
    BinaryOption,
    CryptoFuture,
    CryptoOption,
    CryptoPerpetual,
    CurrencyPair,
    Equity,
    FuturesContract,
    FuturesSpread,
    OptionContract,
    OptionSpread
);

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::instruments::stubs::*;

    #[rstest]
    fn test_delegation_preserves_variant_behaviour() {
        let any = InstrumentAny::from(xbtusd_bitmex());
        assert!(any.is_inverse());
        assert_eq!(any.instrument_class(), InstrumentClass::Swap);
        assert_eq!(any.id().to_string(), "XBTUSD.BITMEX");

        let any = InstrumentAny::from(es_futures());
        assert_eq!(any.underlying().map(|u| u.to_string()), Some("ES".to_string()));
        assert!(any.expiration_ns().is_some());
    }

    #[rstest]
    fn test_serde_round_trip() {
        let any = InstrumentAny::from(audusd_sim());
        let json = serde_json::to_string(&any).unwrap();
        let back: InstrumentAny = serde_json::from_str(&json).unwrap();
        assert_eq!(back, any);
    }
}
