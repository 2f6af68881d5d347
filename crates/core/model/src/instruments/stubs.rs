//! Instrument fixtures for tests

use common::{AssetClass, Currency, InstrumentId, Price, Quantity, UnixNanos};
use rust_decimal::Decimal;
use ustr::Ustr;

use super::{
    CryptoPerpetual, CurrencyPair, Equity, FuturesContract, InstrumentCore,
    derivatives::ContractTerms,
};

fn core(id: &str, quote: Currency, price_increment: &str, size_increment: &str) -> InstrumentCore {
    let instrument_id: InstrumentId = id.parse().expect("valid instrument id");
    InstrumentCore::new(
        instrument_id,
        instrument_id.symbol,
        quote,
        price_increment.parse::<Price>().expect("valid price"),
        size_increment.parse::<Quantity>().expect("valid quantity"),
        UnixNanos::default(),
        UnixNanos::default(),
    )
}

/// `AUD/USD.SIM`, five decimal prices and whole unit sizes
#[must_use]
pub fn audusd_sim() -> CurrencyPair {
    CurrencyPair::new(
        core("AUD/USD.SIM", Currency::USD(), "0.00001", "1"),
        Currency::AUD(),
    )
    .expect("valid stub")
}

/// `BTCUSDT.BINANCE` spot
#[must_use]
pub fn btcusdt_binance() -> CurrencyPair {
    CurrencyPair::new(
        core("BTCUSDT.BINANCE", Currency::USDT(), "0.01", "0.000001")
            .with_fees(Decimal::new(1, 3), Decimal::new(1, 3)),
        Currency::BTC(),
    )
    .expect("valid stub")
}

/// `ETHUSDT-PERP.BINANCE` linear perpetual
#[must_use]
pub fn ethusdt_perp_binance() -> CryptoPerpetual {
    CryptoPerpetual::new(
        core("ETHUSDT-PERP.BINANCE", Currency::USDT(), "0.01", "0.001")
            .with_quantity_limits(
                Some("0.001".parse().expect("qty")),
                Some("10000.000".parse().expect("qty")),
            )
            .with_fees(Decimal::new(2, 4), Decimal::new(4, 4)),
        Currency::ETH(),
        Currency::USDT(),
        false,
    )
    .expect("valid stub")
}

/// `XBTUSD.BITMEX` inverse perpetual settled in BTC
#[must_use]
pub fn xbtusd_bitmex() -> CryptoPerpetual {
    CryptoPerpetual::new(
        core("XBTUSD.BITMEX", Currency::USD(), "0.5", "1"),
        Currency::BTC(),
        Currency::BTC(),
        true,
    )
    .expect("valid stub")
}

/// `AAPL.XNAS` equity
#[must_use]
pub fn aapl_xnas() -> Equity {
    Equity::new(
        core("AAPL.XNAS", Currency::USD(), "0.01", "1"),
        Some(Ustr::from("US0378331005")),
    )
    .expect("valid stub")
}

/// `ESZ21.GLBX` E-mini future
#[must_use]
pub fn es_futures() -> FuturesContract {
    FuturesContract::new(
        core("ESZ21.GLBX", Currency::USD(), "0.25", "1")
            .with_multiplier("50".parse().expect("qty")),
        ContractTerms {
            asset_class: AssetClass::Index,
            exchange: Some(Ustr::from("XCME")),
            underlying: Ustr::from("ES"),
            activation_ns: UnixNanos::new(1_622_842_200_000_000_000),
            expiration_ns: UnixNanos::new(1_639_740_600_000_000_000),
        },
    )
    .expect("valid stub")
}
