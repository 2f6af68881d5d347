//! Trailing stop price calculation

use common::{OrderSideSpecified, Price, TrailingOffsetType, TriggerType};
use oms::{OrderAny, OrderKind, TrailingOffset};
use rust_decimal::Decimal;

use crate::error::{EngineError, EngineResult};

const BASIS_POINTS: Decimal = Decimal::from_parts(10_000, 0, 0, false, 0);

/// Computes new trigger and limit prices for a trailing stop.
///
/// A Buy stop trails above the market and only ever moves down; a Sell stop trails
/// below and only moves up. An order without a trigger yet, such as one that has just
/// reached its activation price, takes the first computed value. Either element of the returned pair is
/// `None` when that price would not tighten, and both are `None` when the reference
/// prices the trigger type needs are not known yet.
///
/// # Errors
///
/// Returns an error for non-trailing orders, unsupported trigger or offset types and
/// prices that cannot be represented at the increment's precision.
pub fn trailing_stop_calculate(
    price_increment: Price,
    order: &OrderAny,
    bid: Option<Price>,
    ask: Option<Price>,
    last: Option<Price>,
) -> EngineResult<(Option<Price>, Option<Price>)> {
    let (trailing, trigger_type, limit_offset, mut trigger_price, mut limit_price) =
        match *order.kind() {
            OrderKind::TrailingStopMarket {
                trigger_price,
                trigger_type,
                trailing,
            } => (trailing, trigger_type, None, trigger_price, None),
            OrderKind::TrailingStopLimit {
                price,
                trigger_price,
                trigger_type,
                limit_offset,
                trailing,
                ..
            } => (trailing, trigger_type, Some(limit_offset), trigger_price, price),
            _ => {
                return Err(EngineError::NotPassive {
                    client_order_id: order.client_order_id,
                    order_type: order.order_type(),
                    reason: "not a trailing stop",
                });
            }
        };
    let Some(side) = order.side_specified() else {
        return Err(EngineError::NotPassive {
            client_order_id: order.client_order_id,
            order_type: order.order_type(),
            reason: "order side is not specified",
        });
    };

    let compute = |offset: Decimal, basis: Price| -> EngineResult<Price> {
        let basis = basis.as_decimal();
        let delta = match trailing.offset_type {
            TrailingOffsetType::Price => offset,
            TrailingOffsetType::BasisPoints => basis * offset / BASIS_POINTS,
            TrailingOffsetType::Ticks => offset * price_increment.as_decimal(),
            offset_type => return Err(EngineError::UnsupportedOffsetType { offset_type }),
        };
        let value = match side {
            OrderSideSpecified::Buy => basis + delta,
            OrderSideSpecified::Sell => basis - delta,
        };
        Price::from_decimal_dp(value, price_increment.precision).map_err(|e| {
            EngineError::Trailing {
                client_order_id: order.client_order_id,
                reason: e.to_string(),
            }
        })
    };

    let mut new_trigger = None;
    let mut new_limit = None;
    let mut trail_from = |basis: Price| -> EngineResult<()> {
        let candidate = compute(trailing.offset, basis)?;
        if tightens(side, candidate, trigger_price) {
            trigger_price = Some(candidate);
            new_trigger = Some(candidate);
        }
        if let Some(limit_offset) = limit_offset {
            let candidate = compute(limit_offset, basis)?;
            if tightens(side, candidate, limit_price) {
                limit_price = Some(candidate);
                new_limit = Some(candidate);
            }
        }
        Ok(())
    };

    let quote = match side {
        OrderSideSpecified::Buy => ask,
        OrderSideSpecified::Sell => bid,
    };
    match trigger_type {
        TriggerType::Default | TriggerType::LastPrice | TriggerType::MarkPrice => {
            let Some(last) = last else {
                return Ok((None, None));
            };
            trail_from(last)?;
        }
        TriggerType::BidAsk => {
            let Some(quote) = quote else {
                return Ok((None, None));
            };
            trail_from(quote)?;
        }
        TriggerType::LastOrBidAsk => {
            if quote.is_none() && last.is_none() {
                return Ok((None, None));
            }
            // Whichever reference tightens more wins; later candidates only replace
            // earlier ones when they tighten further
            if let Some(quote) = quote {
                trail_from(quote)?;
            }
            if let Some(last) = last {
                trail_from(last)?;
            }
        }
        trigger_type => {
            return Err(EngineError::UnsupportedTrigger {
                trigger_type,
                context: "trailing stops",
            });
        }
    }

    Ok((new_trigger, new_limit))
}

/// Whether the market has reached a trailing stop's activation price.
///
/// A Buy trailing stop activates once the reference falls to the activation price, a
/// Sell once it rises to it. Orders without an activation price are always active.
#[must_use]
pub fn is_activation_reached(
    order: &OrderAny,
    bid: Option<Price>,
    ask: Option<Price>,
    last: Option<Price>,
) -> bool {
    let Some(TrailingOffset {
        activation_price,
        is_activated,
        ..
    }) = order.trailing_offset().copied()
    else {
        return true;
    };
    let Some(activation_price) = activation_price else {
        return true;
    };
    if is_activated {
        return true;
    }
    let Some(side) = order.side_specified() else {
        return false;
    };
    let quote = match side {
        OrderSideSpecified::Buy => ask,
        OrderSideSpecified::Sell => bid,
    };
    let reference = match order.trigger_type() {
        Some(TriggerType::BidAsk) => quote,
        _ => last.or(quote),
    };
    reference.is_some_and(|reference| match side {
        OrderSideSpecified::Buy => reference <= activation_price,
        OrderSideSpecified::Sell => reference >= activation_price,
    })
}

fn tightens(side: OrderSideSpecified, candidate: Price, current: Option<Price>) -> bool {
    match current {
        None => true,
        Some(current) => match side {
            OrderSideSpecified::Buy => candidate < current,
            OrderSideSpecified::Sell => candidate > current,
        },
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use common::{OrderSide, OrderType};
    use oms::OrderTestBuilder;
    use rstest::rstest;

    use super::*;

    fn px(value: &str) -> Price {
        Price::from_str(value).unwrap()
    }

    fn dec(value: &str) -> Decimal {
        Decimal::from_str(value).unwrap()
    }

    fn trailing_market(
        side: OrderSide,
        trigger_type: TriggerType,
        offset_type: TrailingOffsetType,
        offset: Decimal,
        trigger: Option<&str>,
    ) -> OrderAny {
        let mut builder = OrderTestBuilder::new(OrderType::TrailingStopMarket)
            .side(side)
            .trigger_type(trigger_type)
            .trailing_offset_type(offset_type)
            .trailing_offset(offset);
        if let Some(trigger) = trigger {
            builder = builder.trigger_price(px(trigger));
        }
        builder.build().unwrap()
    }

    #[rstest]
    #[case(OrderSide::Buy, TrailingOffsetType::Price, dec("0.00100"), "1.00100")]
    #[case(OrderSide::Sell, TrailingOffsetType::Price, dec("0.00100"), "0.99900")]
    #[case(OrderSide::Buy, TrailingOffsetType::BasisPoints, dec("50"), "1.00500")]
    #[case(OrderSide::Sell, TrailingOffsetType::BasisPoints, dec("50"), "0.99500")]
    #[case(OrderSide::Buy, TrailingOffsetType::Ticks, dec("3"), "1.00003")]
    #[case(OrderSide::Sell, TrailingOffsetType::Ticks, dec("3"), "0.99997")]
    fn test_initial_trigger_from_last(
        #[case] side: OrderSide,
        #[case] offset_type: TrailingOffsetType,
        #[case] offset: Decimal,
        #[case] expected: &str,
    ) {
        let order = trailing_market(side, TriggerType::LastPrice, offset_type, offset, None);
        let (trigger, limit) =
            trailing_stop_calculate(px("0.00001"), &order, None, None, Some(px("1.00000")))
                .unwrap();
        assert_eq!(trigger, Some(px(expected)));
        assert_eq!(limit, None);
    }

    #[rstest]
    #[case(OrderSide::Buy, "1.00200", "0.99900", Some("1.00000"))]
    #[case(OrderSide::Buy, "1.00200", "1.00300", None)]
    #[case(OrderSide::Sell, "0.99800", "1.00200", Some("1.00100"))]
    #[case(OrderSide::Sell, "0.99800", "0.99700", None)]
    fn test_trigger_only_tightens(
        #[case] side: OrderSide,
        #[case] current: &str,
        #[case] last: &str,
        #[case] expected: Option<&str>,
    ) {
        let order = trailing_market(
            side,
            TriggerType::LastPrice,
            TrailingOffsetType::Price,
            dec("0.00100"),
            Some(current),
        );
        let (trigger, _) =
            trailing_stop_calculate(px("0.00001"), &order, None, None, Some(px(last))).unwrap();
        assert_eq!(trigger, expected.map(px));
    }

    #[rstest]
    fn test_bid_ask_uses_side_quote() {
        let order = trailing_market(
            OrderSide::Sell,
            TriggerType::BidAsk,
            TrailingOffsetType::Price,
            dec("0.00010"),
            None,
        );
        let (trigger, _) = trailing_stop_calculate(
            px("0.00001"),
            &order,
            Some(px("1.00000")),
            Some(px("1.00020")),
            None,
        )
        .unwrap();
        assert_eq!(trigger, Some(px("0.99990")));
    }

    #[rstest]
    fn test_missing_reference_produces_no_update() {
        let order = trailing_market(
            OrderSide::Buy,
            TriggerType::BidAsk,
            TrailingOffsetType::Price,
            dec("0.00010"),
            None,
        );
        let result =
            trailing_stop_calculate(px("0.00001"), &order, None, None, Some(px("1.00000")));
        assert_eq!(result, Ok((None, None)));
    }

    #[rstest]
    fn test_trailing_stop_limit_moves_limit() {
        let order = OrderTestBuilder::new(OrderType::TrailingStopLimit)
            .side(OrderSide::Sell)
            .trigger_type(TriggerType::LastPrice)
            .trailing_offset_type(TrailingOffsetType::Price)
            .trailing_offset(dec("0.00100"))
            .limit_offset(dec("0.00150"))
            .build()
            .unwrap();
        let (trigger, limit) =
            trailing_stop_calculate(px("0.00001"), &order, None, None, Some(px("1.00000")))
                .unwrap();
        assert_eq!(trigger, Some(px("0.99900")));
        assert_eq!(limit, Some(px("0.99850")));
    }

    #[rstest]
    fn test_last_or_bid_ask_takes_tighter_reference() {
        let order = trailing_market(
            OrderSide::Sell,
            TriggerType::LastOrBidAsk,
            TrailingOffsetType::Price,
            dec("0.00010"),
            None,
        );
        let (trigger, _) = trailing_stop_calculate(
            px("0.00001"),
            &order,
            Some(px("1.00000")),
            Some(px("1.00010")),
            Some(px("1.00005")),
        )
        .unwrap();
        assert_eq!(trigger, Some(px("0.99995")));
    }

    #[rstest]
    fn test_unsupported_trigger_type() {
        let order = trailing_market(
            OrderSide::Buy,
            TriggerType::IndexPrice,
            TrailingOffsetType::Price,
            dec("0.00010"),
            None,
        );
        let result =
            trailing_stop_calculate(px("0.00001"), &order, None, None, Some(px("1.00000")));
        assert!(matches!(result, Err(EngineError::UnsupportedTrigger { .. })));
    }

    #[rstest]
    fn test_non_trailing_order_is_refused() {
        let order = OrderTestBuilder::new(OrderType::StopMarket)
            .trigger_price(px("1.00000"))
            .build()
            .unwrap();
        let result = trailing_stop_calculate(px("0.00001"), &order, None, None, None);
        assert!(result.is_err());
    }

    #[rstest]
    #[case(OrderSide::Buy, "1.00100", false)]
    #[case(OrderSide::Buy, "0.99900", true)]
    #[case(OrderSide::Sell, "0.99900", false)]
    #[case(OrderSide::Sell, "1.00100", true)]
    fn test_activation(#[case] side: OrderSide, #[case] last: &str, #[case] reached: bool) {
        let order = OrderTestBuilder::new(OrderType::TrailingStopMarket)
            .side(side)
            .trigger_type(TriggerType::LastPrice)
            .trailing_offset(dec("0.00010"))
            .activation_price(px("1.00000"))
            .build()
            .unwrap();
        assert!(!order.trailing_offset().unwrap().is_activated);
        assert_eq!(
            is_activation_reached(&order, None, None, Some(px(last))),
            reached
        );
    }
}
