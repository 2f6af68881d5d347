//! Contingent order lists

use std::fmt;

use common::{InstrumentId, OrderListId, StrategyId, UnixNanos};

use crate::{
    error::{OmsResult, OrderError},
    order::OrderAny,
};

/// Orders submitted together, typically a bracket or OCO pair.
///
/// Every order shares the list's instrument and strategy.
#[derive(Clone, Debug, PartialEq)]
pub struct OrderList {
    /// List identifier
    pub id: OrderListId,
    /// Instrument of every order
    pub instrument_id: InstrumentId,
    /// Strategy of every order
    pub strategy_id: StrategyId,
    /// Orders in submission order; the first is the parent of an OTO bracket
    pub orders: Vec<OrderAny>,
    /// Creation time
    pub ts_init: UnixNanos,
}

impl OrderList {
    /// Creates a list from `orders`
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::InvalidOrderList`] when `orders` is empty or the orders
    /// disagree on instrument or strategy.
    pub fn new(id: OrderListId, orders: Vec<OrderAny>, ts_init: UnixNanos) -> OmsResult<Self> {
        let Some(first) = orders.first() else {
            return Err(OrderError::InvalidOrderList {
                reason: format!("{id} has no orders"),
            });
        };
        let instrument_id = first.instrument_id;
        let strategy_id = first.strategy_id;
        if let Some(order) = orders
            .iter()
            .find(|o| o.instrument_id != instrument_id || o.strategy_id != strategy_id)
        {
            return Err(OrderError::InvalidOrderList {
                reason: format!(
                    "{} does not match instrument {instrument_id} and strategy {strategy_id}",
                    order.client_order_id
                ),
            });
        }
        Ok(Self {
            id,
            instrument_id,
            strategy_id,
            orders,
            ts_init,
        })
    }

    /// First order of the list
    #[must_use]
    pub fn first(&self) -> Option<&OrderAny> {
        self.orders.first()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

impl fmt::Display for OrderList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<String> = self
            .orders
            .iter()
            .map(|o| o.client_order_id.to_string())
            .collect();
        write!(
            f,
            "OrderList(id={}, instrument_id={}, strategy_id={}, orders=[{}])",
            self.id,
            self.instrument_id,
            self.strategy_id,
            ids.join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::OrderTestBuilder;
    use common::{ClientOrderId, OrderType, StrategyId};

    #[test]
    fn test_order_list_requires_orders() {
        let result = OrderList::new(OrderListId::from("OL-1"), vec![], UnixNanos::default());
        assert!(matches!(result, Err(OrderError::InvalidOrderList { .. })));
    }

    #[test]
    fn test_order_list_rejects_mixed_strategies() {
        let a = OrderTestBuilder::new(OrderType::Market).build().unwrap();
        let b = OrderTestBuilder::new(OrderType::Market)
            .client_order_id(ClientOrderId::from("O-2"))
            .strategy_id(StrategyId::from("S-002"))
            .build()
            .unwrap();
        let result = OrderList::new(OrderListId::from("OL-1"), vec![a, b], UnixNanos::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_order_list_display() {
        let a = OrderTestBuilder::new(OrderType::Market).build().unwrap();
        let list = OrderList::new(OrderListId::from("OL-1"), vec![a], UnixNanos::default()).unwrap();
        assert_eq!(list.len(), 1);
        assert!(list.to_string().contains("orders=[O-1]"));
    }
}
