//! Price levels and their sort key

use std::{
    cmp::Ordering,
    fmt::{self, Display, Formatter},
};

use common::{OrderSideSpecified, Price, QuantityRaw};
use indexmap::IndexMap;
use model::data::BookOrder;
use rust_decimal::Decimal;

/// Sort key for a ladder: bids descending, asks ascending
#[derive(Clone, Copy, Debug, Eq)]
pub struct BookPrice {
    /// Level price
    pub value: Price,
    /// Side the level belongs to
    pub side: OrderSideSpecified,
}

impl BookPrice {
    /// Creates a sort key
    #[must_use]
    pub const fn new(value: Price, side: OrderSideSpecified) -> Self {
        Self { value, side }
    }
}

impl PartialEq for BookPrice {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl PartialOrd for BookPrice {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BookPrice {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.side {
            OrderSideSpecified::Buy => other.value.cmp(&self.value),
            OrderSideSpecified::Sell => self.value.cmp(&other.value),
        }
    }
}

impl Display for BookPrice {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

/// Orders resting at one price, in time priority
#[derive(Clone, Debug)]
pub struct BookLevel {
    /// Level price
    pub price: BookPrice,
    pub(crate) orders: IndexMap<u64, BookOrder>,
}

impl BookLevel {
    /// Creates an empty level
    #[must_use]
    pub fn new(price: BookPrice) -> Self {
        Self {
            price,
            orders: IndexMap::new(),
        }
    }

    /// Creates a level holding a single order
    ///
    /// Returns `None` for an order without a side.
    #[must_use]
    pub fn from_order(order: BookOrder) -> Option<Self> {
        let side = order.side.as_specified()?;
        let mut level = Self::new(BookPrice::new(order.price, side));
        level.orders.insert(order.order_id, order);
        Some(level)
    }

    /// Side of the level
    #[must_use]
    pub const fn side(&self) -> OrderSideSpecified {
        self.price.side
    }

    /// Number of orders
    #[must_use]
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    /// True when no orders rest here
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Time-priority head
    #[must_use]
    pub fn first(&self) -> Option<&BookOrder> {
        self.orders.first().map(|(_, order)| order)
    }

    /// Orders in time priority
    pub fn iter(&self) -> impl Iterator<Item = &BookOrder> {
        self.orders.values()
    }

    /// Copies of all orders in time priority
    #[must_use]
    pub fn get_orders(&self) -> Vec<BookOrder> {
        self.orders.values().copied().collect()
    }

    /// Looks up an order by id
    #[must_use]
    pub fn get(&self, order_id: u64) -> Option<&BookOrder> {
        self.orders.get(&order_id)
    }

    /// Total size as `f64`
    #[must_use]
    pub fn size(&self) -> f64 {
        self.orders.values().map(|o| o.size.as_f64()).sum()
    }

    /// Total size in raw units
    #[must_use]
    pub fn size_raw(&self) -> QuantityRaw {
        self.orders
            .values()
            .fold(0, |acc: QuantityRaw, o| acc.saturating_add(o.size.raw))
    }

    /// Exact total size
    #[must_use]
    pub fn size_decimal(&self) -> Decimal {
        self.orders.values().map(|o| o.size.as_decimal()).sum()
    }

    /// Exact total notional (`price * size`)
    #[must_use]
    pub fn exposure_decimal(&self) -> Decimal {
        self.orders.values().map(BookOrder::exposure).sum()
    }

    /// Appends an order at the back of the queue
    pub fn add(&mut self, order: BookOrder) {
        debug_assert_eq!(order.price, self.price.value);
        self.orders.insert(order.order_id, order);
    }

    /// Updates an order in place.
    ///
    /// A size reduction keeps queue position; a size increase (or an unknown id) moves the
    /// order to the back; a zero size removes it.
    pub fn update(&mut self, order: BookOrder) {
        debug_assert_eq!(order.price, self.price.value);
        if order.size.is_zero() {
            self.orders.shift_remove(&order.order_id);
            return;
        }
        match self.orders.get_mut(&order.order_id) {
            Some(existing) if order.size <= existing.size => *existing = order,
            _ => {
                self.orders.shift_remove(&order.order_id);
                self.orders.insert(order.order_id, order);
            }
        }
    }

    /// Removes an order by id, returning it if present
    pub fn remove_by_id(&mut self, order_id: u64) -> Option<BookOrder> {
        self.orders.shift_remove(&order_id)
    }
}

impl PartialEq for BookLevel {
    fn eq(&self, other: &Self) -> bool {
        self.price == other.price
    }
}

impl Eq for BookLevel {}

impl PartialOrd for BookLevel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BookLevel {
    fn cmp(&self, other: &Self) -> Ordering {
        self.price.cmp(&other.price)
    }
}

#[cfg(test)]
mod tests {
    use common::{OrderSide, Quantity};
    use rstest::rstest;

    use super::*;

    fn order(size: &str, id: u64) -> BookOrder {
        BookOrder::new(
            OrderSide::Buy,
            "100.00".parse().unwrap(),
            size.parse::<Quantity>().unwrap(),
            id,
        )
    }

    #[rstest]
    fn test_bid_prices_sort_descending() {
        let high = BookPrice::new("2.0".parse().unwrap(), OrderSideSpecified::Buy);
        let low = BookPrice::new("1.0".parse().unwrap(), OrderSideSpecified::Buy);
        assert!(high < low);
    }

    #[rstest]
    fn test_ask_prices_sort_ascending() {
        let high = BookPrice::new("2.0".parse().unwrap(), OrderSideSpecified::Sell);
        let low = BookPrice::new("1.0".parse().unwrap(), OrderSideSpecified::Sell);
        assert!(low < high);
    }

    #[rstest]
    fn test_size_down_keeps_priority() {
        let mut level = BookLevel::from_order(order("10", 1)).unwrap();
        level.add(order("20", 2));
        level.update(order("5", 1));
        assert_eq!(level.first().unwrap().order_id, 1);
        assert_eq!(level.size_decimal(), Decimal::from(25));
    }

    #[rstest]
    fn test_size_up_loses_priority() {
        let mut level = BookLevel::from_order(order("10", 1)).unwrap();
        level.add(order("20", 2));
        level.update(order("15", 1));
        let ids: Vec<u64> = level.iter().map(|o| o.order_id).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[rstest]
    fn test_zero_size_update_removes() {
        let mut level = BookLevel::from_order(order("10", 1)).unwrap();
        level.update(order("0", 1));
        assert!(level.is_empty());
    }

    #[rstest]
    fn test_exposure() {
        let mut level = BookLevel::from_order(order("10", 1)).unwrap();
        level.add(order("5", 2));
        assert_eq!(level.exposure_decimal(), Decimal::from(1500));
        assert_eq!(level.size_raw(), 15_000_000_000);
    }
}
