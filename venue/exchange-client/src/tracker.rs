//! Authoritative local view of outstanding orders, keyed by client order id
//! and indexed by `(side, price-bucketed-to-1-cent)`. The venue exposes no
//! order-query endpoint, so this is the only source of truth the controller
//! has for what is resting on the book; it must stay consistent at every
//! public-call boundary.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderState {
    Open,
    Done,
}

#[derive(Debug, Clone)]
pub struct Order {
    pub client_order_id: u32,
    pub market_id: u32,
    pub side: Side,
    pub price: Decimal,
    pub size: Decimal,
    pub submitted_at: DateTime<Utc>,
    pub state: OrderState,
}

/// Buckets a price to the nearest cent for the secondary index. The
/// controller never intentionally places two same-side orders within one
/// cent of each other, so this bucket key is expected to be unique per side.
fn price_bucket(price: Decimal) -> i64 {
    (price * Decimal::from(100)).round().to_i64().unwrap_or(0)
}

#[derive(Default)]
pub struct OrderTracker {
    by_id: HashMap<u32, Order>,
    by_side_price: HashMap<(Side, i64), u32>,
    history: Vec<Order>,
}

impl OrderTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, order: Order) {
        let key = (order.side, price_bucket(order.price));
        self.by_side_price.insert(key, order.client_order_id);
        self.by_id.insert(order.client_order_id, order);
    }

    /// Removes the order, moving it to history. Returns the removed order if
    /// it was present (callers treat a missing id as already-filled).
    pub fn remove(&mut self, id: u32) -> Option<Order> {
        let mut order = self.by_id.remove(&id)?;
        let key = (order.side, price_bucket(order.price));
        if self.by_side_price.get(&key) == Some(&id) {
            self.by_side_price.remove(&key);
        }
        order.state = OrderState::Done;
        self.history.push(order.clone());
        Some(order)
    }

    pub fn contains(&self, id: u32) -> bool {
        self.by_id.contains_key(&id)
    }

    /// Returns the first order matching `side` within `tol` of `price`.
    pub fn find_by_price(&self, side: Side, price: Decimal, tol: Decimal) -> Option<&Order> {
        let key = (side, price_bucket(price));
        if let Some(id) = self.by_side_price.get(&key) {
            if let Some(order) = self.by_id.get(id) {
                if (order.price - price).abs() <= tol {
                    return Some(order);
                }
            }
        }
        self.by_id
            .values()
            .find(|o| o.side == side && (o.price - price).abs() <= tol)
    }

    pub fn list_open(&self) -> impl Iterator<Item = &Order> {
        self.by_id.values()
    }

    pub fn open_on_side(&self, side: Side) -> impl Iterator<Item = &Order> {
        self.by_id.values().filter(move |o| o.side == side)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(id: u32, side: Side, price: &str) -> Order {
        Order {
            client_order_id: id,
            market_id: 1,
            side,
            price: price.parse().unwrap(),
            size: "0.001".parse().unwrap(),
            submitted_at: Utc::now(),
            state: OrderState::Open,
        }
    }

    #[test]
    fn add_then_find_by_price() {
        let mut tracker = OrderTracker::new();
        tracker.add(order(1, Side::Buy, "70000.01"));
        let found = tracker
            .find_by_price(Side::Buy, "70000.01".parse().unwrap(), "0.01".parse().unwrap())
            .unwrap();
        assert_eq!(found.client_order_id, 1);
    }

    #[test]
    fn remove_moves_to_history_and_clears_indices() {
        let mut tracker = OrderTracker::new();
        tracker.add(order(1, Side::Sell, "70010"));
        assert_eq!(tracker.len(), 1);
        let removed = tracker.remove(1).unwrap();
        assert_eq!(removed.state, OrderState::Done);
        assert_eq!(tracker.len(), 0);
        assert!(tracker
            .find_by_price(Side::Sell, "70010".parse().unwrap(), "0.01".parse().unwrap())
            .is_none());
    }

    #[test]
    fn remove_missing_id_returns_none() {
        let mut tracker = OrderTracker::new();
        assert!(tracker.remove(999).is_none());
    }

    #[test]
    fn id_index_size_tracks_places_minus_removes() {
        let mut tracker = OrderTracker::new();
        for id in 1..=5u32 {
            tracker.add(order(id, Side::Buy, "100"));
        }
        tracker.remove(2);
        tracker.remove(4);
        assert_eq!(tracker.len(), 3);
    }
}
