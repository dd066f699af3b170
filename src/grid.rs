//! Grid ladder computation: window geometry, position-skewed side split,
//! target price ladders, and the diff against currently open orders that
//! turns a plan into a minimal set of cancels and places.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use exchange_client::{OrderTracker, Side};

#[derive(Debug, Clone)]
pub struct GridConfig {
    pub total_orders: u32,
    pub window_percent: Decimal,
    pub safe_gap: Decimal,
    pub grid_spacing: Decimal,
    pub order_size: Decimal,
    pub max_multiplier: Decimal,
    /// Minimum price increment target prices are discretized to. Not named
    /// explicitly in the external-interfaces table; taken to match the 1c
    /// bucket granularity the diff step already uses.
    pub tick_size: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridPlan {
    pub mid: Decimal,
    pub window: (Decimal, Decimal),
    pub sell_prices: Vec<Decimal>,
    pub buy_prices: Vec<Decimal>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GridAction {
    Place { side: Side, price: Decimal },
    Cancel { order_id: u32 },
}

fn discretize(price: Decimal, tick_size: Decimal) -> Decimal {
    if tick_size.is_zero() {
        return price;
    }
    (price / tick_size).round() * tick_size
}

fn bucket(price: Decimal) -> i64 {
    (price * Decimal::from(100))
        .round()
        .to_i64()
        .unwrap_or(0)
}

/// Steps 1-3: geometry, side split, and the target price ladders.
pub fn plan(bid: Decimal, ask: Decimal, position: Decimal, config: &GridConfig) -> GridPlan {
    let mid = (bid + ask) / Decimal::from(2);
    let half = Decimal::ONE - config.window_percent;
    let upper = Decimal::ONE + config.window_percent;
    let window = (mid * half, mid * upper);

    let k = (position / config.order_size).abs();
    let (buy_ratio, sell_ratio) = side_ratios(position, k, config.max_multiplier);

    let total = Decimal::from(config.total_orders);
    let sell_count = (total * sell_ratio).floor().to_u32().unwrap_or(0) as usize;
    let buy_count = (total * buy_ratio).floor().to_u32().unwrap_or(0) as usize;

    let sell_prices = ladder(ask + config.safe_gap, config.grid_spacing, sell_count, window.1, true, config.tick_size);
    let buy_prices = ladder(bid - config.safe_gap, -config.grid_spacing, buy_count, window.0, false, config.tick_size);

    GridPlan { mid, window, sell_prices, buy_prices }
}

/// `p > 0`: same-as-position (reducing) side is sell; `p < 0`: mirror.
/// At or above the position cap only the reducing side is quoted.
fn side_ratios(position: Decimal, k: Decimal, k_max: Decimal) -> (Decimal, Decimal) {
    use std::cmp::Ordering;

    if position.is_zero() {
        return (Decimal::new(5, 1), Decimal::new(5, 1));
    }

    if k >= k_max {
        return match position.cmp(&Decimal::ZERO) {
            Ordering::Greater => (Decimal::ZERO, Decimal::ONE), // buy_ratio, sell_ratio
            Ordering::Less => (Decimal::ONE, Decimal::ZERO),
            Ordering::Equal => (Decimal::new(5, 1), Decimal::new(5, 1)),
        };
    }

    let r = k / k_max;
    let half = Decimal::new(5, 1);
    match position.cmp(&Decimal::ZERO) {
        Ordering::Greater => (half * (Decimal::ONE - r), half * (Decimal::ONE + r)),
        Ordering::Less => (half * (Decimal::ONE + r), half * (Decimal::ONE - r)),
        Ordering::Equal => (half, half),
    }
}

/// Walks `count` levels from `start`, stepping by `step` (signed — negative
/// walks down for the buy side), stopping early at `count` levels or the
/// first level outside the window bound. `ascending` selects whether the
/// bound is an upper or lower bound.
fn ladder(start: Decimal, step: Decimal, count: usize, bound: Decimal, ascending: bool, tick_size: Decimal) -> Vec<Decimal> {
    let mut out = Vec::with_capacity(count);
    let mut price = start;
    for _ in 0..count {
        let in_bounds = if ascending { price <= bound } else { price >= bound };
        if !in_bounds {
            break;
        }
        out.push(discretize(price, tick_size));
        price += step;
    }
    out
}

/// Step 4: symmetric difference between the target ladder and the open
/// orders on each side, bucketed to one cent. Cancels are ordered
/// farthest-from-mid first, places nearest-to-mid first, and all cancels
/// precede all places.
pub fn diff(plan: &GridPlan, tracker: &OrderTracker) -> Vec<GridAction> {
    let mut cancels: Vec<(Decimal, u32)> = Vec::new();
    let mut places: Vec<(Decimal, Side, Decimal)> = Vec::new();

    for (side, targets) in [(Side::Sell, &plan.sell_prices), (Side::Buy, &plan.buy_prices)] {
        let target_buckets: std::collections::HashSet<i64> = targets.iter().map(|p| bucket(*p)).collect();
        let open_buckets: std::collections::HashMap<i64, (u32, Decimal)> = tracker
            .open_on_side(side)
            .map(|o| (bucket(o.price), (o.client_order_id, o.price)))
            .collect();

        for target in targets {
            if !open_buckets.contains_key(&bucket(*target)) {
                places.push(((*target - plan.mid).abs(), side, *target));
            }
        }

        for (b, (order_id, price)) in &open_buckets {
            if !target_buckets.contains(b) {
                cancels.push(((*price - plan.mid).abs(), *order_id));
            }
        }
    }

    cancels.sort_by(|a, b| b.0.cmp(&a.0));
    places.sort_by(|a, b| a.0.cmp(&b.0));

    let mut actions: Vec<GridAction> = cancels.into_iter().map(|(_, order_id)| GridAction::Cancel { order_id }).collect();
    actions.extend(places.into_iter().map(|(_, side, price)| GridAction::Place { side, price }));
    actions
}
