//! External collaborators the indicator engine and grid controller treat as
//! given interfaces: the OHLCV candle feed and the source of the current
//! position. Both are out of scope for this specification beyond the
//! interface they present (see the design notes' open questions on where
//! position updates actually originate).

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::errors::GridBotResult;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candle {
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub interval_start: i64,
}

/// Finite, not restartable: a single call returns whatever history is
/// currently available, oldest-first.
#[async_trait]
pub trait OhlcvFeed: Send + Sync {
    async fn get_candles(&self, symbol: &str, interval: &str, limit: usize) -> GridBotResult<Vec<Candle>>;
}

/// Fetches candles from the venue's own REST endpoint. The exact shape of
/// that endpoint is out of scope for this specification; this
/// implementation is provided so the bot has a working default, not as a
/// verified contract.
pub struct HttpOhlcvFeed {
    client: reqwest::Client,
    base_url: String,
}

impl HttpOhlcvFeed {
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }
}

#[async_trait]
impl OhlcvFeed for HttpOhlcvFeed {
    async fn get_candles(&self, symbol: &str, interval: &str, limit: usize) -> GridBotResult<Vec<Candle>> {
        let url = format!(
            "{}/api/v1/candlesticks?symbol={}&interval={}&limit={}",
            self.base_url, symbol, interval, limit
        );
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| crate::errors::GridBotError::FeedUnavailable(e.to_string()))?;
        let candles: Vec<RawCandle> = resp
            .json()
            .await
            .map_err(|e| crate::errors::GridBotError::FeedUnavailable(e.to_string()))?;
        Ok(candles.into_iter().map(Into::into).collect())
    }
}

#[derive(serde::Deserialize)]
struct RawCandle {
    open: Decimal,
    high: Decimal,
    low: Decimal,
    close: Decimal,
    #[serde(rename = "t")]
    interval_start: i64,
}

impl From<RawCandle> for Candle {
    fn from(raw: RawCandle) -> Self {
        Candle {
            open: raw.open,
            high: raw.high,
            low: raw.low,
            close: raw.close,
            interval_start: raw.interval_start,
        }
    }
}

/// Where position updates actually come from (a receipt heartbeat field, a
/// separate read endpoint) is unconfirmed against the venue; this trait
/// keeps that choice isolated from the controller.
#[async_trait]
pub trait PositionFeed: Send + Sync {
    async fn current_position(&self, market_id: u32) -> GridBotResult<Decimal>;
}
