mod config;
mod errors;
mod feed;
mod grid;
mod indicators;
mod risk;
mod supervisor;

use std::sync::Arc;
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use log::info;
use rust_decimal::Decimal;

use exchange_client::ExchangeClient;
use signer::IdentityKey;

use config::GridBotConfig;
use feed::{HttpOhlcvFeed, PositionFeed};
use indicators::IndicatorEngine;
use supervisor::Supervisor;

const SESSION_RENEW_BEFORE_SECONDS: i64 = 300;
const REQUEST_TIMEOUT_SECONDS: u64 = 10;

/// No confirmed source for position updates exists (see design notes); this
/// stub always reports flat and exists so the binary links and runs against
/// a venue that has no position endpoint wired up yet.
struct FlatPositionFeed;

#[async_trait::async_trait]
impl PositionFeed for FlatPositionFeed {
    async fn current_position(&self, _market_id: u32) -> errors::GridBotResult<Decimal> {
        Ok(Decimal::ZERO)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    run().await?;
    Ok(())
}

async fn run() -> errors::GridBotResult<()> {
    let config = GridBotConfig::from_env()?;
    info!("starting gridbot for {} on market {}", config.symbol, config.market_id);

    let identity = IdentityKey::from_base58(&config.identity_key)
        .map_err(|e| errors::GridBotError::ConfigurationInvalid(format!("invalid identity key: {e}")))?;

    let client = Arc::new(ExchangeClient::new(
        config.api_url.clone(),
        identity,
        Duration::from_secs(REQUEST_TIMEOUT_SECONDS),
        ChronoDuration::seconds(SESSION_RENEW_BEFORE_SECONDS),
    ));
    let feed = Arc::new(HttpOhlcvFeed::new(config.api_url.clone()));
    let indicators = IndicatorEngine::new(feed, config.indicator_symbol.clone(), config.indicator_timeframe.clone());
    let position_feed = Arc::new(FlatPositionFeed);

    let supervisor = Supervisor::new(client, indicators, position_feed, config);
    supervisor.run().await
}
