use rust_decimal::Decimal;
use std::env;
use std::str::FromStr;

use crate::errors::{GridBotError, GridBotResult};

/// All configuration keys of the external-interfaces table, loaded from the
/// process environment. Missing or unparsable required keys are
/// `ConfigurationInvalid`, which is fatal at startup.
#[derive(Debug, Clone)]
pub struct GridBotConfig {
    pub api_url: String,
    pub identity_key: String,
    pub symbol: String,
    pub market_id: u32,

    pub total_orders: u32,
    pub window_percent: Decimal,
    pub grid_spacing: Decimal,
    pub safe_gap: Decimal,
    pub order_size: Decimal,
    pub max_multiplier: Decimal,

    pub rsi_min: Decimal,
    pub rsi_max: Decimal,
    pub adx_trend_threshold: Decimal,
    pub adx_strong_trend: Decimal,
    pub cooldown_minutes: i64,

    pub cycle_interval_seconds: u64,
    pub indicator_symbol: String,
    pub indicator_timeframe: String,

    pub flatten_on_shutdown: bool,
}

fn required(key: &str) -> GridBotResult<String> {
    env::var(key).map_err(|_| GridBotError::ConfigurationInvalid(format!("missing required key {key}")))
}

fn parse_required<T: FromStr>(key: &str) -> GridBotResult<T> {
    let raw = required(key)?;
    raw.parse::<T>()
        .map_err(|_| GridBotError::ConfigurationInvalid(format!("key {key} has invalid value {raw:?}")))
}

fn parse_with_default<T: FromStr>(key: &str, default: T) -> GridBotResult<T> {
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|_| GridBotError::ConfigurationInvalid(format!("key {key} has invalid value {raw:?}"))),
        Err(_) => Ok(default),
    }
}

impl GridBotConfig {
    pub fn from_env() -> GridBotResult<Self> {
        dotenv::dotenv().ok();

        Ok(Self {
            api_url: required("GRIDBOT_API_URL")?,
            identity_key: required("GRIDBOT_IDENTITY_KEY")?,
            symbol: required("GRIDBOT_SYMBOL")?,
            market_id: parse_required("GRIDBOT_MARKET_ID")?,

            total_orders: parse_with_default("GRIDBOT_TOTAL_ORDERS", 18)?,
            window_percent: parse_with_default("GRIDBOT_WINDOW_PERCENT", "0.12".parse().unwrap())?,
            grid_spacing: parse_with_default("GRIDBOT_GRID_SPACING", "10".parse().unwrap())?,
            safe_gap: parse_with_default("GRIDBOT_SAFE_GAP", "5".parse().unwrap())?,
            order_size: parse_with_default("GRIDBOT_ORDER_SIZE", "0.001".parse().unwrap())?,
            max_multiplier: parse_with_default("GRIDBOT_MAX_MULTIPLIER", "15".parse().unwrap())?,

            rsi_min: parse_with_default("GRIDBOT_RSI_MIN", "30".parse().unwrap())?,
            rsi_max: parse_with_default("GRIDBOT_RSI_MAX", "70".parse().unwrap())?,
            adx_trend_threshold: parse_with_default("GRIDBOT_ADX_TREND_THRESHOLD", "25".parse().unwrap())?,
            adx_strong_trend: parse_with_default("GRIDBOT_ADX_STRONG_TREND", "30".parse().unwrap())?,
            cooldown_minutes: parse_with_default("GRIDBOT_COOLDOWN_MINUTES", 15)?,

            cycle_interval_seconds: parse_with_default("GRIDBOT_CYCLE_INTERVAL_SECONDS", 5)?,
            indicator_symbol: required("GRIDBOT_INDICATOR_SYMBOL")?,
            indicator_timeframe: parse_with_default("GRIDBOT_INDICATOR_TIMEFRAME", "1h".to_string())?,

            flatten_on_shutdown: parse_with_default("GRIDBOT_FLATTEN_ON_SHUTDOWN", true)?,
        })
    }
}
