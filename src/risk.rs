//! Regime gate: decides whether the grid controller is allowed to quote on
//! a given tick, based on the current RSI/ADX reading and a time-based
//! cool-down triggered by trending or extreme-momentum conditions.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

/// The thresholds of the decision table, carried from configuration rather
/// than hard-coded so the 25/30/70/30/15-minute defaults can be tuned per
/// venue without a code change.
#[derive(Debug, Clone)]
pub struct RiskConfig {
    pub rsi_min: Decimal,
    pub rsi_max: Decimal,
    pub adx_trend_threshold: Decimal,
    pub adx_strong_trend: Decimal,
    pub cooldown_minutes: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateDecision {
    pub admit: bool,
    pub trigger_cooldown: bool,
    pub reason: Option<&'static str>,
}

impl GateDecision {
    fn admit() -> Self {
        Self { admit: true, trigger_cooldown: false, reason: None }
    }

    fn deny(reason: &'static str) -> Self {
        Self { admit: false, trigger_cooldown: true, reason: Some(reason) }
    }

    fn cautious_admit() -> Self {
        Self { admit: true, trigger_cooldown: false, reason: None }
    }
}

/// The cool-down is purely time-based: once triggered it denies
/// unconditionally until `exit_at`, regardless of what RSI/ADX do in the
/// meantime, and exits on the first tick at or after `exit_at`.
#[derive(Debug, Clone)]
pub struct RegimeGate {
    config: RiskConfig,
    cooldown_until: Option<DateTime<Utc>>,
}

impl RegimeGate {
    pub fn new(config: RiskConfig) -> Self {
        Self { config, cooldown_until: None }
    }

    /// `now` is passed in rather than read from the clock so the cool-down
    /// boundary can be tested deterministically.
    pub fn decide(&mut self, rsi: Decimal, adx: Decimal, now: DateTime<Utc>) -> GateDecision {
        if let Some(exit_at) = self.cooldown_until {
            if now < exit_at {
                return GateDecision::deny("cool-down active");
            }
            self.cooldown_until = None;
        }

        let decision = classify(rsi, adx, &self.config);
        if decision.trigger_cooldown {
            self.cooldown_until = Some(now + Duration::minutes(self.config.cooldown_minutes));
        }
        decision
    }

    pub fn is_on_cooldown(&self) -> bool {
        self.cooldown_until.is_some()
    }
}

/// The extreme-RSI bounds of the middle row of the decision table (25/75)
/// are fixed by the spec and are distinct from the configurable
/// `rsi_min`/`rsi_max` band (typ. 30/70) used by the bottom row.
const EXTREME_RSI_LOW: i64 = 25;
const EXTREME_RSI_HIGH: i64 = 75;

/// The table from the decision matrix, evaluated in order. Boundaries are
/// strict: ADX = 30.0 is not strong trend, ADX = 25.0 is not trending.
fn classify(rsi: Decimal, adx: Decimal, config: &RiskConfig) -> GateDecision {
    if adx > config.adx_strong_trend {
        return GateDecision::deny("strong trend");
    }

    if adx > config.adx_trend_threshold && adx <= config.adx_strong_trend {
        if rsi < Decimal::from(EXTREME_RSI_LOW) || rsi > Decimal::from(EXTREME_RSI_HIGH) {
            return GateDecision::deny("extreme RSI under trending market");
        }
        return GateDecision::cautious_admit();
    }

    // adx <= adx_trend_threshold
    if rsi < config.rsi_min || rsi > config.rsi_max {
        return GateDecision::deny("RSI out of band");
    }

    GateDecision::admit()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(minute: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + minute * 60, 0).unwrap()
    }

    fn default_config() -> RiskConfig {
        RiskConfig {
            rsi_min: Decimal::from(30),
            rsi_max: Decimal::from(70),
            adx_trend_threshold: Decimal::from(25),
            adx_strong_trend: Decimal::from(30),
            cooldown_minutes: 15,
        }
    }

    #[test]
    fn strong_trend_denies_and_triggers_cooldown() {
        let mut gate = RegimeGate::new(default_config());
        let decision = gate.decide(Decimal::from(55), Decimal::from_str_exact("31").unwrap(), t(0));
        assert!(!decision.admit);
        assert!(decision.trigger_cooldown);
        assert_eq!(decision.reason, Some("strong trend"));
    }

    #[test]
    fn adx_exactly_30_is_not_strong_trend() {
        let mut gate = RegimeGate::new(default_config());
        let decision = gate.decide(Decimal::from(50), Decimal::from(30), t(0));
        // falls into the 25 < adx <= 30 band, cautiously admitted at RSI=50.
        assert!(decision.admit);
        assert!(!decision.trigger_cooldown);
    }

    #[test]
    fn adx_exactly_25_is_not_trending() {
        let mut gate = RegimeGate::new(default_config());
        let decision = gate.decide(Decimal::from(50), Decimal::from(25), t(0));
        // falls through to the adx <= 25 band, admitted at RSI=50.
        assert!(decision.admit);
        assert!(!decision.trigger_cooldown);
    }

    #[test]
    fn trending_band_with_extreme_rsi_denies() {
        let mut gate = RegimeGate::new(default_config());
        let decision = gate.decide(Decimal::from(20), Decimal::from_str_exact("27").unwrap(), t(0));
        assert!(!decision.admit);
        assert!(decision.trigger_cooldown);
        assert_eq!(decision.reason, Some("extreme RSI under trending market"));
    }

    #[test]
    fn trending_band_with_moderate_rsi_is_cautiously_admitted() {
        let mut gate = RegimeGate::new(default_config());
        let decision = gate.decide(Decimal::from(50), Decimal::from_str_exact("27").unwrap(), t(0));
        assert!(decision.admit);
        assert!(!decision.trigger_cooldown);
    }

    #[test]
    fn calm_market_with_rsi_out_of_band_denies() {
        let mut gate = RegimeGate::new(default_config());
        let decision = gate.decide(Decimal::from(20), Decimal::from(10), t(0));
        assert!(!decision.admit);
        assert!(decision.trigger_cooldown);
        assert_eq!(decision.reason, Some("RSI out of band"));
    }

    #[test]
    fn calm_market_in_band_admits() {
        let mut gate = RegimeGate::new(default_config());
        let decision = gate.decide(Decimal::from(55), Decimal::from(10), t(0));
        assert!(decision.admit);
        assert!(!decision.trigger_cooldown);
    }

    #[test]
    fn cooldown_denies_unconditionally_until_exit_time() {
        let mut gate = RegimeGate::new(default_config());
        let trigger = gate.decide(Decimal::from(55), Decimal::from_str_exact("31").unwrap(), t(0));
        assert!(trigger.trigger_cooldown);
        assert!(gate.is_on_cooldown());

        // 14 minutes later, still denied even with perfectly calm readings.
        let still_down = gate.decide(Decimal::from(50), Decimal::from(10), t(14));
        assert!(!still_down.admit);
        assert_eq!(still_down.reason, Some("cool-down active"));

        // exactly at exit_at, the gate re-evaluates using the fresh reading.
        let resumed = gate.decide(Decimal::from(50), Decimal::from(10), t(15));
        assert!(resumed.admit);
        assert!(!gate.is_on_cooldown());
    }
}
