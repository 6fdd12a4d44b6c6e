//! Configuration
//! Mission: one typed record for every environment-driven knob, loaded once
//! at bootstrap, so downstream code never touches `std::env` directly.

use clap::ValueEnum;

use crate::types::RiskLimits;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradingMode {
    Paper,
    Live,
    Backtest,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub mode: TradingMode,
    pub starting_balance_usd: f64,
    pub kelly_fraction: f64,
    pub min_edge_bps: f64,
    pub min_notional_usd: f64,
    pub max_slippage_bps: f64,
    pub max_open_risk_usd: f64,
    pub max_per_trade_usd: f64,
    pub max_position_per_event_usd: f64,
    pub max_drawdown_pct: f64,
    pub circuit_breaker_error_rate: f64,
    pub circuit_breaker_latency_ms: f64,
    pub confirm_live: bool,
    pub discovery_interval_secs: u64,
    pub registry_events_path: String,
    pub registry_mappings_path: String,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        let mode = match std::env::var("MODE")
            .unwrap_or_else(|_| "paper".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "live" => TradingMode::Live,
            "backtest" => TradingMode::Backtest,
            _ => TradingMode::Paper,
        };

        let starting_balance_usd = env_parse("STARTING_BALANCE_USD", 10_000.0);
        let kelly_fraction = env_parse("KELLY_FRACTION", 0.25);
        let min_edge_bps = env_parse("MIN_EDGE_BPS", 50.0);
        let min_notional_usd = env_parse("MIN_NOTIONAL_USD", 10.0);
        let max_slippage_bps = env_parse("MAX_SLIPPAGE_BPS", 50.0);
        let max_open_risk_usd = env_parse("MAX_OPEN_RISK_USD", 5_000.0);
        let max_per_trade_usd = env_parse("MAX_PER_TRADE_USD", 1_000.0);
        let max_position_per_event_usd = env_parse("MAX_POSITION_PER_EVENT_USD", 2_000.0);
        let max_drawdown_pct = env_parse("MAX_DRAWDOWN_PCT", 20.0);
        let circuit_breaker_error_rate = env_parse("CIRCUIT_BREAKER_ERROR_RATE", 0.1);
        let circuit_breaker_latency_ms = env_parse("CIRCUIT_BREAKER_LATENCY_MS", 2_000.0);
        let confirm_live = std::env::var("CONFIRM_LIVE")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);
        let discovery_interval_secs = env_parse("DISCOVERY_INTERVAL", 10u64);
        let registry_events_path = std::env::var("REGISTRY_EVENTS_PATH")
            .unwrap_or_else(|_| "./data/events.csv".to_string());
        let registry_mappings_path = std::env::var("REGISTRY_MAPPINGS_PATH")
            .unwrap_or_else(|_| "./data/mappings.csv".to_string());
        let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            mode,
            starting_balance_usd,
            kelly_fraction,
            min_edge_bps,
            min_notional_usd,
            max_slippage_bps,
            max_open_risk_usd,
            max_per_trade_usd,
            max_position_per_event_usd,
            max_drawdown_pct,
            circuit_breaker_error_rate,
            circuit_breaker_latency_ms,
            confirm_live,
            discovery_interval_secs,
            registry_events_path,
            registry_mappings_path,
            log_level,
        })
    }

    pub fn risk_limits(&self) -> RiskLimits {
        RiskLimits {
            max_open_risk_usd: self.max_open_risk_usd,
            max_per_trade_usd: self.max_per_trade_usd,
            max_position_per_event_usd: self.max_position_per_event_usd,
            max_drawdown_pct: self.max_drawdown_pct,
            min_edge_bps: self.min_edge_bps,
            max_slippage_bps: self.max_slippage_bps,
        }
    }

    /// Live mode is fatal to enter without an explicit operator confirmation.
    pub fn validate_for_startup(&self) -> anyhow::Result<()> {
        if self.mode == TradingMode::Live && !self.confirm_live {
            anyhow::bail!("mode=live requires confirm_live=true; refusing to start");
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
