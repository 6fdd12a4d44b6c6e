//! Cross-Venue Prediction-Market Arbitrage
//! Mission: discover mispriced YES/NO pairs across venues and work them
//! through risk, sizing, and execution every tick.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use parity_arb::config::{Config, TradingMode};
use parity_arb::discovery::DiscoveryEngine;
use parity_arb::execution::ExecutionEngine;
use parity_arb::fees::FeeCalculator;
use parity_arb::portfolio::Portfolio;
use parity_arb::registry::mappers::{KalshiMapper, PolymarketMapper, VenueMapper};
use parity_arb::registry::EventRegistry;
use parity_arb::risk::RiskManager;
use parity_arb::sizing::{PositionSizer, SizerConfig};
use parity_arb::types::{Balance, Venue};
use parity_arb::venues::mock::MockVenueClient;
use parity_arb::venues::VenueClient;

#[derive(Parser, Debug)]
#[command(name = "parity-arb", about = "Cross-venue prediction-market arbitrage")]
struct Cli {
    /// Overrides MODE from the environment (paper, live, backtest).
    #[arg(long)]
    mode: Option<TradingMode>,

    /// Number of discovery ticks to run before exiting. Omit to run forever.
    #[arg(long)]
    ticks: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::from_env().context("loading configuration")?;
    if let Some(mode) = cli.mode {
        config.mode = mode;
    }

    init_tracing(&config.log_level);
    config.validate_for_startup().context("startup validation failed")?;

    info!(mode = ?config.mode, "starting up");

    match config.mode {
        TradingMode::Live => run_live(&config).await,
        TradingMode::Paper | TradingMode::Backtest => run_paper(&config, cli.ticks).await,
    }
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Live mode has no real venue credentials wired into this crate; the
/// startup lock in `Config::validate_for_startup` already requires an
/// explicit operator confirmation, so reaching here means the operator has
/// acknowledged that — but placing real orders still requires supplying
/// `VenueClient` implementations this crate does not ship.
async fn run_live(_config: &Config) -> Result<()> {
    anyhow::bail!(
        "mode=live has no bundled VenueClient implementations; \
         wire real venue clients into the driver before enabling live trading"
    );
}

/// Paper (and backtest, which reuses the same driver against mocked venues)
/// drives one fan-out+barrier-join tick per `discovery_interval_secs`:
/// discovery -> risk -> sizing -> execution -> portfolio mark-to-market.
async fn run_paper(config: &Config, ticks: Option<u64>) -> Result<()> {
    let mut registry = EventRegistry::new();
    let events_path = Path::new(&config.registry_events_path);
    let mappings_path = Path::new(&config.registry_mappings_path);
    if let Err(err) = registry.load(events_path, mappings_path) {
        warn!("could not load existing registry, starting empty: {err}");
    }

    let mut mappers: HashMap<Venue, Box<dyn VenueMapper + Send + Sync>> = HashMap::new();
    mappers.insert(Venue::Polymarket, Box::new(PolymarketMapper::default()));
    mappers.insert(Venue::Kalshi, Box::new(KalshiMapper::default()));

    let clients = build_paper_clients(config);

    let fee_calculator = Arc::new(FeeCalculator::with_defaults());
    let mut discovery_engine = DiscoveryEngine::new(Arc::clone(&fee_calculator), config.min_edge_bps, config.min_notional_usd);
    let mut risk_manager = RiskManager::new(config.risk_limits(), config.circuit_breaker_error_rate, config.circuit_breaker_latency_ms);
    let sizer = PositionSizer::new(SizerConfig { kelly_multiplier: config.kelly_fraction });
    let execution_engine = ExecutionEngine::default();
    let mut portfolio = Portfolio::new();

    let mut balance = config.starting_balance_usd;
    let mut tick: u64 = 0;

    loop {
        tick += 1;
        info!(tick, "discovery tick starting");

        let opportunities = discovery_engine
            .discover(&clients, &mut registry, &mappers, true)
            .await;
        info!("found {} candidate opportunities", opportunities.len());

        let positions_by_event = portfolio.positions_by_event();

        for opportunity in &opportunities {
            if let Err(err) = risk_manager.check(opportunity, &positions_by_event) {
                info!(event_id = %opportunity.event_id, %err, "opportunity rejected by risk manager");
                continue;
            }

            let Some(balance_a) = fetch_balance(&clients, opportunity.leg_a.venue).await else {
                warn!(venue = ?opportunity.leg_a.venue, "no balance available, skipping opportunity");
                continue;
            };
            let Some(balance_b) = fetch_balance(&clients, opportunity.leg_b.venue).await else {
                warn!(venue = ?opportunity.leg_b.venue, "no balance available, skipping opportunity");
                continue;
            };

            let sizing = sizer.size(
                opportunity,
                &config.risk_limits(),
                balance,
                &positions_by_event,
                &balance_a,
                &balance_b,
                0.01,
            );
            if !sizing.should_trade {
                info!(
                    event_id = %opportunity.event_id,
                    reason = sizing.skip_reason.as_deref().unwrap_or("unknown"),
                    "opportunity rejected by sizer"
                );
                continue;
            }

            let quotes = HashMap::new();
            let trade = execution_engine.execute(opportunity, sizing.qty, &clients, &quotes).await;
            balance -= sizing.notional;
            risk_manager.record_trade(&trade);
            portfolio.record_trade(trade);
        }

        portfolio.log_summary();

        if let Some(limit) = ticks {
            if tick >= limit {
                break;
            }
        }

        tokio::time::sleep(Duration::from_secs(config.discovery_interval_secs)).await;
    }

    if let Err(err) = registry.save(events_path, mappings_path) {
        warn!("failed to persist registry on shutdown: {err}");
    }

    Ok(())
}

async fn fetch_balance(clients: &HashMap<Venue, Arc<dyn VenueClient>>, venue: Venue) -> Option<Balance> {
    let client = clients.get(&venue)?;
    match client.get_balance().await {
        Ok(balance) => Some(balance),
        Err(err) => {
            warn!(?venue, %err, "failed to fetch venue balance");
            None
        }
    }
}

fn build_paper_clients(config: &Config) -> HashMap<Venue, Arc<dyn VenueClient>> {
    let mut clients: HashMap<Venue, Arc<dyn VenueClient>> = HashMap::new();
    for venue in Venue::all() {
        let balance = Balance {
            venue,
            available: config.starting_balance_usd,
            total: config.starting_balance_usd,
        };
        clients.insert(venue, Arc::new(MockVenueClient::new(venue, Vec::new(), Vec::new(), balance)));
    }
    clients
}
