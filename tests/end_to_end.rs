//! Drives one full discovery -> risk -> size -> execute -> portfolio tick
//! against `MockVenueClient`, the way the teacher repo keeps its one
//! cross-binary integration test under `tests/`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};

use parity_arb::discovery::DiscoveryEngine;
use parity_arb::execution::ExecutionEngine;
use parity_arb::fees::FeeCalculator;
use parity_arb::portfolio::Portfolio;
use parity_arb::registry::mappers::{KalshiMapper, PolymarketMapper, VenueMapper};
use parity_arb::registry::EventRegistry;
use parity_arb::risk::RiskManager;
use parity_arb::sizing::{PositionSizer, SizerConfig};
use parity_arb::types::{
    ArbOpportunity, Balance, Contract, ContractSide, Fill, OpportunityLeg, OrderRequest, OrderSide,
    Quote, RiskLimits, TradeStatus, Venue,
};
use parity_arb::venues::mock::MockVenueClient;
use parity_arb::venues::VenueClient;

const TRUMP_TITLE: &str = "Will Trump win the 2028 Presidential Election?";

fn contract(venue: Venue, contract_id: &str, side: ContractSide, event_title: &str) -> Contract {
    Contract {
        venue,
        contract_id: contract_id.to_string(),
        side,
        normalized_event_id: event_title.to_string(),
        tick_size: 0.01,
        settlement_ccy: "USD".to_string(),
        expires_at: Utc::now() + Duration::days(30),
        min_size: 1.0,
    }
}

fn quote(venue: Venue, contract_id: &str, bid: f64, ask: f64) -> Quote {
    Quote {
        venue,
        contract_id: contract_id.to_string(),
        best_bid: bid,
        best_ask: ask,
        bid_size: 500.0,
        ask_size: 500.0,
        ts: Utc::now(),
    }
}

fn risk_limits() -> RiskLimits {
    RiskLimits {
        max_open_risk_usd: 10_000.0,
        max_per_trade_usd: 1_000.0,
        max_position_per_event_usd: 5_000.0,
        max_drawdown_pct: 20.0,
        min_edge_bps: 50.0,
        max_slippage_bps: 50.0,
    }
}

#[tokio::test]
async fn full_tick_discovers_sizes_and_executes_a_cross_venue_pair() {
    // Polymarket lists a title-based YES/NO pair, Kalshi lists the same
    // event under the same title text -- both mappers resolve it to the
    // same canonical event id (S3) so discovery pairs them.
    let poly_yes = contract(Venue::Polymarket, "poly-yes", ContractSide::Yes, TRUMP_TITLE);
    let poly_no = contract(Venue::Polymarket, "poly-no", ContractSide::No, TRUMP_TITLE);
    let kalshi_yes = contract(Venue::Kalshi, "PRES-2028-TRUMP", ContractSide::Yes, TRUMP_TITLE);
    let kalshi_no = contract(Venue::Kalshi, "PRES-2028-TRUMP-NO", ContractSide::No, TRUMP_TITLE);

    let poly_client = MockVenueClient::new(
        Venue::Polymarket,
        vec![poly_yes, poly_no],
        vec![
            quote(Venue::Polymarket, "poly-yes", 0.38, 0.40),
            quote(Venue::Polymarket, "poly-no", 0.58, 0.60),
        ],
        Balance { venue: Venue::Polymarket, available: 10_000.0, total: 10_000.0 },
    );
    let kalshi_client = MockVenueClient::new(
        Venue::Kalshi,
        vec![kalshi_yes, kalshi_no],
        vec![
            quote(Venue::Kalshi, "PRES-2028-TRUMP", 0.48, 0.50),
            quote(Venue::Kalshi, "PRES-2028-TRUMP-NO", 0.48, 0.50),
        ],
        Balance { venue: Venue::Kalshi, available: 10_000.0, total: 10_000.0 },
    );

    let mut clients: HashMap<Venue, Arc<dyn VenueClient>> = HashMap::new();
    clients.insert(Venue::Polymarket, Arc::new(poly_client));
    clients.insert(Venue::Kalshi, Arc::new(kalshi_client));

    // The mapper source of truth: each venue's client is paired with its own
    // mapper so discovery can resolve titles/tickers to a canonical event id
    // regardless of which venue listed the contract first.
    let mut mappers: HashMap<Venue, Box<dyn VenueMapper + Send + Sync>> = HashMap::new();
    mappers.insert(Venue::Polymarket, Box::new(PolymarketMapper::default()));
    mappers.insert(Venue::Kalshi, Box::new(KalshiMapper::default()));

    let mut registry = EventRegistry::new();
    let fee_calculator = Arc::new(FeeCalculator::with_defaults());
    let mut discovery = DiscoveryEngine::new(Arc::clone(&fee_calculator), 50.0, 1.0);

    let opportunities = discovery.discover(&clients, &mut registry, &mappers, true).await;
    assert!(!opportunities.is_empty(), "fixture prices should clear the min-edge gate");

    let mut risk_manager = RiskManager::new(risk_limits(), 0.1, 2_000.0);
    let sizer = PositionSizer::new(SizerConfig { kelly_multiplier: 0.25 });
    let execution_engine = ExecutionEngine::default();
    let mut portfolio = Portfolio::new();

    for opportunity in &opportunities {
        let positions_by_event = portfolio.positions_by_event();
        if risk_manager.check(opportunity, &positions_by_event).is_err() {
            continue;
        }
        let balance_a = clients[&opportunity.leg_a.venue].get_balance().await.unwrap();
        let balance_b = clients[&opportunity.leg_b.venue].get_balance().await.unwrap();
        let sizing = sizer.size(opportunity, &risk_limits(), 10_000.0, &positions_by_event, &balance_a, &balance_b, 0.01);
        if !sizing.should_trade {
            continue;
        }
        let trade = execution_engine.execute(opportunity, sizing.qty, &clients, &HashMap::new()).await;
        assert!(matches!(trade.status, TradeStatus::Filled | TradeStatus::Hedged | TradeStatus::Failed));
        risk_manager.record_trade(&trade);
        portfolio.record_trade(trade);
    }

    let summary = portfolio.summary();
    assert!(summary.open_position_count > 0);
    assert!(summary.open_position_count <= opportunities.len() * 2);
}

#[tokio::test]
async fn risk_manager_blocks_trade_exceeding_per_event_cap_s4() {
    let mut risk_manager = RiskManager::new(risk_limits(), 0.1, 2_000.0);
    let mut positions = HashMap::new();
    positions.insert("ELECTION:US:PRESIDENT:2028:TRUMP".to_string(), 4_800.0);

    let opportunity = ArbOpportunity {
        event_id: "ELECTION:US:PRESIDENT:2028:TRUMP".to_string(),
        leg_a: OpportunityLeg {
            venue: Venue::Polymarket,
            contract_id: "c1".to_string(),
            side: ContractSide::Yes,
            order_side: OrderSide::Buy,
            price: 0.4,
        },
        leg_b: OpportunityLeg {
            venue: Venue::Kalshi,
            contract_id: "c2".to_string(),
            side: ContractSide::No,
            order_side: OrderSide::Buy,
            price: 0.5,
        },
        edge_bps: 1000.0,
        notional: 400.0,
        expiry: Utc::now() + Duration::days(1),
        rationale: "YES@A+NO@B".to_string(),
        confidence_score: 1.0,
    };

    let err = risk_manager.check(&opportunity, &positions).unwrap_err();
    assert!(err.to_string().contains("per-event"));
}

fn sizing_opportunity(edge_bps: f64) -> ArbOpportunity {
    ArbOpportunity {
        event_id: "ELECTION:US:PRESIDENT:2028:TRUMP".to_string(),
        leg_a: OpportunityLeg {
            venue: Venue::Polymarket,
            contract_id: "c1".to_string(),
            side: ContractSide::Yes,
            order_side: OrderSide::Buy,
            price: 0.4,
        },
        leg_b: OpportunityLeg {
            venue: Venue::Kalshi,
            contract_id: "c2".to_string(),
            side: ContractSide::No,
            order_side: OrderSide::Buy,
            price: 0.5,
        },
        edge_bps,
        notional: 0.0,
        expiry: Utc::now() + Duration::days(1),
        rationale: "YES@A+NO@B".to_string(),
        confidence_score: 1.0,
    }
}

/// S5: a 2000bps edge under a 0.25x Kelly multiplier against a $10,000
/// bankroll sizes to a fixed, hand-checkable notional and quantity with
/// generous risk/balance headroom on both sides.
#[tokio::test]
async fn kelly_sizing_produces_expected_quantity_s5() {
    let sizer = PositionSizer::new(SizerConfig { kelly_multiplier: 0.25 });
    let opportunity = sizing_opportunity(2000.0);
    let limits = RiskLimits {
        max_open_risk_usd: 10_000.0,
        max_per_trade_usd: 10_000.0,
        max_position_per_event_usd: 10_000.0,
        max_drawdown_pct: 20.0,
        min_edge_bps: 50.0,
        max_slippage_bps: 50.0,
    };
    let balance_a = Balance { venue: Venue::Polymarket, available: 1_000_000.0, total: 1_000_000.0 };
    let balance_b = Balance { venue: Venue::Kalshi, available: 1_000_000.0, total: 1_000_000.0 };

    // edge_decimal = 2000/10_000 = 0.2; kelly_notional = 0.2 * 0.25 * 10_000 = 500
    let result = sizer.size(&opportunity, &limits, 10_000.0, &HashMap::new(), &balance_a, &balance_b, 0.01);

    assert!(result.should_trade);
    assert!((result.qty - 555.56).abs() < 1e-6);
    assert!((result.notional - 500.004).abs() < 1e-3);
}

/// S6: the second leg only partially fills, stranding the first leg. The
/// engine hedges the unfilled remainder back out through the first venue
/// and marks the trade hedged rather than filled.
#[tokio::test]
async fn partial_second_leg_fill_hedges_stranded_first_leg_s6() {
    let opportunity = ArbOpportunity {
        event_id: "ELECTION:US:PRESIDENT:2028:TRUMP".to_string(),
        leg_a: OpportunityLeg {
            venue: Venue::Polymarket,
            contract_id: "poly-c".to_string(),
            side: ContractSide::Yes,
            order_side: OrderSide::Buy,
            price: 0.4,
        },
        leg_b: OpportunityLeg {
            venue: Venue::Kalshi,
            contract_id: "kalshi-c".to_string(),
            side: ContractSide::No,
            order_side: OrderSide::Buy,
            price: 0.5,
        },
        edge_bps: 1000.0,
        notional: 90.0,
        expiry: Utc::now() + Duration::days(1),
        rationale: "YES@A+NO@B".to_string(),
        confidence_score: 1.0,
    };

    let poly_client = MockVenueClient::new(
        Venue::Polymarket,
        Vec::new(),
        Vec::new(),
        Balance { venue: Venue::Polymarket, available: 10_000.0, total: 10_000.0 },
    );
    let kalshi_client = PartialFillVenueClient {
        venue: Venue::Kalshi,
        fill_qty: 40.0,
        balance: Balance { venue: Venue::Kalshi, available: 10_000.0, total: 10_000.0 },
    };

    let mut clients: HashMap<Venue, Arc<dyn VenueClient>> = HashMap::new();
    clients.insert(Venue::Polymarket, Arc::new(poly_client));
    clients.insert(Venue::Kalshi, Arc::new(kalshi_client));

    // Both quotes report equal liquidity so `order_legs` places leg_a first.
    let mut quotes = HashMap::new();
    quotes.insert("poly-c".to_string(), quote(Venue::Polymarket, "poly-c", 0.38, 0.40));
    quotes.insert("kalshi-c".to_string(), quote(Venue::Kalshi, "kalshi-c", 0.48, 0.50));

    let execution_engine = ExecutionEngine::default();
    let trade = execution_engine.execute(&opportunity, 100.0, &clients, &quotes).await;

    assert_eq!(trade.status, TradeStatus::Hedged);
    assert!(trade.hedge_fill.is_some());

    let stats = execution_engine.stats();
    assert_eq!(stats.total_trades, 1);
    assert_eq!(stats.hedged_trades, 1);
}

struct PartialFillVenueClient {
    venue: Venue,
    fill_qty: f64,
    balance: Balance,
}

#[async_trait]
impl VenueClient for PartialFillVenueClient {
    fn venue(&self) -> Venue {
        self.venue
    }

    async fn list_contracts(&self) -> anyhow::Result<Vec<Contract>> {
        Ok(Vec::new())
    }

    async fn get_quotes(&self, _contract_ids: &[String]) -> anyhow::Result<Vec<Quote>> {
        Ok(Vec::new())
    }

    async fn place_order(&self, request: &OrderRequest) -> anyhow::Result<Option<Fill>> {
        Ok(Some(Fill {
            venue: self.venue,
            contract_id: request.contract_id.clone(),
            venue_order_id: "partial-fill".to_string(),
            qty: self.fill_qty,
            avg_price: request.price,
            fee_paid: 0.0,
        }))
    }

    async fn cancel_order(&self, _venue_order_id: &str) -> anyhow::Result<bool> {
        Ok(false)
    }

    async fn get_balance(&self) -> anyhow::Result<Balance> {
        Ok(self.balance)
    }

    async fn healthcheck(&self) -> anyhow::Result<bool> {
        Ok(true)
    }
}
