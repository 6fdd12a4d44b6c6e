//! Core Data Model
//! Mission: one typed vocabulary shared by every subsystem, so discovery,
//! risk, sizing, execution and the portfolio never pass raw strings or
//! untyped maps across a boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Venue {
    Polymarket,
    Kalshi,
}

impl Venue {
    pub fn as_str(&self) -> &'static str {
        match self {
            Venue::Polymarket => "polymarket",
            Venue::Kalshi => "kalshi",
        }
    }

    pub fn all() -> [Venue; 2] {
        [Venue::Polymarket, Venue::Kalshi]
    }
}

impl std::str::FromStr for Venue {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "polymarket" => Ok(Venue::Polymarket),
            "kalshi" => Ok(Venue::Kalshi),
            other => Err(anyhow::anyhow!("unknown venue: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ContractSide {
    Yes,
    No,
}

impl ContractSide {
    pub fn opposite(&self) -> ContractSide {
        match self {
            ContractSide::Yes => ContractSide::No,
            ContractSide::No => ContractSide::Yes,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContractSide::Yes => "YES",
            ContractSide::No => "NO",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn opposite(&self) -> OrderSide {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderTif {
    Ioc,
    Fok,
    Gtc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Election,
    Crypto,
    Awards,
    Sports,
    Finance,
    Politics,
    Economy,
    Other,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Election => "election",
            EventType::Crypto => "crypto",
            EventType::Awards => "awards",
            EventType::Sports => "sports",
            EventType::Finance => "finance",
            EventType::Politics => "politics",
            EventType::Economy => "economy",
            EventType::Other => "other",
        }
    }
}

impl std::str::FromStr for EventType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "election" => Ok(EventType::Election),
            "crypto" => Ok(EventType::Crypto),
            "awards" => Ok(EventType::Awards),
            "sports" => Ok(EventType::Sports),
            "finance" => Ok(EventType::Finance),
            "politics" => Ok(EventType::Politics),
            "economy" => Ok(EventType::Economy),
            _ => Ok(EventType::Other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingMethod {
    Manual,
    Deterministic,
    Heuristic,
}

impl MappingMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            MappingMethod::Manual => "manual",
            MappingMethod::Deterministic => "deterministic",
            MappingMethod::Heuristic => "heuristic",
        }
    }
}

/// Canonical event: the single identity a venue-specific market title or
/// ticker resolves to once a mapper recognizes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalEvent {
    pub event_id: String,
    pub event_type: EventType,
    pub scope: String,
    pub close_time: DateTime<Utc>,
    pub canonical_units: String,
    pub display_title: String,
    pub resolution_source: String,
    pub aliases: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// A single venue's mapping of one of its markets onto a canonical event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenueMapping {
    pub venue: Venue,
    pub market_id: String,
    pub event_id: String,
    pub title_raw: String,
    pub description_raw: String,
    pub outcomes: Vec<String>,
    pub confidence: f64,
    pub mapping_method: MappingMethod,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A binary leg tradeable at one venue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contract {
    pub venue: Venue,
    pub contract_id: String,
    pub side: ContractSide,
    pub normalized_event_id: String,
    pub tick_size: f64,
    pub settlement_ccy: String,
    pub expires_at: DateTime<Utc>,
    pub min_size: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub venue: Venue,
    pub contract_id: String,
    pub best_bid: f64,
    pub best_ask: f64,
    pub bid_size: f64,
    pub ask_size: f64,
    pub ts: DateTime<Utc>,
}

impl Quote {
    pub fn mid(&self) -> f64 {
        (self.best_bid + self.best_ask) / 2.0
    }
}

/// A resting order to submit to a venue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    pub venue: Venue,
    pub contract_id: String,
    pub side: OrderSide,
    pub price: f64,
    pub qty: f64,
    pub tif: OrderTif,
    pub client_order_id: String,
}

impl OrderRequest {
    pub fn new(
        venue: Venue,
        contract_id: impl Into<String>,
        side: OrderSide,
        price: f64,
        qty: f64,
        tif: OrderTif,
    ) -> Self {
        Self {
            venue,
            contract_id: contract_id.into(),
            side,
            price,
            qty,
            tif,
            client_order_id: Uuid::new_v4().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fill {
    pub venue: Venue,
    pub contract_id: String,
    pub venue_order_id: String,
    pub qty: f64,
    pub avg_price: f64,
    pub fee_paid: f64,
}

/// One leg of an arbitrage pair, ready for sizing and placement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpportunityLeg {
    pub venue: Venue,
    pub contract_id: String,
    pub side: ContractSide,
    pub order_side: OrderSide,
    pub price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArbOpportunity {
    pub event_id: String,
    pub leg_a: OpportunityLeg,
    pub leg_b: OpportunityLeg,
    pub edge_bps: f64,
    pub notional: f64,
    pub expiry: DateTime<Utc>,
    pub rationale: String,
    pub confidence_score: f64,
}

impl ArbOpportunity {
    pub fn leg_a_request(&self, qty: f64) -> OrderRequest {
        OrderRequest::new(
            self.leg_a.venue,
            self.leg_a.contract_id.clone(),
            self.leg_a.order_side,
            self.leg_a.price,
            qty,
            OrderTif::Ioc,
        )
    }

    pub fn leg_b_request(&self, qty: f64) -> OrderRequest {
        OrderRequest::new(
            self.leg_b.venue,
            self.leg_b.contract_id.clone(),
            self.leg_b.order_side,
            self.leg_b.price,
            qty,
            OrderTif::Ioc,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeStatus {
    Pending,
    Filled,
    Failed,
    Hedged,
    Cancelled,
}

impl TradeStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TradeStatus::Pending)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub trade_id: String,
    pub event_id: String,
    pub venue_a: Venue,
    pub venue_b: Venue,
    pub contract_a: String,
    pub contract_b: String,
    pub side_a: ContractSide,
    pub side_b: ContractSide,
    pub order_side_a: OrderSide,
    pub order_side_b: OrderSide,
    pub qty: f64,
    pub price_a: f64,
    pub price_b: f64,
    pub fee_a: f64,
    pub fee_b: f64,
    pub edge_bps: f64,
    pub pnl: f64,
    pub status: TradeStatus,
    pub created_at: DateTime<Utc>,
    pub filled_at: Option<DateTime<Utc>>,
    pub hedge_fill: Option<Fill>,
}

impl Trade {
    pub fn pending(opportunity: &ArbOpportunity, qty: f64) -> Self {
        Self {
            trade_id: Uuid::new_v4().to_string(),
            event_id: opportunity.event_id.clone(),
            venue_a: opportunity.leg_a.venue,
            venue_b: opportunity.leg_b.venue,
            contract_a: opportunity.leg_a.contract_id.clone(),
            contract_b: opportunity.leg_b.contract_id.clone(),
            side_a: opportunity.leg_a.side,
            side_b: opportunity.leg_b.side,
            order_side_a: opportunity.leg_a.order_side,
            order_side_b: opportunity.leg_b.order_side,
            qty,
            price_a: opportunity.leg_a.price,
            price_b: opportunity.leg_b.price,
            fee_a: 0.0,
            fee_b: 0.0,
            edge_bps: opportunity.edge_bps,
            pnl: 0.0,
            status: TradeStatus::Pending,
            created_at: Utc::now(),
            filled_at: None,
            hedge_fill: None,
        }
    }
}

/// Per (event_id, venue) aggregate position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub venue: Venue,
    pub contract_id: String,
    pub normalized_event_id: String,
    pub side: ContractSide,
    pub qty: f64,
    pub avg_price: f64,
    pub unrealized_pnl: f64,
    pub realized_pnl: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Position {
    pub fn flat(venue: Venue, contract_id: String, event_id: String, side: ContractSide) -> Self {
        let now = Utc::now();
        Self {
            venue,
            contract_id,
            normalized_event_id: event_id,
            side,
            qty: 0.0,
            avg_price: 0.0,
            unrealized_pnl: 0.0,
            realized_pnl: 0.0,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Balance {
    pub venue: Venue,
    pub available: f64,
    pub total: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RiskLimits {
    pub max_open_risk_usd: f64,
    pub max_per_trade_usd: f64,
    pub max_position_per_event_usd: f64,
    pub max_drawdown_pct: f64,
    pub min_edge_bps: f64,
    pub max_slippage_bps: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FeeModel {
    pub maker_bps: f64,
    pub taker_bps: f64,
    pub gas_estimate_usd: f64,
    pub withdrawal_fee_usd: f64,
}

impl Default for FeeModel {
    fn default() -> Self {
        Self {
            maker_bps: 0.0,
            taker_bps: 0.0,
            gas_estimate_usd: 0.0,
            withdrawal_fee_usd: 0.0,
        }
    }
}
