//! Execution Engine
//! Mission: place both legs of an arbitrage trade, least-liquid leg first,
//! retrying transient failures and hedging out of a stranded leg rather
//! than leaving the book one-sided.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use tracing::{error, info, warn};

use crate::types::{ArbOpportunity, Fill, OrderRequest, Quote, Trade, TradeStatus, Venue};
use crate::venues::VenueClient;

const MAX_RETRIES: usize = 3;
const RETRY_DELAY: StdDuration = StdDuration::from_millis(200);

pub struct ExecutionEngine {
    max_retries: usize,
    retry_delay: StdDuration,
    trade_history: Mutex<Vec<Trade>>,
}

/// Snapshot accessor mirroring the risk manager's and portfolio's own
/// summary structs, so the driver can log all three the same way.
pub struct ExecutionStats {
    pub total_trades: usize,
    pub successful_trades: usize,
    pub failed_trades: usize,
    pub hedged_trades: usize,
    pub success_rate_pct: f64,
    pub total_pnl: f64,
    pub total_fees: f64,
}

impl Default for ExecutionEngine {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            retry_delay: RETRY_DELAY,
            trade_history: Mutex::new(Vec::new()),
        }
    }
}

impl ExecutionEngine {
    pub fn new(max_retries: usize, retry_delay: StdDuration) -> Self {
        Self {
            max_retries,
            retry_delay,
            trade_history: Mutex::new(Vec::new()),
        }
    }

    pub fn stats(&self) -> ExecutionStats {
        let history = self.trade_history.lock().unwrap();
        let total_trades = history.len();
        let successful_trades = history.iter().filter(|t| t.status == TradeStatus::Filled).count();
        let failed_trades = history.iter().filter(|t| t.status == TradeStatus::Failed).count();
        let hedged_trades = history.iter().filter(|t| t.status == TradeStatus::Hedged).count();
        let success_rate_pct = if total_trades > 0 {
            successful_trades as f64 / total_trades as f64 * 100.0
        } else {
            0.0
        };
        let total_pnl = history.iter().map(|t| t.pnl).sum();
        let total_fees = history.iter().map(|t| t.fee_a + t.fee_b).sum();

        ExecutionStats {
            total_trades,
            successful_trades,
            failed_trades,
            hedged_trades,
            success_rate_pct,
            total_pnl,
            total_fees,
        }
    }

    /// Places the less-liquid leg first — if it can't fill, the more liquid
    /// leg never gets touched. A partial fill on the second leg triggers an
    /// IOC hedge on the first leg's opposite side so the book doesn't carry
    /// a naked position.
    pub async fn execute(
        &self,
        opportunity: &ArbOpportunity,
        qty: f64,
        clients: &HashMap<Venue, Arc<dyn VenueClient>>,
        quotes: &HashMap<String, Quote>,
    ) -> Trade {
        let mut trade = Trade::pending(opportunity, qty);

        let (first, second, first_is_leg_a) = self.order_legs(opportunity, quotes);

        let Some(first_client) = clients.get(&first.venue) else {
            trade.status = TradeStatus::Failed;
            error!("no client registered for venue {:?}", first.venue);
            return self.record(trade);
        };

        let first_request = opportunity_leg_request(opportunity, first_is_leg_a, qty);
        let first_fill = match self.place_with_retry(first_client.as_ref(), &first_request).await {
            Some(fill) => fill,
            None => {
                trade.status = TradeStatus::Failed;
                warn!("first leg failed to fill for event {}", opportunity.event_id);
                return self.record(trade);
            }
        };

        self.apply_fill(&mut trade, first_is_leg_a, &first_fill);

        let Some(second_client) = clients.get(&second.venue) else {
            trade.status = TradeStatus::Failed;
            error!("no client registered for venue {:?}", second.venue);
            return self.record(trade);
        };

        let second_request = opportunity_leg_request(opportunity, !first_is_leg_a, qty);
        let second_fill = self.place_with_retry(second_client.as_ref(), &second_request).await;

        match second_fill {
            Some(fill) if (fill.qty - qty).abs() < 1e-9 => {
                self.apply_fill(&mut trade, !first_is_leg_a, &fill);
                trade.status = TradeStatus::Filled;
                trade.filled_at = Some(chrono::Utc::now());
                trade.pnl = qty * (trade.edge_bps / 10_000.0) - (trade.fee_a + trade.fee_b);
                info!("trade {} filled both legs for event {}", trade.trade_id, opportunity.event_id);
            }
            Some(fill) => {
                self.apply_fill(&mut trade, !first_is_leg_a, &fill);
                self.hedge_stranded_leg(&mut trade, first_is_leg_a, first_client.as_ref(), &first_fill, qty - fill.qty)
                    .await;
            }
            None => {
                self.hedge_stranded_leg(&mut trade, first_is_leg_a, first_client.as_ref(), &first_fill, qty)
                    .await;
            }
        }

        self.record(trade)
    }

    fn record(&self, trade: Trade) -> Trade {
        self.trade_history.lock().unwrap().push(trade.clone());
        trade
    }

    fn order_legs<'a>(
        &self,
        opportunity: &'a ArbOpportunity,
        quotes: &HashMap<String, Quote>,
    ) -> (&'a crate::types::OpportunityLeg, &'a crate::types::OpportunityLeg, bool) {
        let liquidity_a = quotes
            .get(&opportunity.leg_a.contract_id)
            .map(|q| q.bid_size.min(q.ask_size))
            .unwrap_or(f64::MAX);
        let liquidity_b = quotes
            .get(&opportunity.leg_b.contract_id)
            .map(|q| q.bid_size.min(q.ask_size))
            .unwrap_or(f64::MAX);

        if liquidity_a <= liquidity_b {
            (&opportunity.leg_a, &opportunity.leg_b, true)
        } else {
            (&opportunity.leg_b, &opportunity.leg_a, false)
        }
    }

    async fn place_with_retry(&self, client: &dyn VenueClient, request: &OrderRequest) -> Option<Fill> {
        for attempt in 0..=self.max_retries {
            match client.place_order(request).await {
                Ok(Some(fill)) => return Some(fill),
                Ok(None) => {
                    warn!("order {} unfilled on attempt {attempt}", request.client_order_id);
                }
                Err(err) => {
                    warn!("order {} errored on attempt {attempt}: {err}", request.client_order_id);
                }
            }
            if attempt < self.max_retries {
                tokio::time::sleep(self.retry_delay).await;
            }
        }
        None
    }

    async fn hedge_stranded_leg(
        &self,
        trade: &mut Trade,
        first_is_leg_a: bool,
        first_client: &dyn VenueClient,
        first_fill: &Fill,
        unhedged_qty: f64,
    ) {
        if unhedged_qty <= 0.0 {
            trade.status = TradeStatus::Filled;
            return;
        }
        warn!(
            "hedging {unhedged_qty} stranded units for trade {} after partial second-leg fill",
            trade.trade_id
        );

        let side = if first_is_leg_a { trade.order_side_a } else { trade.order_side_b };
        let hedge_request = OrderRequest::new(
            first_fill.venue,
            first_fill.contract_id.clone(),
            side.opposite(),
            first_fill.avg_price,
            unhedged_qty,
            crate::types::OrderTif::Ioc,
        );

        match first_client.place_order(&hedge_request).await {
            Ok(Some(hedge_fill)) => {
                trade.hedge_fill = Some(hedge_fill);
                trade.status = TradeStatus::Hedged;
            }
            Ok(None) | Err(_) => {
                error!("hedge failed to fill for trade {}; leg remains stranded", trade.trade_id);
                trade.status = TradeStatus::Failed;
            }
        }
    }

    fn apply_fill(&self, trade: &mut Trade, is_leg_a: bool, fill: &Fill) {
        if is_leg_a {
            trade.price_a = fill.avg_price;
            trade.fee_a = fill.fee_paid;
        } else {
            trade.price_b = fill.avg_price;
            trade.fee_b = fill.fee_paid;
        }
    }
}

fn opportunity_leg_request(opportunity: &ArbOpportunity, is_leg_a: bool, qty: f64) -> OrderRequest {
    if is_leg_a {
        opportunity.leg_a_request(qty)
    } else {
        opportunity.leg_b_request(qty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Balance, ContractSide, OpportunityLeg, OrderSide};
    use crate::venues::mock::MockVenueClient;
    use chrono::Utc;

    fn sample_opportunity() -> ArbOpportunity {
        ArbOpportunity {
            event_id: "EVENT:1".to_string(),
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
            notional: 90.0,
            expiry: Utc::now() + chrono::Duration::days(1),
            rationale: "YES@A+NO@B".to_string(),
            confidence_score: 1.0,
        }
    }

    fn balance(venue: Venue) -> Balance {
        Balance { venue, available: 1000.0, total: 1000.0 }
    }

    #[tokio::test]
    async fn both_legs_fill_cleanly() {
        let opportunity = sample_opportunity();
        let mut clients: HashMap<Venue, Arc<dyn VenueClient>> = HashMap::new();
        clients.insert(
            Venue::Polymarket,
            Arc::new(MockVenueClient::new(Venue::Polymarket, vec![], vec![], balance(Venue::Polymarket))),
        );
        clients.insert(
            Venue::Kalshi,
            Arc::new(MockVenueClient::new(Venue::Kalshi, vec![], vec![], balance(Venue::Kalshi))),
        );

        let engine = ExecutionEngine::default();
        let trade = engine.execute(&opportunity, 100.0, &clients, &HashMap::new()).await;
        assert_eq!(trade.status, TradeStatus::Filled);
    }

    #[tokio::test]
    async fn first_leg_failure_aborts_without_placing_second() {
        let opportunity = sample_opportunity();
        let mut clients: HashMap<Venue, Arc<dyn VenueClient>> = HashMap::new();
        clients.insert(
            Venue::Polymarket,
            Arc::new(
                MockVenueClient::new(Venue::Polymarket, vec![], vec![], balance(Venue::Polymarket))
                    .with_fill_probability(0.0),
            ),
        );
        clients.insert(
            Venue::Kalshi,
            Arc::new(MockVenueClient::new(Venue::Kalshi, vec![], vec![], balance(Venue::Kalshi))),
        );

        let engine = ExecutionEngine::new(0, StdDuration::from_millis(1));
        let trade = engine.execute(&opportunity, 100.0, &clients, &HashMap::new()).await;
        assert_eq!(trade.status, TradeStatus::Failed);
    }
}
