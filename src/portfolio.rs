//! Portfolio
//! Mission: the single source of truth for what is currently held, at what
//! average price, and what it is worth mark-to-market — keyed by
//! (event_id, venue) so both legs of a cross-venue pair coexist as
//! independent positions rather than collapsing into one.
//!
//! Each leg carries its own `ContractSide`; mark-to-market must use that
//! leg's actual side rather than assuming venue A is always YES and venue B
//! is always NO.

use std::collections::HashMap;

use chrono::Utc;
use tracing::info;

use crate::types::{ContractSide, Position, Quote, Trade, TradeStatus, Venue};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PositionKey {
    pub event_id: String,
    pub venue: Venue,
}

pub struct PortfolioSummary {
    pub total_unrealized_pnl: f64,
    pub total_realized_pnl: f64,
    pub total_notional: f64,
    pub open_position_count: usize,
    pub total_trades: usize,
    pub successful_trades: usize,
    pub win_rate: f64,
}

pub struct Portfolio {
    positions: HashMap<PositionKey, Position>,
    trade_ledger: Vec<Trade>,
}

impl Portfolio {
    pub fn new() -> Self {
        Self {
            positions: HashMap::new(),
            trade_ledger: Vec::new(),
        }
    }

    /// Folds a filled or hedged trade's two legs into the position map with
    /// a weighted-average price update, then appends it to the ledger.
    pub fn record_trade(&mut self, trade: Trade) {
        if trade.status == TradeStatus::Filled || trade.status == TradeStatus::Hedged {
            self.apply_leg(
                trade.event_id.clone(),
                trade.venue_a,
                trade.contract_a.clone(),
                trade.side_a,
                trade.qty,
                trade.price_a,
            );
            self.apply_leg(
                trade.event_id.clone(),
                trade.venue_b,
                trade.contract_b.clone(),
                trade.side_b,
                trade.qty,
                trade.price_b,
            );
        }
        self.trade_ledger.push(trade);
    }

    fn apply_leg(&mut self, event_id: String, venue: Venue, contract_id: String, side: ContractSide, qty: f64, price: f64) {
        let key = PositionKey { event_id: event_id.clone(), venue };
        let position = self
            .positions
            .entry(key)
            .or_insert_with(|| Position::flat(venue, contract_id, event_id, side));

        let new_qty = position.qty + qty;
        if new_qty.abs() > 1e-9 {
            position.avg_price = ((position.avg_price * position.qty) + (price * qty)) / new_qty;
        }
        position.qty = new_qty;
        position.updated_at = Utc::now();
    }

    /// Recomputes unrealized PnL for every open position from fresh quotes,
    /// valuing a YES position at the best bid and a NO position at
    /// `1 - best_ask` — each leg valued by its own recorded side, never a
    /// fixed per-venue default.
    pub fn mark_to_market(&mut self, quotes: &HashMap<String, Quote>) {
        for position in self.positions.values_mut() {
            if position.qty.abs() < 1e-9 {
                position.unrealized_pnl = 0.0;
                continue;
            }
            let Some(quote) = quotes.get(&position.contract_id) else {
                continue;
            };
            let mark_price = match position.side {
                ContractSide::Yes => quote.best_bid,
                ContractSide::No => 1.0 - quote.best_ask,
            };
            position.unrealized_pnl = (mark_price - position.avg_price) * position.qty;
        }
    }

    pub fn position(&self, event_id: &str, venue: Venue) -> Option<&Position> {
        self.positions.get(&PositionKey { event_id: event_id.to_string(), venue })
    }

    pub fn positions_by_event(&self) -> HashMap<String, f64> {
        let mut totals: HashMap<String, f64> = HashMap::new();
        for (key, position) in &self.positions {
            *totals.entry(key.event_id.clone()).or_insert(0.0) += position.qty.abs() * position.avg_price;
        }
        totals
    }

    pub fn summary(&self) -> PortfolioSummary {
        let total_unrealized_pnl = self.positions.values().map(|p| p.unrealized_pnl).sum();
        let total_realized_pnl = self.positions.values().map(|p| p.realized_pnl).sum();
        let total_notional = self.positions.values().map(|p| p.qty.abs() * p.avg_price).sum();
        let open_position_count = self.positions.values().filter(|p| p.qty.abs() > 1e-9).count();

        let total_trades = self.trade_ledger.len();
        let successful_trades = self.trade_ledger.iter().filter(|t| t.pnl > 0.0).count();
        let win_rate = if total_trades > 0 {
            successful_trades as f64 / total_trades as f64 * 100.0
        } else {
            0.0
        };

        PortfolioSummary {
            total_unrealized_pnl,
            total_realized_pnl,
            total_notional,
            open_position_count,
            total_trades,
            successful_trades,
            win_rate,
        }
    }

    pub fn trade_ledger(&self) -> &[Trade] {
        &self.trade_ledger
    }

    pub fn log_summary(&self) {
        let summary = self.summary();
        info!(
            "portfolio: {} open positions, unrealized={:.2}, realized={:.2}",
            summary.open_position_count, summary.total_unrealized_pnl, summary.total_realized_pnl
        );
    }
}

impl Default for Portfolio {
    fn default() -> Self {
        Self::new()
    }
}
