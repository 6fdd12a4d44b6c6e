//! Position Sizer
//! Mission: turn an admissible opportunity into a concrete quantity —
//! Kelly-sized, then clamped by the per-event/aggregate risk-limit ceiling,
//! then clamped by each leg's own venue balance, then rounded to a tradeable
//! tick. Never returns less than one whole unit.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::odds::round_to_tick;
use crate::types::{ArbOpportunity, Balance, RiskLimits};

const MIN_UNITS: f64 = 1.0;
const KELLY_CAP: f64 = 0.25;

/// Sizer configuration: the fractional multiplier applied on top of the raw
/// Kelly fraction, mirroring the conservatism knob in a typical Kelly sizer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SizerConfig {
    pub kelly_multiplier: f64,
}

impl Default for SizerConfig {
    fn default() -> Self {
        Self { kelly_multiplier: 0.25 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizingResult {
    pub qty: f64,
    pub notional: f64,
    pub should_trade: bool,
    pub skip_reason: Option<String>,
}

pub struct PositionSizer {
    config: SizerConfig,
}

impl PositionSizer {
    pub fn new(config: SizerConfig) -> Self {
        Self { config }
    }

    /// Kelly -> per-trade/per-event/aggregate risk cap -> per-venue balance
    /// -> tick rounding. Each stage can only shrink the notional (and then
    /// quantity) handed down from the prior stage.
    pub fn size(
        &self,
        opportunity: &ArbOpportunity,
        limits: &RiskLimits,
        bankroll_usd: f64,
        current_positions_by_event: &HashMap<String, f64>,
        balance_a: &Balance,
        balance_b: &Balance,
        tick_size: f64,
    ) -> SizingResult {
        let edge_decimal = (opportunity.edge_bps / 10_000.0).clamp(0.0, KELLY_CAP);
        let kelly_notional = edge_decimal * self.config.kelly_multiplier * bankroll_usd;

        if kelly_notional <= 0.0 {
            return skip("edge yielded zero Kelly notional");
        }

        let mut notional = kelly_notional.min(limits.max_per_trade_usd);

        let existing_event_exposure = current_positions_by_event
            .get(&opportunity.event_id)
            .copied()
            .unwrap_or(0.0);
        if existing_event_exposure + notional > limits.max_position_per_event_usd {
            let remaining = limits.max_position_per_event_usd - existing_event_exposure;
            notional = if remaining > 0.0 { remaining } else { 0.0 };
        }

        let total_exposure: f64 = current_positions_by_event.values().sum();
        if total_exposure + notional > limits.max_open_risk_usd {
            let remaining = limits.max_open_risk_usd - total_exposure;
            notional = if remaining > 0.0 { notional.min(remaining) } else { 0.0 };
        }

        if notional <= 0.0 {
            return skip("risk limit exhausted before any size remained");
        }

        let unit_cost = opportunity.leg_a.price + opportunity.leg_b.price;
        if unit_cost <= 0.0 {
            return skip("non-positive combined leg price");
        }

        let mut qty = notional / unit_cost;

        let leg_a_cost = qty * opportunity.leg_a.price;
        if leg_a_cost > balance_a.available {
            qty = balance_a.available / opportunity.leg_a.price;
        }
        let leg_b_cost = qty * opportunity.leg_b.price;
        if leg_b_cost > balance_b.available {
            qty = qty.min(balance_b.available / opportunity.leg_b.price);
        }

        let tick = if tick_size > 0.0 { tick_size } else { 1.0 };
        let rounded_qty = round_to_tick(qty, tick).max(0.0);

        if rounded_qty < MIN_UNITS {
            return skip(&format!("sized quantity {rounded_qty:.4} below the {MIN_UNITS} unit floor"));
        }

        SizingResult {
            qty: rounded_qty,
            notional: rounded_qty * unit_cost,
            should_trade: true,
            skip_reason: None,
        }
    }
}

fn skip(reason: &str) -> SizingResult {
    SizingResult {
        qty: 0.0,
        notional: 0.0,
        should_trade: false,
        skip_reason: Some(reason.to_string()),
    }
}
