//! Risk Manager
//! Mission: the one place trades can be vetoed — circuit breakers, drawdown,
//! and the exposure limit stack — so the driver never has to reason about
//! venue health or capital allocation itself.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use crate::errors::EngineError;
use crate::types::{ArbOpportunity, RiskLimits, Trade, Venue};

const WINDOW_CAPACITY: usize = 100;
const PNL_HISTORY_CAPACITY: usize = 1000;
const BREAKER_LOOKBACK: Duration = Duration::minutes(5);
const BREAKER_LATCH_DURATION: Duration = Duration::minutes(5);
const MIN_ERRORS_TO_TRIP: usize = 10;

#[derive(Default)]
struct VenueHistory {
    errors: VecDeque<DateTime<Utc>>,
    latencies: VecDeque<(DateTime<Utc>, f64)>,
    breaker_tripped_at: Option<DateTime<Utc>>,
}

impl VenueHistory {
    fn record_error(&mut self, at: DateTime<Utc>) {
        push_bounded(&mut self.errors, at, WINDOW_CAPACITY);
    }

    fn record_latency(&mut self, at: DateTime<Utc>, millis: f64) {
        push_bounded(&mut self.latencies, (at, millis), WINDOW_CAPACITY);
    }

    fn recent_errors(&self, now: DateTime<Utc>) -> usize {
        self.errors.iter().filter(|t| now - **t <= BREAKER_LOOKBACK).count()
    }

    fn recent_mean_latency(&self, now: DateTime<Utc>) -> Option<f64> {
        let recent: Vec<f64> = self
            .latencies
            .iter()
            .filter(|(t, _)| now - *t <= BREAKER_LOOKBACK)
            .map(|(_, l)| *l)
            .collect();
        if recent.is_empty() {
            None
        } else {
            Some(recent.iter().sum::<f64>() / recent.len() as f64)
        }
    }
}

fn push_bounded<T>(buf: &mut VecDeque<T>, item: T, capacity: usize) {
    buf.push_back(item);
    while buf.len() > capacity {
        buf.pop_front();
    }
}

pub struct RiskManager {
    limits: RiskLimits,
    circuit_breaker_error_rate: f64,
    circuit_breaker_latency_ms: f64,
    histories: HashMap<Venue, VenueHistory>,
    pnl_history: VecDeque<f64>,
    running_peak: f64,
    cumulative_pnl: f64,
}

pub struct RiskSummary {
    pub cumulative_pnl: f64,
    pub running_peak: f64,
    pub current_drawdown_pct: f64,
    pub active_circuit_breakers: Vec<Venue>,
}

impl RiskManager {
    pub fn new(limits: RiskLimits, circuit_breaker_error_rate: f64, circuit_breaker_latency_ms: f64) -> Self {
        Self {
            limits,
            circuit_breaker_error_rate,
            circuit_breaker_latency_ms,
            histories: HashMap::new(),
            pnl_history: VecDeque::new(),
            running_peak: 0.0,
            cumulative_pnl: 0.0,
        }
    }

    pub fn record_error(&mut self, venue: Venue) {
        self.histories.entry(venue).or_default().record_error(Utc::now());
    }

    pub fn record_latency(&mut self, venue: Venue, millis: f64) {
        self.histories
            .entry(venue)
            .or_default()
            .record_latency(Utc::now(), millis);
    }

    pub fn record_trade(&mut self, trade: &Trade) {
        self.cumulative_pnl += trade.pnl;
        push_bounded(&mut self.pnl_history, trade.pnl, PNL_HISTORY_CAPACITY);
        if self.cumulative_pnl > self.running_peak {
            self.running_peak = self.cumulative_pnl;
        }
    }

    pub fn reset_circuit_breaker(&mut self, venue: Venue) {
        if let Some(history) = self.histories.get_mut(&venue) {
            history.breaker_tripped_at = None;
            info!("circuit breaker manually reset for {:?}", venue);
        }
    }

    fn should_trip(&self, venue: Venue, now: DateTime<Utc>) -> bool {
        let Some(history) = self.histories.get(&venue) else {
            return false;
        };
        let error_count = history.recent_errors(now);
        let error_rate_tripped = error_count >= MIN_ERRORS_TO_TRIP
            && (error_count as f64 / WINDOW_CAPACITY as f64) > self.circuit_breaker_error_rate;
        let latency_tripped = history
            .recent_mean_latency(now)
            .map(|avg| avg > self.circuit_breaker_latency_ms)
            .unwrap_or(false);
        error_rate_tripped || latency_tripped
    }

    /// Latches for 5 minutes of wall time once tripped; auto-resets on the
    /// next check after expiry rather than on an internal timer.
    fn is_circuit_breaker_active(&mut self, venue: Venue) -> bool {
        let now = Utc::now();
        let tripped_now = self.should_trip(venue, now);
        let history = self.histories.entry(venue).or_default();

        if tripped_now && history.breaker_tripped_at.is_none() {
            history.breaker_tripped_at = Some(now);
            warn!("circuit breaker tripped for {:?}", venue);
        }

        match history.breaker_tripped_at {
            None => false,
            Some(tripped_at) => {
                if now - tripped_at > BREAKER_LATCH_DURATION {
                    history.breaker_tripped_at = None;
                    false
                } else {
                    true
                }
            }
        }
    }

    fn drawdown_pct(&self) -> f64 {
        if self.running_peak <= 0.0 {
            return 0.0;
        }
        ((self.running_peak - self.cumulative_pnl) / self.running_peak) * 100.0
    }

    /// Evaluates, in strict order, circuit breakers for both legs, the
    /// drawdown gate, the per-event cap, the aggregate open-risk cap, and
    /// the min-edge floor. First failure short-circuits with a reason.
    pub fn is_allowed(
        &mut self,
        opportunity: &ArbOpportunity,
        current_positions_by_event: &HashMap<String, f64>,
    ) -> (bool, String) {
        if self.is_circuit_breaker_active(opportunity.leg_a.venue) {
            return (false, format!("circuit breaker active for {:?}", opportunity.leg_a.venue));
        }
        if self.is_circuit_breaker_active(opportunity.leg_b.venue) {
            return (false, format!("circuit breaker active for {:?}", opportunity.leg_b.venue));
        }

        let drawdown = self.drawdown_pct();
        if drawdown > self.limits.max_drawdown_pct {
            return (
                false,
                format!("drawdown gate breached: {drawdown:.2}% > {:.2}%", self.limits.max_drawdown_pct),
            );
        }

        let existing_event_exposure = current_positions_by_event
            .get(&opportunity.event_id)
            .copied()
            .unwrap_or(0.0);
        if existing_event_exposure + opportunity.notional > self.limits.max_position_per_event_usd {
            return (false, "per-event exposure cap exceeded".to_string());
        }

        let total_exposure: f64 = current_positions_by_event.values().sum();
        if total_exposure + opportunity.notional > self.limits.max_open_risk_usd {
            return (false, "aggregate open-risk cap exceeded".to_string());
        }

        if opportunity.edge_bps < self.limits.min_edge_bps {
            return (false, "edge below min_edge_bps".to_string());
        }

        (true, "allowed".to_string())
    }

    /// Typed wrapper around `is_allowed` for the driver loop, which branches
    /// on rejection rather than formatting a log line from a string.
    pub fn check(
        &mut self,
        opportunity: &ArbOpportunity,
        current_positions_by_event: &HashMap<String, f64>,
    ) -> Result<(), EngineError> {
        let (allowed, reason) = self.is_allowed(opportunity, current_positions_by_event);
        if allowed {
            Ok(())
        } else {
            Err(EngineError::RiskRejected { reason })
        }
    }

    pub fn summary(&self) -> RiskSummary {
        let active_circuit_breakers = self
            .histories
            .iter()
            .filter(|(_, h)| h.breaker_tripped_at.is_some())
            .map(|(v, _)| *v)
            .collect();
        RiskSummary {
            cumulative_pnl: self.cumulative_pnl,
            running_peak: self.running_peak,
            current_drawdown_pct: self.drawdown_pct(),
            active_circuit_breakers,
        }
    }
}
