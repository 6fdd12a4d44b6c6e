//! Odds Primitives
//! Mission: the handful of pure-arithmetic functions every other subsystem
//! composes — price/probability conversion, edge, Kelly, tick rounding.
//! Nothing here touches I/O or mutable state.

/// YES-side implied probability of a price quoted in [0, 1].
pub fn price_to_probability(price: f64) -> f64 {
    price
}

/// Inverse of `price_to_probability` — kept distinct so call sites read as
/// intent rather than a no-op, and so a future non-identity mapping has a
/// single place to change.
pub fn probability_to_price(probability: f64) -> f64 {
    probability
}

pub fn no_probability(price: f64) -> f64 {
    1.0 - price
}

/// Arbitrage edge in bps across both possible leg orderings, plus a
/// rationale string naming the winning direction.
pub fn calculate_arbitrage_edge(
    ask_yes_a: f64,
    ask_no_b: f64,
    ask_no_a: f64,
    ask_yes_b: f64,
    total_costs: f64,
) -> (f64, String) {
    let edge_1 = (1.0 - (ask_yes_a + ask_no_b) - total_costs).max(0.0) * 10_000.0;
    let edge_2 = (1.0 - (ask_no_a + ask_yes_b) - total_costs).max(0.0) * 10_000.0;

    if edge_1 >= edge_2 {
        (edge_1, "YES@A+NO@B".to_string())
    } else {
        (edge_2, "NO@A+YES@B".to_string())
    }
}

/// Maximum quantity executable without exceeding either side's quoted size
/// or the capital cap, given the two leg prices.
pub fn min_executable_qty(
    size_yes: f64,
    size_no: f64,
    capital_cap: f64,
    price_yes: f64,
    price_no: f64,
) -> f64 {
    let denom = price_yes + price_no;
    if denom <= 0.0 {
        return 0.0;
    }
    (capital_cap / denom).min(size_yes).min(size_no)
}

/// Kelly fraction for a binary bet at 1:1 payout (`b = 1`), hard-capped at
/// 0.25 regardless of any multiplier a caller applies afterward.
pub fn kelly_fraction(edge_bps: f64, probability: Option<f64>) -> f64 {
    let p = probability.unwrap_or(0.5);
    let q = 1.0 - p;
    let b = 1.0_f64;
    let _ = edge_bps; // edge informs callers' sizing decisions, not this formula directly
    let raw = (b * p - q) / b;
    raw.clamp(0.0, 0.25)
}

pub fn round_to_tick(price: f64, tick: f64) -> f64 {
    if tick <= 0.0 {
        return price;
    }
    (price / tick).round() * tick
}

pub fn spread_bps(best_bid: f64, best_ask: f64) -> f64 {
    (best_ask - best_bid) * 10_000.0
}

pub fn mid_price(best_bid: f64, best_ask: f64) -> f64 {
    (best_bid + best_ask) / 2.0
}
