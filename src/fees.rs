//! Fee Model
//! Mission: one place that turns a quoted price into what a trade actually
//! costs, per venue, so every other subsystem reasons in effective prices.

use std::collections::HashMap;

use crate::types::{FeeModel, OrderSide, Venue};

pub struct FeeCalculator {
    models: HashMap<Venue, FeeModel>,
}

impl FeeCalculator {
    pub fn new(models: HashMap<Venue, FeeModel>) -> Self {
        Self { models }
    }

    pub fn default_for(venue: Venue) -> FeeModel {
        match venue {
            Venue::Polymarket => FeeModel {
                maker_bps: 0.0,
                taker_bps: 25.0,
                gas_estimate_usd: 0.50,
                withdrawal_fee_usd: 0.0,
            },
            Venue::Kalshi => FeeModel {
                maker_bps: 0.0,
                taker_bps: 30.0,
                gas_estimate_usd: 0.0,
                withdrawal_fee_usd: 0.0,
            },
        }
    }

    pub fn with_defaults() -> Self {
        let mut models = HashMap::new();
        for venue in Venue::all() {
            models.insert(venue, Self::default_for(venue));
        }
        Self::new(models)
    }

    pub fn fee_model(&self, venue: Venue) -> FeeModel {
        self.models
            .get(&venue)
            .copied()
            .unwrap_or_else(|| Self::default_for(venue))
    }

    fn total_cost(&self, venue: Venue, price: f64, qty: f64, is_maker: bool) -> f64 {
        let model = self.fee_model(venue);
        let fee_bps = if is_maker {
            model.maker_bps
        } else {
            model.taker_bps
        };
        let trading_fee = price * qty * fee_bps / 10_000.0;
        trading_fee + model.gas_estimate_usd + model.withdrawal_fee_usd
    }

    /// Effective price after fees for a single leg. Never negative.
    pub fn effective_price(
        &self,
        venue: Venue,
        side: OrderSide,
        price: f64,
        qty: f64,
        is_maker: bool,
    ) -> f64 {
        if qty <= 0.0 {
            return price.max(0.0);
        }
        let total_cost = self.total_cost(venue, price, qty, is_maker);
        let adjustment = total_cost / qty;
        let effective = match side {
            OrderSide::Buy => price + adjustment,
            OrderSide::Sell => price - adjustment,
        };
        effective.max(0.0)
    }

    /// Inverse of `effective_price`: the quoted price that would net out to
    /// `target_effective` once fees are applied, solved separately for BUY
    /// and SELL since the fee term itself depends on price.
    pub fn breakeven_price(
        &self,
        venue: Venue,
        side: OrderSide,
        target_effective: f64,
        qty: f64,
        is_maker: bool,
    ) -> f64 {
        if qty <= 0.0 {
            return target_effective.max(0.0);
        }
        let model = self.fee_model(venue);
        let fee_bps = if is_maker {
            model.maker_bps
        } else {
            model.taker_bps
        };
        let flat = (model.gas_estimate_usd + model.withdrawal_fee_usd) / qty;
        let fee_rate = fee_bps / 10_000.0;

        let price = match side {
            // target = price + (price*fee_rate*qty + flat_usd)/qty = price*(1+fee_rate) + flat
            OrderSide::Buy => (target_effective - flat) / (1.0 + fee_rate),
            // target = price - (price*fee_rate*qty + flat_usd)/qty = price*(1-fee_rate) - flat
            OrderSide::Sell => (target_effective + flat) / (1.0 - fee_rate),
        };
        price.max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_price_buy_adds_cost() {
        let calc = FeeCalculator::with_defaults();
        let eff = calc.effective_price(Venue::Polymarket, OrderSide::Buy, 0.40, 100.0, false);
        assert!(eff > 0.40);
    }

    #[test]
    fn effective_price_sell_subtracts_cost() {
        let calc = FeeCalculator::with_defaults();
        let eff = calc.effective_price(Venue::Kalshi, OrderSide::Sell, 0.60, 100.0, false);
        assert!(eff < 0.60);
    }

    #[test]
    fn effective_price_never_negative() {
        let calc = FeeCalculator::with_defaults();
        let eff = calc.effective_price(Venue::Polymarket, OrderSide::Sell, 0.001, 1.0, false);
        assert!(eff >= 0.0);
    }

    #[test]
    fn breakeven_round_trips_effective_price() {
        let calc = FeeCalculator::with_defaults();
        let price = 0.45;
        let qty = 200.0;
        let eff = calc.effective_price(Venue::Kalshi, OrderSide::Buy, price, qty, false);
        let recovered = calc.breakeven_price(Venue::Kalshi, OrderSide::Buy, eff, qty, false);
        assert!((recovered - price).abs() < 1e-9);
    }
}
