//! Mock Venue Client
//! Mission: a deterministic, injectable VenueClient for tests and paper
//! mode — no network, no real exchange credentials.

use std::sync::Mutex;

use async_trait::async_trait;
use rand::Rng;
use uuid::Uuid;

use crate::types::{Balance, Contract, Fill, OrderRequest, Quote, Venue};

use super::VenueClient;

pub struct MockVenueClient {
    venue: Venue,
    contracts: Vec<Contract>,
    quotes: Mutex<Vec<Quote>>,
    balance: Balance,
    /// Probability in [0, 1] that `place_order` returns a Fill rather than
    /// `None`. Defaults to 1.0 (always fills) so tests are deterministic
    /// unless a scenario explicitly wants partial-fill behavior.
    fill_probability: f64,
    taker_bps: f64,
}

impl MockVenueClient {
    pub fn new(venue: Venue, contracts: Vec<Contract>, quotes: Vec<Quote>, balance: Balance) -> Self {
        Self {
            venue,
            contracts,
            quotes: Mutex::new(quotes),
            balance,
            fill_probability: 1.0,
            taker_bps: 25.0,
        }
    }

    pub fn with_fill_probability(mut self, probability: f64) -> Self {
        self.fill_probability = probability.clamp(0.0, 1.0);
        self
    }

    pub fn with_taker_bps(mut self, bps: f64) -> Self {
        self.taker_bps = bps;
        self
    }

    pub fn push_quote(&self, quote: Quote) {
        let mut quotes = self.quotes.lock().unwrap();
        quotes.retain(|q| q.contract_id != quote.contract_id);
        quotes.push(quote);
    }
}

#[async_trait]
impl VenueClient for MockVenueClient {
    fn venue(&self) -> Venue {
        self.venue
    }

    async fn list_contracts(&self) -> anyhow::Result<Vec<Contract>> {
        Ok(self.contracts.clone())
    }

    async fn get_quotes(&self, contract_ids: &[String]) -> anyhow::Result<Vec<Quote>> {
        let quotes = self.quotes.lock().unwrap();
        Ok(quotes
            .iter()
            .filter(|q| contract_ids.iter().any(|id| id == &q.contract_id))
            .cloned()
            .collect())
    }

    async fn place_order(&self, request: &OrderRequest) -> anyhow::Result<Option<Fill>> {
        let roll: f64 = rand::thread_rng().gen_range(0.0..1.0);
        if roll > self.fill_probability {
            return Ok(None);
        }

        let fee = request.price * request.qty * self.taker_bps / 10_000.0;
        Ok(Some(Fill {
            venue: self.venue,
            contract_id: request.contract_id.clone(),
            venue_order_id: Uuid::new_v4().to_string(),
            qty: request.qty,
            avg_price: request.price,
            fee_paid: fee,
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
