//! Venue Client Capability
//! Mission: the single abstract boundary discovery and execution consume.
//! Real HTTP implementations for Polymarket/Kalshi live outside this crate;
//! `mock` is the in-process stand-in used by tests and paper mode.

pub mod mock;

use async_trait::async_trait;

use crate::types::{Balance, Contract, Fill, OrderRequest, Quote, Venue};

#[async_trait]
pub trait VenueClient: Send + Sync {
    fn venue(&self) -> Venue;
    async fn list_contracts(&self) -> anyhow::Result<Vec<Contract>>;
    async fn get_quotes(&self, contract_ids: &[String]) -> anyhow::Result<Vec<Quote>>;
    async fn place_order(&self, request: &OrderRequest) -> anyhow::Result<Option<Fill>>;
    async fn cancel_order(&self, venue_order_id: &str) -> anyhow::Result<bool>;
    async fn get_balance(&self) -> anyhow::Result<Balance>;
    async fn healthcheck(&self) -> anyhow::Result<bool>;
}
