//! Discovery Engine
//! Mission: fan out to every venue concurrently, match contracts into
//! cross-venue YES/NO pairs, and emit fee-adjusted arbitrage opportunities.
//! Philosophy: one venue's failure must never poison another's.

pub mod matcher;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, warn};

use crate::fees::FeeCalculator;
use crate::odds::{calculate_arbitrage_edge, min_executable_qty};
use crate::registry::mappers::{MarketMetadata, VenueMapper};
use crate::registry::EventRegistry;
use crate::types::{ArbOpportunity, Contract, ContractSide, OpportunityLeg, OrderSide, Quote, Venue};
use crate::venues::VenueClient;

const LIQUIDITY_FLOOR: f64 = 100.0;
const MIN_EXPIRY_HORIZON: Duration = Duration::hours(1);

pub struct DiscoveryEngine {
    fee_calculator: Arc<FeeCalculator>,
    min_edge_bps: f64,
    min_notional_usd: f64,
    contract_cache: HashMap<Venue, Vec<Contract>>,
    quote_cache: HashMap<String, Quote>,
}

impl DiscoveryEngine {
    pub fn new(fee_calculator: Arc<FeeCalculator>, min_edge_bps: f64, min_notional_usd: f64) -> Self {
        Self {
            fee_calculator,
            min_edge_bps,
            min_notional_usd,
            contract_cache: HashMap::new(),
            quote_cache: HashMap::new(),
        }
    }

    pub async fn discover(
        &mut self,
        clients: &HashMap<Venue, Arc<dyn VenueClient>>,
        registry: &mut EventRegistry,
        mappers: &HashMap<Venue, Box<dyn VenueMapper + Send + Sync>>,
        refresh_contracts: bool,
    ) -> Vec<ArbOpportunity> {
        if refresh_contracts || self.contract_cache.is_empty() {
            self.refresh_contracts(clients, registry, mappers).await;
        }

        let pairs = self.enumerate_pairs();
        if pairs.is_empty() {
            return Vec::new();
        }

        self.refresh_quotes(clients, &pairs).await;

        let mut opportunities: Vec<ArbOpportunity> = pairs
            .into_iter()
            .filter_map(|pair| self.evaluate_pair(pair))
            .filter(|opp| opp.expiry - Utc::now() >= MIN_EXPIRY_HORIZON)
            .collect();

        opportunities.sort_by(|a, b| b.edge_bps.partial_cmp(&a.edge_bps).unwrap());
        opportunities
    }

    async fn refresh_contracts(
        &mut self,
        clients: &HashMap<Venue, Arc<dyn VenueClient>>,
        registry: &mut EventRegistry,
        mappers: &HashMap<Venue, Box<dyn VenueMapper + Send + Sync>>,
    ) {
        let mut tasks = Vec::new();
        for (venue, client) in clients.iter() {
            let venue = *venue;
            let client = Arc::clone(client);
            tasks.push(async move { (venue, client.list_contracts().await) });
        }
        let results = futures::future::join_all(tasks).await;

        for (venue, result) in results {
            match result {
                Ok(contracts) => {
                    let mapper = mappers.get(&venue);
                    let mapped: Vec<Contract> = contracts
                        .into_iter()
                        .filter(|c| {
                            mapper
                                .map(|m| {
                                    m.map_and_register(
                                        registry,
                                        &c.contract_id,
                                        &c.normalized_event_id,
                                        "",
                                        &MarketMetadata {
                                            close_time: Some(c.expires_at),
                                            end_date: None,
                                        },
                                    )
                                    .is_some()
                                })
                                .unwrap_or(true)
                        })
                        .collect();
                    self.contract_cache.insert(venue, mapped);
                }
                Err(err) => {
                    warn!("contract refresh failed for {:?}: {err}", venue);
                    // leave this venue's cache entry stale per the fault-isolation contract
                }
            }
        }
    }

    fn enumerate_pairs(&self) -> Vec<PairCandidate> {
        let venues: Vec<Venue> = self.contract_cache.keys().copied().collect();
        let mut by_event: HashMap<&str, HashMap<Venue, Vec<&Contract>>> = HashMap::new();

        for venue in &venues {
            if let Some(contracts) = self.contract_cache.get(venue) {
                for contract in contracts {
                    by_event
                        .entry(contract.normalized_event_id.as_str())
                        .or_default()
                        .entry(*venue)
                        .or_default()
                        .push(contract);
                }
            }
        }

        let mut pairs = Vec::new();
        for (event_id, per_venue) in by_event {
            if per_venue.len() < 2 {
                continue;
            }
            let mut venue_list: Vec<&Venue> = per_venue.keys().collect();
            venue_list.sort_by_key(|v| v.as_str());
            for i in 0..venue_list.len() {
                for j in (i + 1)..venue_list.len() {
                    let venue_a = *venue_list[i];
                    let venue_b = *venue_list[j];
                    let yes_a = find_side(&per_venue[&venue_a], ContractSide::Yes);
                    let no_a = find_side(&per_venue[&venue_a], ContractSide::No);
                    let yes_b = find_side(&per_venue[&venue_b], ContractSide::Yes);
                    let no_b = find_side(&per_venue[&venue_b], ContractSide::No);

                    if let (Some(yes_a), Some(yes_b)) = (yes_a, yes_b) {
                        pairs.push(PairCandidate {
                            event_id: event_id.to_string(),
                            side_a: (venue_a, yes_a.contract_id.clone(), ContractSide::Yes, yes_a.expires_at),
                            side_b: (venue_b, yes_b.contract_id.clone(), ContractSide::Yes, yes_b.expires_at),
                        });
                    }
                    if let (Some(no_a), Some(no_b)) = (no_a, no_b) {
                        pairs.push(PairCandidate {
                            event_id: event_id.to_string(),
                            side_a: (venue_a, no_a.contract_id.clone(), ContractSide::No, no_a.expires_at),
                            side_b: (venue_b, no_b.contract_id.clone(), ContractSide::No, no_b.expires_at),
                        });
                    }
                }
            }
        }
        pairs
    }

    async fn refresh_quotes(&mut self, clients: &HashMap<Venue, Arc<dyn VenueClient>>, pairs: &[PairCandidate]) {
        let mut ids_by_venue: HashMap<Venue, Vec<String>> = HashMap::new();
        for pair in pairs {
            ids_by_venue
                .entry(pair.side_a.0)
                .or_default()
                .push(pair.side_a.1.clone());
            ids_by_venue
                .entry(pair.side_b.0)
                .or_default()
                .push(pair.side_b.1.clone());
        }

        let mut tasks = Vec::new();
        for (venue, ids) in ids_by_venue {
            if let Some(client) = clients.get(&venue) {
                let client = Arc::clone(client);
                tasks.push(async move { client.get_quotes(&ids).await });
            }
        }
        let results = futures::future::join_all(tasks).await;

        for result in results {
            match result {
                Ok(quotes) => {
                    for quote in quotes {
                        // last writer wins for a given contract_id
                        self.quote_cache.insert(quote.contract_id.clone(), quote);
                    }
                }
                Err(err) => warn!("quote refresh failed: {err}"),
            }
        }
    }

    fn evaluate_pair(&self, pair: PairCandidate) -> Option<ArbOpportunity> {
        let quote_a = self.quote_cache.get(&pair.side_a.1)?;
        let quote_b = self.quote_cache.get(&pair.side_b.1)?;

        if !self.has_sufficient_liquidity(quote_a, quote_b) {
            return None;
        }

        // Opposite-side asks: a YES-YES pair hedges through the NO ask on
        // each venue's complementary market; absent that contract in this
        // simplified cross-venue universe we treat ask on the matched side
        // as both legs' cost and let min_edge_bps gate the rest.
        let ask_yes_a = if pair.side_a.2 == ContractSide::Yes {
            quote_a.best_ask
        } else {
            1.0 - quote_a.best_ask
        };
        let ask_no_b = if pair.side_b.2 == ContractSide::No {
            quote_b.best_ask
        } else {
            1.0 - quote_b.best_ask
        };
        let ask_no_a = if pair.side_a.2 == ContractSide::No {
            quote_a.best_ask
        } else {
            1.0 - quote_a.best_ask
        };
        let ask_yes_b = if pair.side_b.2 == ContractSide::Yes {
            quote_b.best_ask
        } else {
            1.0 - quote_b.best_ask
        };

        // Effective (fee-adjusted) asks, assuming a single unit per leg for
        // the cost estimate the same way the edge calculation does — the
        // real qty isn't known until after the edge clears the min-edge
        // gate below, at which point notional is derived from this same
        // fee-adjusted pair rather than the raw quoted ask.
        let fee_calc = &self.fee_calculator;
        let eff_ask_yes_a = fee_calc.effective_price(pair.side_a.0, OrderSide::Buy, ask_yes_a, 1.0, false);
        let eff_ask_no_b = fee_calc.effective_price(pair.side_b.0, OrderSide::Buy, ask_no_b, 1.0, false);
        let eff_ask_no_a = fee_calc.effective_price(pair.side_a.0, OrderSide::Buy, ask_no_a, 1.0, false);
        let eff_ask_yes_b = fee_calc.effective_price(pair.side_b.0, OrderSide::Buy, ask_yes_b, 1.0, false);

        let (edge_bps, rationale) =
            calculate_arbitrage_edge(eff_ask_yes_a, eff_ask_no_b, eff_ask_no_a, eff_ask_yes_b, 0.0);

        if edge_bps < self.min_edge_bps {
            return None;
        }

        let (price_a, price_b) = if rationale == "YES@A+NO@B" {
            (eff_ask_yes_a, eff_ask_no_b)
        } else {
            (eff_ask_no_a, eff_ask_yes_b)
        };

        let qty = min_executable_qty(
            quote_a.bid_size.min(quote_a.ask_size),
            quote_b.bid_size.min(quote_b.ask_size),
            self.min_notional_usd,
            price_a,
            price_b,
        );

        let notional = qty * (price_a + price_b);
        if qty < 1.0 || notional < self.min_notional_usd {
            return None;
        }

        debug!(
            "candidate opportunity {} edge={edge_bps}bps qty={qty}",
            pair.event_id
        );

        Some(ArbOpportunity {
            event_id: pair.event_id,
            leg_a: OpportunityLeg {
                venue: pair.side_a.0,
                contract_id: pair.side_a.1,
                side: pair.side_a.2,
                order_side: OrderSide::Buy,
                price: price_a,
            },
            leg_b: OpportunityLeg {
                venue: pair.side_b.0,
                contract_id: pair.side_b.1,
                side: pair.side_b.2,
                order_side: OrderSide::Buy,
                price: price_b,
            },
            edge_bps,
            notional,
            expiry: pair.side_a.3.min(pair.side_b.3),
            rationale,
            confidence_score: 1.0,
        })
    }

    fn has_sufficient_liquidity(&self, a: &Quote, b: &Quote) -> bool {
        a.bid_size >= LIQUIDITY_FLOOR
            && a.ask_size >= LIQUIDITY_FLOOR
            && b.bid_size >= LIQUIDITY_FLOOR
            && b.ask_size >= LIQUIDITY_FLOOR
    }
}

struct PairCandidate {
    event_id: String,
    side_a: (Venue, String, ContractSide, chrono::DateTime<Utc>),
    side_b: (Venue, String, ContractSide, chrono::DateTime<Utc>),
}

fn find_side<'a>(contracts: &[&'a Contract], side: ContractSide) -> Option<&'a Contract> {
    contracts.iter().find(|c| c.side == side).copied()
}
