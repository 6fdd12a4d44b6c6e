//! Venue Mappers
//! Mission: turn a venue's raw market title/ticker into a canonical event
//! id, or abstain. Policy: deterministic or abstain — never a fuzzy guess.

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::types::{CanonicalEvent, EventType, MappingMethod, Venue, VenueMapping};

use super::EventRegistry;

/// Closed union of the metadata a mapper may be handed alongside a title —
/// deliberately not a dynamic dict, per the registry's typed-record policy.
#[derive(Debug, Clone, Default)]
pub struct MarketMetadata {
    pub close_time: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl MarketMetadata {
    fn close_or_far_future(&self) -> DateTime<Utc> {
        self.close_time
            .or(self.end_date)
            .unwrap_or_else(|| Utc::now() + chrono::Duration::days(3650))
    }
}

const TITLE_PREFIXES: &[&str] = &["mr", "mr.", "dr", "dr.", "sen", "sen.", "rep", "rep."];

fn ascii_fold(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'ö' | 'õ' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ñ' => 'n',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

fn normalize_for_match(input: &str) -> String {
    let folded = ascii_fold(input).to_lowercase();
    let mut words: Vec<&str> = folded.split_whitespace().collect();
    words.retain(|w| !TITLE_PREFIXES.contains(w));
    words.join(" ")
}

fn candidate_alias(normalized_text: &str) -> Option<&'static str> {
    const ALIASES: &[(&str, &[&str])] = &[
        ("TRUMP", &["trump", "donald trump"]),
        ("BIDEN", &["biden", "joe biden"]),
        ("HARRIS", &["harris", "kamala harris"]),
        ("DESANTIS", &["desantis", "ron desantis"]),
        ("NEWSOM", &["newsom", "gavin newsom"]),
    ];
    for (canonical, variants) in ALIASES {
        if variants.iter().any(|v| normalized_text.contains(v)) {
            return Some(canonical);
        }
    }
    None
}

fn ceremony_alias(normalized_text: &str) -> Option<&'static str> {
    if normalized_text.contains("oscar") {
        Some("OSCARS")
    } else if normalized_text.contains("emmy") {
        Some("EMMYS")
    } else if normalized_text.contains("grammy") {
        Some("GRAMMYS")
    } else {
        None
    }
}

pub trait VenueMapper {
    fn venue(&self) -> Venue;

    /// Returns a canonical event id only when every required component for
    /// some event-id template can be deterministically extracted; otherwise
    /// abstains (returns `None`) without touching the registry.
    fn map(
        &self,
        market_id: &str,
        title: &str,
        description: &str,
        metadata: &MarketMetadata,
    ) -> Option<String>;

    /// Runs `map`, and on success ensures the event exists and records the
    /// mapping at confidence 0.95 (deterministic).
    fn map_and_register(
        &self,
        registry: &mut EventRegistry,
        market_id: &str,
        title: &str,
        description: &str,
        metadata: &MarketMetadata,
    ) -> Option<String> {
        let event_id = self.map(market_id, title, description, metadata)?;

        if registry.event(&event_id).is_none() {
            registry.add_event(CanonicalEvent {
                event_id: event_id.clone(),
                event_type: infer_event_type(&event_id),
                scope: infer_scope(&event_id),
                close_time: metadata.close_or_far_future(),
                canonical_units: "USD".to_string(),
                display_title: title.to_string(),
                resolution_source: String::new(),
                aliases: Vec::new(),
                created_at: Utc::now(),
            });
        }

        let now = Utc::now();
        let _ = registry.add_mapping(VenueMapping {
            venue: self.venue(),
            market_id: market_id.to_string(),
            event_id: event_id.clone(),
            title_raw: title.to_string(),
            description_raw: description.to_string(),
            outcomes: vec!["YES".to_string(), "NO".to_string()],
            confidence: 0.95,
            mapping_method: MappingMethod::Deterministic,
            created_at: now,
            updated_at: now,
        });

        Some(event_id)
    }
}

fn infer_event_type(event_id: &str) -> EventType {
    event_id
        .split(':')
        .next()
        .and_then(|s| s.to_lowercase().parse().ok())
        .unwrap_or(EventType::Other)
}

fn infer_scope(event_id: &str) -> String {
    event_id.split(':').nth(1).unwrap_or("GLOBAL").to_string()
}

/// Matches titles like "Will Trump win the 2028 Presidential Election?" and
/// tickers like `PRES-2028-TRUMP`.
pub struct PolymarketMapper {
    election_year_re: Regex,
    award_year_re: Regex,
    crypto_target_re: Regex,
}

impl Default for PolymarketMapper {
    fn default() -> Self {
        Self {
            election_year_re: Regex::new(r"20(2[4-9]|30)").unwrap(),
            award_year_re: Regex::new(r"20\d{2}").unwrap(),
            crypto_target_re: Regex::new(r"(BTC|ETH|SOL)\D{0,6}(\d+)K?").unwrap(),
        }
    }
}

impl PolymarketMapper {
    fn parse_election(&self, title: &str) -> Option<String> {
        let normalized = normalize_for_match(title);
        if !normalized.contains("president") && !normalized.contains("election") {
            return None;
        }
        let year_match = self.election_year_re.find(title)?;
        let year = year_match.as_str();
        let candidate = candidate_alias(&normalized)?;
        Some(format!("ELECTION:US:PRESIDENT:{year}:{candidate}"))
    }

    fn parse_crypto(&self, title: &str, metadata: &MarketMetadata) -> Option<String> {
        let title_upper = title.to_uppercase();
        let caps = self.crypto_target_re.captures(&title_upper)?;
        let ticker = caps.get(1)?.as_str();
        let threshold: i64 = caps.get(2)?.as_str().parse().ok()?;
        let threshold = if title.to_uppercase().contains(&format!("{threshold}K")) {
            threshold * 1000
        } else {
            threshold
        };
        let date = metadata.close_or_far_future().format("%Y-%m-%d").to_string();
        Some(format!("CRYPTO:GLOBAL:{ticker}_TARGET:{threshold}:{date}"))
    }

    fn parse_awards(&self, title: &str, metadata: &MarketMetadata) -> Option<String> {
        let normalized = normalize_for_match(title);
        let ceremony = ceremony_alias(&normalized)?;
        let year_match = self.award_year_re.find(title)?;
        let year = year_match.as_str();

        // Category and nominee both need explicit " - " delimited structure in
        // the title; without it we cannot deterministically split them.
        let parts: Vec<&str> = title.split(" - ").collect();
        if parts.len() < 2 {
            let _ = metadata;
            return None;
        }
        let category = parts[0]
            .split_whitespace()
            .last()
            .unwrap_or("CATEGORY")
            .to_uppercase();
        let nominee = parts[1].trim().to_uppercase().replace(' ', "_");
        Some(format!("AWARDS:GLOBAL:{ceremony}:{category}:{year}:{nominee}"))
    }
}

impl VenueMapper for PolymarketMapper {
    fn venue(&self) -> Venue {
        Venue::Polymarket
    }

    fn map(
        &self,
        _market_id: &str,
        title: &str,
        _description: &str,
        metadata: &MarketMetadata,
    ) -> Option<String> {
        self.parse_election(title)
            .or_else(|| self.parse_crypto(title, metadata))
            .or_else(|| self.parse_awards(title, metadata))
    }
}

/// Parses Kalshi's compact ticker conventions directly; falls back to the
/// same title-parsing logic as `PolymarketMapper` when no ticker pattern
/// matches (Kalshi titles follow the same English-language conventions).
pub struct KalshiMapper {
    fallback: PolymarketMapper,
}

impl Default for KalshiMapper {
    fn default() -> Self {
        Self {
            fallback: PolymarketMapper::default(),
        }
    }
}

impl KalshiMapper {
    fn parse_ticker(&self, market_id: &str) -> Option<String> {
        let parts: Vec<&str> = market_id.split('-').collect();
        match parts.as_slice() {
            ["PRES", year, candidate] => {
                Some(format!("ELECTION:US:PRESIDENT:{year}:{}", candidate.to_uppercase()))
            }
            [ticker @ ("BTC" | "ETH" | "SOL"), amount, year] => {
                let digits: String = amount.chars().take_while(|c| c.is_ascii_digit()).collect();
                let value: i64 = digits.parse().ok()?;
                let value = if amount.to_uppercase().ends_with('K') {
                    value * 1000
                } else {
                    value
                };
                Some(format!(
                    "CRYPTO:GLOBAL:{ticker}_TARGET:{value}:{year}-12-31"
                ))
            }
            _ => None,
        }
    }
}

impl VenueMapper for KalshiMapper {
    fn venue(&self) -> Venue {
        Venue::Kalshi
    }

    fn map(
        &self,
        market_id: &str,
        title: &str,
        description: &str,
        metadata: &MarketMetadata,
    ) -> Option<String> {
        self.parse_ticker(market_id)
            .or_else(|| self.fallback.map(market_id, title, description, metadata))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cross_venue_determinism_s3() {
        let poly = PolymarketMapper::default();
        let kalshi = KalshiMapper::default();
        let metadata = MarketMetadata::default();

        let from_title = poly
            .map(
                "m1",
                "Will Trump win the 2028 Presidential Election?",
                "",
                &metadata,
            )
            .expect("polymarket title should map");
        let from_ticker = kalshi
            .map("PRES-2028-TRUMP", "", "", &metadata)
            .expect("kalshi ticker should map");

        assert_eq!(from_title, "ELECTION:US:PRESIDENT:2028:TRUMP");
        assert_eq!(from_title, from_ticker);
    }

    #[test]
    fn ambiguous_title_abstains() {
        let poly = PolymarketMapper::default();
        let metadata = MarketMetadata::default();
        assert!(poly
            .map("m2", "Will it rain tomorrow?", "", &metadata)
            .is_none());
    }

    #[test]
    fn crypto_ticker_expands_k_suffix() {
        let kalshi = KalshiMapper::default();
        let metadata = MarketMetadata::default();
        let event_id = kalshi
            .map("BTC-150K-2025", "", "", &metadata)
            .expect("should map crypto ticker");
        assert!(event_id.starts_with("CRYPTO:GLOBAL:BTC_TARGET:150000:"));
    }

    #[test]
    fn map_and_register_creates_event_and_mapping() {
        let mut registry = EventRegistry::new();
        let poly = PolymarketMapper::default();
        let metadata = MarketMetadata::default();
        let event_id = poly
            .map_and_register(
                &mut registry,
                "m1",
                "Will Trump win the 2028 Presidential Election?",
                "",
                &metadata,
            )
            .unwrap();
        assert!(registry.event(&event_id).is_some());
        assert_eq!(registry.lookup(Venue::Polymarket, "m1"), Some(event_id.as_str()));
    }
}
