//! Canonical Event Registry
//! Mission: the single source of truth mapping (venue, market_id) onto a
//! canonical event id, persisted to two pipe-delimited CSV tables.

pub mod mappers;

use std::collections::HashMap;
use std::path::Path;

use chrono::Utc;
use csv::{ReaderBuilder, WriterBuilder};
use tracing::warn;

use crate::types::{CanonicalEvent, EventType, MappingMethod, Venue, VenueMapping};

const ALIAS_DELIM: char = '|';

#[derive(Debug, Default)]
pub struct CoverageStats {
    pub total_events: usize,
    pub total_mappings: usize,
    pub per_venue: HashMap<Venue, usize>,
    pub per_method: HashMap<MappingMethod, usize>,
    pub events_with_cross_venue: usize,
}

#[derive(Default)]
pub struct EventRegistry {
    events: HashMap<String, CanonicalEvent>,
    mappings: HashMap<(Venue, String), VenueMapping>,
    aliases: HashMap<String, String>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent by event_id: a later add overwrites metadata but never
    /// changes the id, since the id itself is a pure function of its inputs.
    pub fn add_event(&mut self, event: CanonicalEvent) {
        for alias in &event.aliases {
            self.aliases.insert(alias.to_ascii_uppercase(), event.event_id.clone());
        }
        self.events.insert(event.event_id.clone(), event);
    }

    /// Case-insensitive lookup against every alias registered across all
    /// events, not just an event's own display title.
    pub fn lookup_by_alias(&self, alias: &str) -> Option<&CanonicalEvent> {
        let event_id = self.aliases.get(&alias.to_ascii_uppercase())?;
        self.events.get(event_id)
    }

    pub fn add_mapping(&mut self, mapping: VenueMapping) -> anyhow::Result<()> {
        if !self.events.contains_key(&mapping.event_id) {
            anyhow::bail!(
                "cannot add mapping for unknown event_id {}",
                mapping.event_id
            );
        }
        let key = (mapping.venue, mapping.market_id.clone());
        let mut mapping = mapping;
        mapping.updated_at = Utc::now();
        self.mappings.insert(key, mapping);
        Ok(())
    }

    pub fn lookup(&self, venue: Venue, market_id: &str) -> Option<&str> {
        self.mappings
            .get(&(venue, market_id.to_string()))
            .map(|m| m.event_id.as_str())
    }

    pub fn event(&self, event_id: &str) -> Option<&CanonicalEvent> {
        self.events.get(event_id)
    }

    pub fn markets_for(&self, event_id: &str) -> Vec<&VenueMapping> {
        self.mappings
            .values()
            .filter(|m| m.event_id == event_id)
            .collect()
    }

    pub fn coverage_stats(&self) -> CoverageStats {
        let mut stats = CoverageStats {
            total_events: self.events.len(),
            total_mappings: self.mappings.len(),
            ..Default::default()
        };

        let mut venues_by_event: HashMap<&str, std::collections::HashSet<Venue>> = HashMap::new();
        for mapping in self.mappings.values() {
            *stats.per_venue.entry(mapping.venue).or_insert(0) += 1;
            *stats
                .per_method
                .entry(mapping.mapping_method.clone())
                .or_insert(0) += 1;
            venues_by_event
                .entry(mapping.event_id.as_str())
                .or_default()
                .insert(mapping.venue);
        }
        stats.events_with_cross_venue = venues_by_event
            .values()
            .filter(|venues| venues.len() >= 2)
            .count();

        stats
    }

    pub fn save(&self, events_path: &Path, mappings_path: &Path) -> anyhow::Result<()> {
        let mut events_writer = WriterBuilder::new().from_path(events_path)?;
        events_writer.write_record([
            "event_id",
            "event_type",
            "scope",
            "date_close",
            "canonical_units",
            "display_title",
            "resolution_source",
            "aliases",
            "created_at",
        ])?;
        for event in self.events.values() {
            events_writer.write_record([
                event.event_id.as_str(),
                event.event_type.as_str(),
                event.scope.as_str(),
                &event.close_time.to_rfc3339(),
                event.canonical_units.as_str(),
                event.display_title.as_str(),
                event.resolution_source.as_str(),
                &event.aliases.join(&ALIAS_DELIM.to_string()),
                &event.created_at.to_rfc3339(),
            ])?;
        }
        events_writer.flush()?;

        let mut mappings_writer = WriterBuilder::new().from_path(mappings_path)?;
        mappings_writer.write_record([
            "venue",
            "market_id",
            "event_id",
            "title_raw",
            "description_raw",
            "outcomes",
            "confidence",
            "mapping_method",
            "created_at",
            "updated_at",
        ])?;
        for mapping in self.mappings.values() {
            mappings_writer.write_record([
                mapping.venue.as_str(),
                mapping.market_id.as_str(),
                mapping.event_id.as_str(),
                mapping.title_raw.as_str(),
                mapping.description_raw.as_str(),
                &mapping.outcomes.join(&ALIAS_DELIM.to_string()),
                &mapping.confidence.to_string(),
                mapping.mapping_method.as_str(),
                &mapping.created_at.to_rfc3339(),
                &mapping.updated_at.to_rfc3339(),
            ])?;
        }
        mappings_writer.flush()?;

        Ok(())
    }

    pub fn load(&mut self, events_path: &Path, mappings_path: &Path) -> anyhow::Result<()> {
        if events_path.exists() {
            let mut reader = ReaderBuilder::new().from_path(events_path)?;
            let headers = reader.headers()?.clone();
            for result in reader.records() {
                let record = result?;
                match parse_event_row(&record, &headers) {
                    Some(event) => self.add_event(event),
                    None => warn!("skipping malformed event row: {:?}", record),
                }
            }
        }

        if mappings_path.exists() {
            let mut reader = ReaderBuilder::new().from_path(mappings_path)?;
            let headers = reader.headers()?.clone();
            for result in reader.records() {
                let record = result?;
                match parse_mapping_row(&record, &headers) {
                    Some(mapping) => {
                        let key = (mapping.venue, mapping.market_id.clone());
                        self.mappings.insert(key, mapping);
                    }
                    None => warn!("skipping malformed mapping row: {:?}", record),
                }
            }
        }

        Ok(())
    }
}

fn field<'a>(record: &'a csv::StringRecord, headers: &csv::StringRecord, name: &str) -> Option<&'a str> {
    headers.iter().position(|h| h == name).and_then(|i| record.get(i))
}

fn parse_event_row(record: &csv::StringRecord, headers: &csv::StringRecord) -> Option<CanonicalEvent> {
    let event_id = field(record, headers, "event_id")?.to_string();
    let event_type = field(record, headers, "event_type")?.parse::<EventType>().ok()?;
    let scope = field(record, headers, "scope")?.to_string();
    let close_time = chrono::DateTime::parse_from_rfc3339(field(record, headers, "date_close")?)
        .ok()?
        .with_timezone(&Utc);
    let canonical_units = field(record, headers, "canonical_units").unwrap_or("").to_string();
    let display_title = field(record, headers, "display_title").unwrap_or("").to_string();
    let resolution_source = field(record, headers, "resolution_source").unwrap_or("").to_string();
    let aliases = field(record, headers, "aliases")
        .unwrap_or("")
        .split(ALIAS_DELIM)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect();
    let created_at = field(record, headers, "created_at")
        .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);

    Some(CanonicalEvent {
        event_id,
        event_type,
        scope,
        close_time,
        canonical_units,
        display_title,
        resolution_source,
        aliases,
        created_at,
    })
}

fn parse_mapping_row(record: &csv::StringRecord, headers: &csv::StringRecord) -> Option<VenueMapping> {
    let venue = field(record, headers, "venue")?.parse::<Venue>().ok()?;
    let market_id = field(record, headers, "market_id")?.to_string();
    let event_id = field(record, headers, "event_id")?.to_string();
    let title_raw = field(record, headers, "title_raw").unwrap_or("").to_string();
    let description_raw = field(record, headers, "description_raw").unwrap_or("").to_string();
    let outcomes = field(record, headers, "outcomes")
        .unwrap_or("")
        .split(ALIAS_DELIM)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect();
    let confidence: f64 = field(record, headers, "confidence")?.parse().ok()?;
    let mapping_method = match field(record, headers, "mapping_method")? {
        "manual" => MappingMethod::Manual,
        "heuristic" => MappingMethod::Heuristic,
        _ => MappingMethod::Deterministic,
    };
    let created_at = field(record, headers, "created_at")
        .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);
    let updated_at = field(record, headers, "updated_at")
        .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);

    Some(VenueMapping {
        venue,
        market_id,
        event_id,
        title_raw,
        description_raw,
        outcomes,
        confidence,
        mapping_method,
        created_at,
        updated_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_event() -> CanonicalEvent {
        CanonicalEvent {
            event_id: "ELECTION:US:PRESIDENT:2028:TRUMP".to_string(),
            event_type: EventType::Election,
            scope: "US".to_string(),
            close_time: Utc::now() + Duration::days(400),
            canonical_units: "USD".to_string(),
            display_title: "2028 US Presidential Election - Trump".to_string(),
            resolution_source: "AP".to_string(),
            aliases: vec!["TRUMP".to_string()],
            created_at: Utc::now(),
        }
    }

    fn sample_mapping(venue: Venue, market_id: &str, event_id: &str) -> VenueMapping {
        let now = Utc::now();
        VenueMapping {
            venue,
            market_id: market_id.to_string(),
            event_id: event_id.to_string(),
            title_raw: "Will Trump win the 2028 Presidential Election?".to_string(),
            description_raw: String::new(),
            outcomes: vec!["YES".to_string(), "NO".to_string()],
            confidence: 0.95,
            mapping_method: MappingMethod::Deterministic,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn add_mapping_requires_existing_event() {
        let mut registry = EventRegistry::new();
        let mapping = sample_mapping(Venue::Polymarket, "m1", "ELECTION:US:PRESIDENT:2028:TRUMP");
        assert!(registry.add_mapping(mapping).is_err());
    }

    #[test]
    fn lookup_after_add() {
        let mut registry = EventRegistry::new();
        registry.add_event(sample_event());
        registry
            .add_mapping(sample_mapping(
                Venue::Polymarket,
                "m1",
                "ELECTION:US:PRESIDENT:2028:TRUMP",
            ))
            .unwrap();
        assert_eq!(
            registry.lookup(Venue::Polymarket, "m1"),
            Some("ELECTION:US:PRESIDENT:2028:TRUMP")
        );
    }

    #[test]
    fn cross_venue_coverage_s3() {
        let mut registry = EventRegistry::new();
        registry.add_event(sample_event());
        registry
            .add_mapping(sample_mapping(
                Venue::Polymarket,
                "m1",
                "ELECTION:US:PRESIDENT:2028:TRUMP",
            ))
            .unwrap();
        registry
            .add_mapping(sample_mapping(
                Venue::Kalshi,
                "PRES-2028-TRUMP",
                "ELECTION:US:PRESIDENT:2028:TRUMP",
            ))
            .unwrap();
        let stats = registry.coverage_stats();
        assert_eq!(stats.events_with_cross_venue, 1);
    }

    #[test]
    fn alias_lookup_is_case_insensitive() {
        let mut registry = EventRegistry::new();
        registry.add_event(sample_event());
        assert_eq!(
            registry.lookup_by_alias("trump").unwrap().event_id,
            "ELECTION:US:PRESIDENT:2028:TRUMP"
        );
        assert_eq!(
            registry.lookup_by_alias("TrUmP").unwrap().event_id,
            "ELECTION:US:PRESIDENT:2028:TRUMP"
        );
        assert!(registry.lookup_by_alias("no-such-alias").is_none());
    }

    #[test]
    fn save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let events_path = dir.path().join("events.csv");
        let mappings_path = dir.path().join("mappings.csv");

        let mut registry = EventRegistry::new();
        registry.add_event(sample_event());
        registry
            .add_mapping(sample_mapping(
                Venue::Polymarket,
                "m1",
                "ELECTION:US:PRESIDENT:2028:TRUMP",
            ))
            .unwrap();
        registry.save(&events_path, &mappings_path).unwrap();

        let mut loaded = EventRegistry::new();
        loaded.load(&events_path, &mappings_path).unwrap();
        assert_eq!(loaded.events.len(), 1);
        assert_eq!(loaded.mappings.len(), 1);
        assert_eq!(
            loaded.lookup(Venue::Polymarket, "m1"),
            Some("ELECTION:US:PRESIDENT:2028:TRUMP")
        );
    }
}
