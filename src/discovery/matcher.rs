//! Legacy Similarity Matcher
//! Mission: an opt-in fallback for venues that have not yet been back-filled
//! with deterministic mappings. Not wired into the default driver loop.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::types::{Contract, ContractSide};

const TITLE_WEIGHT: f64 = 0.6;
const EXPIRY_WEIGHT: f64 = 0.4;
const EXPIRY_MAX_DIFF_SECS: f64 = 7.0 * 24.0 * 3600.0;

#[derive(Debug, Clone)]
pub struct MatchedPair {
    pub event_id: String,
    pub contract_a: Contract,
    pub contract_b: Contract,
    pub confidence_score: f64,
    pub match_reason: String,
}

const STOPWORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
    "from", "up", "about", "into", "through", "during", "before", "after", "above", "below",
    "between", "among", "is", "are", "was", "were", "be", "been", "being", "have", "has", "had",
    "do", "does", "did", "will", "would", "could", "should", "may", "might", "must", "can",
    "shall", "this", "that", "these", "those",
];

pub struct EventMatcher {
    manual_mappings: HashMap<String, String>,
}

impl EventMatcher {
    pub fn new() -> Self {
        Self {
            manual_mappings: HashMap::new(),
        }
    }

    pub fn load_manual_mappings(&mut self, path: &Path) -> anyhow::Result<()> {
        if !path.exists() {
            return Ok(());
        }
        let mut reader = csv::ReaderBuilder::new().from_path(path)?;
        for result in reader.records() {
            let record = result?;
            if record.len() < 2 {
                continue;
            }
            let a = record[0].trim().to_string();
            let b = record[1].trim().to_string();
            if !a.is_empty() && !b.is_empty() {
                self.manual_mappings.insert(a.clone(), b.clone());
                self.manual_mappings.insert(b, a);
            }
        }
        Ok(())
    }

    pub fn add_manual_mapping(&mut self, venue_a_id: &str, venue_b_id: &str) {
        self.manual_mappings
            .insert(venue_a_id.to_string(), venue_b_id.to_string());
        self.manual_mappings
            .insert(venue_b_id.to_string(), venue_a_id.to_string());
    }

    pub fn match_events(
        &self,
        contracts_a: &[Contract],
        contracts_b: &[Contract],
        min_confidence: f64,
    ) -> Vec<MatchedPair> {
        let events_a = group_by_event(contracts_a);
        let events_b = group_by_event(contracts_b);
        let mut pairs = Vec::new();

        for (event_id_a, group_a) in &events_a {
            if let Some(event_id_b) = self.manual_mappings.get(event_id_a) {
                if let Some(group_b) = events_b.get(event_id_b) {
                    pairs.extend(create_pairs(group_a, group_b, 1.0, "manual_mapping"));
                }
            }
        }

        for (event_id_a, group_a) in &events_a {
            if self.manual_mappings.contains_key(event_id_a) {
                continue;
            }
            let mut best: Option<(&Vec<&Contract>, f64)> = None;
            for (event_id_b, group_b) in &events_b {
                if self.manual_mappings.contains_key(event_id_b) {
                    continue;
                }
                let score = match_score(group_a, group_b);
                if score >= min_confidence && score > best.as_ref().map(|(_, s)| *s).unwrap_or(0.0) {
                    best = Some((group_b, score));
                }
            }
            if let Some((group_b, score)) = best {
                pairs.extend(create_pairs(group_a, group_b, score, "automatic"));
            }
        }

        pairs
    }
}

fn group_by_event(contracts: &[Contract]) -> HashMap<String, Vec<&Contract>> {
    let mut map: HashMap<String, Vec<&Contract>> = HashMap::new();
    for contract in contracts {
        map.entry(contract.normalized_event_id.clone())
            .or_default()
            .push(contract);
    }
    map
}

fn create_pairs(
    group_a: &[&Contract],
    group_b: &[&Contract],
    confidence: f64,
    reason: &str,
) -> Vec<MatchedPair> {
    let mut pairs = Vec::new();
    let yes_a = group_a.iter().find(|c| c.side == ContractSide::Yes);
    let no_a = group_a.iter().find(|c| c.side == ContractSide::No);
    let yes_b = group_b.iter().find(|c| c.side == ContractSide::Yes);
    let no_b = group_b.iter().find(|c| c.side == ContractSide::No);

    if let (Some(yes_a), Some(yes_b)) = (yes_a, yes_b) {
        pairs.push(MatchedPair {
            event_id: yes_a.normalized_event_id.clone(),
            contract_a: (*yes_a).clone(),
            contract_b: (*yes_b).clone(),
            confidence_score: confidence,
            match_reason: format!("{reason}_yes"),
        });
    }
    if let (Some(no_a), Some(no_b)) = (no_a, no_b) {
        pairs.push(MatchedPair {
            event_id: no_a.normalized_event_id.clone(),
            contract_a: (*no_a).clone(),
            contract_b: (*no_b).clone(),
            confidence_score: confidence,
            match_reason: format!("{reason}_no"),
        });
    }
    pairs
}

fn match_score(group_a: &[&Contract], group_b: &[&Contract]) -> f64 {
    let (Some(a), Some(b)) = (group_a.first(), group_b.first()) else {
        return 0.0;
    };
    let title_score = title_similarity(&a.normalized_event_id, &b.normalized_event_id);
    let expiry_score = expiry_similarity(a.expires_at, b.expires_at);
    (TITLE_WEIGHT * title_score + EXPIRY_WEIGHT * expiry_score).min(1.0)
}

fn normalize_title(title: &str) -> String {
    title
        .to_lowercase()
        .split_whitespace()
        .filter(|w| !STOPWORDS.contains(w))
        .map(|w| w.chars().filter(|c| c.is_alphanumeric()).collect::<String>())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_similarity(title_a: &str, title_b: &str) -> f64 {
    if title_a.is_empty() || title_b.is_empty() {
        return 0.0;
    }
    let norm_a = normalize_title(title_a);
    let norm_b = normalize_title(title_b);
    if norm_a == norm_b {
        return 1.0;
    }
    sequence_ratio(&norm_a, &norm_b)
}

/// A longest-common-subsequence-based similarity ratio, matching the
/// character-level intent of a `SequenceMatcher.ratio()` call without a
/// dedicated diffing crate.
fn sequence_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let lcs = longest_common_subsequence(&a, &b);
    (2 * lcs) as f64 / (a.len() + b.len()) as f64
}

fn longest_common_subsequence(a: &[char], b: &[char]) -> usize {
    let mut dp = vec![vec![0usize; b.len() + 1]; a.len() + 1];
    for i in 1..=a.len() {
        for j in 1..=b.len() {
            dp[i][j] = if a[i - 1] == b[j - 1] {
                dp[i - 1][j - 1] + 1
            } else {
                dp[i - 1][j].max(dp[i][j - 1])
            };
        }
    }
    dp[a.len()][b.len()]
}

fn expiry_similarity(expiry_a: DateTime<Utc>, expiry_b: DateTime<Utc>) -> f64 {
    let diff_secs = (expiry_a - expiry_b).num_seconds().unsigned_abs() as f64;
    (1.0 - diff_secs / EXPIRY_MAX_DIFF_SECS).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_title_match_scores_one() {
        assert_eq!(title_similarity("will trump win", "will trump win"), 1.0);
    }

    #[test]
    fn expiry_similarity_decays_to_zero_at_seven_days() {
        let a = Utc::now();
        let b = a + chrono::Duration::days(7);
        assert_eq!(expiry_similarity(a, b), 0.0);
    }

    #[test]
    fn manual_mapping_takes_priority() {
        let mut matcher = EventMatcher::new();
        matcher.add_manual_mapping("a1", "b1");
        assert_eq!(matcher.manual_mappings.get("a1"), Some(&"b1".to_string()));
    }
}
