//! Contract parser and matcher: a sub-protocol riding on top of ordinary
//! entries.
//!
//! Extraction is optional and best-effort: it reports an `Option`-heavy
//! result rather than a hard failure mode, since a caller should never
//! depend on it succeeding.

use std::collections::BTreeMap;

use crate::types::{Entry, EntryRef, MetadataValue};
use crate::validator::ValidatorPort;

/// Closed set of contract-sub-protocol message types. Kept as an enum (a
/// small fixed registry, not an open string), mirroring `Decision`'s
/// closed-enum-plus-tag shape.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ContractType {
    Offer,
    Seek,
    Proposal,
    Response,
    Closure,
}

impl ContractType {
    const METADATA_KEY: &'static str = "contract_type";

    /// Reads the contract type tag out of an entry's metadata, if present
    /// and recognized.
    pub fn from_entry(entry: &Entry) -> Option<Self> {
        match entry.metadata.get(Self::METADATA_KEY)? {
            MetadataValue::Text(s) => Self::from_tag(s),
            _ => None,
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "OFFER" => Some(Self::Offer),
            "SEEK" => Some(Self::Seek),
            "PROPOSAL" => Some(Self::Proposal),
            "RESPONSE" => Some(Self::Response),
            "CLOSURE" => Some(Self::Closure),
            _ => None,
        }
    }
}

/// Best-effort extraction result. Every field is optional because
/// extraction is heuristic, not authoritative: a caller must never treat
/// `ContractTerms` as a binding representation of the underlying entry.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ContractTerms {
    pub parties: Vec<String>,
    pub obligations: Vec<String>,
    pub conditions: Vec<String>,
    pub timeline: Option<String>,
    pub value: Option<f64>,
    pub currency: Option<String>,
}

/// A proposed pairing between an OFFER and a SEEK entry. Advisory only:
/// nothing about a `Match` is committed to the chain. The matcher is not
/// a consensus or settlement mechanism.
#[derive(Clone, Debug, PartialEq)]
pub struct Match {
    pub offer: EntryRef,
    pub seek: EntryRef,
    pub score: f64,
}

const SEMANTIC_WEIGHT: f64 = 0.7;
const TERM_WEIGHT: f64 = 0.3;

/// Extracts structured terms from a contract-tagged entry's free text.
///
/// Tries the validator port's natural-language extraction first; if the
/// validator has no extraction capability (or declines to produce a
/// result), falls back to a deterministic, regex-free line heuristic
/// ("parties: a, b", "value: 500 USD", "by <date>"). Both paths are
/// equally "best-effort, nullable on failure, never throws".
pub fn parse(entry: &Entry, validator: &dyn ValidatorPort) -> Option<ContractTerms> {
    ContractType::from_entry(entry)?;

    if let Some(terms) = validator.extract_contract_terms(&entry.content) {
        return Some(terms);
    }

    parse_by_line_heuristic(&entry.content)
}

fn parse_by_line_heuristic(content: &str) -> Option<ContractTerms> {
    let mut terms = ContractTerms::default();
    let mut found_anything = false;

    for line in content.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().to_lowercase();
        let value = value.trim();
        if value.is_empty() {
            continue;
        }

        match key.as_str() {
            "parties" => {
                terms.parties = value.split(',').map(|p| p.trim().to_string()).collect();
                found_anything = true;
            }
            "obligations" => {
                terms.obligations = value.split(';').map(|o| o.trim().to_string()).collect();
                found_anything = true;
            }
            "conditions" => {
                terms.conditions = value.split(';').map(|c| c.trim().to_string()).collect();
                found_anything = true;
            }
            "timeline" | "by" => {
                terms.timeline = Some(value.to_string());
                found_anything = true;
            }
            "value" => {
                if let Some((amount, currency)) = parse_amount(value) {
                    terms.value = Some(amount);
                    terms.currency = currency;
                    found_anything = true;
                }
            }
            _ => {}
        }
    }

    if found_anything {
        Some(terms)
    } else {
        None
    }
}

fn parse_amount(text: &str) -> Option<(f64, Option<String>)> {
    let mut parts = text.split_whitespace();
    let amount: f64 = parts.next()?.trim_start_matches('$').replace(',', "").parse().ok()?;
    let currency = parts.next().map(|s| s.to_uppercase());
    Some((amount, currency))
}

fn term_compatibility(a: &ContractTerms, b: &ContractTerms) -> f64 {
    let a_terms: std::collections::HashSet<&str> = a
        .obligations
        .iter()
        .chain(a.conditions.iter())
        .map(|s| s.as_str())
        .collect();
    let b_terms: std::collections::HashSet<&str> = b
        .obligations
        .iter()
        .chain(b.conditions.iter())
        .map(|s| s.as_str())
        .collect();

    if a_terms.is_empty() || b_terms.is_empty() {
        return 0.0;
    }
    let intersection = a_terms.intersection(&b_terms).count();
    let union = a_terms.union(&b_terms).count();
    intersection as f64 / union as f64
}

/// Pairs OFFERs with SEEKs across `entries` by compatibility score. Score
/// is `0.7 * semantic + 0.3 * term-compatibility`; `semantic_similarity`
/// is supplied by the caller and keyed by each pair's `EntryRef`s (rather
/// than just their text) so it can look vectors up in an embedding index
/// keyed the same way, keeping this module free of any
/// embedding-provider dependency.
pub fn find_matches(
    entries: &[(EntryRef, Entry)],
    validator: &dyn ValidatorPort,
    semantic_similarity: impl Fn(&EntryRef, &Entry, &EntryRef, &Entry) -> f64,
) -> Vec<Match> {
    let offers: Vec<(&EntryRef, &Entry, ContractTerms)> = entries
        .iter()
        .filter(|(_, e)| ContractType::from_entry(e) == Some(ContractType::Offer))
        .filter_map(|(r, e)| parse(e, validator).map(|t| (r, e, t)))
        .collect();
    let seeks: Vec<(&EntryRef, &Entry, ContractTerms)> = entries
        .iter()
        .filter(|(_, e)| ContractType::from_entry(e) == Some(ContractType::Seek))
        .filter_map(|(r, e)| parse(e, validator).map(|t| (r, e, t)))
        .collect();

    let mut matches = Vec::new();
    for (offer_ref, offer_entry, offer_terms) in &offers {
        for (seek_ref, seek_entry, seek_terms) in &seeks {
            let semantic = semantic_similarity(offer_ref, offer_entry, seek_ref, seek_entry).clamp(0.0, 1.0);
            let term = term_compatibility(offer_terms, seek_terms);
            let score = SEMANTIC_WEIGHT * semantic + TERM_WEIGHT * term;
            matches.push(Match {
                offer: **offer_ref,
                seek: **seek_ref,
                score,
            });
        }
    }

    matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    matches
}

#[allow(dead_code)]
fn forbidden_keys_stripped(metadata: &BTreeMap<String, MetadataValue>) -> bool {
    metadata.keys().all(|k| !crate::types::is_forbidden_metadata_key(k))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Decision, Metadata, ValidationRecord};
    use crate::validator::HeuristicValidator;
    use chrono::Utc;

    fn contract_entry(tag: &str, content: &str) -> Entry {
        let mut metadata = Metadata::new();
        metadata.insert("contract_type".into(), MetadataValue::Text(tag.to_string()));
        Entry {
            content: content.to_string(),
            author: "alice".into(),
            intent: "contract".into(),
            timestamp: Utc::now(),
            metadata,
            validation: ValidationRecord {
                decision: Decision::Valid,
                paraphrase: content.to_string(),
                reasoning: "ok".into(),
                validator_id: "heuristic".into(),
                model_version: "v1".into(),
            },
        }
    }

    #[test]
    fn parse_returns_none_for_non_contract_entries() {
        let validator = HeuristicValidator::new();
        let entry = contract_entry("NOT_A_TAG", "parties: a, b");
        // metadata tag is literally invalid so from_entry returns None
        let mut untagged = entry.clone();
        untagged.metadata.clear();
        assert_eq!(parse(&untagged, &validator), None);
    }

    #[test]
    fn parse_extracts_parties_and_value_via_line_heuristic() {
        let validator = HeuristicValidator::new();
        let entry = contract_entry(
            "OFFER",
            "parties: alice, bob\nobligations: deliver widgets\nvalue: 500 USD\nby: Friday",
        );
        let terms = parse(&entry, &validator).expect("should extract terms");
        assert_eq!(terms.parties, vec!["alice", "bob"]);
        assert_eq!(terms.value, Some(500.0));
        assert_eq!(terms.currency, Some("USD".to_string()));
        assert_eq!(terms.timeline, Some("Friday".to_string()));
    }

    #[test]
    fn parse_prefers_validator_extraction_over_line_heuristic() {
        struct FixedExtractor;
        impl ValidatorPort for FixedExtractor {
            fn decide(&self, _request: &crate::validator::DecisionRequest) -> Result<ValidationRecord, crate::error::ErrorKind> {
                unreachable!("not exercised by this test")
            }
            fn extract_contract_terms(&self, _content: &str) -> Option<ContractTerms> {
                Some(ContractTerms {
                    parties: vec!["carol".to_string()],
                    ..Default::default()
                })
            }
        }

        let entry = contract_entry("OFFER", "parties: alice, bob");
        let terms = parse(&entry, &FixedExtractor).expect("should extract terms");
        assert_eq!(terms.parties, vec!["carol"]);
    }

    #[test]
    fn parse_is_nullable_on_unparseable_content() {
        let validator = HeuristicValidator::new();
        let entry = contract_entry("OFFER", "just a friendly chat with no structure");
        assert_eq!(parse(&entry, &validator), None);
    }

    #[test]
    fn find_matches_pairs_offers_with_seeks_and_sorts_by_score() {
        let validator = HeuristicValidator::new();
        let offer = contract_entry("OFFER", "parties: alice\nobligations: widgets\nvalue: 100 USD");
        let seek = contract_entry("SEEK", "parties: bob\nobligations: widgets\nvalue: 100 USD");
        let unrelated_seek = contract_entry("SEEK", "parties: carol\nobligations: gizmos");

        let entries = vec![
            (EntryRef { block_index: 1, offset: 0 }, offer),
            (EntryRef { block_index: 1, offset: 1 }, seek),
            (EntryRef { block_index: 1, offset: 2 }, unrelated_seek),
        ];

        let matches = find_matches(&entries, &validator, |_or, _oe, _sr, _se| 0.9);
        assert_eq!(matches.len(), 2);
        // Matching obligations ("widgets") should outrank the unrelated pair.
        assert!(matches[0].score >= matches[1].score);
    }

    #[test]
    fn contract_type_round_trips_through_metadata() {
        for (tag, expected) in [
            ("OFFER", ContractType::Offer),
            ("SEEK", ContractType::Seek),
            ("PROPOSAL", ContractType::Proposal),
            ("RESPONSE", ContractType::Response),
            ("CLOSURE", ContractType::Closure),
        ] {
            let entry = contract_entry(tag, "parties: a");
            assert_eq!(ContractType::from_entry(&entry), Some(expected));
        }
    }
}
