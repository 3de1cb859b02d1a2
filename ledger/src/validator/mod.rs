//! Validator port: the pluggable decision surface that turns sanitized
//! `{content, intent, author}` triples into a [`ValidationRecord`].
//!
//! [`heuristic::HeuristicValidator`] is a deterministic fallback,
//! [`http::HttpLlmValidator`] delegates to an external LLM-mediation
//! service over HTTP, and [`quorum::QuorumValidator`] combines N
//! validators by majority vote with an INVALID tie-break.

pub mod heuristic;
pub mod http;
pub mod quorum;

pub use heuristic::HeuristicValidator;
pub use http::HttpLlmValidator;
pub use quorum::QuorumValidator;

use crate::error::ErrorKind;
use crate::types::{Decision, ValidationRecord};

/// A request to decide admissibility for one candidate entry.
///
/// All three fields have already passed through the sanitizer; the
/// validator port never re-sanitizes.
#[derive(Clone, Debug)]
pub struct DecisionRequest {
    pub content: String,
    pub intent: String,
    pub author: String,
}

/// Abstract LLM-backed (or heuristic) admission-decision surface dispatch
/// calls into for every candidate entry.
///
/// Implementations must be `Send + Sync`: the dispatch layer may call a
/// validator from multiple worker threads concurrently.
pub trait ValidatorPort: Send + Sync {
    /// Decides whether `request` is admissible, returning a full
    /// [`ValidationRecord`] (never just a [`Decision`]) so the paraphrase
    /// and reasoning travel with the entry.
    fn decide(&self, request: &DecisionRequest) -> Result<ValidationRecord, ErrorKind>;

    /// Best-effort natural-language extraction of contract terms from
    /// free text, used by [`crate::contract::parse`] ahead of its line
    /// heuristic. Implementations with no extraction capability return
    /// `None`, telling the caller to fall back to the heuristic; this
    /// must never panic or block indefinitely.
    fn extract_contract_terms(&self, _content: &str) -> Option<crate::contract::ContractTerms> {
        None
    }
}

/// Builds a [`ValidationRecord`] for a [`Decision::Valid`] with no further
/// commentary. Small helper shared by the heuristic and quorum validators.
pub(crate) fn plain_record(
    decision: Decision,
    paraphrase: impl Into<String>,
    reasoning: impl Into<String>,
    validator_id: &str,
    model_version: &str,
) -> ValidationRecord {
    ValidationRecord {
        decision,
        paraphrase: paraphrase.into(),
        reasoning: reasoning.into(),
        validator_id: validator_id.to_string(),
        model_version: model_version.to_string(),
    }
}
