//! Deterministic validator for tests and degraded mode (mirrors the
//! teacher's `AcceptAllValidator`, but makes an actual decision instead of
//! always accepting).

use crate::types::Decision;

use super::{plain_record, DecisionRequest, ValidationRecord, ValidatorPort};
use crate::error::ErrorKind;

/// Minimum content length (in characters) below which an entry is
/// considered too terse to validate and comes back `NEEDS_CLARIFICATION`.
const MIN_CONTENT_CHARS: usize = 4;

/// A validator with no external dependencies, useful in tests and as a
/// fallback when the configured LLM validator is unavailable.
///
/// Decision rule, in order:
/// 1. Empty content or empty author → `INVALID`.
/// 2. Content shorter than [`MIN_CONTENT_CHARS`] → `NEEDS_CLARIFICATION`.
/// 3. Otherwise → `VALID`, paraphrase is the content verbatim.
pub struct HeuristicValidator {
    model_version: &'static str,
}

impl HeuristicValidator {
    pub fn new() -> Self {
        Self {
            model_version: "heuristic-v1",
        }
    }
}

impl Default for HeuristicValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidatorPort for HeuristicValidator {
    fn decide(&self, request: &DecisionRequest) -> Result<ValidationRecord, ErrorKind> {
        if request.content.trim().is_empty() || request.author.trim().is_empty() {
            return Ok(plain_record(
                Decision::Invalid,
                "",
                "empty content or author",
                "heuristic",
                self.model_version,
            ));
        }

        if request.content.chars().count() < MIN_CONTENT_CHARS {
            return Ok(plain_record(
                Decision::NeedsClarification,
                request.content.clone(),
                "content too short to evaluate confidently",
                "heuristic",
                self.model_version,
            ));
        }

        Ok(plain_record(
            Decision::Valid,
            request.content.clone(),
            "passed deterministic heuristic checks",
            "heuristic",
            self.model_version,
        ))
    }
}
