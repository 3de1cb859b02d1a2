//! Versioned table of suspicious patterns.
//!
//! Pattern identifiers are internal bookkeeping only: they are never
//! surfaced to a caller, logged at a level a caller could observe, or
//! returned in an error message. A rejection is always the same
//! generic [`crate::error::ErrorKind::InjectionSuspected`].

use regex::Regex;

/// One compiled suspicious-pattern rule.
pub struct Pattern {
    /// Stable internal identifier, never exposed outside the sanitizer.
    pub id: &'static str,
    regex: Regex,
}

impl Pattern {
    fn new(id: &'static str, pattern: &str) -> Self {
        Self {
            id,
            regex: Regex::new(pattern).expect("pattern table entries are compile-time constants"),
        }
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

/// Current pattern-table version. Bump whenever a rule is added, removed,
/// or rewritten; callers observe this for audit purposes only.
pub const PATTERN_TABLE_VERSION: u32 = 1;

/// Builds the default suspicious-pattern table.
///
/// Patterns target common prompt-injection and role-confusion phrasing
/// aimed at a downstream LLM validator, not general profanity or spam —
/// those are left to the validator itself.
pub fn default_table() -> Vec<Pattern> {
    vec![
        Pattern::new(
            "ignore-prior-instructions",
            r"(?i)ignore\s+(all\s+)?(previous|prior|above)\s+instructions",
        ),
        Pattern::new(
            "role-override",
            r"(?i)you\s+are\s+now\s+(a|an|in)\s+\w+\s+mode",
        ),
        Pattern::new("system-prompt-leak", r"(?i)reveal\s+(your|the)\s+system\s+prompt"),
        Pattern::new(
            "developer-override",
            r"(?i)\b(developer|admin|root)\s+override\b",
        ),
        Pattern::new("forced-affirmative", r"(?i)respond\s+only\s+with\s+(valid|yes|approved)"),
    ]
}
