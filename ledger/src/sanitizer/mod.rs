//! Semantic firewall: normalizes and screens caller-supplied text before
//! it ever reaches the validator.
//!
//! Ordering is fixed and enforced here, not left to callers: NFKC
//! normalization, then zero-width stripping, then length check, then
//! pattern match. A sanitizer that cannot load its pattern table must
//! refuse everything rather than silently let suspicious text through.

pub mod patterns;

use unicode_normalization::UnicodeNormalization;

use crate::error::ErrorKind;
use patterns::{default_table, Pattern, PATTERN_TABLE_VERSION};

/// Zero-width and invisible-formatting characters stripped prior to
/// pattern matching, so they cannot be used to split a suspicious phrase
/// across invisible boundaries.
const ZERO_WIDTH_CHARS: [char; 6] = [
    '\u{200B}', // zero width space
    '\u{200C}', // zero width non-joiner
    '\u{200D}', // zero width joiner
    '\u{200E}', // left-to-right mark
    '\u{200F}', // right-to-left mark
    '\u{FEFF}', // byte order mark / zero width no-break space
];

/// Screens and normalizes a single piece of caller-supplied text.
///
/// Component-local checks map onto a small number of [`ErrorKind`]
/// variants rather than inventing a parallel error type.
pub struct Sanitizer {
    table: Option<Vec<Pattern>>,
    max_len: usize,
}

impl Sanitizer {
    /// Builds a sanitizer with the default pattern table loaded.
    pub fn new(max_len: usize) -> Self {
        Self {
            table: Some(default_table()),
            max_len,
        }
    }

    /// Builds a sanitizer with no pattern table, simulating the table
    /// becoming unavailable (e.g. failed to load at startup). Every call
    /// then fails closed with [`ErrorKind::PolicyUnavailable`].
    pub fn without_table(max_len: usize) -> Self {
        Self {
            table: None,
            max_len,
        }
    }

    pub fn pattern_table_version(&self) -> Option<u32> {
        self.table.as_ref().map(|_| PATTERN_TABLE_VERSION)
    }

    /// Normalizes and screens `raw`, the value of caller field `field`
    /// (e.g. `"content"`, `"author"`). `field` never appears in a
    /// caller-facing error — it exists purely so rejections can be traced
    /// back to the input that triggered them in logs.
    ///
    /// Returns the sanitized string on success, or the id of the first
    /// matching pattern as an [`ErrorKind::InjectionSuspected`] for the
    /// caller to log internally — the id never appears in a `Display`
    /// string.
    pub fn sanitize(&self, field: &'static str, raw: &str) -> Result<String, ErrorKind> {
        let Some(table) = &self.table else {
            tracing::debug!(field, "sanitizer unavailable, failing closed");
            return Err(ErrorKind::PolicyUnavailable);
        };

        let normalized: String = raw.nfkc().collect();
        let stripped: String = normalized
            .chars()
            .filter(|c| !ZERO_WIDTH_CHARS.contains(c))
            .collect();

        if stripped.len() > self.max_len {
            tracing::debug!(field, len = stripped.len(), max_len = self.max_len, "input too long");
            return Err(ErrorKind::TooLong);
        }

        for pattern in table {
            if pattern.is_match(&stripped) {
                tracing::debug!(field, pattern_id = pattern.id, "input rejected by sanitizer");
                return Err(ErrorKind::InjectionSuspected { pattern_id: pattern.id });
            }
        }

        Ok(stripped)
    }
}
