//! Entry, metadata, and validation-record types.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Hard cap on entry content length (64 KiB).
pub const MAX_CONTENT_LEN: usize = 64 * 1024;
/// Bound on the `author` field (256 bytes).
pub const MAX_AUTHOR_LEN: usize = 256;
/// Bound on the `intent` field (2 KiB).
pub const MAX_INTENT_LEN: usize = 2 * 1024;

/// A bounded tagged-variant over the recognized metadata scalar kinds.
///
/// Unrecognized shapes simply cannot be constructed, rather than being
/// silently stored and later misinterpreted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum MetadataValue {
    Text(String),
    Integer(i64),
    Number(f64),
    Bool(bool),
}

/// Mapping from a bounded set of recognized keys to scalar values.
///
/// A [`BTreeMap`] is used (rather than a `HashMap`) so iteration is always
/// in lexicographic key order, which is exactly the ordering canonical
/// byte encoding requires, no separate sort step needed before hashing.
pub type Metadata = BTreeMap<String, MetadataValue>;

/// Prefix reserved for system-owned metadata keys.
///
/// Keys with this prefix are stripped at ingress by core dispatch and
/// can never be set by a candidate entry's author.
pub const SYSTEM_METADATA_PREFIX: &str = "_system";

/// Returns true if `key` is reserved for system use and must be rejected
/// or stripped at the trust boundary.
pub fn is_forbidden_metadata_key(key: &str) -> bool {
    key.starts_with(SYSTEM_METADATA_PREFIX)
}

/// The validator's admission decision.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Decision {
    Valid,
    NeedsClarification,
    Invalid,
}

impl Decision {
    pub fn as_tag(&self) -> u8 {
        match self {
            Decision::Valid => 0,
            Decision::NeedsClarification => 1,
            Decision::Invalid => 2,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Decision::Valid),
            1 => Some(Decision::NeedsClarification),
            2 => Some(Decision::Invalid),
            _ => None,
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Decision::Valid => "VALID",
            Decision::NeedsClarification => "NEEDS_CLARIFICATION",
            Decision::Invalid => "INVALID",
        };
        write!(f, "{s}")
    }
}

/// Record of the validator's decision, paraphrase, and reasoning at
/// admission time. Never mutated after an entry is constructed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValidationRecord {
    pub decision: Decision,
    pub paraphrase: String,
    pub reasoning: String,
    pub validator_id: String,
    pub model_version: String,
}

/// One immutable natural-language statement authored by a named party.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub content: String,
    pub author: String,
    pub intent: String,
    pub timestamp: DateTime<Utc>,
    pub metadata: Metadata,
    pub validation: ValidationRecord,
}

impl Entry {
    /// True only if this entry was admitted with `decision = VALID`.
    pub fn is_admissible(&self) -> bool {
        self.validation.decision == Decision::Valid
    }
}

/// Opaque back-reference to an entry sealed in the chain.
///
/// No reference is authoritative until the target is sealed, and
/// resolution always goes through the chain store.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct EntryRef {
    pub block_index: u64,
    pub offset: u32,
}
