//! Core value types and the canonical-bytes codec.

pub mod block;
pub mod canonical;
pub mod entry;
pub mod hash;

pub use block::Block;
pub use canonical::{block_hash, canonicalize_block, canonicalize_entry, decode_block, decode_entry, entry_hash};
pub use entry::{
    is_forbidden_metadata_key, Decision, Entry, EntryRef, Metadata, MetadataValue,
    ValidationRecord, MAX_AUTHOR_LEN, MAX_CONTENT_LEN, MAX_INTENT_LEN, SYSTEM_METADATA_PREFIX,
};
pub use hash::{Hash256, HASH_LEN};
