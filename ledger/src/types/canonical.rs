//! Canonical byte serialization and SHA-256 hashing.
//!
//! Deterministic; no I/O; no clock reads. This is the sole input to
//! hashing for both entries and blocks, and is stable across releases:
//! any change here requires a new block-format version field (absent in
//! v1; all v1 blocks imply version 1).
//!
//! Every field is written as an 8-byte big-endian length prefix followed
//! by its UTF-8 (or raw) bytes, which makes the encoding both canonical
//! and trivially reversible: `decode_entry`/`decode_block` are the exact
//! inverse of `encode_entry`/`encode_block`.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::ErrorKind;

use super::block::Block;
use super::entry::{Decision, Entry, Metadata, MetadataValue, ValidationRecord};
use super::hash::Hash256;

// ---------------------------------------------------------------------
// Low-level writer/reader
// ---------------------------------------------------------------------

fn write_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.extend_from_slice(&(bytes.len() as u64).to_be_bytes());
    buf.extend_from_slice(bytes);
}

fn write_str(buf: &mut Vec<u8>, s: &str) {
    write_bytes(buf, s.as_bytes());
}

fn write_u64(buf: &mut Vec<u8>, n: u64) {
    write_str(buf, &n.to_string());
}

fn write_i64(buf: &mut Vec<u8>, n: i64) {
    write_str(buf, &n.to_string());
}

fn write_f64(buf: &mut Vec<u8>, n: f64) {
    // `{:?}` on f64 round-trips exactly (shortest representation that
    // parses back to the same bit pattern), which is what the round-trip
    // property needs.
    write_str(buf, &format!("{n:?}"));
}

fn write_timestamp(buf: &mut Vec<u8>, ts: &DateTime<Utc>) {
    write_str(buf, &ts.to_rfc3339_opts(SecondsFormat::Nanos, true));
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn read_bytes(&mut self) -> Result<&'a [u8], ErrorKind> {
        if self.pos + 8 > self.bytes.len() {
            return Err(ErrorKind::BadInput("truncated canonical length prefix".into()));
        }
        let mut len_bytes = [0u8; 8];
        len_bytes.copy_from_slice(&self.bytes[self.pos..self.pos + 8]);
        let len = u64::from_be_bytes(len_bytes) as usize;
        self.pos += 8;
        if self.pos + len > self.bytes.len() {
            return Err(ErrorKind::BadInput("truncated canonical field".into()));
        }
        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn read_str(&mut self) -> Result<String, ErrorKind> {
        let bytes = self.read_bytes()?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| ErrorKind::BadInput("canonical field is not valid UTF-8".into()))
    }

    fn read_u64(&mut self) -> Result<u64, ErrorKind> {
        self.read_str()?
            .parse()
            .map_err(|_| ErrorKind::BadInput("expected decimal u64".into()))
    }

    fn read_i64(&mut self) -> Result<i64, ErrorKind> {
        self.read_str()?
            .parse()
            .map_err(|_| ErrorKind::BadInput("expected decimal i64".into()))
    }

    fn read_f64(&mut self) -> Result<f64, ErrorKind> {
        self.read_str()?
            .parse()
            .map_err(|_| ErrorKind::BadInput("expected decimal f64".into()))
    }

    fn read_timestamp(&mut self) -> Result<DateTime<Utc>, ErrorKind> {
        let s = self.read_str()?;
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|_| ErrorKind::BadInput("expected RFC3339 timestamp".into()))
    }

    fn at_end(&self) -> bool {
        self.pos == self.bytes.len()
    }
}

// ---------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------

fn write_metadata(buf: &mut Vec<u8>, metadata: &Metadata) {
    write_u64(buf, metadata.len() as u64);
    // BTreeMap iterates in sorted key order already.
    for (key, value) in metadata.iter() {
        write_str(buf, key);
        match value {
            MetadataValue::Text(s) => {
                buf.push(0);
                write_str(buf, s);
            }
            MetadataValue::Integer(n) => {
                buf.push(1);
                write_i64(buf, *n);
            }
            MetadataValue::Number(n) => {
                buf.push(2);
                write_f64(buf, *n);
            }
            MetadataValue::Bool(b) => {
                buf.push(3);
                buf.push(if *b { 1 } else { 0 });
            }
        }
    }
}

fn read_metadata(r: &mut Reader) -> Result<Metadata, ErrorKind> {
    let count = r.read_u64()?;
    let mut metadata = Metadata::new();
    for _ in 0..count {
        let key = r.read_str()?;
        if r.pos >= r.bytes.len() {
            return Err(ErrorKind::BadInput("truncated metadata tag".into()));
        }
        let tag = r.bytes[r.pos];
        r.pos += 1;
        let value = match tag {
            0 => MetadataValue::Text(r.read_str()?),
            1 => MetadataValue::Integer(r.read_i64()?),
            2 => MetadataValue::Number(r.read_f64()?),
            3 => {
                if r.pos >= r.bytes.len() {
                    return Err(ErrorKind::BadInput("truncated metadata bool".into()));
                }
                let b = r.bytes[r.pos] != 0;
                r.pos += 1;
                MetadataValue::Bool(b)
            }
            _ => return Err(ErrorKind::BadMetadata),
        };
        metadata.insert(key, value);
    }
    Ok(metadata)
}

// ---------------------------------------------------------------------
// Validation record
// ---------------------------------------------------------------------

fn write_validation(buf: &mut Vec<u8>, v: &ValidationRecord) {
    buf.push(v.decision.as_tag());
    write_str(buf, &v.paraphrase);
    write_str(buf, &v.reasoning);
    write_str(buf, &v.validator_id);
    write_str(buf, &v.model_version);
}

fn read_validation(r: &mut Reader) -> Result<ValidationRecord, ErrorKind> {
    if r.pos >= r.bytes.len() {
        return Err(ErrorKind::BadInput("truncated validation record".into()));
    }
    let tag = r.bytes[r.pos];
    r.pos += 1;
    let decision = Decision::from_tag(tag)
        .ok_or_else(|| ErrorKind::BadInput("unrecognized decision tag".into()))?;
    Ok(ValidationRecord {
        decision,
        paraphrase: r.read_str()?,
        reasoning: r.read_str()?,
        validator_id: r.read_str()?,
        model_version: r.read_str()?,
    })
}

// ---------------------------------------------------------------------
// Entry
// ---------------------------------------------------------------------

/// Field order: content, author, intent, timestamp, sorted(metadata),
/// validation record.
pub fn canonicalize_entry(entry: &Entry) -> Vec<u8> {
    let mut buf = Vec::new();
    write_str(&mut buf, &entry.content);
    write_str(&mut buf, &entry.author);
    write_str(&mut buf, &entry.intent);
    write_timestamp(&mut buf, &entry.timestamp);
    write_metadata(&mut buf, &entry.metadata);
    write_validation(&mut buf, &entry.validation);
    buf
}

/// Inverse of [`canonicalize_entry`].
pub fn decode_entry(bytes: &[u8]) -> Result<Entry, ErrorKind> {
    let mut r = Reader::new(bytes);
    let content = r.read_str()?;
    let author = r.read_str()?;
    let intent = r.read_str()?;
    let timestamp = r.read_timestamp()?;
    let metadata = read_metadata(&mut r)?;
    let validation = read_validation(&mut r)?;
    if !r.at_end() {
        return Err(ErrorKind::BadInput("trailing bytes after entry".into()));
    }
    Ok(Entry {
        content,
        author,
        intent,
        timestamp,
        metadata,
        validation,
    })
}

/// SHA-256 over [`canonicalize_entry`]'s output.
pub fn entry_hash(entry: &Entry) -> Hash256 {
    Hash256::compute(&canonicalize_entry(entry))
}

/// Field order: index, timestamp, previous_hash (hex lowercase), nonce,
/// entries (each in canonical form, concatenated length-prefixed).
pub fn canonicalize_block(block: &Block) -> Vec<u8> {
    let mut buf = Vec::new();
    write_u64(&mut buf, block.index);
    write_timestamp(&mut buf, &block.timestamp);
    write_str(&mut buf, &block.previous_hash.to_hex());
    write_u64(&mut buf, block.nonce);
    write_u64(&mut buf, block.entries.len() as u64);
    for entry in &block.entries {
        write_bytes(&mut buf, &canonicalize_entry(entry));
    }
    buf
}

/// Inverse of [`canonicalize_block`]. Does not populate `hash` — callers
/// that need a fully-formed [`Block`] should set it from [`block_hash`]
/// or from the value that accompanied the canonical bytes.
pub fn decode_block(bytes: &[u8]) -> Result<Block, ErrorKind> {
    let mut r = Reader::new(bytes);
    let index = r.read_u64()?;
    let timestamp = r.read_timestamp()?;
    let previous_hash_hex = r.read_str()?;
    let previous_hash = decode_hash_hex(&previous_hash_hex)?;
    let nonce = r.read_u64()?;
    let entry_count = r.read_u64()?;
    let mut entries = Vec::with_capacity(entry_count as usize);
    for _ in 0..entry_count {
        let entry_bytes = r.read_bytes()?;
        entries.push(decode_entry(entry_bytes)?);
    }
    if !r.at_end() {
        return Err(ErrorKind::BadInput("trailing bytes after block".into()));
    }
    let mut block = Block {
        index,
        timestamp,
        entries,
        previous_hash,
        nonce,
        hash: Hash256::ZERO,
    };
    block.hash = block_hash(&block);
    Ok(block)
}

fn decode_hash_hex(s: &str) -> Result<Hash256, ErrorKind> {
    let bytes = hex::decode(s).map_err(|_| ErrorKind::BadInput("expected hex hash".into()))?;
    if bytes.len() != super::hash::HASH_LEN {
        return Err(ErrorKind::BadInput("hash has wrong length".into()));
    }
    let mut arr = [0u8; super::hash::HASH_LEN];
    arr.copy_from_slice(&bytes);
    Ok(Hash256(arr))
}

/// SHA-256 over [`canonicalize_block`]'s output.
pub fn block_hash(block: &Block) -> Hash256 {
    Hash256::compute(&canonicalize_block(block))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::entry::{Decision, ValidationRecord};
    use chrono::TimeZone;

    fn dummy_entry(content: &str) -> Entry {
        let mut metadata = Metadata::new();
        metadata.insert("zeta".into(), MetadataValue::Text("z".into()));
        metadata.insert("alpha".into(), MetadataValue::Integer(7));
        Entry {
            content: content.into(),
            author: "alice".into(),
            intent: "offer".into(),
            timestamp: Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap(),
            metadata,
            validation: ValidationRecord {
                decision: Decision::Valid,
                paraphrase: "p".into(),
                reasoning: "r".into(),
                validator_id: "heuristic".into(),
                model_version: "v1".into(),
            },
        }
    }

    #[test]
    fn entry_hash_is_pure_function_of_canonical_bytes() {
        let e1 = dummy_entry("hello");
        let e2 = dummy_entry("hello");
        assert_eq!(entry_hash(&e1).as_bytes(), entry_hash(&e2).as_bytes());
    }

    #[test]
    fn entry_hash_changes_with_content() {
        let e1 = dummy_entry("hello");
        let e2 = dummy_entry("goodbye");
        assert_ne!(entry_hash(&e1).as_bytes(), entry_hash(&e2).as_bytes());
    }

    #[test]
    fn entry_roundtrips_through_canonical_bytes() {
        let e = dummy_entry("roundtrip me");
        let bytes = canonicalize_entry(&e);
        let decoded = decode_entry(&bytes).expect("decode");
        assert_eq!(decoded, e);
    }

    #[test]
    fn block_roundtrips_through_canonical_bytes() {
        let block = Block {
            index: 4,
            timestamp: Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap(),
            entries: vec![dummy_entry("one"), dummy_entry("two")],
            previous_hash: Hash256::compute(b"parent"),
            nonce: 42,
            hash: Hash256::ZERO,
        };
        let bytes = canonicalize_block(&block);
        let decoded = decode_block(&bytes).expect("decode");
        assert_eq!(decoded.index, block.index);
        assert_eq!(decoded.entries, block.entries);
        assert_eq!(decoded.previous_hash.as_bytes(), block.previous_hash.as_bytes());
        assert_eq!(decoded.nonce, block.nonce);
        assert_eq!(decoded.hash.as_bytes(), block_hash(&block).as_bytes());
    }

    #[test]
    fn metadata_key_order_does_not_affect_hash() {
        // BTreeMap always iterates sorted, so insertion order must not matter.
        let mut m1 = Metadata::new();
        m1.insert("b".into(), MetadataValue::Text("2".into()));
        m1.insert("a".into(), MetadataValue::Text("1".into()));

        let mut m2 = Metadata::new();
        m2.insert("a".into(), MetadataValue::Text("1".into()));
        m2.insert("b".into(), MetadataValue::Text("2".into()));

        let mut e1 = dummy_entry("x");
        e1.metadata = m1;
        let mut e2 = dummy_entry("x");
        e2.metadata = m2;

        assert_eq!(entry_hash(&e1).as_bytes(), entry_hash(&e2).as_bytes());
    }
}
