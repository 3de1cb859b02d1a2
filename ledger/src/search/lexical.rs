//! Lexical search: case-insensitive substring/term-frequency search
//! with a stable tie-break, no regex.

use crate::types::{Entry, EntryRef};

/// Hard cap on a lexical query's length; queries longer than this are
/// rejected by the caller (core dispatch) before reaching this module,
/// mirroring the sanitizer's length-then-pattern ordering.
pub const MAX_QUERY_LEN: usize = 1024;

/// Counts case-insensitive, non-overlapping occurrences of `needle` in
/// `haystack`.
fn term_frequency(haystack: &str, needle: &str) -> usize {
    if needle.is_empty() {
        return 0;
    }
    let haystack_lower = haystack.to_lowercase();
    let needle_lower = needle.to_lowercase();
    haystack_lower.matches(&needle_lower).count()
}

/// Scores one entry against `query`: the sum of term-frequency counts
/// across `content`, `intent`, and `author`.
fn score_entry(entry: &Entry, query: &str) -> usize {
    term_frequency(&entry.content, query)
        + term_frequency(&entry.intent, query)
        + term_frequency(&entry.author, query)
}

/// Searches `entries` (paired with their chain-relative references) for
/// case-insensitive substring matches of `query`, returning up to `limit`
/// results ordered by descending score, with ties broken by ascending
/// `(block_index, offset)` for determinism.
pub fn search_lexical(entries: &[(EntryRef, Entry)], query: &str, limit: usize) -> Vec<EntryRef> {
    if query.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<(usize, EntryRef)> = entries
        .iter()
        .map(|(r, e)| (score_entry(e, query), *r))
        .filter(|(score, _)| *score > 0)
        .collect();

    scored.sort_by(|(score_a, ref_a), (score_b, ref_b)| {
        score_b
            .cmp(score_a)
            .then_with(|| ref_a.block_index.cmp(&ref_b.block_index))
            .then_with(|| ref_a.offset.cmp(&ref_b.offset))
    });

    scored.into_iter().take(limit).map(|(_, r)| r).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Decision, Metadata, ValidationRecord};
    use chrono::Utc;

    fn entry(content: &str) -> Entry {
        Entry {
            content: content.to_string(),
            author: "alice".into(),
            intent: "test".into(),
            timestamp: Utc::now(),
            metadata: Metadata::new(),
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
    fn matches_are_case_insensitive() {
        let entries = vec![(EntryRef { block_index: 1, offset: 0 }, entry("Widgets are great"))];
        let results = search_lexical(&entries, "WIDGETS", 10);
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn higher_term_frequency_ranks_first() {
        let entries = vec![
            (EntryRef { block_index: 1, offset: 0 }, entry("widget widget widget")),
            (EntryRef { block_index: 1, offset: 1 }, entry("widget")),
        ];
        let results = search_lexical(&entries, "widget", 10);
        assert_eq!(results[0], EntryRef { block_index: 1, offset: 0 });
        assert_eq!(results[1], EntryRef { block_index: 1, offset: 1 });
    }

    #[test]
    fn ties_break_on_block_index_then_offset() {
        let entries = vec![
            (EntryRef { block_index: 2, offset: 0 }, entry("widget")),
            (EntryRef { block_index: 1, offset: 5 }, entry("widget")),
            (EntryRef { block_index: 1, offset: 1 }, entry("widget")),
        ];
        let results = search_lexical(&entries, "widget", 10);
        assert_eq!(
            results,
            vec![
                EntryRef { block_index: 1, offset: 1 },
                EntryRef { block_index: 1, offset: 5 },
                EntryRef { block_index: 2, offset: 0 },
            ]
        );
    }

    #[test]
    fn limit_truncates_results() {
        let entries = vec![
            (EntryRef { block_index: 1, offset: 0 }, entry("widget")),
            (EntryRef { block_index: 1, offset: 1 }, entry("widget")),
        ];
        let results = search_lexical(&entries, "widget", 1);
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn non_matching_entries_are_excluded() {
        let entries = vec![(EntryRef { block_index: 1, offset: 0 }, entry("gizmos only"))];
        let results = search_lexical(&entries, "widget", 10);
        assert!(results.is_empty());
    }
}
