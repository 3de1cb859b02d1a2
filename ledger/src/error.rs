//! Unified error taxonomy for the ledger core.
//!
//! Every component-local error type (sanitizer, validator, storage) is
//! convertible into [`ErrorKind`] via `From`. Only the kind is part of
//! the public taxonomy; component errors stay internal.

use thiserror::Error;

/// Stable invariant identifiers used by [`ErrorKind::ChainBroken`].
pub type Invariant = &'static str;

/// The ledger's error taxonomy.
///
/// Variants are kinds, not class names: callers match on `ErrorKind` to
/// decide whether to retry, surface a generic message, or escalate to an
/// operator.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// Caller-supplied fields violate constraints (length, encoding, missing field).
    #[error("bad input: {0}")]
    BadInput(String),

    /// A metadata value did not match any recognized scalar kind during canonicalization.
    #[error("unrecognized metadata value kind")]
    BadMetadata,

    /// Input exceeds a length bound enforced by the sanitizer, prior to pattern matching.
    #[error("input too long")]
    TooLong,

    /// Sanitizer rejection. `pattern_id` is retained for internal observability
    /// only: `Display` never includes it, so a generic message is all any
    /// caller-facing surface ever sees.
    #[error("input rejected")]
    InjectionSuspected { pattern_id: &'static str },

    /// Sanitizer pattern table or validator configuration missing.
    #[error("policy unavailable")]
    PolicyUnavailable,

    /// The validator returned a non-VALID decision.
    #[error("validator rejected entry: {0}")]
    ValidatorRejected(String),

    /// Validator response malformed or schema-invalid.
    #[error("validator protocol error: {0}")]
    ValidatorProtocol(String),

    /// Transient I/O or rate limit talking to the validator; may be retried.
    #[error("validator transient error: {0}")]
    ValidatorTransient(String),

    /// Validator retries exhausted.
    #[error("validator unavailable")]
    ValidatorUnavailable,

    /// Content already present in chain or pool.
    #[error("duplicate entry")]
    Duplicate,

    /// Pool over its soft cap.
    #[error("pending pool full")]
    PendingFull,

    /// Empty pool at mine time.
    #[error("nothing to mine")]
    NothingToMine,

    /// A concurrent mine won the race for this height.
    #[error("stale tip, retry")]
    StaleTip,

    /// Cooperative cancellation observed.
    #[error("operation cancelled")]
    Cancelled,

    /// Mining did not converge within its wall-clock budget.
    #[error("mining budget exceeded")]
    MiningBudgetExceeded,

    /// Chain invariant violation detected on append or verify.
    #[error("chain broken at index {index}: {invariant}")]
    ChainBroken { index: u64, invariant: Invariant },

    /// Durability layer failure.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// Queried block/entry does not exist.
    #[error("not found")]
    NotFound,
}

impl ErrorKind {
    /// True for kinds that are safe to retry without caller-visible policy implications.
    pub fn is_retry_hint(&self) -> bool {
        matches!(
            self,
            ErrorKind::ValidatorTransient(_) | ErrorKind::Cancelled | ErrorKind::StaleTip
        )
    }

    /// True for kinds that are fatal to subsequent writes until an operator intervenes.
    pub fn is_operator_fatal(&self) -> bool {
        matches!(
            self,
            ErrorKind::ChainBroken { .. } | ErrorKind::StoreUnavailable(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_hints_are_limited_to_transient_kinds() {
        assert!(ErrorKind::ValidatorTransient("timeout".into()).is_retry_hint());
        assert!(ErrorKind::Cancelled.is_retry_hint());
        assert!(ErrorKind::StaleTip.is_retry_hint());
        assert!(!ErrorKind::Duplicate.is_retry_hint());
        assert!(!ErrorKind::NotFound.is_retry_hint());
    }

    #[test]
    fn operator_fatal_kinds_are_limited_to_unrecoverable_storage_state() {
        assert!(
            ErrorKind::ChainBroken {
                index: 3,
                invariant: "previous_hash"
            }
            .is_operator_fatal()
        );
        assert!(ErrorKind::StoreUnavailable("disk full".into()).is_operator_fatal());
        assert!(!ErrorKind::PendingFull.is_operator_fatal());
    }

    #[test]
    fn injection_suspected_message_is_generic() {
        let msg = ErrorKind::InjectionSuspected {
            pattern_id: "ignore-prior-instructions",
        }
        .to_string();
        assert_eq!(msg, "input rejected");
    }
}
