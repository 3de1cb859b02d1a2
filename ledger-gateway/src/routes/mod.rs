pub mod entries;
pub mod health;
pub mod mine;

use axum::http::StatusCode;
use ledger::ErrorKind;

/// Maps an [`ErrorKind`] to an HTTP status and a caller-facing message.
///
/// `Display` on `ErrorKind` already keeps internal detail (e.g. a
/// sanitizer `pattern_id`) out of the message, so handlers can pass it
/// straight through to the response body.
pub fn error_to_response(err: ErrorKind) -> (StatusCode, String) {
    let status = match &err {
        ErrorKind::BadInput(_) | ErrorKind::BadMetadata | ErrorKind::TooLong => StatusCode::BAD_REQUEST,
        ErrorKind::InjectionSuspected { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::ValidatorRejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Duplicate => StatusCode::CONFLICT,
        ErrorKind::PendingFull => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::NothingToMine => StatusCode::NO_CONTENT,
        ErrorKind::StaleTip => StatusCode::CONFLICT,
        ErrorKind::Cancelled => StatusCode::REQUEST_TIMEOUT,
        ErrorKind::MiningBudgetExceeded => StatusCode::REQUEST_TIMEOUT,
        ErrorKind::PolicyUnavailable
        | ErrorKind::ValidatorUnavailable
        | ErrorKind::ValidatorTransient(_)
        | ErrorKind::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::ValidatorProtocol(_) => StatusCode::BAD_GATEWAY,
        ErrorKind::ChainBroken { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
    };
    (status, err.to_string())
}
