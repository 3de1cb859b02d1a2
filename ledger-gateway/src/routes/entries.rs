use std::collections::BTreeMap;

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

use ledger::dispatch::{EntrySubmission, RequestContext};
use ledger::types::MetadataValue;

use super::error_to_response;
use crate::state::SharedState;

/// Request body for `POST /entries`.
#[derive(Debug, Deserialize)]
pub struct SubmitEntryRequest {
    pub content: String,
    pub author: String,
    pub intent: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

/// Response body for `POST /entries`.
#[derive(Debug, Serialize)]
pub struct SubmitEntryResponse {
    pub status: &'static str,
}

/// `POST /entries`
///
/// Sanitizes, validates, and admits a candidate entry to the pending
/// pool. The dispatch layer (not this handler) strips any caller-supplied
/// system-reserved metadata keys.
pub async fn submit_entry(
    State(state): State<SharedState>,
    Json(body): Json<SubmitEntryRequest>,
) -> Result<(StatusCode, Json<SubmitEntryResponse>), (StatusCode, String)> {
    let core = state.core.clone();

    tokio::task::spawn_blocking(move || {
        let ctx = RequestContext::new("http-gateway");
        let metadata = body
            .metadata
            .into_iter()
            .map(|(k, v)| (k, MetadataValue::Text(v)))
            .collect();
        let submission = EntrySubmission {
            content: body.content,
            author: body.author,
            intent: body.intent,
            metadata,
        };
        core.submit_entry(&ctx, submission)
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("task panicked: {e}")))?
    .map(|()| (StatusCode::ACCEPTED, Json(SubmitEntryResponse { status: "queued" })))
    .map_err(error_to_response)
}
