use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

use ledger::dispatch::RequestContext;
use ledger::ErrorKind;

use super::error_to_response;
use crate::state::SharedState;

/// Response body for `POST /mine`.
#[derive(Debug, Serialize)]
pub struct MineResponse {
    pub index: u64,
    pub hash: String,
    pub entries: usize,
}

/// `POST /mine`
///
/// Seals the pending pool into the next block. Returns `204 No Content`
/// if the pool was empty.
pub async fn mine(
    State(state): State<SharedState>,
) -> Result<(StatusCode, Json<MineResponse>), (StatusCode, String)> {
    let core = state.core.clone();

    let result = tokio::task::spawn_blocking(move || {
        let ctx = RequestContext::new("http-gateway");
        core.mine(&ctx)
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("task panicked: {e}")))?;

    match result {
        Ok(block) => Ok((
            StatusCode::OK,
            Json(MineResponse {
                index: block.index,
                hash: block.hash.to_hex(),
                entries: block.entries.len(),
            }),
        )),
        Err(ErrorKind::NothingToMine) => Err((StatusCode::NO_CONTENT, String::new())),
        Err(err) => Err(error_to_response(err)),
    }
}
