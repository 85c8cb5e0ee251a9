use crate::error::{AppError, Result};
use crate::state::AppState;
use axum::{Json, extract::State};
use tongate_protocol::{MemberRecordView, RegisterMemberRequest};

/// Registers a wallet (idempotently) and returns its membership record.
pub async fn register_member(
    State(state): State<AppState>,
    Json(body): Json<RegisterMemberRequest>,
) -> Result<Json<MemberRecordView>> {
    let wallet = body
        .wallet_address
        .filter(|w| !w.is_empty())
        .ok_or_else(|| AppError::BadRequest("Wallet address is required".to_string()))?;

    let record = state.store.ensure_member(&wallet).await?;
    Ok(Json(record.to_view()))
}
