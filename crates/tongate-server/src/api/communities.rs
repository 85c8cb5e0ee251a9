use crate::error::{AppError, Result};
use crate::models::JoinSubmission;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use tongate_protocol::{CommunityView, JoinNftRequest, JoinPaymentRequest, JoinResponse};

#[derive(Debug, Deserialize)]
pub struct CatalogQuery {
    pub category: Option<String>,
}

pub async fn list_communities(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> Result<Json<Vec<CommunityView>>> {
    let communities = state
        .store
        .list_communities(query.category.as_deref())
        .await?;
    Ok(Json(communities.iter().map(|c| c.to_view()).collect()))
}

pub async fn get_community(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CommunityView>> {
    let community = state
        .store
        .get_community(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Community not found".to_string()))?;
    Ok(Json(community.to_view()))
}

pub async fn join_payment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<JoinPaymentRequest>,
) -> Result<Json<JoinResponse>> {
    run_join(state, JoinSubmission::payment(id, body)).await
}

pub async fn join_nft(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<JoinNftRequest>,
) -> Result<Json<JoinResponse>> {
    run_join(state, JoinSubmission::nft(id, body)).await
}

/// Runs the workflow on its own task so that a client disconnect cannot
/// cancel verification or persistence mid-flight; only response delivery
/// is lost.
async fn run_join(state: AppState, submission: JoinSubmission) -> Result<Json<JoinResponse>> {
    let joins = state.joins.clone();
    let grant = tokio::spawn(async move { joins.run(submission).await })
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("join task failed: {e}")))??;

    Ok(Json(JoinResponse {
        success: true,
        invite_link: grant.invite_link,
        message: grant.message,
    }))
}
