use axum::{extract::State, Json};
use std::sync::Arc;

use crate::auth::AuthUser;
use crate::models::*;
use crate::AppState;

use super::ApiError;

async fn single(state: &AppState, pair: LinkPair, op: LinkOp) -> Result<Json<LinkOperationResult>, ApiError> {
    if let Err(e) = state.links.execute(&pair, op).await {
        tracing::warn!("Link {} {} failed: {}", op, pair, e);
        return Err(e.into());
    }
    tracing::info!("Link {} {} succeeded", op, pair);
    Ok(Json(LinkOperationResult {
        pair,
        success: true,
        error: None,
    }))
}

/// Runs the bulk operation in its own task so it completes even if the
/// client goes away.
async fn bulk(state: &AppState, pairs: Vec<LinkPair>, op: LinkOp) -> Result<Json<BulkSummary>, ApiError> {
    let links = state.links.clone();
    let summary = tokio::spawn(async move { links.perform_bulk(&pairs, op).await })
        .await
        .map_err(|e| ApiError::internal(format!("bulk link task failed: {}", e)))?;
    Ok(Json(summary))
}

/// Create a single link
pub async fn create_link(
    _auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<LinkRequestBody>,
) -> Result<Json<LinkOperationResult>, ApiError> {
    single(&state, req.pair, LinkOp::Create).await
}

/// Clear a single link
pub async fn delete_link(
    _auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<LinkRequestBody>,
) -> Result<Json<LinkOperationResult>, ApiError> {
    single(&state, req.pair, LinkOp::Delete).await
}

/// Create many links concurrently
pub async fn create_links_bulk(
    _auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<BulkLinkRequest>,
) -> Result<Json<BulkSummary>, ApiError> {
    bulk(&state, req.pairs, LinkOp::Create).await
}

/// Clear many links concurrently
pub async fn delete_links_bulk(
    _auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<BulkLinkRequest>,
) -> Result<Json<BulkSummary>, ApiError> {
    bulk(&state, req.pairs, LinkOp::Delete).await
}
