use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::auth::AuthUser;
use crate::geometry::{layout_document, EdgeLayout};
use crate::links::TopologyLinkReport;
use crate::models::*;
use crate::teardown::{TeardownReport, TopologyListing};
use crate::AppState;

use super::{created, ApiError};

#[derive(Debug, Default, Deserialize)]
pub struct TopologyListQuery {
    #[serde(default)]
    pub archived: bool,
    /// Administrators may list every user's topologies
    #[serde(default)]
    pub all: bool,
}

/// Load a topology the caller owns (or may administer)
async fn owned_topology(state: &AppState, auth: &AuthUser, id: i64) -> Result<Topology, ApiError> {
    let topology = state
        .store
        .get_topology(id)
        .await?
        .ok_or_else(|| ApiError::not_found("topology"))?;
    if topology.owner_id != auth.user_id()? && !auth.account_type().is_elevated() {
        return Err(ApiError::forbidden("not your topology"));
    }
    Ok(topology)
}

/// The caller's ordered list of active topologies
async fn active_listing(state: &AppState, auth: &AuthUser) -> Result<TopologyListing, ApiError> {
    let topologies = state
        .store
        .list_topologies_for_owner(auth.user_id()?, false)
        .await?;
    Ok(TopologyListing::new(topologies))
}

/// List the caller's topologies
pub async fn list_topologies(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(query): Query<TopologyListQuery>,
) -> Result<Json<Vec<Topology>>, ApiError> {
    let topologies = if query.all && auth.account_type().is_elevated() {
        state.store.list_all_topologies(query.archived).await?
    } else {
        state
            .store
            .list_topologies_for_owner(auth.user_id()?, query.archived)
            .await?
    };
    Ok(Json(topologies))
}

/// Get a single topology by ID
pub async fn get_topology(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Topology>, ApiError> {
    Ok(Json(owned_topology(&state, &auth, id).await?))
}

/// Create a new, empty topology
pub async fn create_topology(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateTopologyRequest>,
) -> Result<(StatusCode, Json<Topology>), ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::bad_request("name is required"));
    }

    let topology = state.store.create_topology(auth.user_id()?, &req).await?;
    Ok(created(topology))
}

/// Autosave: replace the whole graph document
pub async fn save_graph(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(graph): Json<GraphDocument>,
) -> Result<Json<Topology>, ApiError> {
    owned_topology(&state, &auth, id).await?;
    let topology = state.store.update_topology_graph(id, &graph).await?;
    Ok(Json(topology))
}

/// Rendering hints for every edge of a topology
pub async fn get_layout(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<EdgeLayout>>, ApiError> {
    let topology = owned_topology(&state, &auth, id).await?;
    Ok(Json(layout_document(&topology.graph)))
}

/// Create links and add their edges to the topology
pub async fn create_links(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<BulkLinkRequest>,
) -> Result<Json<TopologyLinkReport>, ApiError> {
    owned_topology(&state, &auth, id).await?;
    let links = state.links.clone();
    let report = tokio::spawn(async move { links.create_topology_links(id, &req.pairs).await })
        .await
        .map_err(|e| ApiError::internal(format!("topology link task failed: {}", e)))??;
    Ok(Json(report))
}

/// Clear links and remove their edges; an empty list clears every edge
pub async fn delete_links(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<TopologyLinkDeleteRequest>,
) -> Result<Json<TopologyLinkReport>, ApiError> {
    owned_topology(&state, &auth, id).await?;
    let links = state.links.clone();
    let report = tokio::spawn(async move { links.delete_topology_links(id, &req.edge_ids).await })
        .await
        .map_err(|e| ApiError::internal(format!("topology link task failed: {}", e)))??;
    Ok(Json(report))
}

/// Delete a topology once all of its links are cleared
pub async fn delete_topology(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<TeardownReport>, ApiError> {
    let listing = active_listing(&state, &auth).await?;
    let teardown = state.teardown.clone();
    let (user_id, role) = (auth.user_id()?, auth.account_type());
    let report = tokio::spawn(async move { teardown.delete(listing, id, user_id, role).await })
        .await
        .map_err(|e| ApiError::internal(format!("teardown task failed: {}", e)))??;
    Ok(Json(report))
}

/// Archive a topology once all of its links are cleared
pub async fn archive_topology(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<TeardownReport>, ApiError> {
    let listing = active_listing(&state, &auth).await?;
    let teardown = state.teardown.clone();
    let (user_id, role) = (auth.user_id()?, auth.account_type());
    let report = tokio::spawn(async move { teardown.archive(listing, id, user_id, role).await })
        .await
        .map_err(|e| ApiError::internal(format!("teardown task failed: {}", e)))??;
    Ok(Json(report))
}

/// Restore an archived topology
pub async fn unarchive_topology(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Topology>, ApiError> {
    let topology = state
        .teardown
        .unarchive(id, auth.user_id()?, auth.account_type())
        .await?;
    Ok(Json(topology))
}
