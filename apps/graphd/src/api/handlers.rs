//! # API Endpoint Handlers
//!
//! Reads are answered inline from the in-memory index. Mutations block on
//! disk, so they run on tokio's blocking pool.

use super::{
    AppState,
    error::ApiError,
    types::{
        ActorParams, ActorsParams, BatchResponse, EdgeRequest, HealthResponse, MutationResponse,
        PairParams, PairResponse,
    },
};
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use graphd_core::{ActorId, Edge, GraphError, MutationEngine};

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check: 200 once the graph is serving, 503 while it loads or
/// shuts down.
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let stats = state.graph.stats();
    let status = if stats.state.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(HealthResponse::from(stats)))
}

// =============================================================================
// READ HANDLERS
// =============================================================================

pub async fn followers_handler(
    State(state): State<AppState>,
    Query(params): Query<ActorParams>,
) -> Result<Json<Vec<ActorId>>, ApiError> {
    let actor = params.to_actor()?;
    Ok(Json(state.graph.followers(&actor)?))
}

pub async fn following_handler(
    State(state): State<AppState>,
    Query(params): Query<ActorParams>,
) -> Result<Json<Vec<ActorId>>, ApiError> {
    let actor = params.to_actor()?;
    Ok(Json(state.graph.following(&actor)?))
}

pub async fn moots_handler(
    State(state): State<AppState>,
    Query(params): Query<ActorParams>,
) -> Result<Json<Vec<ActorId>>, ApiError> {
    let actor = params.to_actor()?;
    Ok(Json(state.graph.moots(&actor)?))
}

pub async fn followers_not_following_handler(
    State(state): State<AppState>,
    Query(params): Query<ActorParams>,
) -> Result<Json<Vec<ActorId>>, ApiError> {
    let actor = params.to_actor()?;
    Ok(Json(state.graph.followers_not_following(&actor)?))
}

pub async fn does_follow_handler(
    State(state): State<AppState>,
    Query(params): Query<PairParams>,
) -> Result<Json<PairResponse>, ApiError> {
    let (source, target) = params.to_actors()?;
    let result = state.graph.does_follow(&source, &target)?;
    Ok(Json(PairResponse {
        source: params.source,
        target: params.target,
        result,
    }))
}

pub async fn are_moots_handler(
    State(state): State<AppState>,
    Query(params): Query<PairParams>,
) -> Result<Json<PairResponse>, ApiError> {
    let (source, target) = params.to_actors()?;
    let result = state.graph.are_moots(&source, &target)?;
    Ok(Json(PairResponse {
        source: params.source,
        target: params.target,
        result,
    }))
}

pub async fn intersect_followers_handler(
    State(state): State<AppState>,
    Query(params): Query<ActorsParams>,
) -> Result<Json<Vec<ActorId>>, ApiError> {
    let actors = params.to_actors()?;
    Ok(Json(state.graph.intersect_followers(&actors)?))
}

pub async fn intersect_following_handler(
    State(state): State<AppState>,
    Query(params): Query<ActorsParams>,
) -> Result<Json<Vec<ActorId>>, ApiError> {
    let actors = params.to_actors()?;
    Ok(Json(state.graph.intersect_following(&actors)?))
}

// =============================================================================
// MUTATION HANDLERS
// =============================================================================

/// Run blocking engine work off the async workers.
async fn blocking<T, F>(work: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, GraphError> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| GraphError::Io(format!("mutation task failed: {}", e)))?
        .map_err(ApiError::from)
}

pub async fn follow_handler(
    State(state): State<AppState>,
    Json(request): Json<EdgeRequest>,
) -> Result<Json<MutationResponse>, ApiError> {
    let edge = request.to_edge();
    let graph = state.graph.clone();
    let committed = edge.clone();
    let outcome = blocking(move || MutationEngine::follow(&graph, &committed)).await?;
    Ok(Json(MutationResponse::new(&edge, outcome)))
}

pub async fn unfollow_handler(
    State(state): State<AppState>,
    Json(request): Json<EdgeRequest>,
) -> Result<Json<MutationResponse>, ApiError> {
    let edge = request.to_edge();
    let graph = state.graph.clone();
    let committed = edge.clone();
    let outcome = blocking(move || MutationEngine::unfollow(&graph, &committed)).await?;
    Ok(Json(MutationResponse::new(&edge, outcome)))
}

pub async fn follows_handler(
    State(state): State<AppState>,
    Json(requests): Json<Vec<EdgeRequest>>,
) -> Result<Json<BatchResponse>, ApiError> {
    let edges: Vec<Edge> = requests.iter().map(EdgeRequest::to_edge).collect();
    let graph = state.graph.clone();
    let policy = state.batch_policy;
    let report = blocking(move || MutationEngine::follow_many(&graph, &edges, policy)).await?;
    Ok(Json(report.into()))
}

pub async fn unfollows_handler(
    State(state): State<AppState>,
    Json(requests): Json<Vec<EdgeRequest>>,
) -> Result<Json<BatchResponse>, ApiError> {
    let edges: Vec<Edge> = requests.iter().map(EdgeRequest::to_edge).collect();
    let graph = state.graph.clone();
    let policy = state.batch_policy;
    let report = blocking(move || MutationEngine::unfollow_many(&graph, &edges, policy)).await?;
    Ok(Json(report.into()))
}
