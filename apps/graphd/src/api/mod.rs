//! # graphd HTTP API Module
//!
//! This module implements the HTTP API server using axum.
//!
//! ## Endpoints
//!
//! Reads (query parameters, JSON array responses unless noted):
//! - `GET /followers?actor=A`
//! - `GET /following?actor=A`
//! - `GET /moots?actor=A`
//! - `GET /followersNotFollowing?actor=A`
//! - `GET /doesFollow?source=A&target=B` - `{source, target, result}`
//! - `GET /areMoots?source=A&target=B` - `{source, target, result}`
//! - `GET /intersectFollowers?actors=A,B,C`
//! - `GET /intersectFollowing?actors=A,B,C`
//!
//! Mutations (JSON bodies):
//! - `POST /follow`, `POST /unfollow` - `{source, target}`
//! - `POST /follows`, `POST /unfollows` - `[{source, target}, ...]`
//!
//! Ops:
//! - `GET /_health`

mod error;
mod handlers;
mod types;

// Re-export handlers and types for integration tests (via `graphd::api::*`)
pub use error::ApiError;
pub use handlers::{
    are_moots_handler, does_follow_handler, follow_handler, followers_handler,
    followers_not_following_handler, following_handler, follows_handler, health_handler,
    intersect_followers_handler, intersect_following_handler, moots_handler, unfollow_handler,
    unfollows_handler,
};
pub use types::{
    ActorParams, ActorsParams, BatchResponse, EdgeRequest, EdgeResult, ErrorResponse,
    HealthResponse, MutationResponse, PairParams, PairResponse, parse_actor_list,
};

use crate::config::Config;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use graphd_core::{BatchPolicy, GraphError, RedbStore, SocialGraph};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// Maximum request body size (2 MiB).
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

// =============================================================================
// SERVER STATE
// =============================================================================

/// The graph as shared between handlers.
pub type SharedGraph = Arc<SocialGraph<RedbStore>>;

/// Shared server state.
#[derive(Clone)]
pub struct AppState {
    /// The follow graph.
    pub graph: SharedGraph,
    /// Error policy for batch mutations.
    pub batch_policy: BatchPolicy,
}

impl AppState {
    /// Create new app state around a graph.
    #[must_use]
    pub fn new(graph: SharedGraph, batch_policy: BatchPolicy) -> Self {
        Self {
            graph,
            batch_policy,
        }
    }
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. Tracing - logs all requests
/// 2. Body limit - rejects oversized bodies
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/_health", get(handlers::health_handler))
        .route("/followers", get(handlers::followers_handler))
        .route("/following", get(handlers::following_handler))
        .route("/moots", get(handlers::moots_handler))
        .route(
            "/followersNotFollowing",
            get(handlers::followers_not_following_handler),
        )
        .route("/doesFollow", get(handlers::does_follow_handler))
        .route("/areMoots", get(handlers::are_moots_handler))
        .route(
            "/intersectFollowers",
            get(handlers::intersect_followers_handler),
        )
        .route(
            "/intersectFollowing",
            get(handlers::intersect_following_handler),
        )
        .route("/follow", post(handlers::follow_handler))
        .route("/unfollow", post(handlers::unfollow_handler))
        .route("/follows", post(handlers::follows_handler))
        .route("/unfollows", post(handlers::unfollows_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::max(MAX_BODY_BYTES)),
        )
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Bring the graph up: bulk load when a source is configured, otherwise
/// recover from the store.
pub fn load_graph(graph: &SocialGraph<RedbStore>, config: &Config) -> Result<(), GraphError> {
    match &config.graph_csv {
        Some(path) => {
            let report = graph.bulk_load(path, &config.load)?;
            tracing::info!(
                source = %report.source,
                edges = report.edges_loaded,
                malformed = report.malformed_rows,
                elapsed_ms = report.elapsed_ms,
                "graph bulk loaded"
            );
        }
        None => {
            graph.recover()?;
        }
    }
    Ok(())
}

/// Serve the API until `shutdown` resolves or the startup load fails.
///
/// The listener is bound before the graph loads, so `/_health` answers 503
/// during a long load instead of refusing connections. On the way out the
/// graph stops accepting work, in-flight requests drain and the store is
/// flushed.
pub async fn run_server(
    config: &Config,
    graph: SharedGraph,
    shutdown: impl Future<Output = ()>,
) -> Result<(), GraphError> {
    let addr = config.listen_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| GraphError::Io(format!("bind {} failed: {}", addr, e)))?;
    tracing::info!(addr = %addr, "graphd HTTP server listening");

    let router = create_router(AppState::new(graph.clone(), config.batch_policy));
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                stop_rx.await.ok();
            })
            .await
    });

    let loader = {
        let graph = graph.clone();
        let config = config.clone();
        tokio::task::spawn_blocking(move || load_graph(&graph, &config))
    };

    let outcome = wait_for_stop(loader, shutdown).await;

    graph.begin_shutdown();
    stop_tx.send(()).ok();
    match server.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!(error = %e, "HTTP server exited with error"),
        Err(e) => tracing::warn!(error = %e, "HTTP server task failed"),
    }

    let flushed = tokio::task::spawn_blocking(move || graph.shutdown())
        .await
        .map_err(|e| GraphError::Io(format!("shutdown task failed: {}", e)))?;
    outcome.and(flushed)
}

/// Resolve when a shutdown is requested (`Ok`) or the startup load fails
/// (`Err`).
async fn wait_for_stop(
    loader: tokio::task::JoinHandle<Result<(), GraphError>>,
    shutdown: impl Future<Output = ()>,
) -> Result<(), GraphError> {
    tokio::pin!(shutdown);
    tokio::select! {
        () = &mut shutdown => {
            tracing::info!("shutdown requested");
            Ok(())
        }
        joined = loader => match joined {
            Ok(Ok(())) => {
                tracing::info!("graph ready");
                shutdown.await;
                tracing::info!("shutdown requested");
                Ok(())
            }
            Ok(Err(e)) => Err(e),
            Err(e) => Err(GraphError::Io(format!("load task failed: {}", e))),
        },
    }
}

/// Resolve on SIGINT or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
