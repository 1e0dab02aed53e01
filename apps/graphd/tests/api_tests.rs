//! Integration tests for the graphd HTTP API.
//!
//! Uses axum-test to drive the router without binding a socket. Each server
//! is backed by a redb store in its own temporary directory.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use axum::http::{StatusCode, header};
use axum_test::TestServer;
use bytes::Bytes;
use graphd::api::{
    AppState, BatchResponse, ErrorResponse, HealthResponse, MutationResponse, PairResponse,
    create_router,
};
use graphd_core::{BatchPolicy, EdgeOutcome, MutationOutcome, RedbStore, SocialGraph};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// A server whose graph has not been loaded yet.
fn create_loading_server() -> (TestServer, Arc<SocialGraph<RedbStore>>, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let graph = Arc::new(SocialGraph::new(RedbStore::open(dir.path()).unwrap()));
    let router = create_router(AppState::new(graph.clone(), BatchPolicy::default()));
    (TestServer::new(router).unwrap(), graph, dir)
}

/// A ready server over an empty graph.
fn create_test_server_with_policy(policy: BatchPolicy) -> (TestServer, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let graph = Arc::new(SocialGraph::new(RedbStore::open(dir.path()).unwrap()));
    graph.recover().unwrap();
    let router = create_router(AppState::new(graph, policy));
    (TestServer::new(router).unwrap(), dir)
}

fn create_test_server() -> (TestServer, TempDir) {
    create_test_server_with_policy(BatchPolicy::ContinueOnError)
}

async fn follow(server: &TestServer, source: &str, target: &str) {
    server
        .post("/follow")
        .json(&json!({ "source": source, "target": target }))
        .await
        .assert_status_ok();
}

/// alice <-> bob, carol -> bob, bob -> dave, carol -> dave.
async fn create_populated_test_server() -> (TestServer, TempDir) {
    let (server, dir) = create_test_server();
    for (source, target) in [
        ("alice", "bob"),
        ("bob", "alice"),
        ("carol", "bob"),
        ("bob", "dave"),
        ("carol", "dave"),
    ] {
        follow(&server, source, target).await;
    }
    (server, dir)
}

async fn get_list(server: &TestServer, path: &str, key: &str, value: &str) -> Vec<String> {
    let response = server.get(path).add_query_param(key, value).await;
    response.assert_status_ok();
    response.json::<Vec<String>>()
}

// =============================================================================
// HEALTH ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_health_ready() {
    let (server, _dir) = create_populated_test_server().await;

    let response = server.get("/_health").await;
    response.assert_status_ok();
    let health: HealthResponse = response.json();
    assert_eq!(health.status, "ready");
    assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
    assert_eq!(health.actors, 4);
    assert_eq!(health.edges, 5);
}

#[tokio::test]
async fn test_health_loading_is_unavailable() {
    let (server, graph, _dir) = create_loading_server();

    let response = server.get("/_health").await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.json::<HealthResponse>().status, "loading");

    graph.recover().unwrap();
    server.get("/_health").await.assert_status_ok();
}

#[tokio::test]
async fn test_health_shutting_down() {
    let (server, graph, _dir) = create_loading_server();
    graph.recover().unwrap();
    graph.begin_shutdown();

    let response = server.get("/_health").await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.json::<HealthResponse>().status, "shutting_down");
}

// =============================================================================
// UNAVAILABLE TESTS
// =============================================================================

#[tokio::test]
async fn test_reads_unavailable_while_loading() {
    let (server, _graph, _dir) = create_loading_server();

    let response = server
        .get("/followers")
        .add_query_param("actor", "alice")
        .await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.header(header::RETRY_AFTER), "1");
    assert_eq!(response.json::<ErrorResponse>().kind, "unavailable");
}

#[tokio::test]
async fn test_mutations_unavailable_after_shutdown() {
    let (server, graph, _dir) = create_loading_server();
    graph.recover().unwrap();
    graph.shutdown().unwrap();

    let response = server
        .post("/follow")
        .json(&json!({ "source": "alice", "target": "bob" }))
        .await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.header(header::RETRY_AFTER), "1");
}

// =============================================================================
// READ ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_followers_and_following() {
    let (server, _dir) = create_populated_test_server().await;

    assert_eq!(
        get_list(&server, "/followers", "actor", "bob").await,
        vec!["alice", "carol"]
    );
    assert_eq!(
        get_list(&server, "/following", "actor", "bob").await,
        vec!["alice", "dave"]
    );
}

#[tokio::test]
async fn test_unknown_actor_is_empty() {
    let (server, _dir) = create_populated_test_server().await;

    assert!(
        get_list(&server, "/followers", "actor", "nobody")
            .await
            .is_empty()
    );
    assert!(get_list(&server, "/moots", "actor", "nobody").await.is_empty());
}

#[tokio::test]
async fn test_moots_and_followers_not_following() {
    let (server, _dir) = create_populated_test_server().await;

    assert_eq!(get_list(&server, "/moots", "actor", "bob").await, vec!["alice"]);
    assert_eq!(
        get_list(&server, "/followersNotFollowing", "actor", "bob").await,
        vec!["carol"]
    );
    assert!(
        get_list(&server, "/followersNotFollowing", "actor", "alice")
            .await
            .is_empty()
    );
}

#[tokio::test]
async fn test_does_follow_and_are_moots() {
    let (server, _dir) = create_populated_test_server().await;

    let response = server
        .get("/doesFollow")
        .add_query_param("source", "carol")
        .add_query_param("target", "bob")
        .await;
    response.assert_status_ok();
    let pair: PairResponse = response.json();
    assert_eq!(pair.source, "carol");
    assert_eq!(pair.target, "bob");
    assert!(pair.result);

    let response = server
        .get("/doesFollow")
        .add_query_param("source", "bob")
        .add_query_param("target", "carol")
        .await;
    assert!(!response.json::<PairResponse>().result);

    let response = server
        .get("/areMoots")
        .add_query_param("source", "bob")
        .add_query_param("target", "alice")
        .await;
    assert!(response.json::<PairResponse>().result);

    let response = server
        .get("/areMoots")
        .add_query_param("source", "carol")
        .add_query_param("target", "bob")
        .await;
    assert!(!response.json::<PairResponse>().result);
}

#[tokio::test]
async fn test_missing_query_param_is_rejected() {
    let (server, _dir) = create_test_server();

    let response = server.get("/followers").await;
    assert!(response.status_code().is_client_error());
}

#[tokio::test]
async fn test_invalid_actor_is_bad_request() {
    let (server, _dir) = create_test_server();

    let response = server
        .get("/followers")
        .add_query_param("actor", "has space")
        .await;
    response.assert_status_bad_request();
    assert_eq!(response.json::<ErrorResponse>().kind, "validation");
}

// =============================================================================
// INTERSECTION TESTS
// =============================================================================

#[tokio::test]
async fn test_intersect_followers() {
    let (server, _dir) = create_populated_test_server().await;

    // bob and dave are both followed by carol
    assert_eq!(
        get_list(&server, "/intersectFollowers", "actors", "bob,dave").await,
        vec!["carol"]
    );
    // A single actor is its own follower set
    assert_eq!(
        get_list(&server, "/intersectFollowers", "actors", "bob").await,
        vec!["alice", "carol"]
    );
}

#[tokio::test]
async fn test_intersect_following() {
    let (server, _dir) = create_populated_test_server().await;

    assert_eq!(
        get_list(&server, "/intersectFollowing", "actors", "carol, bob").await,
        vec!["dave"]
    );
    assert!(
        get_list(&server, "/intersectFollowing", "actors", "alice,carol,nobody")
            .await
            .is_empty()
    );
}

#[tokio::test]
async fn test_intersect_empty_list_is_bad_request() {
    let (server, _dir) = create_test_server();

    let response = server
        .get("/intersectFollowers")
        .add_query_param("actors", " , ")
        .await;
    response.assert_status_bad_request();
    assert_eq!(response.json::<ErrorResponse>().kind, "validation");
}

#[tokio::test]
async fn test_intersect_too_many_actors() {
    let (server, _dir) = create_test_server();

    let actors: Vec<String> = (0..101).map(|i| format!("user{}", i)).collect();
    let response = server
        .get("/intersectFollowing")
        .add_query_param("actors", actors.join(","))
        .await;
    response.assert_status_bad_request();

    let actors: Vec<String> = (0..100).map(|i| format!("user{}", i)).collect();
    server
        .get("/intersectFollowing")
        .add_query_param("actors", actors.join(","))
        .await
        .assert_status_ok();
}

// =============================================================================
// MUTATION ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_follow_is_idempotent() {
    let (server, _dir) = create_test_server();
    let body = json!({ "source": "alice", "target": "bob" });

    let first: MutationResponse = server.post("/follow").json(&body).await.json();
    assert_eq!(first.status, MutationOutcome::Applied);
    assert_eq!(first.source, "alice");

    let second: MutationResponse = server.post("/follow").json(&body).await.json();
    assert_eq!(second.status, MutationOutcome::Unchanged);

    assert_eq!(
        get_list(&server, "/followers", "actor", "bob").await,
        vec!["alice"]
    );
}

#[tokio::test]
async fn test_unfollow() {
    let (server, _dir) = create_populated_test_server().await;
    let body = json!({ "source": "carol", "target": "bob" });

    let first: MutationResponse = server.post("/unfollow").json(&body).await.json();
    assert_eq!(first.status, MutationOutcome::Applied);
    let second: MutationResponse = server.post("/unfollow").json(&body).await.json();
    assert_eq!(second.status, MutationOutcome::Unchanged);

    assert_eq!(
        get_list(&server, "/followers", "actor", "bob").await,
        vec!["alice"]
    );
    assert!(
        get_list(&server, "/followersNotFollowing", "actor", "bob")
            .await
            .is_empty()
    );
}

#[tokio::test]
async fn test_self_follow_is_bad_request() {
    let (server, _dir) = create_test_server();

    let response = server
        .post("/follow")
        .json(&json!({ "source": "alice", "target": "alice" }))
        .await;
    response.assert_status_bad_request();
    let error: ErrorResponse = response.json();
    assert_eq!(error.kind, "validation");
    assert!(error.error.contains("alice"));

    assert!(
        get_list(&server, "/followers", "actor", "alice")
            .await
            .is_empty()
    );
}

#[tokio::test]
async fn test_empty_identifier_is_bad_request() {
    let (server, _dir) = create_test_server();

    let response = server
        .post("/unfollow")
        .json(&json!({ "source": "", "target": "bob" }))
        .await;
    response.assert_status_bad_request();
}

#[tokio::test]
async fn test_malformed_json_is_rejected() {
    let (server, _dir) = create_test_server();

    let response = server
        .post("/follow")
        .content_type("application/json")
        .bytes(Bytes::from_static(b"{\"source\": \"alice\""))
        .await;
    assert!(response.status_code().is_client_error());

    let response = server
        .post("/follow")
        .json(&json!({ "source": "alice" }))
        .await;
    assert!(response.status_code().is_client_error());
}

// =============================================================================
// BATCH ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_follows_batch_reports_each_pair() {
    let (server, _dir) = create_test_server();
    follow(&server, "alice", "bob").await;

    let response = server
        .post("/follows")
        .json(&json!([
            { "source": "alice", "target": "bob" },
            { "source": "carol", "target": "carol" },
            { "source": "carol", "target": "bob" },
            { "source": "bad id", "target": "bob" },
        ]))
        .await;
    response.assert_status_ok();
    let batch: BatchResponse = response.json();

    assert_eq!(batch.applied, 1);
    assert_eq!(batch.unchanged, 1);
    assert_eq!(batch.failed, 2);
    assert_eq!(batch.skipped, 0);
    assert_eq!(batch.results.len(), 4);
    assert_eq!(batch.results[0].outcome, EdgeOutcome::Unchanged);
    assert!(matches!(batch.results[1].outcome, EdgeOutcome::Failed { .. }));
    assert_eq!(batch.results[2].source, "carol");
    assert_eq!(batch.results[2].outcome, EdgeOutcome::Applied);
    assert!(matches!(batch.results[3].outcome, EdgeOutcome::Failed { .. }));

    assert_eq!(
        get_list(&server, "/followers", "actor", "bob").await,
        vec!["alice", "carol"]
    );
}

#[tokio::test]
async fn test_batch_result_wire_format() {
    let (server, _dir) = create_test_server();

    let response = server
        .post("/follows")
        .json(&json!([{ "source": "dave", "target": "dave" }]))
        .await;
    let value: serde_json::Value = response.json();
    assert_eq!(value["failed"], 1);
    assert_eq!(value["results"][0]["source"], "dave");
    assert_eq!(value["results"][0]["status"], "failed");
    assert!(value["results"][0]["error"].is_string());
}

#[tokio::test]
async fn test_stop_on_first_error_skips_rest() {
    let (server, _dir) = create_test_server_with_policy(BatchPolicy::StopOnFirstError);

    let batch: BatchResponse = server
        .post("/follows")
        .json(&json!([
            { "source": "alice", "target": "bob" },
            { "source": "bob", "target": "bob" },
            { "source": "carol", "target": "bob" },
        ]))
        .await
        .json();

    assert_eq!(batch.applied, 1);
    assert_eq!(batch.failed, 1);
    assert_eq!(batch.skipped, 1);
    assert_eq!(batch.results[2].outcome, EdgeOutcome::Skipped);
    assert_eq!(
        get_list(&server, "/followers", "actor", "bob").await,
        vec!["alice"]
    );
}

#[tokio::test]
async fn test_unfollows_batch() {
    let (server, _dir) = create_populated_test_server().await;

    let batch: BatchResponse = server
        .post("/unfollows")
        .json(&json!([
            { "source": "alice", "target": "bob" },
            { "source": "bob", "target": "alice" },
            { "source": "alice", "target": "dave" },
        ]))
        .await
        .json();

    assert_eq!(batch.applied, 2);
    assert_eq!(batch.unchanged, 1);
    assert!(get_list(&server, "/moots", "actor", "bob").await.is_empty());
}

#[tokio::test]
async fn test_empty_batch_is_bad_request() {
    let (server, _dir) = create_test_server();

    let response = server.post("/follows").json(&json!([])).await;
    response.assert_status_bad_request();
    assert_eq!(response.json::<ErrorResponse>().kind, "validation");
}

// =============================================================================
// DURABILITY TESTS
// =============================================================================

#[tokio::test]
async fn test_mutations_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    {
        let graph = Arc::new(SocialGraph::new(RedbStore::open(dir.path()).unwrap()));
        graph.recover().unwrap();
        let server =
            TestServer::new(create_router(AppState::new(graph.clone(), BatchPolicy::default())))
                .unwrap();
        follow(&server, "alice", "bob").await;
        follow(&server, "bob", "alice").await;
        server
            .post("/unfollow")
            .json(&json!({ "source": "bob", "target": "alice" }))
            .await
            .assert_status_ok();
        drop(server);
        graph.shutdown().unwrap();
    }

    let graph = Arc::new(SocialGraph::new(RedbStore::open(dir.path()).unwrap()));
    graph.recover().unwrap();
    let server =
        TestServer::new(create_router(AppState::new(graph, BatchPolicy::default()))).unwrap();
    assert_eq!(
        get_list(&server, "/followers", "actor", "bob").await,
        vec!["alice"]
    );
    assert!(
        get_list(&server, "/followers", "actor", "alice")
            .await
            .is_empty()
    );
}
