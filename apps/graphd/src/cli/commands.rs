//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.
//! Every command except `serve` opens the store, does one thing and
//! flushes before returning.

use super::QueryOp;
use crate::api::{self, parse_actor_list};
use crate::config::Config;
use graphd_core::{ActorId, GraphError, Query, QueryOutput, RedbStore, SocialGraph};
use std::path::Path;
use std::sync::Arc;

/// Open the configured data directory.
fn open_graph(config: &Config) -> Result<SocialGraph<RedbStore>, GraphError> {
    let store = RedbStore::open(&config.data_dir)?;
    Ok(SocialGraph::new(store))
}

/// Render a value as pretty JSON.
fn to_json<T: serde::Serialize>(value: &T) -> Result<String, GraphError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| GraphError::Io(format!("cannot encode JSON output: {}", e)))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), GraphError> {
    println!("{}", to_json(value)?);
    Ok(())
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server and run until SIGINT/SIGTERM.
pub async fn cmd_serve(config: &Config) -> Result<(), GraphError> {
    tracing::info!(
        data_dir = %config.data_dir.display(),
        graph_csv = ?config.graph_csv,
        batch_policy = ?config.batch_policy,
        "starting graphd"
    );
    let graph = Arc::new(open_graph(config)?);
    api::run_server(config, graph, api::shutdown_signal()).await
}

// =============================================================================
// IMPORT COMMAND
// =============================================================================

/// Replace the stored graph with the contents of a CSV file.
pub fn cmd_import(config: &Config, json_mode: bool, file: &Path) -> Result<(), GraphError> {
    let graph = open_graph(config)?;
    let report = graph.bulk_load(file, &config.load)?;
    graph.shutdown()?;

    if json_mode {
        return print_json(&report);
    }

    println!("Import complete");
    println!("===============");
    println!("Source:         {}", report.source);
    println!("Rows read:      {}", report.rows_read);
    println!("Edges loaded:   {}", report.edges_loaded);
    println!("Malformed rows: {}", report.malformed_rows);
    println!("Self loops:     {}", report.self_loops);
    println!("Duplicates:     {}", report.duplicates);
    println!("Elapsed:        {} ms", report.elapsed_ms);
    Ok(())
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show actor and edge counts of the stored graph.
pub fn cmd_status(config: &Config, json_mode: bool) -> Result<(), GraphError> {
    let graph = open_graph(config)?;
    let stats = graph.recover()?;
    graph.shutdown()?;

    if json_mode {
        let output = serde_json::json!({
            "data_dir": config.data_dir.to_string_lossy(),
            "actors": stats.actors,
            "edges": stats.edges,
        });
        return print_json(&output);
    }

    println!("graphd status");
    println!("=============");
    println!("Data dir: {}", config.data_dir.display());
    println!("Actors:   {}", stats.actors);
    println!("Edges:    {}", stats.edges);
    Ok(())
}

// =============================================================================
// QUERY COMMAND
// =============================================================================

/// Run a single query against the stored graph.
pub fn cmd_query(
    config: &Config,
    json_mode: bool,
    op: QueryOp,
    actors: &str,
) -> Result<(), GraphError> {
    let query = build_query(op, actors)?;
    let graph = open_graph(config)?;
    graph.recover()?;
    let output = graph.query(&query);
    graph.shutdown()?;

    match output? {
        QueryOutput::Actors(list) if json_mode => print_json(&list)?,
        QueryOutput::Actors(list) => {
            for actor in &list {
                println!("{}", actor);
            }
        }
        QueryOutput::Flag(flag) if json_mode => {
            print_json(&serde_json::json!({ "result": flag }))?;
        }
        QueryOutput::Flag(flag) => println!("{}", flag),
    }
    Ok(())
}

/// Turn a CLI operation and its actor list into an engine query.
pub fn build_query(op: QueryOp, raw: &str) -> Result<Query, GraphError> {
    let mut actors = parse_actor_list(raw)?;
    let query = match op {
        QueryOp::IntersectFollowers => Query::IntersectFollowers(actors),
        QueryOp::IntersectFollowing => Query::IntersectFollowing(actors),
        QueryOp::DoesFollow | QueryOp::AreMoots => {
            let (source, target) = pair(actors)?;
            if op == QueryOp::DoesFollow {
                Query::DoesFollow { source, target }
            } else {
                Query::AreMoots { source, target }
            }
        }
        single => {
            if actors.len() != 1 {
                return Err(GraphError::Config(format!(
                    "query {:?} takes exactly one actor, got {}",
                    single,
                    actors.len()
                )));
            }
            let actor = actors.remove(0);
            match single {
                QueryOp::Followers => Query::Followers(actor),
                QueryOp::Following => Query::Following(actor),
                QueryOp::Moots => Query::Moots(actor),
                _ => Query::FollowersNotFollowing(actor),
            }
        }
    };
    Ok(query)
}

fn pair(actors: Vec<ActorId>) -> Result<(ActorId, ActorId), GraphError> {
    let count = actors.len();
    let mut iter = actors.into_iter();
    match (iter.next(), iter.next(), iter.next()) {
        (Some(source), Some(target), None) => Ok((source, target)),
        _ => Err(GraphError::Config(format!(
            "pair queries take exactly two actors, got {}",
            count
        ))),
    }
}
