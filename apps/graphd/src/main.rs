//! # graphd - Social Follow-Graph Daemon
//!
//! Holds the complete follow graph in memory, persists every mutation to an
//! embedded redb store, and answers set queries over HTTP.
//!
//! ## Usage
//!
//! ```bash
//! # Serve on the default port (1327), recovering from the data dir
//! graphd serve
//!
//! # Bulk load a CSV at startup
//! GRAPH_CSV=edges.csv graphd serve --port 8080
//!
//! # Offline operations
//! graphd import -f edges.csv
//! graphd status
//! graphd query --op moots --actors alice
//! ```

use clap::Parser;
use graphd::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = cli::Cli::parse();

    // GRAPHD_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("GRAPHD_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let default_filter = if cli.debug {
        "graphd=debug,graphd_core=debug,tower_http=debug"
    } else {
        "graphd=info,graphd_core=info,tower_http=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    // Execute command
    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}
