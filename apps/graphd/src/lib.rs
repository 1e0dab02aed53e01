//! # graphd
//!
//! The daemon around `graphd-core`: HTTP API, CLI and configuration.
//!
//! Exposed as a library so integration tests can build the router and the
//! CLI without spawning a process.

pub mod api;
pub mod cli;
pub mod config;
