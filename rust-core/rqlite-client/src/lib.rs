// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <j.d.a.jewell@open.ac.uk>

//! # rqlite Client SDK
//!
//! A Rust client for [rqlite](https://rqlite.io), the distributed database
//! built on SQLite and Raft. The client talks to any number of cluster nodes
//! over HTTP and hides node failures, leader changes and redirects behind a
//! single call.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rqlite_client::client::RqliteClient;
//! use rqlite_client::config::{ClientConfig, RequestOptions};
//!
//! #[tokio::main]
//! async fn main() -> rqlite_client::error::Result<()> {
//!     let client = RqliteClient::open(["localhost:4001"], ClientConfig::default())?;
//!     let results = client
//!         .execute(&["INSERT INTO foo(name) VALUES('fiona')"], RequestOptions::new())
//!         .await?;
//!     if let Some(err) = results.first_error() {
//!         eprintln!("statement failed: {err}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`client`]: the data (`query`, `execute`) and status (`status`, `nodes`) API.
//! - [`executor`]: host rotation, retries with backoff, redirect handling.
//! - [`transport`]: the pluggable HTTP and sleep boundaries.
//! - [`config`]: connection configuration and per-call overrides.
//! - [`result`]: per-statement results and row iteration.
//! - [`scan`]: typed row decoding.
//! - [`value`]: wire cell values.
//! - [`status`]: diagnostics payloads.
//! - [`error`]: error types and the crate-level `Result` alias.

pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod result;
pub mod scan;
pub mod status;
pub mod transport;
pub mod value;

pub use client::{NodesOptions, RqliteClient};
pub use config::{ClientConfig, Consistency, RequestOptions};
pub use error::{Result, RqliteError};
pub use result::{ExecuteResult, ExecuteResults, QueryResult, QueryResults, QueryRow};
pub use scan::{ScanDest, ScanError};
pub use value::Value;
