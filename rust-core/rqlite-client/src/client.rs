// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <j.d.a.jewell@open.ac.uk>

//! The rqlite data and status API.
//!
//! [`RqliteClient`] is the primary entry point. It wraps a
//! [`RequestExecutor`] and turns its raw responses into typed results.

use std::sync::Arc;

use reqwest::header::{HeaderValue, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::{ClientConfig, RequestOptions};
use crate::error::{Result, RqliteError};
use crate::executor::{RequestExecutor, RequestSpec};
use crate::result::{Envelope, ExecuteResult, ExecuteResults, QueryResult, QueryResults};
use crate::status::{Nodes, Status};
use crate::transport::{Clock, HttpTransport, TokioClock, Transport};

/// Options of [`RqliteClient::nodes`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodesOptions {
    /// Include read-only (non-voting) nodes.
    pub nonvoters: bool,
}

/// Client for an rqlite cluster.
///
/// # Examples
///
/// ```rust,no_run
/// use rqlite_client::client::RqliteClient;
/// use rqlite_client::config::{ClientConfig, Consistency, RequestOptions};
///
/// # #[tokio::main]
/// # async fn main() -> rqlite_client::error::Result<()> {
/// let client = RqliteClient::open(["node-1:4001", "node-2:4001"], ClientConfig::default())?;
///
/// client
///     .execute(&["CREATE TABLE foo (id INTEGER PRIMARY KEY, name TEXT)"], RequestOptions::new())
///     .await?;
///
/// let mut result = client
///     .query_one("SELECT id, name FROM foo", RequestOptions::new().consistency(Consistency::Strong))
///     .await?;
/// while let Some(row) = result.next_row() {
///     let (mut id, mut name) = (0_i64, String::new());
///     row.scan(&mut [&mut id, &mut name])?;
///     println!("{id}: {name}");
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct RqliteClient {
    executor: RequestExecutor,
}

impl RqliteClient {
    /// Connect to `hosts` over HTTP.
    ///
    /// No request is sent until the first call.
    ///
    /// # Errors
    ///
    /// Returns [`RqliteError::NoHosts`] for an empty host list, or
    /// [`RqliteError::Transport`] if the HTTP client cannot be built.
    pub fn open<I, S>(hosts: I, config: ClientConfig) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let transport = HttpTransport::new(config.timeout)?;
        Self::with_transport(hosts, config, Arc::new(transport), Arc::new(TokioClock))
    }

    /// Connect through a custom transport and clock.
    pub fn with_transport<I, S>(
        hosts: I,
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let executor = RequestExecutor::new(hosts, config, transport, clock)?;
        Ok(Self { executor })
    }

    /// Connect using `RQLITE_HOSTS` (comma separated) and the variables read
    /// by [`ClientConfig::from_env`].
    pub fn from_env() -> Result<Self> {
        let hosts = std::env::var("RQLITE_HOSTS").unwrap_or_default();
        Self::open(parse_hosts(&hosts), ClientConfig::from_env()?)
    }

    /// The underlying request executor.
    pub fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    // -- Data API -----------------------------------------------------------

    /// Run read statements. Per-statement failures are reported in the
    /// results, see [`QueryResults::first_error`].
    ///
    /// # Errors
    ///
    /// Any executor error, [`RqliteError::Decode`] on a malformed body, or
    /// [`RqliteError::Rejected`] if the server refused the batch.
    pub async fn query<S: AsRef<str>>(
        &self,
        statements: &[S],
        options: RequestOptions,
    ) -> Result<QueryResults> {
        let results = self
            .post_statements::<QueryResult, S>("/db/query", "query", statements, options)
            .await?;
        Ok(QueryResults::from(results))
    }

    /// Run a single read statement.
    ///
    /// # Errors
    ///
    /// As [`query`](Self::query), plus [`RqliteError::UnexpectedResultCount`]
    /// unless the server returned exactly one result.
    pub async fn query_one(&self, sql: &str, options: RequestOptions) -> Result<QueryResult> {
        single(self.query(&[sql], options).await?.into_inner())
    }

    /// Run write statements.
    ///
    /// # Errors
    ///
    /// As [`query`](Self::query).
    pub async fn execute<S: AsRef<str>>(
        &self,
        statements: &[S],
        options: RequestOptions,
    ) -> Result<ExecuteResults> {
        let results = self
            .post_statements::<ExecuteResult, S>("/db/execute", "execute", statements, options)
            .await?;
        Ok(ExecuteResults::from(results))
    }

    /// Run a single write statement.
    ///
    /// # Errors
    ///
    /// As [`query_one`](Self::query_one).
    pub async fn execute_one(&self, sql: &str, options: RequestOptions) -> Result<ExecuteResult> {
        single(self.execute(&[sql], options).await?.into_inner())
    }

    // -- Status API ---------------------------------------------------------

    /// Fetch the status of whichever node serves the request.
    pub async fn status(&self) -> Result<Status> {
        self.get_json(RequestSpec::get("/status")).await
    }

    /// Fetch cluster membership and reachability.
    pub async fn nodes(&self, options: NodesOptions) -> Result<Nodes> {
        let mut spec = RequestSpec::get("/nodes");
        if options.nonvoters {
            spec = spec.with_flag("nonvoters");
        }
        self.get_json(spec).await
    }

    // -- Internal helpers ---------------------------------------------------

    async fn post_statements<T, S>(
        &self,
        path: &str,
        operation: &'static str,
        statements: &[S],
        options: RequestOptions,
    ) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
        S: AsRef<str>,
    {
        let statements: Vec<&str> = statements.iter().map(AsRef::as_ref).collect();
        let body = serde_json::to_vec(&statements)
            .map_err(|e| RqliteError::InvalidRequest(format!("failed to encode statements: {e}")))?;
        let spec = RequestSpec::post(path, body)
            .with_header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .with_options(options);

        let envelope: Envelope<T> = self.get_json(spec).await?;
        let results = envelope.into_results(operation)?;
        debug!(operation, statements = statements.len(), results = results.len(), "batch complete");
        Ok(results)
    }

    async fn get_json<T: DeserializeOwned>(&self, spec: RequestSpec) -> Result<T> {
        let response = self.executor.execute(&spec).await?;
        let body = response.bytes().await.map_err(RqliteError::Body)?;
        Ok(serde_json::from_slice(&body)?)
    }
}

/// Split a comma separated host list, dropping blanks.
pub(crate) fn parse_hosts(hosts: &str) -> Vec<String> {
    hosts
        .split(',')
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(str::to_owned)
        .collect()
}

fn single<T>(mut results: Vec<T>) -> Result<T> {
    if results.len() != 1 {
        return Err(RqliteError::UnexpectedResultCount {
            expected: 1,
            actual: results.len(),
        });
    }
    results.pop().ok_or(RqliteError::UnexpectedResultCount {
        expected: 1,
        actual: 0,
    })
}
