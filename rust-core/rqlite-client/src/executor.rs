// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <j.d.a.jewell@open.ac.uk>

//! Resilient multi-host request execution.
//!
//! [`RequestExecutor`] turns one logical [`RequestSpec`] into a completed HTTP
//! response without the caller knowing which node is up or which one leads:
//!
//! - the request goes to the *active host* of a [`HostSet`];
//! - transport errors and the retryable statuses (408, 413, 429, 500, 502,
//!   503) are retried up to `3 × hosts` times with exponential backoff
//!   (`100ms × 2^n`), force-rotating to the next host each time;
//! - 301/302/303 are followed up to `max_redirects` hops, outside the retry
//!   budget;
//! - any other non-2xx status is fatal;
//! - after the call, the active host advances once more when round robin is
//!   enabled.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, LOCATION};
use reqwest::{Method, StatusCode};
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::{ClientConfig, RequestOptions};
use crate::error::{Result, RetryCause, RqliteError, TransportError};
use crate::transport::{Clock, Transport};

/// Retries granted per known host before giving up.
pub const RETRIES_PER_HOST: usize = 3;

/// First backoff interval; doubles on every retry.
pub const BACKOFF_BASE: Duration = Duration::from_millis(100);

/// Statuses that indicate a transient node condition.
const RETRYABLE_STATUSES: [StatusCode; 6] = [
    StatusCode::REQUEST_TIMEOUT,
    StatusCode::PAYLOAD_TOO_LARGE,
    StatusCode::TOO_MANY_REQUESTS,
    StatusCode::INTERNAL_SERVER_ERROR,
    StatusCode::BAD_GATEWAY,
    StatusCode::SERVICE_UNAVAILABLE,
];

/// Whether `status` should be retried against another node.
pub fn is_retryable_status(status: StatusCode) -> bool {
    RETRYABLE_STATUSES.contains(&status)
}

/// Whether `status` is a redirect the executor follows.
pub fn is_redirect_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND | StatusCode::SEE_OTHER
    )
}

/// Backoff before retry number `retry` (zero-based): `100ms × 2^retry`.
pub fn backoff(retry: usize) -> Duration {
    let factor = u32::try_from(retry)
        .ok()
        .and_then(|shift| 1u32.checked_shl(shift))
        .unwrap_or(u32::MAX);
    BACKOFF_BASE.saturating_mul(factor)
}

// ---------------------------------------------------------------------------
// HostSet
// ---------------------------------------------------------------------------

/// Ordered, immutable list of cluster nodes plus the active-host cursor.
///
/// The cursor is only ever moved by [`HostSet::rotate`], a compare-and-swap
/// that keeps it in `0..len` when several calls share the set.
#[derive(Debug)]
pub struct HostSet {
    hosts: Vec<String>,
    bases: Vec<Url>,
    cursor: AtomicUsize,
}

impl HostSet {
    /// Build a host set from `host[:port]` addresses.
    ///
    /// Every address is parsed here, so no attempt can fail on a bad host.
    ///
    /// # Errors
    ///
    /// - [`RqliteError::NoHosts`] if `hosts` is empty.
    /// - [`RqliteError::InvalidConfig`] if any entry is not `host[:port]`.
    pub fn new<I, S>(hosts: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let hosts: Vec<String> = hosts.into_iter().map(Into::into).collect();
        if hosts.is_empty() {
            return Err(RqliteError::NoHosts);
        }
        let bases = hosts
            .iter()
            .map(String::as_str)
            .map(base_url)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            hosts,
            bases,
            cursor: AtomicUsize::new(0),
        })
    }

    /// All hosts in configured order.
    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    /// Number of hosts.
    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    /// Always `false` for a constructed set.
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// Index of the active host.
    pub fn active_index(&self) -> usize {
        self.cursor.load(Ordering::Acquire)
    }

    /// The host the next attempt goes to.
    pub fn active(&self) -> Option<&str> {
        self.hosts.get(self.active_index()).map(String::as_str)
    }

    /// The active host and its parsed base URL, read at one cursor position.
    fn active_entry(&self) -> Option<(&str, &Url)> {
        let index = self.active_index();
        Some((self.hosts.get(index)?.as_str(), self.bases.get(index)?))
    }

    /// Advance the active host, wrapping at the end of the list.
    pub fn rotate(&self) {
        let len = self.hosts.len();
        if len == 0 {
            return;
        }
        let _ = self
            .cursor
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |i| Some((i + 1) % len));
    }
}

/// `http://host[:port]/` for one configured address.
fn base_url(host: &str) -> Result<Url> {
    let url = Url::parse(&format!("http://{host}"))
        .map_err(|e| RqliteError::InvalidConfig(format!("invalid host {host:?}: {e}")))?;
    if url.host_str().is_none() || url.path() != "/" || url.query().is_some() || url.fragment().is_some() {
        return Err(RqliteError::InvalidConfig(format!(
            "invalid host {host:?}: expected host[:port]"
        )));
    }
    Ok(url)
}

/// Rotates the host set when dropped, so the round-robin step also runs
/// when the call future is cancelled.
struct RotateOnDrop<'a> {
    hosts: &'a HostSet,
    enabled: bool,
}

impl Drop for RotateOnDrop<'_> {
    fn drop(&mut self) {
        if self.enabled {
            self.hosts.rotate();
        }
    }
}

// ---------------------------------------------------------------------------
// RequestSpec
// ---------------------------------------------------------------------------

/// Immutable description of one logical call.
///
/// The host is deliberately absent: the executor rebuilds a fresh
/// `reqwest::Request` for every attempt and every redirect hop.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    method: Method,
    path: String,
    query: Vec<(String, Option<String>)>,
    body: Option<Vec<u8>>,
    headers: HeaderMap,
    options: RequestOptions,
}

impl RequestSpec {
    /// A request with no query, body or headers.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            headers: HeaderMap::new(),
            options: RequestOptions::default(),
        }
    }

    /// `GET path`.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// `POST path` with `body`.
    pub fn post(path: impl Into<String>, body: Vec<u8>) -> Self {
        Self::new(Method::POST, path).with_body(body)
    }

    /// Attach a request body.
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    /// Append a `key=value` query parameter.
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), Some(value.into())));
        self
    }

    /// Append a presence-only query flag (`?key`).
    pub fn with_flag(mut self, key: impl Into<String>) -> Self {
        self.query.push((key.into(), None));
        self
    }

    /// Add a header for this call only.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Apply per-call configuration overrides.
    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    /// HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Request path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Request body, if any.
    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    /// Per-call overrides.
    pub fn options(&self) -> &RequestOptions {
        &self.options
    }

    /// URL of this request on the host at `base`, with the parameters
    /// `config` injects.
    fn url_for(&self, base: &Url, config: &ClientConfig) -> Url {
        let mut url = base.clone();
        url.set_path(&self.path);

        let injected = config.injected_params();
        if !self.query.is_empty() || !injected.is_empty() {
            let mut pairs = url.query_pairs_mut();
            let own = self.query.iter().map(|(k, v)| (k.as_str(), v.as_deref()));
            for (key, value) in own.chain(injected) {
                match value {
                    Some(value) => pairs.append_pair(key, value),
                    None => pairs.append_key_only(key),
                };
            }
        }
        url
    }

    /// A fresh outbound request targeting `url`.
    fn build(&self, url: Url, config: &ClientConfig) -> reqwest::Request {
        let mut request = reqwest::Request::new(self.method.clone(), url);
        let headers = request.headers_mut();
        for (name, value) in config.headers.iter().chain(self.headers.iter()) {
            headers.append(name.clone(), value.clone());
        }
        if let Some(body) = &self.body {
            *request.body_mut() = Some(reqwest::Body::from(body.clone()));
        }
        request
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Classification of one attempt.
#[derive(Debug)]
pub enum Outcome {
    /// 2xx: hand the response to the caller.
    Success(reqwest::Response),
    /// 301/302/303: follow `location`.
    Redirect {
        /// Redirect status.
        status: StatusCode,
        /// Raw `Location` header, if present and valid UTF-8.
        location: Option<String>,
    },
    /// Transient failure: back off, rotate, retry.
    Retryable(RetryCause),
    /// Any other status: give up immediately.
    Fatal(reqwest::Response),
}

impl Outcome {
    /// Classify the result of sending one request.
    pub fn classify(result: std::result::Result<reqwest::Response, TransportError>) -> Self {
        let response = match result {
            Ok(response) => response,
            Err(err) => return Outcome::Retryable(RetryCause::Transport(err)),
        };

        let status = response.status();
        if status.is_success() {
            Outcome::Success(response)
        } else if is_redirect_status(status) {
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned);
            Outcome::Redirect { status, location }
        } else if is_retryable_status(status) {
            Outcome::Retryable(RetryCause::Status(status.as_u16()))
        } else {
            Outcome::Fatal(response)
        }
    }
}

/// Result of one attempt after redirects: a response, or the transient cause
/// that should be charged to the retry budget.
enum Attempt {
    Done(reqwest::Response),
    Failed(RetryCause),
}

// ---------------------------------------------------------------------------
// RequestExecutor
// ---------------------------------------------------------------------------

/// Sends requests to an rqlite cluster with host rotation, retries and
/// redirect handling.
///
/// One executor lives as long as its connection. It may be shared between
/// tasks; the only mutable state is the [`HostSet`] cursor.
pub struct RequestExecutor {
    hosts: HostSet,
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("hosts", &self.hosts)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RequestExecutor {
    /// Create an executor over `hosts`.
    ///
    /// # Errors
    ///
    /// Returns [`RqliteError::NoHosts`] if `hosts` is empty and
    /// [`RqliteError::InvalidConfig`] if any host is not `host[:port]`.
    pub fn new<I, S>(
        hosts: I,
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(Self {
            hosts: HostSet::new(hosts)?,
            config,
            transport,
            clock,
        })
    }

    /// The host set and its cursor.
    pub fn hosts(&self) -> &HostSet {
        &self.hosts
    }

    /// The base configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Execute `spec` and return the first 2xx response.
    ///
    /// # Errors
    ///
    /// - [`RqliteError::Server`] on a non-retryable error status.
    /// - [`RqliteError::TooManyRedirects`] / [`RqliteError::InvalidRedirect`]
    ///   on a broken redirect chain.
    /// - [`RqliteError::MaxRetriesExceeded`] once the retry budget is spent.
    #[instrument(level = "debug", skip_all, fields(method = %spec.method(), path = %spec.path()))]
    pub async fn execute(&self, spec: &RequestSpec) -> Result<reqwest::Response> {
        let config = self.config.with_overrides(spec.options());
        let _rotate = RotateOnDrop {
            hosts: &self.hosts,
            enabled: config.round_robin,
        };
        self.execute_with_retries(spec, &config).await
    }

    async fn execute_with_retries(
        &self,
        spec: &RequestSpec,
        config: &ClientConfig,
    ) -> Result<reqwest::Response> {
        let budget = self.hosts.len() * RETRIES_PER_HOST;
        let mut retries = 0;

        loop {
            let (host, base) = self.hosts.active_entry().ok_or(RqliteError::NoHosts)?;
            let url = spec.url_for(base, config);

            let cause = match self.send_following_redirects(spec, config, url).await? {
                Attempt::Done(response) => {
                    debug!(host, retries, status = response.status().as_u16(), "request succeeded");
                    return Ok(response);
                }
                Attempt::Failed(cause) => cause,
            };

            if retries >= budget {
                warn!(host, attempts = retries + 1, cause = %cause, "max retries exceeded");
                return Err(RqliteError::MaxRetriesExceeded {
                    attempts: retries + 1,
                    cause,
                });
            }

            let delay = backoff(retries);
            warn!(
                host,
                retry = retries + 1,
                budget,
                delay_ms = delay.as_millis() as u64,
                cause = %cause,
                "request failed, retrying on next host"
            );
            self.clock.sleep(delay).await;

            // Rotate even with round robin off so a dead node is skipped.
            self.hosts.rotate();
            retries += 1;
        }
    }

    /// Send one attempt to `url`, following redirects.
    async fn send_following_redirects(
        &self,
        spec: &RequestSpec,
        config: &ClientConfig,
        mut url: Url,
    ) -> Result<Attempt> {
        let mut hops = 0;

        loop {
            let request = spec.build(url.clone(), config);
            match Outcome::classify(self.transport.send(request).await) {
                Outcome::Success(response) => return Ok(Attempt::Done(response)),
                Outcome::Retryable(cause) => return Ok(Attempt::Failed(cause)),
                Outcome::Fatal(response) => return Err(server_error(response).await),
                Outcome::Redirect { status, location } => {
                    if hops >= config.max_redirects {
                        warn!(url = %url, max = config.max_redirects, "redirect limit reached");
                        return Err(RqliteError::TooManyRedirects {
                            max: config.max_redirects,
                        });
                    }
                    let location = location.ok_or_else(|| {
                        RqliteError::InvalidRedirect(format!(
                            "status {} without a Location header",
                            status.as_u16()
                        ))
                    })?;
                    let next = url.join(&location).map_err(|e| {
                        RqliteError::InvalidRedirect(format!("bad Location {location:?}: {e}"))
                    })?;
                    debug!(from = %url, to = %next, status = status.as_u16(), "following redirect");
                    url = next;
                    hops += 1;
                }
            }
        }
    }
}

/// Build the fatal error for a non-retryable status, keeping the body text.
async fn server_error(response: reqwest::Response) -> RqliteError {
    let status = response.status();
    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => {
            debug!(status = status.as_u16(), error = %e, "failed to read error body");
            String::new()
        }
    };
    let message = if body.trim().is_empty() {
        status.canonical_reason().unwrap_or("unknown status").to_owned()
    } else {
        body.trim().to_owned()
    };
    warn!(status = status.as_u16(), %message, "request failed with non-retryable status");
    RqliteError::Server {
        status: status.as_u16(),
        message,
    }
}
