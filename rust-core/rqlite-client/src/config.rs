// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <j.d.a.jewell@open.ac.uk>

//! Client configuration and per-call overrides.
//!
//! A [`ClientConfig`] is fixed when the client is opened. Individual calls may
//! pass [`RequestOptions`]; these are applied to a private copy with
//! [`ClientConfig::with_overrides`] and never touch the shared base.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RqliteError};

/// Default redirect hop limit.
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// Default per-request timeout of the built-in HTTP transport.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Read consistency level, sent as the `level` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Consistency {
    /// Read from the local node's SQLite file without any leadership check.
    None,
    /// The node checks it is the leader before reading (the server default).
    Weak,
    /// The read goes through the Raft log.
    Strong,
}

impl Consistency {
    /// Wire name of the level.
    pub fn as_str(self) -> &'static str {
        match self {
            Consistency::None => "none",
            Consistency::Weak => "weak",
            Consistency::Strong => "strong",
        }
    }
}

impl fmt::Display for Consistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Consistency {
    type Err = RqliteError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Consistency::None),
            "weak" => Ok(Consistency::Weak),
            "strong" => Ok(Consistency::Strong),
            other => Err(RqliteError::InvalidConfig(format!(
                "unknown consistency level: {other}"
            ))),
        }
    }
}

/// Connection-wide configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Advance the active host after every call, spreading load over the
    /// cluster. Disable when hosts are listed in preference order.
    pub round_robin: bool,
    /// Maximum number of redirect hops followed for one attempt.
    pub max_redirects: usize,
    /// Extra headers added to every request.
    pub headers: HeaderMap,
    /// Consistency level injected as `level`, if set.
    pub consistency: Option<Consistency>,
    /// Inject the presence-only `transaction` parameter.
    pub transaction: bool,
    /// Per-request timeout used by [`HttpTransport`](crate::transport::HttpTransport).
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            round_robin: true,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            headers: HeaderMap::new(),
            consistency: None,
            transaction: false,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ClientConfig {
    /// Enable or disable active-host round robin.
    pub fn with_round_robin(mut self, round_robin: bool) -> Self {
        self.round_robin = round_robin;
        self
    }

    /// Set the redirect hop limit.
    pub fn with_max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    /// Set the default consistency level.
    pub fn with_consistency(mut self, consistency: Consistency) -> Self {
        self.consistency = Some(consistency);
        self
    }

    /// Run every request as a transaction by default.
    pub fn with_transaction(mut self, transaction: bool) -> Self {
        self.transaction = transaction;
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replace the extra header set.
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Add one extra header.
    ///
    /// # Errors
    ///
    /// Returns [`RqliteError::InvalidConfig`] if the name or value is not a
    /// valid HTTP header.
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| RqliteError::InvalidConfig(format!("invalid header name {name:?}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| RqliteError::InvalidConfig(format!("invalid header value: {e}")))?;
        self.headers.append(name, value);
        Ok(self)
    }

    /// Return a copy of this configuration with `options` applied.
    pub fn with_overrides(&self, options: &RequestOptions) -> ClientConfig {
        let mut effective = self.clone();
        if let Some(consistency) = options.consistency {
            effective.consistency = Some(consistency);
        }
        if let Some(transaction) = options.transaction {
            effective.transaction = transaction;
        }
        if let Some(round_robin) = options.round_robin {
            effective.round_robin = round_robin;
        }
        effective
    }

    /// Query parameters this configuration injects into every request.
    /// A `None` value marks a presence-only flag.
    pub(crate) fn injected_params(&self) -> Vec<(&'static str, Option<&'static str>)> {
        let mut params = Vec::new();
        if self.transaction {
            params.push(("transaction", None));
        }
        if let Some(consistency) = self.consistency {
            params.push(("level", Some(consistency.as_str())));
        }
        params
    }

    /// Load configuration from `RQLITE_*` environment variables, falling back
    /// to defaults for anything unset.
    ///
    /// | variable | meaning |
    /// |---|---|
    /// | `RQLITE_CONSISTENCY` | `none`, `weak` or `strong` |
    /// | `RQLITE_ROUND_ROBIN` | `true` or `false` |
    /// | `RQLITE_TIMEOUT_MS` | per-request timeout in milliseconds |
    /// | `RQLITE_MAX_REDIRECTS` | redirect hop limit |
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = ClientConfig::default();

        if let Some(level) = lookup("RQLITE_CONSISTENCY") {
            config.consistency = Some(level.parse()?);
        }
        if let Some(flag) = lookup("RQLITE_ROUND_ROBIN") {
            config.round_robin = flag.trim().parse().map_err(|_| {
                RqliteError::InvalidConfig(format!("RQLITE_ROUND_ROBIN must be true or false, got {flag:?}"))
            })?;
        }
        if let Some(ms) = lookup("RQLITE_TIMEOUT_MS") {
            let ms: u64 = ms.trim().parse().map_err(|_| {
                RqliteError::InvalidConfig(format!("RQLITE_TIMEOUT_MS must be an integer, got {ms:?}"))
            })?;
            config.timeout = Duration::from_millis(ms);
        }
        if let Some(max) = lookup("RQLITE_MAX_REDIRECTS") {
            config.max_redirects = max.trim().parse().map_err(|_| {
                RqliteError::InvalidConfig(format!("RQLITE_MAX_REDIRECTS must be an integer, got {max:?}"))
            })?;
        }

        Ok(config)
    }
}

/// Per-call overrides. Unset fields inherit from the client configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// Override the consistency level.
    pub consistency: Option<Consistency>,
    /// Override the transaction flag.
    pub transaction: Option<bool>,
    /// Override active-host round robin for this call.
    pub round_robin: Option<bool>,
}

impl RequestOptions {
    /// Options that override nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read at the given consistency level.
    pub fn consistency(mut self, consistency: Consistency) -> Self {
        self.consistency = Some(consistency);
        self
    }

    /// Wrap the statements in a transaction (or explicitly not).
    pub fn transaction(mut self, transaction: bool) -> Self {
        self.transaction = Some(transaction);
        self
    }

    /// Enable or disable round robin for this call.
    pub fn round_robin(mut self, round_robin: bool) -> Self {
        self.round_robin = Some(round_robin);
        self
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert!(config.round_robin);
        assert_eq!(config.max_redirects, 10);
        assert!(config.headers.is_empty());
        assert!(config.consistency.is_none());
        assert!(!config.transaction);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.injected_params().is_empty());
    }

    #[test]
    fn test_overrides_leave_base_untouched() {
        let base = ClientConfig::default().with_consistency(Consistency::Weak);
        let options = RequestOptions::new()
            .consistency(Consistency::Strong)
            .transaction(true)
            .round_robin(false);

        let effective = base.with_overrides(&options);

        assert_eq!(effective.consistency, Some(Consistency::Strong));
        assert!(effective.transaction);
        assert!(!effective.round_robin);

        assert_eq!(base.consistency, Some(Consistency::Weak));
        assert!(!base.transaction);
        assert!(base.round_robin);
    }

    #[test]
    fn test_empty_overrides_are_identity() {
        let base = ClientConfig::default()
            .with_transaction(true)
            .with_round_robin(false);
        let effective = base.with_overrides(&RequestOptions::new());
        assert!(effective.transaction);
        assert!(!effective.round_robin);
        assert_eq!(effective.consistency, None);
    }

    #[test]
    fn test_injected_params() {
        let config = ClientConfig::default()
            .with_transaction(true)
            .with_consistency(Consistency::Strong);
        assert_eq!(
            config.injected_params(),
            vec![("transaction", None), ("level", Some("strong"))]
        );
    }

    #[test]
    fn test_consistency_parse() {
        assert_eq!("STRONG".parse::<Consistency>().unwrap(), Consistency::Strong);
        assert_eq!(" none ".parse::<Consistency>().unwrap(), Consistency::None);
        assert!("linear".parse::<Consistency>().is_err());
        assert_eq!(Consistency::Weak.to_string(), "weak");
    }

    #[test]
    fn test_with_header_rejects_bad_name() {
        assert!(ClientConfig::default().with_header("bad header", "x").is_err());
        let config = ClientConfig::default()
            .with_header("X-Trace", "abc")
            .unwrap();
        assert_eq!(config.headers.get("x-trace").unwrap(), "abc");
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("RQLITE_CONSISTENCY", "strong"),
            ("RQLITE_ROUND_ROBIN", "false"),
            ("RQLITE_TIMEOUT_MS", "250"),
        ]
        .into_iter()
        .collect();

        let config =
            ClientConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();
        assert_eq!(config.consistency, Some(Consistency::Strong));
        assert!(!config.round_robin);
        assert_eq!(config.timeout, Duration::from_millis(250));
        assert_eq!(config.max_redirects, DEFAULT_MAX_REDIRECTS);
    }

    #[test]
    fn test_from_lookup_rejects_garbage() {
        let err = ClientConfig::from_lookup(|key| {
            (key == "RQLITE_ROUND_ROBIN").then(|| "sometimes".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, RqliteError::InvalidConfig(_)));
    }
}
