// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <j.d.a.jewell@open.ac.uk>

//! Error types for the rqlite client SDK.
//!
//! All fallible operations in this crate return [`Result<T>`], an alias for
//! `std::result::Result<T, RqliteError>`. The variants fall into five groups:
//! configuration errors (never retried), transient failures (retried by the
//! executor, surfaced as [`RqliteError::MaxRetriesExceeded`] once the budget
//! runs out), fatal server statuses, redirect failures, and decode errors.

use std::fmt;

use thiserror::Error;

use crate::scan::ScanError;

/// Failure raised by a [`Transport`](crate::transport::Transport) while
/// sending a single request.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Error from the underlying `reqwest` client (connect, timeout, I/O).
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// The node could not be reached. Used by custom transports that do not
    /// sit on top of `reqwest`.
    #[error("node unavailable: {0}")]
    Unavailable(String),
}

/// The last failure seen before the retry budget ran out.
#[derive(Debug)]
pub enum RetryCause {
    /// The request never produced a response.
    Transport(TransportError),
    /// The node answered with a retryable HTTP status.
    Status(u16),
}

impl fmt::Display for RetryCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryCause::Transport(err) => write!(f, "{err}"),
            RetryCause::Status(status) => write!(f, "status: {status}"),
        }
    }
}

impl std::error::Error for RetryCause {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RetryCause::Transport(err) => Some(err),
            RetryCause::Status(_) => None,
        }
    }
}

/// Error type for all rqlite client operations.
#[derive(Error, Debug)]
pub enum RqliteError {
    /// The client was built without any host addresses.
    #[error("no addresses given")]
    NoHosts,

    /// The outbound request could not be constructed (bad host or path).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A configuration value could not be parsed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A transport failure outside the retry loop (e.g. client construction).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The server answered with a non-retryable, non-redirect error status.
    #[error("bad status code: status: {status}: {message}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Response body, or the canonical reason when the body is empty.
        message: String,
    },

    /// Every attempt failed with a transient error.
    #[error("max retries exceeded after {attempts} attempts: {cause}")]
    MaxRetriesExceeded {
        /// Number of requests sent, including the first.
        attempts: usize,
        /// The failure of the final attempt.
        #[source]
        cause: RetryCause,
    },

    /// The redirect chain was longer than the configured hop limit.
    #[error("stopped after {max} redirects")]
    TooManyRedirects {
        /// Configured hop limit.
        max: usize,
    },

    /// A redirect response had no usable `Location` header.
    #[error("invalid redirect: {0}")]
    InvalidRedirect(String),

    /// Reading the response body failed.
    #[error("failed to read response body: {0}")]
    Body(#[source] reqwest::Error),

    /// The response body was not the expected JSON envelope.
    #[error("invalid response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The server rejected the whole batch; no statement was executed.
    #[error("{operation} failed: {message}")]
    Rejected {
        /// `"query"` or `"execute"`.
        operation: &'static str,
        /// Top-level error from the response envelope.
        message: String,
    },

    /// A single-statement call got back a different number of results.
    #[error("expected {expected} result, got {actual}")]
    UnexpectedResultCount {
        /// Number of results expected.
        expected: usize,
        /// Number of results returned by the server.
        actual: usize,
    },

    /// Row decoding failed.
    #[error(transparent)]
    Scan(#[from] ScanError),
}

impl RqliteError {
    /// Whether the error came from a transient cluster condition, as opposed
    /// to a problem with the request or the response payload.
    pub fn is_transient(&self) -> bool {
        matches!(self, RqliteError::MaxRetriesExceeded { .. })
    }
}

/// Crate-level result alias using [`RqliteError`].
pub type Result<T> = std::result::Result<T, RqliteError>;
