// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <j.d.a.jewell@open.ac.uk>

//! Injectable I/O boundaries of the request executor.
//!
//! The executor never opens sockets or sleeps on its own. It sends through a
//! [`Transport`] and waits through a [`Clock`], so tests can script node
//! responses and record backoff sequences without a network or real time.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Result, TransportError};

/// Sends one fully formed HTTP request.
///
/// Implementations must not follow redirects themselves; the executor handles
/// `301`/`302`/`303` so that hops are bounded and logged.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `request` and return the response, whatever its status.
    async fn send(&self, request: reqwest::Request) -> std::result::Result<reqwest::Response, TransportError>;
}

/// Waits for a backoff interval.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Suspend the calling task for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// [`Transport`] backed by a pooled `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport whose requests time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`RqliteError::Transport`](crate::error::RqliteError::Transport)
    /// if the underlying client cannot be initialised.
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(TransportError::Http)?;
        Ok(Self { http })
    }

    /// Wrap an existing client. Its redirect policy should be
    /// `Policy::none()`.
    pub fn from_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: reqwest::Request) -> std::result::Result<reqwest::Response, TransportError> {
        Ok(self.http.execute(request).await?)
    }
}

/// [`Clock`] that sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_transport_builds() {
        assert!(HttpTransport::new(Duration::from_millis(500)).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_clock_advances_virtual_time() {
        let start = tokio::time::Instant::now();
        TokioClock.sleep(Duration::from_millis(400)).await;
        assert!(start.elapsed() >= Duration::from_millis(400));
    }
}
