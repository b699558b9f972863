// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <j.d.a.jewell@open.ac.uk>

//! Shared test doubles: a scripted transport and a recording clock.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, LOCATION};
use rqlite_client::config::ClientConfig;
use rqlite_client::error::TransportError;
use rqlite_client::executor::RequestExecutor;
use rqlite_client::transport::{Clock, Transport};
use rqlite_client::RqliteClient;
use url::Url;

/// What a scripted node answers.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Respond with a status and body.
    Status(u16, String),
    /// Respond with a redirect status and optional `Location`.
    Redirect(u16, Option<String>),
    /// Fail without a response.
    Unavailable,
}

impl Reply {
    pub fn ok(body: &str) -> Self {
        Reply::Status(200, body.to_owned())
    }

    pub fn status(code: u16) -> Self {
        Reply::Status(code, String::new())
    }

    pub fn redirect(location: &str) -> Self {
        Reply::Redirect(301, Some(location.to_owned()))
    }
}

/// A request as seen by the transport.
#[derive(Debug, Clone)]
pub struct Sent {
    pub method: String,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

impl Sent {
    /// `host:port` the request went to.
    pub fn host(&self) -> String {
        match self.url.port() {
            Some(port) => format!("{}:{port}", self.url.host_str().unwrap_or_default()),
            None => self.url.host_str().unwrap_or_default().to_owned(),
        }
    }

    pub fn body_str(&self) -> String {
        String::from_utf8(self.body.clone().unwrap_or_default()).unwrap()
    }
}

type Handler = Box<dyn Fn(&Sent) -> Reply + Send + Sync>;

/// Transport that answers from a script and records every request.
pub struct ScriptedTransport {
    handler: Handler,
    sent: Mutex<Vec<Sent>>,
}

impl ScriptedTransport {
    /// Answer every request with `handler`.
    pub fn from_fn<F>(handler: F) -> Arc<Self>
    where
        F: Fn(&Sent) -> Reply + Send + Sync + 'static,
    {
        Arc::new(Self {
            handler: Box::new(handler),
            sent: Mutex::new(Vec::new()),
        })
    }

    /// Answer requests in order; once the queue is empty every node is down.
    pub fn queue(replies: impl IntoIterator<Item = Reply>) -> Arc<Self> {
        let queue = Mutex::new(replies.into_iter().collect::<VecDeque<_>>());
        Self::from_fn(move |_| queue.lock().unwrap().pop_front().unwrap_or(Reply::Unavailable))
    }

    /// Answer by target host; unknown hosts are down.
    pub fn by_host(replies: &[(&str, Reply)]) -> Arc<Self> {
        let replies: Vec<(String, Reply)> = replies
            .iter()
            .map(|(host, reply)| (host.to_string(), reply.clone()))
            .collect();
        Self::from_fn(move |sent| {
            let host = sent.host();
            replies
                .iter()
                .find(|(h, _)| *h == host)
                .map(|(_, reply)| reply.clone())
                .unwrap_or(Reply::Unavailable)
        })
    }

    /// Every node answers `reply`.
    pub fn always(reply: Reply) -> Arc<Self> {
        Self::from_fn(move |_| reply.clone())
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn hosts(&self) -> Vec<String> {
        self.sent().iter().map(Sent::host).collect()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: reqwest::Request) -> Result<reqwest::Response, TransportError> {
        let sent = Sent {
            method: request.method().to_string(),
            url: request.url().clone(),
            headers: request.headers().clone(),
            body: request.body().and_then(|b| b.as_bytes()).map(<[u8]>::to_vec),
        };
        let reply = (self.handler)(&sent);
        self.sent.lock().unwrap().push(sent);

        let response = match reply {
            Reply::Unavailable => {
                return Err(TransportError::Unavailable("connection refused".into()))
            }
            Reply::Status(code, body) => http::Response::builder()
                .status(code)
                .body(body.into_bytes())
                .unwrap(),
            Reply::Redirect(code, location) => {
                let mut builder = http::Response::builder().status(code);
                if let Some(location) = location {
                    builder = builder.header(LOCATION, location);
                }
                builder.body(Vec::new()).unwrap()
            }
        };
        Ok(reqwest::Response::from(response))
    }
}

/// Clock that records requested sleeps and returns immediately.
#[derive(Default)]
pub struct RecordingClock {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }

    pub fn sleeps_ms(&self) -> Vec<u64> {
        self.sleeps().iter().map(|d| d.as_millis() as u64).collect()
    }
}

#[async_trait]
impl Clock for RecordingClock {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}

pub fn executor(
    hosts: &[&str],
    config: ClientConfig,
    transport: &Arc<ScriptedTransport>,
    clock: &Arc<RecordingClock>,
) -> RequestExecutor {
    RequestExecutor::new(
        hosts.iter().copied(),
        config,
        transport.clone(),
        clock.clone(),
    )
    .unwrap()
}

pub fn client(
    hosts: &[&str],
    config: ClientConfig,
    transport: &Arc<ScriptedTransport>,
    clock: &Arc<RecordingClock>,
) -> RqliteClient {
    RqliteClient::with_transport(
        hosts.iter().copied(),
        config,
        transport.clone(),
        clock.clone(),
    )
    .unwrap()
}
