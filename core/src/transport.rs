//! Executes `HttpRequest`s against the network.
//!
//! # Design
//! `Transport` is the single I/O seam of the crate. `IceClient` builds a
//! request, hands it to a transport together with the caller's
//! `RequestContext`, and parses whatever comes back. Tests swap in an
//! in-memory transport; production code uses `UreqTransport`.
//!
//! ureq honors a per-request timeout but has no way to abort a call from
//! another thread. When the context carries a `CancelToken`, the round-trip
//! runs on a worker thread and the calling thread polls the token, returning
//! `Cancelled` as soon as it fires. The worker is left to finish on its own
//! and its result is dropped.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;
use ureq::{Agent, RequestBuilder};

use crate::context::RequestContext;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// How often a cancellable call re-checks its context.
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Performs one HTTP round-trip.
///
/// Implementations must return 4xx/5xx responses as `Ok(HttpResponse)`;
/// status interpretation belongs to `IceClient`. `Err` is reserved for
/// failures to obtain a response at all.
pub trait Transport: Send + Sync {
    fn execute(&self, request: HttpRequest, ctx: &RequestContext) -> Result<HttpResponse, ApiError>;
}

/// Blocking transport backed by a `ureq::Agent`.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }

    /// Use a preconfigured agent (proxy, TLS roots, user agent, ...).
    ///
    /// The agent must be built with `http_status_as_error(false)`, otherwise
    /// every non-2xx response surfaces as a transport error.
    pub fn with_agent(agent: Agent) -> Self {
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: HttpRequest, ctx: &RequestContext) -> Result<HttpResponse, ApiError> {
        ctx.check()?;
        debug!(method = request.method.as_str(), url = %request.url, "sending iCE request");

        let response = match ctx.cancel_token() {
            Some(_) => run_cancellable(self.agent.clone(), request, ctx)?,
            None => round_trip(&self.agent, request, ctx.remaining())
                .map_err(|err| classify(err, ctx))?,
        };

        debug!(status = response.status, "received iCE response");
        Ok(response)
    }
}

fn run_cancellable(
    agent: Agent,
    request: HttpRequest,
    ctx: &RequestContext,
) -> Result<HttpResponse, ApiError> {
    let (tx, rx) = mpsc::channel();
    let timeout = ctx.remaining();
    thread::spawn(move || {
        // The receiver is gone if the caller gave up; nothing to report then.
        let _ = tx.send(round_trip(&agent, request, timeout));
    });

    loop {
        match rx.recv_timeout(CANCEL_POLL_INTERVAL) {
            Ok(result) => return result.map_err(|err| classify(err, ctx)),
            Err(RecvTimeoutError::Timeout) => ctx.check()?,
            Err(RecvTimeoutError::Disconnected) => {
                return Err(ApiError::transport("transport worker exited without a response"));
            }
        }
    }
}

/// A timeout under a deadline is the deadline firing; anything else is
/// passed through as-is.
fn classify(err: ureq::Error, ctx: &RequestContext) -> ApiError {
    match ctx.deadline() {
        Some(deadline) if matches!(err, ureq::Error::Timeout(_)) || Instant::now() >= deadline => {
            ApiError::DeadlineExceeded
        }
        _ => ApiError::transport(err),
    }
}

fn round_trip(
    agent: &Agent,
    request: HttpRequest,
    timeout: Option<Duration>,
) -> Result<HttpResponse, ureq::Error> {
    let HttpRequest {
        method,
        url,
        headers,
        body,
    } = request;

    let mut response = match method {
        HttpMethod::Get => with_headers(agent.get(&url), &headers)
            .config()
            .timeout_global(timeout)
            .build()
            .call()?,
        HttpMethod::Post => {
            let builder = with_headers(agent.post(&url), &headers)
                .config()
                .timeout_global(timeout)
                .build();
            match body {
                Some(body) => builder.send(body.as_bytes())?,
                None => builder.send_empty()?,
            }
        }
    };

    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect();
    let body = response.body_mut().read_to_vec()?;

    Ok(HttpResponse {
        status,
        headers,
        body,
    })
}

fn with_headers<B>(builder: RequestBuilder<B>, headers: &[(String, String)]) -> RequestBuilder<B> {
    headers
        .iter()
        .fold(builder, |builder, (name, value)| builder.header(name.as_str(), value.as_str()))
}
