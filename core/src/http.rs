//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! These types describe HTTP requests and responses as plain data. The
//! `build_*` methods on `IceClient` produce an `HttpRequest` and the `parse_*`
//! methods consume an `HttpResponse`; whatever executes the round-trip in
//! between (the bundled `UreqTransport`, a test double, or a host application)
//! never needs to understand the iCE payloads.

use ureq::http::StatusCode;

/// HTTP method for a request. The iCE API only uses these two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    /// Absolute URL: the client endpoint joined with the route path.
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

/// An HTTP response described as plain data.
///
/// The body is kept as raw bytes: the server is not trusted to send UTF-8,
/// and each `parse_*` method decides what an undecodable body means.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }
}

/// Render a status code the way an HTTP status line does, e.g.
/// `403 Forbidden`. Codes without a registered reason phrase render as the
/// bare number.
pub fn status_text(status: u16) -> String {
    match StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
    {
        Some(reason) => format!("{status} {reason}"),
        None => status.to_string(),
    }
}
