//! The iCE Server client.
//!
//! # Design
//! `IceClient` holds an endpoint and a transport and carries no mutable state
//! between calls. Each operation is split into a `build_*` method that
//! produces an `HttpRequest` and a `parse_*` method that consumes an
//! `HttpResponse`; `my_ip` and `store_instance` simply run the two halves
//! around `Transport::execute`. Hosts with their own HTTP stack can call the
//! halves directly.

use std::net::IpAddr;

use serde::Serialize;

use crate::context::RequestContext;
use crate::error::ApiError;
use crate::http::{status_text, HttpMethod, HttpRequest, HttpResponse};
use crate::issues::store_instance_error_message;
use crate::transport::{Transport, UreqTransport};
use crate::types::StoreInstanceResponse;

const MY_IP_PATH: &str = "/v2/my_ip";
const INSTANCES_PATH: &str = "/v2/instances";

/// Client for the iCE Server REST API.
///
/// The endpoint is used verbatim: it is neither validated nor normalized, so
/// a malformed URL only shows up as an error from the first call.
#[derive(Debug, Clone)]
pub struct IceClient<T = UreqTransport> {
    endpoint: String,
    transport: T,
}

impl IceClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_transport(endpoint, UreqTransport::new())
    }
}

impl<T> IceClient<T> {
    pub fn with_transport(endpoint: impl Into<String>, transport: T) -> Self {
        Self {
            endpoint: endpoint.into(),
            transport,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn build_my_ip(&self) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: format!("{}{MY_IP_PATH}", self.endpoint),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Returns `Ok(None)` when the server answered 200 with something that is
    /// not an IP literal, including a body that is not UTF-8.
    pub fn parse_my_ip(&self, response: HttpResponse) -> Result<Option<IpAddr>, ApiError> {
        if response.status != 200 {
            return Err(ApiError::UnexpectedStatus {
                status: response.status,
            });
        }
        Ok(std::str::from_utf8(&response.body)
            .ok()
            .and_then(|text| text.trim().parse().ok()))
    }

    pub fn build_store_instance<I>(&self, instance: &I) -> Result<HttpRequest, ApiError>
    where
        I: Serialize + ?Sized,
    {
        let body = serde_json::to_string(instance).map_err(ApiError::Serialization)?;
        Ok(HttpRequest {
            method: HttpMethod::Post,
            url: format!("{}{INSTANCES_PATH}", self.endpoint),
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: Some(body),
        })
    }

    pub fn parse_store_instance(&self, response: HttpResponse) -> Result<String, ApiError> {
        // Decode before looking at the status so a garbled error body is
        // reported as such.
        let parsed =
            StoreInstanceResponse::decode(&response.body).map_err(ApiError::MalformedResponse)?;

        if !is_store_success(response.status) {
            let mut message = store_instance_error_message(&parsed.error.message, &parsed.issues);
            if message.is_empty() {
                message = format!("Error: got HTTP response {}", status_text(response.status));
            }
            return Err(ApiError::Rejected {
                status: response.status,
                message,
            });
        }

        if parsed.id.is_empty() {
            return Err(ApiError::MissingId);
        }
        Ok(parsed.id)
    }
}

impl<T: Transport> IceClient<T> {
    /// The caller's public IP address as seen by the server.
    pub fn my_ip(&self, ctx: &RequestContext) -> Result<Option<IpAddr>, ApiError> {
        let response = self.transport.execute(self.build_my_ip(), ctx)?;
        self.parse_my_ip(response)
    }

    /// Register `instance` with the server and return its assigned id.
    ///
    /// Every call creates a new record; nothing is deduplicated here.
    pub fn store_instance<I>(&self, ctx: &RequestContext, instance: &I) -> Result<String, ApiError>
    where
        I: Serialize + ?Sized,
    {
        let request = self.build_store_instance(instance)?;
        let response = self.transport.execute(request, ctx)?;
        self.parse_store_instance(response)
    }
}

fn is_store_success(status: u16) -> bool {
    matches!(status, 200 | 201)
}
