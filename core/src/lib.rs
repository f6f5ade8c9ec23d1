//! Blocking client for the iCE Server REST API.
//!
//! # Overview
//! Two calls: `my_ip` asks the server which address the caller appears to
//! come from, and `store_instance` registers an instance record and returns
//! the id the server assigned to it.
//!
//! # Design
//! - `IceClient` holds only the endpoint and a transport; it is safe to share
//!   between threads and every call is independent.
//! - Each call is split into `build_*` (produces an `HttpRequest`) and
//!   `parse_*` (consumes an `HttpResponse`), so the I/O boundary is explicit
//!   and the parsing rules are testable without a server.
//! - `Transport` executes the round-trip. `UreqTransport` is the default.
//! - Every call takes a `RequestContext` carrying its own deadline and
//!   cancellation token.

pub mod client;
pub mod context;
pub mod error;
pub mod http;
pub mod issues;
pub mod transport;
pub mod types;

pub use client::IceClient;
pub use context::{CancelToken, RequestContext};
pub use error::{ApiError, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use issues::store_instance_error_message;
pub use transport::{Transport, UreqTransport};
pub use types::{ResponseError, StoreInstanceResponse};
