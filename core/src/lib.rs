//! Blocking client for a store-scoped vendor REST API.
//!
//! # Overview
//! `Client` builds requests carrying the app's auth headers, hands them to a
//! `Transport`, parses the raw response and classifies the outcome. Throttled
//! calls (HTTP 429) are waited out and re-issued automatically.
//!
//! # Design
//! - Every call returns its own `ApiResponse`; the client keeps no state about
//!   the last exchange, so `call` takes `&self`.
//! - `Transport` is the only place that does I/O (including the rate-limit
//!   wait). `UreqTransport` is the production implementation.
//! - OAuth2 token exchange reports failure as `None`, while `call` reports
//!   failure through `ClientError`.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod transport;
pub mod types;

pub use client::Client;
pub use config::ClientConfig;
pub use error::{ApiError, ClientError, TransportError, TransportErrorKind};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use transport::{Transport, UreqTransport};
pub use types::{ApiResponse, Credentials, ResponseBody, ResponseHeaders};
