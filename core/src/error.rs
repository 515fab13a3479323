//! Error types for the store API client.
//!
//! # Design
//! Transport failures and API failures are kept apart because callers treat
//! them differently: a transport error means no HTTP exchange completed,
//! while an API error always carries the full response that was received.
//! Rate limiting never reaches the caller unless the automatic retries are
//! exhausted, in which case the 429 surfaces as an ordinary `Api` error.

use std::fmt;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::http::HttpMethod;
use crate::types::{ResponseBody, ResponseHeaders};

/// Errors returned by `Client::call`.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never produced an HTTP response.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The server answered with status >= 400 or an `error` field.
    #[error("API error: {0}")]
    Api(Box<ApiError>),

    /// The request params could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The raw response had no recognizable status line.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl ClientError {
    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Transport(_))
    }

    pub fn is_api(&self) -> bool {
        matches!(self, ClientError::Api(_))
    }

    /// The API error payload, if this is an API error.
    pub fn as_api(&self) -> Option<&ApiError> {
        match self {
            ClientError::Api(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ApiError> for ClientError {
    fn from(err: ApiError) -> Self {
        ClientError::Api(Box::new(err))
    }
}

/// Category of a network-level failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    Dns,
    Connect,
    Tls,
    Timeout,
    Redirect,
    Io,
    Other,
}

impl TransportErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportErrorKind::Dns => "dns",
            TransportErrorKind::Connect => "connect",
            TransportErrorKind::Tls => "tls",
            TransportErrorKind::Timeout => "timeout",
            TransportErrorKind::Redirect => "redirect",
            TransportErrorKind::Io => "io",
            TransportErrorKind::Other => "other",
        }
    }
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A DNS, connect, TLS, timeout or I/O failure reported by the transport.
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// A completed exchange the API reported as failed.
///
/// Carries everything needed to reproduce or log the failure: the request
/// as the caller issued it and the response as the server returned it.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub method: HttpMethod,
    pub path: String,
    pub params: Map<String, Value>,
    pub headers: ResponseHeaders,
    pub body: ResponseBody,
}

impl ApiError {
    pub fn status_code(&self) -> u16 {
        self.headers.status_code
    }

    pub fn status_message(&self) -> &str {
        &self.headers.status_message
    }

    /// The `error` field of a JSON body, rendered as text.
    pub fn error_message(&self) -> Option<String> {
        let error = self.body.as_json()?.get("error")?;
        match error {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.headers.status_code, self.headers.status_message)
    }
}

impl std::error::Error for ApiError {}
