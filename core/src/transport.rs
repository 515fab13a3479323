//! The I/O boundary between the client and the network.
//!
//! # Design
//! `Client` never touches a socket. It builds `HttpRequest` values and hands
//! them to a `Transport`, which performs the exchange and returns the raw
//! response text. Blocking waits for rate limiting also go through the
//! transport so tests can substitute a scripted transport and observe waits
//! without sleeping.

use std::fmt::Write as _;
use std::time::Duration;

use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{TransportError, TransportErrorKind};
use crate::http::{HttpMethod, HttpRequest};

/// Executes `HttpRequest`s and returns raw HTTP response text.
pub trait Transport {
    /// Perform one exchange. Any status code is a successful exchange; only
    /// network-level failures are errors.
    fn execute(&self, request: &HttpRequest) -> Result<String, TransportError>;

    /// Block the calling thread for `duration`.
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, request: &HttpRequest) -> Result<String, TransportError> {
        (**self).execute(request)
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

/// Blocking transport backed by a `ureq` agent.
///
/// TLS certificates are verified, redirects are followed up to the
/// configured limit and both connect and total timeouts apply.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
    user_agent: String,
    max_body_bytes: u64,
}

impl std::fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UreqTransport")
            .field("user_agent", &self.user_agent)
            .field("max_body_bytes", &self.max_body_bytes)
            .finish_non_exhaustive()
    }
}

impl UreqTransport {
    pub fn new(config: &ClientConfig) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .max_redirects(config.max_redirects)
            .timeout_connect(Some(config.connect_timeout()))
            .timeout_global(Some(config.timeout()))
            .build()
            .new_agent();
        Self {
            agent,
            user_agent: config.user_agent.clone(),
            max_body_bytes: config.max_body_bytes,
        }
    }

    fn send(&self, request: &HttpRequest) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
        match request.method {
            HttpMethod::Get => self.with_headers(self.agent.get(&request.url), request).call(),
            HttpMethod::Delete => self.with_headers(self.agent.delete(&request.url), request).call(),
            HttpMethod::Post => {
                let builder = self.with_headers(self.agent.post(&request.url), request);
                match &request.body {
                    Some(body) => builder.send(body.as_bytes()),
                    None => builder.send_empty(),
                }
            }
            HttpMethod::Put => {
                let builder = self.with_headers(self.agent.put(&request.url), request);
                match &request.body {
                    Some(body) => builder.send(body.as_bytes()),
                    None => builder.send_empty(),
                }
            }
        }
    }

    fn with_headers<B>(&self, mut builder: ureq::RequestBuilder<B>, request: &HttpRequest) -> ureq::RequestBuilder<B> {
        builder = builder.header("User-Agent", self.user_agent.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<String, TransportError> {
        debug!(method = %request.method, url = %request.url, "sending request");
        let mut response = self.send(request).map_err(transport_error)?;
        // Bodies are not required to be UTF-8; invalid bytes become U+FFFD so
        // the exchange still reaches the caller with its status.
        let bytes = response
            .body_mut()
            .with_config()
            .limit(self.max_body_bytes)
            .read_to_vec()
            .map_err(transport_error)?;
        Ok(render_raw(&response, &String::from_utf8_lossy(&bytes)))
    }
}

/// Render a response back into the wire format the client parses.
fn render_raw<B>(response: &ureq::http::Response<B>, body: &str) -> String {
    let status = response.status();
    let mut raw = format!(
        "{:?} {} {}\r\n",
        response.version(),
        status.as_u16(),
        status.canonical_reason().unwrap_or_default()
    );
    for (name, value) in response.headers() {
        let _ = write!(raw, "{}: {}\r\n", name.as_str(), String::from_utf8_lossy(value.as_bytes()));
    }
    raw.push_str("\r\n");
    raw.push_str(body);
    raw
}

fn transport_error(err: ureq::Error) -> TransportError {
    let kind = match &err {
        ureq::Error::HostNotFound => TransportErrorKind::Dns,
        ureq::Error::ConnectionFailed => TransportErrorKind::Connect,
        ureq::Error::Timeout(_) => TransportErrorKind::Timeout,
        ureq::Error::Tls(_) => TransportErrorKind::Tls,
        ureq::Error::TooManyRedirects | ureq::Error::RedirectFailed => TransportErrorKind::Redirect,
        ureq::Error::Io(io) => match io.kind() {
            std::io::ErrorKind::ConnectionRefused | std::io::ErrorKind::ConnectionReset => {
                TransportErrorKind::Connect
            }
            std::io::ErrorKind::TimedOut => TransportErrorKind::Timeout,
            _ => TransportErrorKind::Io,
        },
        _ => TransportErrorKind::Other,
    };
    TransportError::new(kind, err.to_string())
}
