//! HTTP request values and raw response parsing.
//!
//! # Design
//! Requests are plain data built by the client and handed to a `Transport`.
//! The transport answers with the raw response text (status line, header
//! lines, blank line, body), and everything from there on is parsed here,
//! so the full pipeline can be exercised in tests with literal responses.

use std::fmt;

use serde_json::{Map, Value};
use url::form_urlencoded;

use crate::error::ClientError;
use crate::types::ResponseHeaders;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// Whether params travel in the body (`POST`/`PUT`) rather than the query.
    pub fn has_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            other => Err(format!("unsupported method: {other}")),
        }
    }
}

/// An HTTP request described as plain data.
///
/// `url` is absolute and already carries any query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// First header value whose name matches case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A response after the status line and headers have been parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub headers: ResponseHeaders,
    pub body: String,
}

/// Append `params` to `url` as a URL-encoded query string.
///
/// Nested arrays and objects use bracket keys (`ids[0]=1`, `filter[name]=x`);
/// null values are dropped.
pub fn append_query(url: &str, params: &Map<String, Value>) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in params {
        push_pairs(&mut serializer, key, value);
    }
    let query = serializer.finish();
    if query.is_empty() {
        return url.to_string();
    }
    let sep = if url.contains('?') { '&' } else { '?' };
    format!("{url}{sep}{query}")
}

/// Encode `pairs` as an `application/x-www-form-urlencoded` body.
pub fn form_encode(pairs: &[(&str, &str)]) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}

fn push_pairs(serializer: &mut form_urlencoded::Serializer<'_, String>, key: &str, value: &Value) {
    match value {
        Value::Null => {}
        Value::Bool(b) => {
            serializer.append_pair(key, if *b { "true" } else { "false" });
        }
        Value::Number(n) => {
            serializer.append_pair(key, &n.to_string());
        }
        Value::String(s) => {
            serializer.append_pair(key, s);
        }
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                push_pairs(serializer, &format!("{key}[{i}]"), item);
            }
        }
        Value::Object(map) => {
            for (sub, item) in map {
                push_pairs(serializer, &format!("{key}[{sub}]"), item);
            }
        }
    }
}

/// Parse raw response text into status, headers and body.
///
/// The header block ends at the first blank line, whichever of `\r\n`, `\n`
/// or `\r` the server used. Interim `1xx` blocks in front of the final
/// response are skipped.
pub fn parse_raw_response(raw: &str) -> Result<HttpResponse, ClientError> {
    let mut rest = raw;
    loop {
        let (head, body) = split_head(rest);
        let headers = parse_head(head)?;
        if (100..200).contains(&headers.status_code) && body.starts_with("HTTP/") {
            rest = body;
            continue;
        }
        return Ok(HttpResponse {
            headers,
            body: body.to_string(),
        });
    }
}

fn split_head(raw: &str) -> (&str, &str) {
    const BLANK_LINES: [&str; 3] = ["\r\n\r\n", "\n\n", "\r\r"];
    BLANK_LINES
        .iter()
        .filter_map(|sep| raw.find(sep).map(|at| (at, sep.len())))
        .min_by_key(|(at, _)| *at)
        .map(|(at, len)| (&raw[..at], &raw[at + len..]))
        .unwrap_or((raw, ""))
}

fn parse_head(head: &str) -> Result<ResponseHeaders, ClientError> {
    let mut lines = head.split(['\r', '\n']).filter(|line| !line.is_empty());
    let status_line = lines
        .next()
        .ok_or_else(|| ClientError::MalformedResponse("empty response".to_string()))?;
    let mut headers = parse_status_line(status_line)?;

    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim(), value.trim());
        }
    }
    Ok(headers)
}

fn parse_status_line(line: &str) -> Result<ResponseHeaders, ClientError> {
    let mut parts = line.trim().splitn(3, ' ');
    let version = parts.next().unwrap_or_default();
    if !version.starts_with("HTTP/") {
        return Err(ClientError::MalformedResponse(format!("bad status line: {line}")));
    }
    let code = parts
        .next()
        .and_then(|c| c.parse::<u16>().ok())
        .ok_or_else(|| ClientError::MalformedResponse(format!("bad status code: {line}")))?;
    let message = parts.next().unwrap_or_default().trim();
    Ok(ResponseHeaders::new(code, message))
}
