//! Credentials and response values for the store API.
//!
//! # Design
//! Every call returns its own `ApiResponse` bundling the parsed status line,
//! headers and body. Nothing about the last exchange is kept on the client,
//! so a shared client never hands one caller another caller's headers.

use std::collections::BTreeMap;

use serde_json::Value;

/// Identity of the store and app the client talks on behalf of.
#[derive(Clone)]
pub struct Credentials {
    /// Path segment selecting the store, e.g. `stores/abc123`.
    pub store_context: String,
    pub client_id: String,
    pub client_secret: String,
    pub token: Option<String>,
}

impl Credentials {
    pub fn new(
        store_context: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        token: Option<String>,
    ) -> Self {
        Self {
            store_context: store_context.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            token,
        }
    }
}

// Secrets stay out of logs and panic messages.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("store_context", &self.store_context)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Status line and header fields of one response.
///
/// Field names are stored lower-cased; lookups are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResponseHeaders {
    pub status_code: u16,
    pub status_message: String,
    pub fields: BTreeMap<String, String>,
}

impl ResponseHeaders {
    pub fn new(status_code: u16, status_message: impl Into<String>) -> Self {
        Self {
            status_code,
            status_message: status_message.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Add a header field. Repeated names are joined with `", "`.
    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        self.fields
            .entry(name.to_ascii_lowercase())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

/// A response body: decoded JSON when possible, otherwise the raw text.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Raw(String),
}

impl ResponseBody {
    /// Decode `text` as JSON, keeping it verbatim if it is not valid JSON.
    pub fn decode(text: &str) -> Self {
        match serde_json::from_str(text) {
            Ok(value) => ResponseBody::Json(value),
            Err(_) => ResponseBody::Raw(text.to_string()),
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ResponseBody::Json(value) => Some(value),
            ResponseBody::Raw(_) => None,
        }
    }

    /// True when the body is a JSON object with a non-null `error` field.
    pub fn has_error_field(&self) -> bool {
        self.as_json()
            .and_then(|v| v.get("error"))
            .is_some_and(|e| !e.is_null())
    }
}

/// Result of a successful `Client::call`.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub headers: ResponseHeaders,
    pub body: ResponseBody,
}

impl ApiResponse {
    pub fn status_code(&self) -> u16 {
        self.headers.status_code
    }

    pub fn json(&self) -> Option<&Value> {
        self.body.as_json()
    }

    /// Deserialize the JSON body into `T`.
    pub fn parse<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        match &self.body {
            ResponseBody::Json(value) => T::deserialize(value),
            ResponseBody::Raw(text) => serde_json::from_str(text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn header_lookup_is_case_insensitive() {
        let mut headers = ResponseHeaders::new(200, "OK");
        headers.insert("X-Rate-Limit-Requests-Left", "149");
        assert_eq!(headers.get("x-rate-limit-requests-left"), Some("149"));
        assert_eq!(headers.get("X-RATE-LIMIT-REQUESTS-LEFT"), Some("149"));
        assert!(headers.fields.contains_key("x-rate-limit-requests-left"));
    }

    #[test]
    fn repeated_headers_are_joined() {
        let mut headers = ResponseHeaders::new(200, "OK");
        headers.insert("Set-Cookie", "a=1");
        headers.insert("set-cookie", "b=2");
        assert_eq!(headers.get("set-cookie"), Some("a=1, b=2"));
    }

    #[test]
    fn body_decode_falls_back_to_raw() {
        assert_eq!(ResponseBody::decode(r#"{"id":5}"#), ResponseBody::Json(json!({"id": 5})));
        assert_eq!(ResponseBody::decode("<html>"), ResponseBody::Raw("<html>".into()));
    }

    #[test]
    fn error_field_detection() {
        assert!(ResponseBody::Json(json!({"error": "Invalid field"})).has_error_field());
        assert!(!ResponseBody::Json(json!({"error": null})).has_error_field());
        assert!(!ResponseBody::Json(json!([{"error": "x"}])).has_error_field());
        assert!(!ResponseBody::Raw("error".into()).has_error_field());
    }

    #[test]
    fn credentials_debug_redacts_secrets() {
        let creds = Credentials::new("stores/abc", "id", "shh", Some("tok".into()));
        let debug = format!("{creds:?}");
        assert!(!debug.contains("shh"));
        assert!(!debug.contains("tok\""));
        assert!(debug.contains("stores/abc"));
    }

    #[test]
    fn parse_typed_body() {
        #[derive(Deserialize)]
        struct Product {
            id: u64,
        }
        let resp = ApiResponse {
            headers: ResponseHeaders::new(200, "OK"),
            body: ResponseBody::Json(json!({"id": 5})),
        };
        let product: Product = resp.parse().unwrap();
        assert_eq!(product.id, 5);
    }
}
