//! Blocking client for the store-scoped REST API.
//!
//! # Design
//! `Client` owns the credentials, the configuration and a `Transport`. A
//! call builds an `HttpRequest`, lets the transport run it, parses the raw
//! response and classifies the outcome. Headers come back inside the
//! returned `ApiResponse` instead of living on the client, so `call` only
//! needs `&self` and a client over a `Sync` transport can be shared between
//! threads. Only the token exchange mutates the client.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::{ApiError, ClientError};
use crate::http::{append_query, form_encode, parse_raw_response, HttpMethod, HttpRequest};
use crate::transport::{Transport, UreqTransport};
use crate::types::{ApiResponse, Credentials, ResponseBody};

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Client for one store, authenticated as one app.
#[derive(Debug, Clone)]
pub struct Client<T = UreqTransport> {
    credentials: Credentials,
    config: ClientConfig,
    transport: T,
}

impl Client<UreqTransport> {
    /// Client against the vendor's production endpoints.
    pub fn new(
        store_context: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        token: Option<String>,
    ) -> Self {
        let credentials = Credentials::new(store_context, client_id, client_secret, token);
        Self::with_config(credentials, ClientConfig::default())
    }

    pub fn with_config(credentials: Credentials, config: ClientConfig) -> Self {
        let transport = UreqTransport::new(&config);
        Self::with_transport(credentials, config, transport)
    }
}

impl<T: Transport> Client<T> {
    pub fn with_transport(credentials: Credentials, config: ClientConfig, transport: T) -> Self {
        Self {
            credentials,
            config,
            transport,
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn token(&self) -> Option<&str> {
        self.credentials.token.as_deref()
    }

    pub fn set_token(&mut self, token: impl Into<String>) {
        self.credentials.token = Some(token.into());
    }

    /// Exchange an OAuth2 authorization code for an access token.
    ///
    /// On success the token is stored on the client and returned. Every
    /// failure (network, malformed response, no `access_token` in the reply)
    /// yields `None`; the reason is logged rather than returned.
    pub fn get_access_token(&mut self, code: &str, scope: &str, redirect_uri: &str) -> Option<String> {
        match self.request_token(code, scope, redirect_uri) {
            Ok(Some(token)) => {
                debug!(store = %self.credentials.store_context, "access token obtained");
                self.credentials.token = Some(token.clone());
                Some(token)
            }
            Ok(None) => {
                warn!(store = %self.credentials.store_context, "token response carried no access_token");
                None
            }
            Err(err) => {
                warn!(store = %self.credentials.store_context, error = %err, "token exchange failed");
                None
            }
        }
    }

    fn request_token(&self, code: &str, scope: &str, redirect_uri: &str) -> Result<Option<String>, ClientError> {
        let request = self.build_token_request(code, scope, redirect_uri);
        let raw = self.transport.execute(&request)?;
        let response = parse_raw_response(&raw)?;
        let token = ResponseBody::decode(&response.body)
            .as_json()
            .and_then(|v| v.get("access_token"))
            .and_then(Value::as_str)
            .map(str::to_string);
        Ok(token)
    }

    /// Build the form-encoded token exchange request.
    pub fn build_token_request(&self, code: &str, scope: &str, redirect_uri: &str) -> HttpRequest {
        let body = form_encode(&[
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("code", code),
            ("scope", scope),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri),
            ("context", self.credentials.store_context.as_str()),
        ]);
        HttpRequest {
            method: HttpMethod::Post,
            url: self.config.token_url(),
            headers: vec![
                ("Accept".to_string(), "application/json".to_string()),
                ("Content-Type".to_string(), FORM_CONTENT_TYPE.to_string()),
            ],
            body: Some(body),
        }
    }

    /// Build the request for `method` on `path`.
    ///
    /// GET and DELETE carry `params` in the query string; POST and PUT carry
    /// them as a JSON body.
    pub fn build_request(
        &self,
        method: HttpMethod,
        path: &str,
        params: &Map<String, Value>,
    ) -> Result<HttpRequest, ClientError> {
        let url = self.url_for(path);
        let mut headers = vec![
            ("Accept".to_string(), "application/json".to_string()),
            ("X-Auth-Client".to_string(), self.credentials.client_id.clone()),
        ];
        if let Some(token) = &self.credentials.token {
            headers.push(("X-Auth-Token".to_string(), token.clone()));
        }

        if method.has_body() {
            headers.push(("Content-Type".to_string(), JSON_CONTENT_TYPE.to_string()));
            Ok(HttpRequest {
                method,
                url,
                headers,
                body: Some(serde_json::to_string(params)?),
            })
        } else {
            Ok(HttpRequest {
                method,
                url: append_query(&url, params),
                headers,
                body: None,
            })
        }
    }

    fn url_for(&self, path: &str) -> String {
        format!(
            "{}/{}/{}",
            self.config.api_base_url.trim_end_matches('/'),
            self.credentials.store_context.trim_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Perform an API call and classify the outcome.
    ///
    /// A 429 is waited out (per `X-Retry-After`) and the identical request
    /// re-issued, up to `rate_limit_retries` times; the response to the last
    /// attempt is what the caller sees. A status >= 400 or a JSON body with
    /// an `error` field, on any status, is an `Api` error.
    pub fn call<P>(&self, method: HttpMethod, path: &str, params: &P) -> Result<ApiResponse, ClientError>
    where
        P: Serialize + ?Sized,
    {
        let params = to_params(params)?;
        let request = self.build_request(method, path, &params)?;

        let mut retries = 0u32;
        loop {
            debug!(%method, path, attempt = retries + 1, "calling store API");
            let raw = self.transport.execute(&request)?;
            let response = parse_raw_response(&raw)?;
            let headers = response.headers;
            debug!(%method, path, status = headers.status_code, "response received");

            if headers.status_code == 429 && retries < self.config.rate_limit_retries {
                let wait = self.config.retry_after(headers.get("x-retry-after"));
                warn!(%method, path, wait_secs = wait.as_secs(), "rate limited, retrying");
                self.transport.sleep(wait);
                retries += 1;
                continue;
            }

            let body = ResponseBody::decode(&response.body);
            if headers.status_code >= 400 || body.has_error_field() {
                return Err(ApiError {
                    method,
                    path: path.to_string(),
                    params,
                    headers,
                    body,
                }
                .into());
            }
            return Ok(ApiResponse { headers, body });
        }
    }

    pub fn get<P: Serialize + ?Sized>(&self, path: &str, params: &P) -> Result<ApiResponse, ClientError> {
        self.call(HttpMethod::Get, path, params)
    }

    pub fn post<P: Serialize + ?Sized>(&self, path: &str, params: &P) -> Result<ApiResponse, ClientError> {
        self.call(HttpMethod::Post, path, params)
    }

    pub fn put<P: Serialize + ?Sized>(&self, path: &str, params: &P) -> Result<ApiResponse, ClientError> {
        self.call(HttpMethod::Put, path, params)
    }

    pub fn delete<P: Serialize + ?Sized>(&self, path: &str, params: &P) -> Result<ApiResponse, ClientError> {
        self.call(HttpMethod::Delete, path, params)
    }
}

/// Serialize caller params into a JSON object; `null` (e.g. `()`) is empty.
fn to_params<P: Serialize + ?Sized>(params: &P) -> Result<Map<String, Value>, ClientError> {
    match serde_json::to_value(params)? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(ClientError::Serialization(<serde_json::Error as serde::ser::Error>::custom(
            format!("params must serialize to a JSON object, got {other}"),
        ))),
    }
}
