//! In-memory stand-in for the vendor's store API and OAuth2 token endpoint.
//!
//! Serves a small product catalog under `/stores/{hash}/v3/...` plus a few
//! diagnostic routes (`echo`, `throttled`, `soft-error`) that let client
//! tests observe exactly what was sent and provoke rate limiting and
//! error-field responses.

use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use axum::{
    extract::{Path, Query, Request, State},
    http::{HeaderMap, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{any, get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};

/// Authorization code the token endpoint accepts.
pub const VALID_CODE: &str = "valid-code";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: u64,
    pub name: String,
    pub price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateProduct {
    pub name: String,
    #[serde(default)]
    pub price: f64,
    pub sku: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateProduct {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub sku: Option<String>,
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub name: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Deserialize)]
pub struct TokenRequest {
    pub client_id: String,
    pub client_secret: String,
    pub code: String,
    pub scope: String,
    pub grant_type: String,
    pub redirect_uri: String,
    pub context: String,
}

#[derive(Clone, Default)]
pub struct AppState {
    products: Arc<RwLock<BTreeMap<u64, Product>>>,
    next_id: Arc<AtomicU64>,
    throttled_hits: Arc<AtomicU64>,
}

pub fn app() -> Router {
    let store = Router::new()
        .route("/stores/{hash}/v3/catalog/products", get(list_products).post(create_product))
        .route(
            "/stores/{hash}/v3/catalog/products/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/stores/{hash}/v3/echo", any(echo))
        .route("/stores/{hash}/v3/throttled", get(throttled))
        .route("/stores/{hash}/v3/soft-error", get(soft_error))
        .route_layer(middleware::from_fn(require_token));

    Router::new()
        .route("/oauth2/token", post(issue_token))
        .merge(store)
        .with_state(AppState::default())
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn require_token(request: Request, next: Next) -> Response {
    if request.headers().get("x-auth-token").is_none() {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"status": 401, "title": "No auth token supplied"})),
        )
            .into_response();
    }
    next.run(request).await
}

async fn issue_token(Form(input): Form<TokenRequest>) -> Response {
    if input.code != VALID_CODE || input.grant_type != "authorization_code" {
        return (StatusCode::BAD_REQUEST, Json(json!({"error": "invalid_grant"}))).into_response();
    }
    Json(json!({
        "access_token": format!("token-for-{}", input.client_id),
        "scope": input.scope,
        "context": input.context,
        "redirect_uri": input.redirect_uri,
        "user": {"id": 1, "email": "owner@example.com"},
    }))
    .into_response()
}

async fn list_products(State(state): State<AppState>, Query(query): Query<ListQuery>) -> Json<Value> {
    let products = state.products.read().await;
    let data: Vec<Product> = products
        .values()
        .filter(|p| query.name.as_deref().is_none_or(|name| p.name == name))
        .take(query.limit.unwrap_or(usize::MAX))
        .cloned()
        .collect();
    Json(json!({"data": data, "meta": {"total": products.len()}}))
}

async fn create_product(State(state): State<AppState>, Json(input): Json<CreateProduct>) -> Response {
    if input.name.trim().is_empty() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"status": 422, "title": "name must not be empty"})),
        )
            .into_response();
    }
    let product = Product {
        id: state.next_id.fetch_add(1, Ordering::SeqCst) + 1,
        name: input.name,
        price: input.price,
        sku: input.sku,
    };
    state.products.write().await.insert(product.id, product.clone());
    (StatusCode::OK, Json(json!({"data": product}))).into_response()
}

async fn get_product(
    State(state): State<AppState>,
    Path((_hash, id)): Path<(String, u64)>,
) -> Response {
    match state.products.read().await.get(&id) {
        Some(product) => Json(json!({"data": product})).into_response(),
        None => not_found(),
    }
}

async fn update_product(
    State(state): State<AppState>,
    Path((_hash, id)): Path<(String, u64)>,
    Json(input): Json<UpdateProduct>,
) -> Response {
    let mut products = state.products.write().await;
    let Some(product) = products.get_mut(&id) else {
        return not_found();
    };
    if let Some(name) = input.name {
        product.name = name;
    }
    if let Some(price) = input.price {
        product.price = price;
    }
    if input.sku.is_some() {
        product.sku = input.sku;
    }
    Json(json!({"data": product})).into_response()
}

async fn delete_product(
    State(state): State<AppState>,
    Path((_hash, id)): Path<(String, u64)>,
) -> StatusCode {
    match state.products.write().await.remove(&id) {
        Some(_) => StatusCode::NO_CONTENT,
        None => StatusCode::NOT_FOUND,
    }
}

/// Reflects the request back so tests can check encoding and headers.
async fn echo(
    method: Method,
    Query(query): Query<BTreeMap<String, String>>,
    headers: HeaderMap,
    body: String,
) -> Json<Value> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string);
    let body = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&body).unwrap_or(Value::String(body))
    };
    Json(json!({
        "method": method.as_str(),
        "query": query,
        "headers": {
            "accept": header("accept"),
            "content-type": header("content-type"),
            "user-agent": header("user-agent"),
            "x-auth-client": header("x-auth-client"),
            "x-auth-token": header("x-auth-token"),
        },
        "body": body,
    }))
}

/// Answers 429 to the first request, 200 afterwards.
async fn throttled(State(state): State<AppState>) -> Response {
    let hits = state.throttled_hits.fetch_add(1, Ordering::SeqCst) + 1;
    if hits == 1 {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            [("X-Retry-After", "1")],
            Json(json!({"status": 429, "title": "Too many requests"})),
        )
            .into_response();
    }
    Json(json!({"data": {"hits": hits}})).into_response()
}

async fn soft_error() -> Json<Value> {
    Json(json!({"error": "Invalid field"}))
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"status": 404, "title": "The requested resource was not found."})),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_omits_missing_sku() {
        let product = Product {
            id: 1,
            name: "Shirt".to_string(),
            price: 19.5,
            sku: None,
        };
        let json = serde_json::to_value(&product).unwrap();
        assert_eq!(json, json!({"id": 1, "name": "Shirt", "price": 19.5}));
    }

    #[test]
    fn create_product_defaults_price() {
        let input: CreateProduct = serde_json::from_str(r#"{"name":"Mug"}"#).unwrap();
        assert_eq!(input.name, "Mug");
        assert_eq!(input.price, 0.0);
        assert!(input.sku.is_none());
    }

    #[test]
    fn create_product_rejects_missing_name() {
        let result: Result<CreateProduct, _> = serde_json::from_str(r#"{"price":1.0}"#);
        assert!(result.is_err());
    }

    #[test]
    fn update_product_all_fields_optional() {
        let input: UpdateProduct = serde_json::from_str("{}").unwrap();
        assert!(input.name.is_none());
        assert!(input.price.is_none());
        assert!(input.sku.is_none());
    }
}
