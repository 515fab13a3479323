//! End-to-end tests against the live mock server.
//!
//! # Design
//! Each test starts its own mock server on a random port (fresh state), then
//! drives `Client` over real HTTP through `UreqTransport`.

use std::io::{Read, Write};
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use serde_json::{json, Value};
use storeapi_core::{Client, ClientConfig, Credentials, HttpMethod, ResponseBody};

const STORE: &str = "stores/abc123";

fn spawn_server() -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    addr
}

fn client(addr: SocketAddr, token: Option<&str>) -> Client {
    Client::with_config(
        Credentials::new(STORE, "client-id", "client-secret", token.map(str::to_string)),
        ClientConfig::with_base_url(&format!("http://{addr}")),
    )
}

#[test]
fn token_exchange_then_product_lifecycle() {
    let addr = spawn_server();
    let mut client = client(addr, None);

    // Step 1: exchange the authorization code.
    let token = client
        .get_access_token(mock_server::VALID_CODE, "store_v2_products", "https://app.test/cb")
        .expect("token exchange");
    assert_eq!(token, "token-for-client-id");
    assert_eq!(client.token(), Some("token-for-client-id"));

    // Step 2: list is empty.
    let resp = client.get("/v3/catalog/products", &()).unwrap();
    assert_eq!(resp.status_code(), 200);
    assert_eq!(resp.json().unwrap()["data"], json!([]));

    // Step 3: create.
    let resp = client
        .post("v3/catalog/products", &json!({"name": "Shirt", "price": 19.5}))
        .unwrap();
    let id = resp.json().unwrap()["data"]["id"].as_u64().unwrap();
    assert!(resp.headers.get("content-type").unwrap().starts_with("application/json"));

    // Step 4: update.
    let resp = client
        .put(&format!("v3/catalog/products/{id}"), &json!({"price": 21.0}))
        .unwrap();
    assert_eq!(resp.json().unwrap()["data"]["price"], 21.0);

    // Step 5: filtered list via query string.
    let resp = client
        .get("v3/catalog/products", &json!({"name": "Shirt", "limit": 5}))
        .unwrap();
    assert_eq!(resp.json().unwrap()["data"].as_array().unwrap().len(), 1);

    // Step 6: delete; the empty 204 body is kept raw.
    let resp = client
        .delete(&format!("v3/catalog/products/{id}"), &())
        .unwrap();
    assert_eq!(resp.status_code(), 204);

    // Step 7: get after delete is an API error carrying the response.
    let err = client
        .get(&format!("v3/catalog/products/{id}"), &())
        .unwrap_err();
    let api = err.as_api().expect("api error");
    assert_eq!(api.status_code(), 404);
    assert_eq!(api.status_message(), "Not Found");
    assert_eq!(api.method, HttpMethod::Get);
}

#[test]
fn bad_code_yields_no_token() {
    let addr = spawn_server();
    let mut client = client(addr, Some("old"));
    assert!(client
        .get_access_token("wrong-code", "store_v2_products", "https://app.test/cb")
        .is_none());
    assert_eq!(client.token(), Some("old"));
}

#[test]
fn get_and_delete_send_query_post_and_put_send_body() {
    let addr = spawn_server();
    let client = client(addr, Some("tok"));
    let params = json!({"page": 2, "name": "red shirt"});

    for method in [HttpMethod::Get, HttpMethod::Post, HttpMethod::Put, HttpMethod::Delete] {
        let resp = client.call(method, "v3/echo", &params).unwrap();
        let echo = resp.json().unwrap();
        assert_eq!(echo["method"], method.as_str());
        assert_eq!(echo["headers"]["accept"], "application/json");
        assert_eq!(echo["headers"]["x-auth-client"], "client-id");
        assert_eq!(echo["headers"]["x-auth-token"], "tok");
        assert!(echo["headers"]["user-agent"].as_str().unwrap().starts_with("storeapi-rust/"));
        if method.has_body() {
            assert_eq!(echo["query"], json!({}), "{method}");
            assert_eq!(echo["body"], params, "{method}");
            assert_eq!(echo["headers"]["content-type"], "application/json; charset=utf-8");
        } else {
            assert_eq!(echo["query"], json!({"page": "2", "name": "red shirt"}), "{method}");
            assert_eq!(echo["body"], Value::Null, "{method}");
        }
    }
}

#[test]
fn rate_limited_call_is_retried_and_result_propagated() {
    let addr = spawn_server();
    let client = client(addr, Some("tok"));

    let started = Instant::now();
    let resp = client.get("v3/throttled", &()).unwrap();
    assert!(started.elapsed() >= Duration::from_secs(1));
    assert_eq!(resp.status_code(), 200);
    assert_eq!(resp.json().unwrap()["data"]["hits"], 2);
}

#[test]
fn error_field_on_success_status_is_api_error() {
    let addr = spawn_server();
    let err = client(addr, Some("tok")).get("v3/soft-error", &()).unwrap_err();
    let api = err.as_api().expect("api error");
    assert_eq!(api.status_code(), 200);
    assert_eq!(api.error_message().as_deref(), Some("Invalid field"));
}

#[test]
fn missing_token_is_rejected_by_server() {
    let addr = spawn_server();
    let err = client(addr, None).get("v3/catalog/products", &()).unwrap_err();
    assert_eq!(err.as_api().unwrap().status_code(), 401);
}

#[test]
fn unreachable_server_is_transport_error() {
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let err = client(addr, Some("tok")).get("v3/catalog/products", &()).unwrap_err();
    assert!(err.is_transport(), "expected transport error, got {err}");
}

/// Serve one canned response (head + raw body bytes) on a random port.
fn serve_once(head: &'static str, body: &'static [u8]) -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = stream.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }
        let head = format!("{head}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n", body.len());
        stream.write_all(head.as_bytes()).unwrap();
        stream.write_all(body).unwrap();
    });

    addr
}

#[test]
fn non_utf8_success_body_is_kept_raw() {
    let addr = serve_once("HTTP/1.1 200 OK\r\nContent-Type: application/octet-stream", b"\xff\xfeA");
    let resp = client(addr, Some("tok")).get("v3/export", &()).unwrap();
    assert_eq!(resp.status_code(), 200);
    assert_eq!(resp.body, ResponseBody::Raw("\u{fffd}\u{fffd}A".to_string()));
}

#[test]
fn non_utf8_error_body_is_api_error() {
    let addr = serve_once("HTTP/1.1 500 Internal Server Error", b"\xff\xfeA");
    let err = client(addr, Some("tok")).get("v3/export", &()).unwrap_err();
    assert!(!err.is_transport(), "completed exchange reported as {err}");
    let api = err.as_api().expect("api error");
    assert_eq!(api.status_code(), 500);
    assert_eq!(api.body, ResponseBody::Raw("\u{fffd}\u{fffd}A".to_string()));
}
