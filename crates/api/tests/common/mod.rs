#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use storefront_api::auth::jwt::{generate_access_token, JwtConfig};
use storefront_api::config::{MergeSettings, ServerConfig};
use storefront_api::router::build_app_router;
use storefront_api::state::AppState;
use storefront_core::roles::{ROLE_ADMIN, ROLE_CUSTOMER};

/// Build a test `ServerConfig` with safe defaults and the in-memory lock
/// backend.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            access_token_expiry_mins: 15,
        },
        merge: MergeSettings::default(),
    }
}

/// Build the full application router (same middleware stack as `main.rs`).
pub fn build_test_app(pool: PgPool) -> Router {
    build_test_app_with(pool, test_config())
}

pub fn build_test_app_with(pool: PgPool, config: ServerConfig) -> Router {
    let state = AppState::new(pool, config.clone());
    build_app_router(state, &config)
}

/// Bearer token for a customer account.
pub fn customer_token(user_id: i64) -> String {
    generate_access_token(user_id, ROLE_CUSTOMER, &test_config().jwt).unwrap()
}

/// Bearer token for an admin account.
pub fn admin_token(user_id: i64) -> String {
    generate_access_token(user_id, ROLE_ADMIN, &test_config().jwt).unwrap()
}

/// Insert an active product and return its id.
pub async fn seed_product(pool: &PgPool, name: &str, price: f64, stock: i32) -> i64 {
    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO products (name, price, stock) VALUES ($1, $2::numeric, $3) RETURNING id",
    )
    .bind(name)
    .bind(price)
    .bind(stock)
    .fetch_one(pool)
    .await
    .unwrap();
    id
}

/// Insert a coupon.
pub async fn seed_coupon(pool: &PgPool, code: &str, kind: &str, value: f64, active: bool) {
    sqlx::query(
        "INSERT INTO coupons (code, discount_type, discount_value, is_active) \
         VALUES ($1, $2, $3::numeric, $4)",
    )
    .bind(code)
    .bind(kind)
    .bind(value)
    .bind(active)
    .execute(pool)
    .await
    .unwrap();
}

/// Send a request with an optional bearer token and JSON body.
pub async fn send(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None, None).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::GET, uri, Some(token), None).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, Method::POST, uri, None, Some(body)).await
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    send(app, Method::POST, uri, Some(token), Some(body)).await
}

pub async fn put_json_auth(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    send(app, Method::PUT, uri, Some(token), Some(body)).await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::DELETE, uri, Some(token), None).await
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
