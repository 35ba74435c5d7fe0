//! Integration tests for guest-to-account merges.

mod common;

use assert_matches::assert_matches;
use axum::http::StatusCode;
use common::{body_json, customer_token, get_auth, post_json, post_json_auth, seed_product};
use serde_json::json;
use sqlx::PgPool;
use storefront_api::config::LockBackend;

// ---------------------------------------------------------------------------
// Cart
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn cart_merge_runs_once_per_login(pool: PgPool) {
    let mug = seed_product(&pool, "Mug", 10.0, 20).await;
    let lamp = seed_product(&pool, "Lamp", 25.5, 3).await;
    let app = common::build_test_app(pool);
    let token = customer_token(1);

    post_json_auth(
        app.clone(),
        "/api/v1/cart/items",
        &token,
        json!({"product_id": mug, "quantity": 1}),
    )
    .await;

    let guest = json!({
        "items": [
            {"productId": mug, "product": {"price": "10.00"}, "quantity": 2},
            {"productId": lamp, "quantity": 1}
        ]
    });

    let response = post_json_auth(app.clone(), "/api/v1/cart/merge", &token, guest.clone()).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(
        json["data"],
        json!({"status": "merged", "added": 1, "updated": 1, "total": 2, "clear_guest": true})
    );

    // A second login hook inside the cooldown window is skipped.
    let json = body_json(post_json_auth(app.clone(), "/api/v1/cart/merge", &token, guest).await).await;
    assert_eq!(json["data"], json!({"status": "skipped", "reason": "locked"}));

    let cart = body_json(get_auth(app, "/api/v1/cart", &token).await).await;
    let items = cart["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["quantity"], 3);
    assert_eq!(cart["data"]["subtotal"], 55.5);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn empty_guest_cart_is_nothing_to_merge(pool: PgPool) {
    let app = common::build_test_app(pool);
    let token = customer_token(1);

    let body = json!({"items": [{"productId": 1, "quantity": 0}]});
    let json = body_json(post_json_auth(app.clone(), "/api/v1/cart/merge", &token, body).await).await;
    assert_eq!(json["data"]["status"], "skipped");
    assert_eq!(json["data"]["reason"], "nothing_to_merge");

    // No cooldown was started.
    let json = body_json(post_json_auth(app, "/api/v1/cart/merge", &token, json!({})).await).await;
    assert_eq!(json["data"]["reason"], "nothing_to_merge");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn replace_mode_overwrites_account_cart(pool: PgPool) {
    let mug = seed_product(&pool, "Mug", 10.0, 20).await;
    let lamp = seed_product(&pool, "Lamp", 25.5, 3).await;
    let app = common::build_test_app(pool);
    let token = customer_token(4);

    post_json_auth(
        app.clone(),
        "/api/v1/cart/items",
        &token,
        json!({"product_id": mug, "quantity": 5}),
    )
    .await;

    let body = json!({"mode": "replace", "items": [{"productId": lamp, "quantity": 2}]});
    let json = body_json(post_json_auth(app.clone(), "/api/v1/cart/merge", &token, body).await).await;
    assert_eq!(json["data"]["status"], "merged");
    assert_eq!(json["data"]["added"], 1);
    assert_eq!(json["data"]["total"], 1);

    let cart = body_json(get_auth(app, "/api/v1/cart", &token).await).await;
    let items = cart["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["product_id"], lamp);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn merge_requires_authentication(pool: PgPool) {
    let app = common::build_test_app(pool);

    let response = post_json(app, "/api/v1/cart/merge", json!({"items": []})).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// ---------------------------------------------------------------------------
// Wishlist
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn wishlist_merge_is_a_union(pool: PgPool) {
    let a = seed_product(&pool, "A", 1.0, 1).await;
    let b = seed_product(&pool, "B", 2.0, 1).await;
    let app = common::build_test_app(pool);
    let token = customer_token(2);

    post_json_auth(app.clone(), "/api/v1/wishlist/items", &token, json!({"product_id": a})).await;

    let body = json!({"items": [{"productId": a}, {"productId": b}, {"productId": b}]});
    let json = body_json(post_json_auth(app.clone(), "/api/v1/wishlist/merge", &token, body).await).await;
    assert_eq!(json["data"]["status"], "merged");
    assert_eq!(json["data"]["added"], 1);
    assert_eq!(json["data"]["updated"], 0);
    assert_eq!(json["data"]["total"], 2);

    // Cart and wishlist locks are independent.
    let body = json!({"items": [{"productId": a, "quantity": 1}]});
    let json = body_json(post_json_auth(app, "/api/v1/cart/merge", &token, body).await).await;
    assert_eq!(json["data"]["status"], "merged");
}

// ---------------------------------------------------------------------------
// Shared lock backend
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn postgres_lock_is_shared_between_instances(pool: PgPool) {
    let mug = seed_product(&pool, "Mug", 10.0, 20).await;
    let mut config = common::test_config();
    config.merge.backend = LockBackend::Postgres;
    let first = common::build_test_app_with(pool.clone(), config.clone());
    let second = common::build_test_app_with(pool, config);
    let token = customer_token(8);
    let body = json!({"items": [{"productId": mug, "quantity": 1}]});

    let json = body_json(post_json_auth(first, "/api/v1/cart/merge", &token, body.clone()).await).await;
    assert_eq!(json["data"]["status"], "merged");

    let json = body_json(post_json_auth(second, "/api/v1/cart/merge", &token, body).await).await;
    assert_matches!(json["data"]["reason"].as_str(), Some("locked"));
}
