//! Integration tests for the admin merge-lock endpoints.

mod common;

use axum::http::StatusCode;
use common::{admin_token, body_json, customer_token, get_auth, post_json_auth, seed_product};
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "../../db/migrations")]
async fn customers_cannot_use_admin_routes(pool: PgPool) {
    let app = common::build_test_app(pool);

    let response = get_auth(app, "/api/v1/admin/merge-locks/1", &customer_token(1)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["code"], "FORBIDDEN");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn lock_status_reports_both_domains(pool: PgPool) {
    let app = common::build_test_app(pool);

    let response = get_auth(app, "/api/v1/admin/merge-locks/7", &admin_token(100)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["data"],
        json!({"user_id": 7, "cart": false, "wishlist": false})
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn release_all_reports_released_domains(pool: PgPool) {
    let mug = seed_product(&pool, "Mug", 10.0, 20).await;
    let app = common::build_test_app(pool);
    let admin = admin_token(100);

    // A completed merge leaves a cooldown but no hold.
    let customer = customer_token(7);
    let body = json!({"items": [{"productId": mug, "quantity": 1}]});
    post_json_auth(app.clone(), "/api/v1/cart/merge", &customer, body.clone()).await;

    let response = post_json_auth(
        app.clone(),
        "/api/v1/admin/merge-locks/release-all",
        &admin,
        json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["data"]["released"],
        json!(["cart", "wishlist"])
    );

    // Cooldown history survives a release-all.
    let json = body_json(post_json_auth(app, "/api/v1/cart/merge", &customer, body).await).await;
    assert_eq!(json["data"]["reason"], "locked");
}
