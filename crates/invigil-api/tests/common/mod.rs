//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use invigil_core::clock::Clock;
use invigil_core::notify::TrackingLinks;
use invigil_resolution::domain::policy::SweepPolicy;
use invigil_test_support::{FixedClock, RecordingNotifier};
use sqlx::PgPool;
use tower::ServiceExt;

use invigil_api::routes;
use invigil_api::state::AppState;

/// Fixed timestamp used across all integration tests.
pub fn fixed_clock() -> FixedClock {
    FixedClock::at(2026, 1, 15, 10, 0)
}

/// Build the full app router over the `PostgreSQL` stores with a fixed
/// clock. Uses the same route structure as `main.rs`.
pub fn build_test_app(pool: PgPool) -> Router {
    build_test_app_at(pool, fixed_clock())
}

/// Like [`build_test_app`], with the clock at `clock`.
pub fn build_test_app_at(pool: PgPool, clock: FixedClock) -> Router {
    let clock: Arc<dyn Clock> = Arc::new(clock);
    let app_state = AppState::postgres(
        pool,
        clock,
        Arc::new(RecordingNotifier::default()),
        TrackingLinks::new("https://desk.example/track"),
        SweepPolicy::default(),
    );
    routes::api_router().with_state(app_state)
}

/// Inserts an active user.
pub async fn seed_user(pool: &PgPool, id: &str) {
    sqlx::query("INSERT INTO users (id, display_name, is_active) VALUES ($1, $2, TRUE)")
        .bind(id)
        .bind(format!("User {id}"))
        .execute(pool)
        .await
        .unwrap();
}

/// A ticket submission body acting as an admin.
pub fn new_ticket_body(description: &str) -> serde_json::Value {
    serde_json::json!({
        "actor_id": "ops-1",
        "actor_role": "admin",
        "category": "Venue",
        "severity": "sev2",
        "description": description,
        "city": "Pune",
        "centre_code": "PN-014",
        "submitted_by": "reporter-1",
    })
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = if body_bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap()
    };

    (status, json)
}

fn json_request(method: &str, uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    send(app, json_request("POST", uri, body)).await
}

/// Send a DELETE request with a JSON body and return the response.
pub async fn delete_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    send(app, json_request("DELETE", uri, body)).await
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    send(app, request).await
}
