//! Tests for the health report across all tenant transports.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{body::Body, http::Request, http::StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use examgate::store::DataAccessStrategy;

mod common;
use common::*;

async fn read_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).expect("response should be valid JSON")
}

fn get_health() -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_health_reports_connected_tenants() {
    let harness = TestHarness::new();
    harness.aprobado.seed_question(1, Some("señales"), None, "a");
    harness.aprobado.seed_question(2, Some("señales"), None, "b");
    harness
        .aprobado
        .seed_user("maria@example.com", TOKEN_A, "pi_1");

    let response = harness.app().oneshot(get_health()).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = read_json(response).await;
    assert_eq!(json["status"], json!("ok"));
    assert_eq!(json["service"], json!("examgate"));
    assert!(json["version"].is_string());
    assert!(json["timestamp"].is_string());

    let tenants = json["tenants"].as_object().unwrap();
    assert_eq!(tenants.len(), 3, "every registered tenant is probed");

    let aprobado = &json["tenants"]["aprobado"];
    assert_eq!(aprobado["status"], json!("connected"));
    assert_eq!(aprobado["transport"], json!("memory"));
    assert!(aprobado.as_object().unwrap().get("error").is_none());
    assert_eq!(aprobado["counts"]["questions"], json!(2));
    assert_eq!(aprobado["counts"]["users"], json!(1));
    assert_eq!(aprobado["counts"]["sessions"], json!(0));

    assert_eq!(json["config"]["stripe_configured"], json!(true));
    assert_eq!(json["config"]["mail_configured"], json!(true));
}

#[tokio::test]
async fn test_health_degrades_when_a_tenant_is_down() {
    let down: Arc<dyn DataAccessStrategy> = Arc::new(DownStrategy);
    let mut overrides: HashMap<&'static str, Arc<dyn DataAccessStrategy>> = HashMap::new();
    overrides.insert("ciudadania", down);
    let harness = TestHarness::with_strategies(overrides);

    let response = harness.app().oneshot(get_health()).await.unwrap();

    assert_eq!(
        response.status(),
        StatusCode::OK,
        "the report itself stays 200 so probes can read the detail"
    );
    let json = read_json(response).await;
    assert_eq!(json["status"], json!("degraded"));

    let ciudadania = &json["tenants"]["ciudadania"];
    assert_eq!(ciudadania["status"], json!("error"));
    assert!(ciudadania["error"].is_string());
    assert!(
        ciudadania.as_object().unwrap().get("counts").is_none(),
        "a dead tenant reports no counts"
    );

    assert_eq!(json["tenants"]["aprobado"]["status"], json!("connected"));
}

#[tokio::test]
async fn test_health_rejects_other_methods() {
    let harness = TestHarness::new();

    let response = harness
        .app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}
