//! Integration tests for the product CRUD routes.

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    response::Response,
    Router,
};
use product_metrics_service::app::{build_router, init_state};
use product_metrics_service::config::Config;
use product_metrics_service::product::Product;
use serde_json::Value;
use tower::ServiceExt;

fn app() -> Router {
    let (state, _process) = init_state(Config::default()).unwrap();
    build_router(state)
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_create_single_product() {
    let app = app();
    let response = app
        .oneshot(json_request(
            "POST",
            "/products",
            r#"{"name":"pen","price":1.5,"amount":3}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let product: Product = serde_json::from_value(json_body(response).await).unwrap();
    assert_eq!(product.id, 1);
    assert_eq!(product.name, "pen");
}

#[tokio::test]
async fn test_create_batch_returns_list() {
    let app = app();
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/products/",
            r#"[{"name":"pen","price":1.5,"amount":3},{"name":"ink","price":2.0,"amount":1}]"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    assert_eq!(body.as_array().map(|a| a.len()), Some(2));

    let response = app.oneshot(empty_request("GET", "/products")).await.unwrap();
    let list: Vec<Product> = serde_json::from_value(json_body(response).await).unwrap();
    assert_eq!(
        list.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
        ["pen", "ink"]
    );
}

#[tokio::test]
async fn test_negative_values_rejected_without_side_effects() {
    let app = app();
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/products",
            r#"[{"name":"ok","price":1.0,"amount":1},{"name":"bad","price":-1.0,"amount":1}]"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await["detail"],
        "Negative values not allowed"
    );

    let response = app.oneshot(empty_request("GET", "/products")).await.unwrap();
    assert_eq!(json_body(response).await, Value::Array(vec![]));
}

#[tokio::test]
async fn test_update_and_delete() {
    let app = app();
    app.clone()
        .oneshot(json_request(
            "POST",
            "/products",
            r#"{"name":"pen","price":1.5,"amount":3}"#,
        ))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(json_request("PUT", "/products/1", r#"{"amount":10}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let product: Product = serde_json::from_value(json_body(response).await).unwrap();
    assert_eq!(product.amount, 10);
    assert_eq!(product.name, "pen");

    let response = app
        .clone()
        .oneshot(empty_request("DELETE", "/products/1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/products/1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(empty_request("DELETE", "/products/1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_can_be_disabled() {
    let app_enabled = app();
    let response = app_enabled
        .oneshot(empty_request("GET", "/health"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let (state, _process) = init_state(Config {
        enable_health: Some(false),
        ..Config::default()
    })
    .unwrap();
    let response = build_router(state)
        .oneshot(empty_request("GET", "/health"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
