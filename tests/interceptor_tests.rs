//! Integration tests for the request metrics middleware.
//!
//! These tests drive the full router with `tower::ServiceExt::oneshot` and
//! inspect the shared registry afterwards.

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    routing::get,
    Router,
};
use product_metrics_service::app::{build_router, init_state, instrumented, METRICS_PATH};
use product_metrics_service::config::Config;
use product_metrics_service::handlers::metrics_handler;
use product_metrics_service::state::SharedState;
use std::sync::Arc;
use tokio::sync::Notify;
use tower::ServiceExt;

fn setup() -> (SharedState, Router) {
    let (state, _process) = init_state(Config::default()).expect("metrics init");
    let app = build_router(state.clone());
    (state, app)
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn boom() -> &'static str {
    panic!("handler exploded");
}

#[tokio::test]
async fn test_successful_request_is_counted() {
    let (state, app) = setup();

    let response = app.oneshot(get_request("/products")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "[]");

    let m = &state.http_metrics;
    assert_eq!(
        m.requests_total.get(&["GET", "/products", "200"]).unwrap(),
        1.0
    );
    assert_eq!(
        m.request_duration_seconds
            .sample_count(&["/products"])
            .unwrap(),
        1
    );
    assert_eq!(m.response_size_bytes.sample_sum(&["/products"]).unwrap(), 2.0);
}

#[tokio::test]
async fn test_handler_status_is_recorded_verbatim() {
    let (state, app) = setup();

    let response = app.oneshot(get_request("/products/42")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        body_string(response).await,
        r#"{"detail":"Product not found"}"#
    );

    assert_eq!(
        state
            .http_metrics
            .requests_total
            .get(&["GET", "/products/{id}", "404"])
            .unwrap(),
        1.0
    );
}

#[tokio::test]
async fn test_request_and_response_sizes() {
    let (state, app) = setup();
    let payload = r#"{"name":"pen","price":1.5,"amount":3}"#;

    let request = Request::builder()
        .method("POST")
        .uri("/products")
        .header("content-type", "application/json")
        .body(Body::from(payload))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_string(response).await;

    let m = &state.http_metrics;
    assert_eq!(
        m.requests_total.get(&["POST", "/products", "201"]).unwrap(),
        1.0
    );
    assert_eq!(
        m.request_size_bytes.sample_sum(&["/products"]).unwrap(),
        payload.len() as f64
    );
    assert_eq!(
        m.response_size_bytes.sample_sum(&["/products"]).unwrap(),
        body.len() as f64
    );
}

#[tokio::test]
async fn test_panicking_handler_records_500_and_propagates() {
    let (state, _process) = init_state(Config::default()).unwrap();
    let app = Router::new()
        .route(METRICS_PATH, get(metrics_handler))
        .merge(instrumented(
            Router::new().route("/boom", get(boom)),
            &state,
        ))
        .with_state(state.clone());

    let result = tokio::spawn(app.oneshot(get_request("/boom"))).await;
    match result {
        Ok(_) => panic!("the panic must reach the caller"),
        Err(e) => assert!(e.is_panic()),
    }

    let m = &state.http_metrics;
    assert_eq!(m.requests_total.get(&["GET", "/boom", "500"]).unwrap(), 1.0);
    assert_eq!(m.request_duration_seconds.sample_count(&["/boom"]).unwrap(), 1);
    assert_eq!(m.response_size_bytes.sample_count(&["/boom"]).unwrap(), 0);
}

#[tokio::test]
async fn test_dropped_request_records_client_closed() {
    let (state, _process) = init_state(Config::default()).unwrap();
    let started = Arc::new(Notify::new());
    let entered = started.clone();
    let stall = get(move || {
        let entered = entered.clone();
        async move {
            entered.notify_one();
            std::future::pending::<&'static str>().await
        }
    });
    let app = instrumented(Router::new().route("/stall", stall), &state).with_state(state.clone());

    let task = tokio::spawn(app.oneshot(get_request("/stall")));
    started.notified().await;
    task.abort();
    match task.await {
        Ok(_) => panic!("the stalled request must not complete"),
        Err(e) => assert!(e.is_cancelled()),
    }

    let m = &state.http_metrics;
    assert_eq!(m.requests_total.get(&["GET", "/stall", "499"]).unwrap(), 1.0);
    assert_eq!(m.requests_total.get(&["GET", "/stall", "500"]).unwrap(), 0.0);
    assert_eq!(m.request_duration_seconds.sample_count(&["/stall"]).unwrap(), 1);
}

#[tokio::test]
async fn test_scrapes_are_not_measured() {
    let (state, app) = setup();

    app.clone().oneshot(get_request("/")).await.unwrap();
    for _ in 0..3 {
        let response = app.clone().oneshot(get_request(METRICS_PATH)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app.oneshot(get_request(METRICS_PATH)).await.unwrap();
    let text = body_string(response).await;

    assert!(text.contains(r#"http_requests_total{endpoint="/",method="GET",status_code="200"} 1"#));
    assert!(!text.contains(r#"endpoint="/metrics""#));
    assert_eq!(
        state
            .http_metrics
            .request_duration_seconds
            .sample_count(&[METRICS_PATH])
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn test_concurrent_requests_are_all_counted() {
    let (state, app) = setup();

    let tasks: Vec<_> = (0..50)
        .map(|_| {
            let app = app.clone();
            tokio::spawn(async move { app.oneshot(get_request("/products")).await.unwrap() })
        })
        .collect();
    for task in tasks {
        assert_eq!(task.await.unwrap().status(), StatusCode::OK);
    }

    assert_eq!(
        state
            .http_metrics
            .requests_total
            .get(&["GET", "/products", "200"])
            .unwrap(),
        50.0
    );
}
