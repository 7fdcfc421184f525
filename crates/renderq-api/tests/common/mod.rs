use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, Response, header};
use http_body_util::BodyExt;
use renderq_api::{AppState, routes};
use renderq_db::MemoryJobRepo;
use renderq_tracker::{ChangeNotifier, JobTracker};
use serde_json::Value;
use tower::ServiceExt;

/// Build the application router over a fresh in-memory store of `total` jobs.
///
/// The tracker is returned as well so tests can arrange state directly.
pub async fn build_test_app(total: i64) -> (Router, Arc<JobTracker>) {
    let tracker = JobTracker::new(Arc::new(MemoryJobRepo::new()), ChangeNotifier::default());
    tracker.initialize(total).await.unwrap();
    let tracker = Arc::new(tracker);
    let app = routes::router(AppState::new(tracker.clone()));
    (app, tracker)
}

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

pub async fn post(app: &Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

pub async fn post_json(app: &Router, uri: &str, body: Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

/// POST a raw body with an explicit content type.
pub async fn post_raw(app: &Router, uri: &str, content_type: &str, body: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body.to_string()))
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
