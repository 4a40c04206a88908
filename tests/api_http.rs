// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET /health
// - GET /evaluation (missing url, multiple urls, unreachable source)

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value as Json};
use tower::ServiceExt as _; // for `oneshot`

use speech_evaluator::api;
use speech_evaluator::config::EvaluationConfig;
use speech_evaluator::ingest::providers::FixtureResolver;
use speech_evaluator::Pipeline;

const BODY_LIMIT: usize = 1024 * 1024; // 1MB, safe for tests

fn test_router() -> Router {
    let resolver = FixtureResolver::new()
        .with_body(
            "http://one.test/a.csv",
            "Redner,Thema,Datum,Wörter\nAlexander Abel,Bildungspolitik,2012-10-30,5310\nBernhard Belling,Kohlesubventionen,2012-11-05,1210\n",
        )
        .with_body(
            "http://two.test/b.csv",
            "Redner,Thema,Datum,Wörter\nCaesare Collins,Kohlesubventionen,2012-11-06,1119\nAlexander Abel,Innere Sicherheit,2013-10-10,911\n",
        );
    api::router(Pipeline::new(Arc::new(resolver), EvaluationConfig::default()))
}

async fn get(app: Router, uri: &str) -> (StatusCode, Option<String>, Json) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build GET");
    let resp = app.oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let ctype = resp
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string);
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    let v = serde_json::from_slice(&bytes).unwrap_or(Json::Null);
    (status, ctype, v)
}

#[tokio::test]
async fn api_health_returns_200_and_ok_body() {
    let req = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .expect("build GET /health");
    let resp = test_router().oneshot(req).await.expect("oneshot /health");
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    assert_eq!(String::from_utf8_lossy(&bytes).trim(), "ok");
}

#[tokio::test]
async fn evaluation_without_url_is_bad_request() {
    let (status, _, v) = get(test_router(), "/evaluation").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(v.get("error").is_some(), "missing 'error': {v}");

    let (status, _, _) = get(test_router(), "/evaluation?other=x").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn evaluation_over_two_sources_returns_snapshot_json() {
    let (status, ctype, v) = get(
        test_router(),
        "/evaluation?url=http%3A%2F%2Fone.test%2Fa.csv&url=http%3A%2F%2Ftwo.test%2Fb.csv",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ctype.as_deref(), Some("application/json"));
    assert_eq!(
        v,
        json!({
            "mostSpeeches": "Alexander Abel",
            "mostOnTopic": "Alexander Abel",
            "leastWordy": "Caesare Collins",
            "errors": []
        })
    );
}

#[tokio::test]
async fn unreachable_source_is_reported_not_fatal() {
    let (status, _, v) = get(
        test_router(),
        "/evaluation?url=http%3A%2F%2Fone.test%2Fa.csv&url=http%3A%2F%2Fnowhere.test%2Fx.csv",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["mostSpeeches"], Json::Null);
    assert_eq!(v["leastWordy"], json!("Bernhard Belling"));
    let errors = v["errors"].as_array().expect("errors array");
    assert_eq!(errors.len(), 1);
    assert!(errors[0].as_str().unwrap().contains("nowhere.test"));
}
