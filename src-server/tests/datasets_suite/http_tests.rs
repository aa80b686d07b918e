// FICHIER : src-server/tests/datasets_suite/http_tests.rs

use crate::init_test_env;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use safd::api::http::router;
use safd::utils::json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

async fn body_json(resp: axum::response::Response) -> Value {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_route() {
    let env = init_test_env().await;
    let app = router(Arc::new(env.engine.clone()));

    let resp = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, json!({"status": "ok"}));
}

#[tokio::test]
async fn save_and_load_over_http() {
    let env = init_test_env().await;
    let app = router(Arc::new(env.engine.clone()));
    let hydrants = json!([{"id": 1, "lng": 1.0, "lat": 2.0}, {"id": 2, "lng": 3.0, "lat": 4.0}]);

    let resp = app
        .clone()
        .oneshot(
            Request::post("/api/data?action=save&type=hydrants")
                .header("content-type", "application/json")
                .header("x-forwarded-for", "203.0.113.5, 10.0.0.1")
                .body(Body::from(hydrants.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["count"], 2);

    let resp = app
        .oneshot(
            Request::get("/api/data?action=load&type=hydrants")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(body_json(resp).await["data"], hydrants);

    let log = std::fs::read_to_string(env.file("activity.log")).unwrap();
    assert!(log.contains("SUCCESS: SAVE - hydrants - IP: 203.0.113.5 - 2 items"));
    assert!(log.contains("SUCCESS: LOAD - hydrants - IP: unknown - file"));
}

#[tokio::test]
async fn error_statuses_over_http() {
    let env = init_test_env().await;
    let app = router(Arc::new(env.engine.clone()));

    let cases = [
        ("GET", "/api/data?action=load&type=nope", Body::empty(), StatusCode::BAD_REQUEST),
        ("GET", "/api/data?action=dance", Body::empty(), StatusCode::BAD_REQUEST),
        ("POST", "/api/data?action=save&type=hydrants", Body::empty(), StatusCode::BAD_REQUEST),
        (
            "PUT",
            "/api/data?action=restore_backup",
            Body::from(r#"{"filename": "backup_full_none.json"}"#),
            StatusCode::NOT_FOUND,
        ),
        ("PATCH", "/api/data?action=load", Body::empty(), StatusCode::METHOD_NOT_ALLOWED),
    ];

    for (method, uri, body, expected) in cases {
        let resp = app
            .clone()
            .oneshot(Request::builder().method(method).uri(uri).body(body).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), expected, "{method} {uri}");
        let body = body_json(resp).await;
        assert!(body["error"].is_string(), "{method} {uri}");
        assert!(body.get("success").is_none());
    }
}

#[tokio::test]
async fn cors_headers_present() {
    let env = init_test_env().await;
    let app = router(Arc::new(env.engine.clone()));

    let resp = app
        .oneshot(
            Request::get("/api/data?action=stats")
                .header("origin", "http://localhost:5173")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );
}
