mod common;

use std::sync::Arc;
use std::time::Instant;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use common::{centered_face, harness, photo, Harness};
use facetag::api::{create_rest_router, AppState};

const BOUNDARY: &str = "facetag-test-boundary";

fn router(h: &Harness) -> Router {
    let state = Arc::new(AppState {
        service: h.service.clone(),
        start_time: Instant::now(),
    });
    create_rest_router(state, 10)
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn multipart(field: &str, data: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"photo.png\"\r\n",
            field
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: image/png\r\n\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::post("/api/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let h = harness().await;
    let app = router(&h);

    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["healthy"], true);
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_upload_and_claim_over_http() {
    let h = harness().await;
    let app = router(&h);
    h.engine.script(vec![centered_face()], vec![vec![0.0, 0.0]]);

    let (status, body) = send(&app, multipart("image", &photo([90, 120, 30]))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Processed 1 faces");
    let result = &body["results"][0];
    assert_eq!(result["name"], "Person not found");
    assert_eq!(result["confidence"], 0);
    assert_eq!(result["face_position"], json!([50, 150, 150, 50]));
    assert!(result["face_image"]
        .as_str()
        .unwrap()
        .starts_with("data:image/jpeg;base64,"));
    let face_id = result["id"].as_str().unwrap().to_string();

    let (status, body) = send(&app, get("/api/persons")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["unrecognized"], json!([face_id]));

    let (status, body) = send(
        &app,
        post_json("/api/person/create", json!({ "faceId": face_id, "name": "Alice" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["person"], "Alice");
    assert_eq!(body["message"], "Added face to person: Alice");

    let (_, body) = send(&app, get("/api/persons")).await;
    assert_eq!(body["persons"], json!(["Alice"]));
    assert_eq!(body["unrecognized"], json!([]));

    let (status, body) = send(
        &app,
        post_json("/api/person/delete", json!({ "personName": "Alice" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Successfully deleted person: Alice");
}

#[tokio::test]
async fn test_upload_rejections() {
    let h = harness().await;
    let app = router(&h);

    let (status, body) = send(&app, multipart("file", b"irrelevant")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No image provided");

    h.engine.script(vec![], vec![]);
    let (status, body) = send(&app, multipart("image", &photo([0, 0, 0]))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "NO_FACES_DETECTED");
}

#[tokio::test]
async fn test_missing_fields_and_unknown_ids() {
    let h = harness().await;
    let app = router(&h);

    let (status, body) = send(&app, post_json("/api/person/create", json!({ "faceId": "x" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required fields");

    let (status, _) = send(&app, post_json("/api/person/add", json!({ "faceId": "x", "personName": " " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        post_json("/api/person/create", json!({ "faceId": "missing", "name": "Alice" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    let (status, _) = send(&app, post_json("/api/face/delete", json!({ "faceId": "missing" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        post_json("/api/face/delete-from-person", json!({ "personName": "Nobody", "faceId": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_bulk_deletes_on_empty_gallery() {
    let h = harness().await;
    let app = router(&h);

    let (status, body) = send(&app, post_json("/api/persons/delete-all", json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);
    assert_eq!(body["message"], "Successfully deleted 0 persons");

    let (status, body) = send(&app, post_json("/api/faces/delete-all", json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Successfully deleted 0 unrecognized faces");
}

#[tokio::test]
async fn test_history_round_trip() {
    let h = harness().await;
    let app = router(&h);

    let (status, body) = send(&app, get("/api/history")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["image_history"], json!([]));

    let (status, body) = send(&app, post_json("/api/history", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No data provided");

    let doc = json!({
        "image_history": [{ "src": "a.jpg" }],
        "recognized_persons": ["Alice"],
        "unrecognized_persons": []
    });
    let (status, body) = send(&app, post_json("/api/history", doc.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "History saved successfully");

    let (_, body) = send(&app, get("/api/history")).await;
    assert_eq!(body, doc);

    let (status, body) = send(&app, post_json("/api/history/delete-all", json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (_, body) = send(&app, get("/api/history")).await;
    assert_eq!(body["recognized_persons"], json!([]));
}
