//! In-process stand-in for the analysis backend.
//!
//! Serves canned JSON, multipart and event-stream responses on
//! `127.0.0.1:0` and records what the client sent.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use futures::StreamExt;
use serde_json::{json, Value};
use shadematch_client::api::ShadeMatchApi;

/// Colour id returned by `POST /colors`.
pub const CREATED_COLOR_ID: i64 = 11;

/// Stream ids with a scripted behaviour.
pub const STREAM_COMPLETES: i64 = CREATED_COLOR_ID;
pub const STREAM_ERRORS: i64 = 12;
pub const STREAM_ENDS_EARLY: i64 = 13;
pub const STREAM_REJECTED: i64 = 14;
pub const STREAM_HANGS: i64 = 15;
pub const STREAM_MALFORMED: i64 = 16;

/// One multipart part as received by the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedPart {
    pub field: String,
    pub file_name: String,
    pub content_type: String,
    pub size: usize,
}

#[derive(Debug, Default)]
pub struct Recorded {
    pub requests: usize,
    pub created: Vec<Value>,
    pub uploads: Vec<(i64, ReceivedPart)>,
    pub analyze_parts: Vec<ReceivedPart>,
    pub trained: Vec<i64>,
}

type Shared = Arc<Mutex<Recorded>>;

pub struct TestBackend {
    pub api: ShadeMatchApi,
    pub recorded: Shared,
}

impl TestBackend {
    pub fn requests(&self) -> usize {
        self.recorded.lock().unwrap().requests
    }
}

/// Start the stand-in backend and return a client pointed at it.
pub async fn spawn_backend() -> TestBackend {
    let recorded = Shared::default();
    let app = router(recorded.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestBackend {
        api: ShadeMatchApi::new(format!("http://{addr}")),
        recorded,
    }
}

fn router(recorded: Shared) -> Router {
    Router::new()
        .route("/colors", get(list_colors).post(create_color))
        .route("/colors/{id}", delete(delete_color))
        .route(
            "/colors/{id}/images",
            get(list_images).post(upload_image),
        )
        .route("/train/{id}", post(trigger_training))
        .route("/train/{id}/stream", get(training_stream))
        .route("/analyze", post(analyze))
        .route("/analyze-legacy", post(analyze_legacy))
        .route("/clear-cache", post(clear_cache))
        .route("/cache/stats", get(cache_stats))
        .with_state(recorded)
}

fn touch(recorded: &Shared) {
    recorded.lock().unwrap().requests += 1;
}

fn detail(status: StatusCode, detail: &str) -> Response {
    (status, Json(json!({ "detail": detail }))).into_response()
}

async fn read_parts(mut multipart: Multipart) -> Vec<ReceivedPart> {
    let mut parts = Vec::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let field_name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        let bytes = field.bytes().await.unwrap();
        parts.push(ReceivedPart {
            field: field_name,
            file_name,
            content_type,
            size: bytes.len(),
        });
    }
    parts
}

async fn list_colors(State(recorded): State<Shared>) -> Json<Value> {
    touch(&recorded);
    Json(json!([
        {"id": 1, "name": "#6 Brown", "description": "Warm mid brown", "status": "ready"},
        {"id": 2, "name": "Ash", "description": null, "status": "untrained"},
        {"id": 3, "name": "Copper", "status": "training"}
    ]))
}

async fn create_color(State(recorded): State<Shared>, Json(body): Json<Value>) -> Response {
    touch(&recorded);
    if body["name"] == "Duplicate" {
        return detail(StatusCode::BAD_REQUEST, "Color already exists");
    }
    recorded.lock().unwrap().created.push(body.clone());
    Json(json!({
        "id": CREATED_COLOR_ID,
        "name": body["name"],
        "description": body["description"],
        "status": "untrained"
    }))
    .into_response()
}

async fn delete_color(State(recorded): State<Shared>, Path(id): Path<i64>) -> Response {
    touch(&recorded);
    if id == 1 {
        StatusCode::NO_CONTENT.into_response()
    } else {
        detail(StatusCode::NOT_FOUND, "Color not found")
    }
}

async fn list_images(State(recorded): State<Shared>, Path(id): Path<i64>) -> Response {
    touch(&recorded);
    let count = match id {
        1 => 3,
        2 => 1,
        3 => 4,
        // Non-JSON error body.
        98 => return (StatusCode::BAD_GATEWAY, "<html>Bad Gateway</html>").into_response(),
        // JSON error body without `detail`.
        99 => {
            return (StatusCode::BAD_REQUEST, Json(json!({"error": "bad id"}))).into_response()
        }
        _ => return detail(StatusCode::NOT_FOUND, "Color not found"),
    };
    let images: Vec<Value> = (1..=count)
        .map(|i| json!({"id": id * 100 + i, "image_path": format!("/static/training/{id}/{i}.jpg")}))
        .collect();
    Json(Value::Array(images)).into_response()
}

async fn upload_image(
    State(recorded): State<Shared>,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Json<Value> {
    touch(&recorded);
    let parts = read_parts(multipart).await;
    let mut guard = recorded.lock().unwrap();
    for part in parts {
        guard.uploads.push((id, part));
    }
    let n = guard.uploads.len() as i64;
    Json(json!({"id": n, "image_path": format!("/static/training/{id}/{n}.jpg")}))
}

async fn trigger_training(State(recorded): State<Shared>, Path(id): Path<i64>) -> Json<Value> {
    touch(&recorded);
    recorded.lock().unwrap().trained.push(id);
    Json(json!({"message": format!("Training started for color {id}")}))
}

fn event_stream(body: Body) -> Response {
    ([(header::CONTENT_TYPE, "text/event-stream")], body).into_response()
}

fn frames(frames: &[&str]) -> Vec<Result<String, std::io::Error>> {
    frames.iter().map(|f| Ok(format!("data: {f}\n\n"))).collect()
}

async fn training_stream(State(recorded): State<Shared>, Path(id): Path<i64>) -> Response {
    touch(&recorded);
    match id {
        STREAM_COMPLETES => event_stream(Body::from_stream(futures::stream::iter(frames(&[
            r#"{"status":"training","percentage":25,"message":"Extracting features"}"#,
            r#"{"status":"training","percentage":75,"message":"Fitting model"}"#,
            r#"{"status":"complete","percentage":100}"#,
            r#"{"status":"training","percentage":99}"#,
        ])))),
        STREAM_ERRORS => event_stream(Body::from_stream(futures::stream::iter(frames(&[
            r#"{"status":"error","error":"disk full"}"#,
            r#"{"status":"training","percentage":50}"#,
        ])))),
        STREAM_ENDS_EARLY => event_stream(Body::from_stream(futures::stream::iter(frames(&[
            r#"{"status":"training","percentage":10}"#,
        ])))),
        STREAM_REJECTED => detail(StatusCode::INTERNAL_SERVER_ERROR, "Trainer unavailable"),
        STREAM_HANGS => event_stream(Body::from_stream(
            futures::stream::iter(frames(&[r#"{"status":"training","percentage":5}"#]))
                .chain(futures::stream::pending()),
        )),
        STREAM_MALFORMED => {
            let mut chunks = vec![
                Ok(": keep-alive\n\n".to_string()),
                Ok("data: {oops\n\n".to_string()),
                Ok("event: ping\ndata: {\"status\":\"training\"}\n\n".to_string()),
            ];
            chunks.extend(frames(&[
                r#"{"status":"training","percentage":40}"#,
                r#"{"status":"complete"}"#,
            ]));
            event_stream(Body::from_stream(futures::stream::iter(chunks)))
        }
        _ => detail(StatusCode::NOT_FOUND, "Color not found"),
    }
}

async fn analyze(State(recorded): State<Shared>, multipart: Multipart) -> Json<Value> {
    touch(&recorded);
    let parts = read_parts(multipart).await;
    let results: Vec<Value> = parts
        .iter()
        .enumerate()
        .map(|(i, part)| {
            json!({
                "image_index": i + 1,
                "filename": part.file_name,
                "cached": i > 0,
                "analysis_summary": {
                    "estimated_tone": "warm",
                    "estimated_level": 6,
                    "estimated_style": "solid"
                },
                "dominant_hair_colors": [
                    {"hex": "#7a4f35", "percentage": 61.4},
                    {"hex": "#5c3a26", "percentage": 22.1}
                ],
                "best_matches": [
                    {"color_id": 1, "name": "#6 Brown", "combined_score": 0.914},
                    {"color_id": 2, "name": "Ash", "combined_score": 0.52}
                ]
            })
        })
        .collect();
    let num_images = parts.len();
    recorded.lock().unwrap().analyze_parts.extend(parts);
    Json(json!({"num_images": num_images, "results": results}))
}

async fn analyze_legacy(State(recorded): State<Shared>, multipart: Multipart) -> Json<Value> {
    touch(&recorded);
    let parts = read_parts(multipart).await;
    let results: Vec<Value> = parts
        .iter()
        .map(|p| json!({"filename": p.file_name, "closest_shade": "Ash Blonde"}))
        .collect();
    Json(Value::Array(results))
}

async fn clear_cache(State(recorded): State<Shared>) -> Json<Value> {
    touch(&recorded);
    Json(json!({"message": "Cache cleared"}))
}

async fn cache_stats(State(recorded): State<Shared>) -> Json<Value> {
    touch(&recorded);
    Json(json!({"cached_results": 3}))
}
