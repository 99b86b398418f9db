//! Mock Paper Cast backend served over real HTTP for integration tests.

#![allow(dead_code)]

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub const AUDIO_BYTES: &[u8] = b"ID3\x04\x00fake-mp3-payload";

pub const SEARCH_TEXT: &str = "Here are the papers I found:\n\n0: Attention Is All You Need - https://arxiv.org/abs/1706.03762\n1: BERT - https://arxiv.org/abs/1810.04805\n";

/// Everything the mock backend has been asked to do.
#[derive(Default)]
pub struct MockState {
    pub queries: Mutex<Vec<String>>,
    pub stored: Mutex<HashMap<String, String>>,
    /// `(identifier, t query parameter)` per synthesis request.
    pub audio_requests: Mutex<Vec<(String, Option<String>)>>,
    /// `(file name, byte count)` per upload.
    pub uploads: Mutex<Vec<(String, usize)>>,
}

impl MockState {
    pub fn audio_request_count(&self) -> usize {
        self.audio_requests.lock().unwrap().len()
    }
}

pub struct MockBackend {
    pub base_url: String,
    pub state: Arc<MockState>,
}

/// Start the mock backend on an ephemeral port.
pub async fn spawn_mock_backend() -> MockBackend {
    let state = Arc::new(MockState::default());
    let app = Router::new()
        .route("/health", get(handle_health))
        .route("/search", post(handle_search))
        .route("/summarize/{index}", get(handle_summarize))
        .route("/summarize-direct", post(handle_summarize_direct))
        .route("/upload-pdf", post(handle_upload))
        .route("/store-summary/{id}", post(handle_store))
        .route("/audio/{id}", post(handle_generate_audio).get(handle_get_audio))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockBackend {
        base_url: format!("http://{}", addr),
        state,
    }
}

/// A base URL nothing is listening on.
pub fn dead_base_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}

fn detail(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "detail": message }))).into_response()
}

async fn handle_health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn handle_search(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> String {
    let query = body["query"].as_str().unwrap_or_default().to_string();
    state.queries.lock().unwrap().push(query.clone());
    if query == "nothing" {
        return "No papers matched your query.".to_string();
    }
    SEARCH_TEXT.to_string()
}

async fn handle_summarize(Path(index): Path<String>) -> Response {
    match index.as_str() {
        "0" => "[SUMMARY] The Transformer relies entirely on attention.".into_response(),
        "1" => "[SUMMARY] BERT introduces...".into_response(),
        _ => detail(StatusCode::NOT_FOUND, format!("No paper at index {}", index)),
    }
}

async fn handle_summarize_direct(
    State(state): State<Arc<MockState>>,
    Json(body): Json<Value>,
) -> Response {
    let paper_id = body["paper_id"].as_str().unwrap_or_default().to_string();
    if paper_id == "plain" {
        // FastAPI-style JSON string literal without an identifier.
        return Json(json!("just a plain summary")).into_response();
    }
    let summary = format!("Direct summary of {}", paper_id);
    state
        .stored
        .lock()
        .unwrap()
        .insert(paper_id.clone(), summary.clone());
    format!("{}:{}", paper_id, summary).into_response()
}

async fn handle_upload(State(state): State<Arc<MockState>>, mut multipart: Multipart) -> Response {
    while let Some(field) = multipart.next_field().await.unwrap() {
        if field.name() == Some("file") {
            let name = field.file_name().unwrap_or_default().to_string();
            let data = field.bytes().await.unwrap();
            state.uploads.lock().unwrap().push((name, data.len()));
            state
                .stored
                .lock()
                .unwrap()
                .insert("pdf_7".to_string(), "Uploaded summary".to_string());
            return "pdf_7:Uploaded summary".into_response();
        }
    }
    detail(StatusCode::BAD_REQUEST, "file field missing".to_string())
}

async fn handle_store(
    State(state): State<Arc<MockState>>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let summary = body["summary"].as_str().unwrap_or_default().to_string();
    state.stored.lock().unwrap().insert(id, summary);
    Json(json!({ "status": "stored" }))
}

fn audio_for(state: &MockState, id: &str) -> Response {
    match id {
        "crash" => (StatusCode::INTERNAL_SERVER_ERROR, "TTS engine crashed").into_response(),
        "silent" => StatusCode::BAD_GATEWAY.into_response(),
        _ => {
            let known = id.parse::<u64>().is_ok() || state.stored.lock().unwrap().contains_key(id);
            if known {
                ([(header::CONTENT_TYPE, "audio/mpeg")], AUDIO_BYTES).into_response()
            } else {
                detail(StatusCode::NOT_FOUND, format!("Summary not found for ID {}", id))
            }
        }
    }
}

async fn handle_generate_audio(
    State(state): State<Arc<MockState>>,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    state
        .audio_requests
        .lock()
        .unwrap()
        .push((id.clone(), params.get("t").cloned()));
    audio_for(&state, &id)
}

async fn handle_get_audio(State(state): State<Arc<MockState>>, Path(id): Path<String>) -> Response {
    audio_for(&state, &id)
}
