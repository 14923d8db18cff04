//! In-process Bot API double for tests.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use {
    axum::{
        Json, Router,
        body::Bytes,
        extract::State,
        http::{StatusCode, Uri},
        routing::post,
    },
    serde_json::{Value, json},
    teloxide::Bot,
};

pub const TOKEN: &str = "123:test-token";

#[derive(Debug, Clone)]
pub struct Captured {
    pub method: String,
    /// JSON body, or `Null` for multipart uploads.
    pub body: Value,
    pub raw: String,
}

#[derive(Clone, Default)]
pub struct MockTelegramApi {
    requests: Arc<Mutex<Vec<Captured>>>,
    results: Arc<Mutex<HashMap<String, Value>>>,
    failures: Arc<Mutex<HashMap<String, String>>>,
    files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MockTelegramApi {
    pub fn with_result(self, method: &str, result: Value) -> Self {
        self.results
            .lock()
            .unwrap()
            .insert(method.to_string(), result);
        self
    }

    /// Answer `method` with `{"ok": false}` and the given description.
    pub fn failing(self, method: &str, description: &str) -> Self {
        self.failures
            .lock()
            .unwrap()
            .insert(method.to_string(), description.to_string());
        self
    }

    /// Serve `bytes` at `file/bot<token>/<path>`.
    pub fn with_file(self, path: &str, bytes: &[u8]) -> Self {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), bytes.to_vec());
        self
    }

    pub fn requests(&self) -> Vec<Captured> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_for(&self, method: &str) -> Vec<Value> {
        self.requests()
            .into_iter()
            .filter(|c| c.method == method)
            .map(|c| c.body)
            .collect()
    }

    pub fn methods(&self) -> Vec<String> {
        self.requests().into_iter().map(|c| c.method).collect()
    }
}

fn channel_message() -> Value {
    json!({
        "message_id": 1,
        "date": 0,
        "chat": {"id": -100_999, "type": "channel", "title": "Destination"}
    })
}

fn default_result(method: &str) -> Value {
    match method {
        "GetMe" => json!({
            "id": 1,
            "is_bot": true,
            "first_name": "Relay",
            "username": "relay_bot",
            "can_join_groups": false,
            "can_read_all_group_messages": false,
            "supports_inline_queries": false
        }),
        "DeleteWebhook" => json!(true),
        "SendMediaGroup" => json!([channel_message()]),
        _ => channel_message(),
    }
}

async fn api_handler(
    State(state): State<MockTelegramApi>,
    uri: Uri,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    let method = uri.path().rsplit('/').next().unwrap_or_default().to_string();
    let raw = String::from_utf8_lossy(&body).to_string();
    let parsed = serde_json::from_slice(&body).unwrap_or(Value::Null);
    state.requests.lock().unwrap().push(Captured {
        method: method.clone(),
        body: parsed,
        raw,
    });

    if let Some(description) = state.failures.lock().unwrap().get(&method) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"ok": false, "error_code": 400, "description": description})),
        );
    }

    let result = state
        .results
        .lock()
        .unwrap()
        .get(&method)
        .cloned()
        .unwrap_or_else(|| default_result(&method));
    (StatusCode::OK, Json(json!({"ok": true, "result": result})))
}

async fn file_handler(State(state): State<MockTelegramApi>, uri: Uri) -> (StatusCode, Vec<u8>) {
    let prefix = format!("/file/bot{TOKEN}/");
    let path = uri.path().strip_prefix(&prefix).unwrap_or_default();
    match state.files.lock().unwrap().get(path) {
        Some(bytes) => (StatusCode::OK, bytes.clone()),
        None => (StatusCode::NOT_FOUND, Vec::new()),
    }
}

/// Start the double and return a bot pointed at it.
pub async fn start_mock(api: MockTelegramApi) -> Bot {
    let app = Router::new()
        .route("/{*path}", post(api_handler).get(file_handler))
        .with_state(api);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    let api_url = reqwest::Url::parse(&format!("http://{addr}/")).unwrap();
    Bot::new(TOKEN).set_api_url(api_url)
}
