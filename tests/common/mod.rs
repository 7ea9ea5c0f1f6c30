//! In-process fake of the AstroPi capture server, served with axum.

#![allow(dead_code)]

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use astropi_control::connection::{AddressSource, ServerAddress};
use astropi_control::transport::{ClientConfig, PanelClient};

/// What the fake server has seen and will answer.
#[derive(Default)]
pub struct FakeServer {
    /// Bodies received on /start_capture
    pub start_bodies: Mutex<Vec<Value>>,
    /// Status replies, served in order; the last one repeats
    pub statuses: Mutex<VecDeque<Value>>,
    /// Number of /stop_capture calls
    pub stops: Mutex<usize>,
    /// Reject start requests with this message (HTTP 409)
    pub busy: Mutex<Option<String>>,
    /// Current ISO value
    pub iso: Mutex<String>,
}

impl FakeServer {
    pub fn with_statuses(statuses: &[(&str, &str)]) -> Arc<Self> {
        let server = Self::default();
        *server.iso.lock().unwrap() = "400".to_string();
        {
            let mut queue = server.statuses.lock().unwrap();
            for (status, message) in statuses {
                queue.push_back(json!({"status": status, "message": message}));
            }
        }
        Arc::new(server)
    }
}

type Shared = State<Arc<FakeServer>>;

async fn start_capture(State(server): Shared, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    server.start_bodies.lock().unwrap().push(body.clone());
    if let Some(reason) = server.busy.lock().unwrap().clone() {
        return (
            StatusCode::CONFLICT,
            Json(json!({"status": "error", "message": reason})),
        );
    }
    (
        StatusCode::OK,
        Json(json!({
            "status": "started",
            "message": format!("Started {} capture.", body["type"].as_str().unwrap_or("?"))
        })),
    )
}

async fn status(State(server): Shared) -> Json<Value> {
    let mut queue = server.statuses.lock().unwrap();
    let reply = if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    };
    Json(reply.unwrap_or_else(|| json!({"status": "idle", "message": "No capture in progress."})))
}

async fn stop_capture(State(server): Shared) -> Json<Value> {
    *server.stops.lock().unwrap() += 1;
    Json(json!({"status": "stopped", "message": "Capture process terminated."}))
}

async fn get_config(State(server): Shared, Path(name): Path<String>) -> (StatusCode, Json<Value>) {
    match name.as_str() {
        "iso" => (
            StatusCode::OK,
            Json(json!({
                "choices": [{"value": "100"}, {"value": "400"}, {"value": "1600"}],
                "current": server.iso.lock().unwrap().clone()
            })),
        ),
        other => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": format!("Unknown setting: {other}")})),
        ),
    }
}

async fn set_config(
    State(server): Shared,
    Path(name): Path<String>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let value = body["value"].as_str().unwrap_or_default().to_string();
    if name == "iso" && ["100", "400", "1600"].contains(&value.as_str()) {
        *server.iso.lock().unwrap() = value;
        (StatusCode::OK, Json(json!({"status": "success"})))
    } else {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({"status": "error", "message": format!("Cannot set {name} to {value}")})),
        )
    }
}

async fn system_actions() -> Json<Value> {
    Json(json!({"choices": ["shutdown", "restart"]}))
}

async fn run_system_action(Json(body): Json<Value>) -> Json<Value> {
    Json(json!({"message": format!("Executing {}...", body["action"].as_str().unwrap_or("?"))}))
}

/// Serve `server` on an ephemeral port and return a client pointed at it.
pub async fn spawn(server: Arc<FakeServer>) -> PanelClient {
    let app = Router::new()
        .route("/start_capture", post(start_capture))
        .route("/status", get(status))
        .route("/stop_capture", post(stop_capture))
        .route("/api/config/{name}", get(get_config).post(set_config))
        .route("/api/system", get(system_actions).post(run_system_action))
        .with_state(server);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let address =
        ServerAddress::parse(&format!("127.0.0.1:{port}"), AddressSource::CommandLine).unwrap();
    PanelClient::with_config(address, ClientConfig::fast()).unwrap()
}

/// A client for a port nothing listens on.
pub fn unreachable_client() -> PanelClient {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    let address =
        ServerAddress::parse(&format!("127.0.0.1:{port}"), AddressSource::CommandLine).unwrap();
    PanelClient::with_config(address, ClientConfig::fast()).unwrap()
}
