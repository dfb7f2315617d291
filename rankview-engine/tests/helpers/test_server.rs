//! Local stand-in for the decomposition service
//!
//! Serves `POST /api/svd` on an ephemeral port and records every request
//! body it receives.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;
use rankview_common::config::ServiceConfig;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

/// What the stand-in answers with
#[derive(Clone)]
pub enum ServiceReply {
    Payload(Vec<u8>),
    Status(StatusCode),
}

/// Request as seen by the stand-in
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub content_type: String,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Clone)]
struct ServerState {
    reply: ServiceReply,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

pub struct TestService {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl TestService {
    pub async fn start(reply: ServiceReply) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = ServerState {
            reply,
            requests: Arc::clone(&requests),
        };

        let app = Router::new().route("/api/svd", post(svd)).with_state(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, requests }
    }

    pub fn config(&self) -> ServiceConfig {
        ServiceConfig {
            base_url: format!("http://{}", self.addr),
            timeout_ms: 5_000,
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

async fn svd(State(state): State<ServerState>, headers: HeaderMap, body: Bytes) -> (StatusCode, Vec<u8>) {
    let content_type = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    state.requests.lock().unwrap().push(RecordedRequest {
        content_type,
        body: body.to_vec(),
    });

    match state.reply {
        ServiceReply::Payload(payload) => (StatusCode::OK, payload),
        ServiceReply::Status(status) => (status, Vec::new()),
    }
}
