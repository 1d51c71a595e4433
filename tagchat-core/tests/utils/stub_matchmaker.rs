use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tagchat_core::model::FindPartnerRequest;

/// What the stub answers on `/get-user-by-tags`.
#[derive(Clone, Debug)]
pub enum PartnerReply {
    Name(String),
    Empty,
    Missing,
    Status(u16),
    Garbage,
}

struct StubInner {
    tags: Vec<String>,
    reply: Mutex<PartnerReply>,
    tag_hits: AtomicUsize,
    requests: Mutex<Vec<FindPartnerRequest>>,
}

/// Matchmaking server on a random local port.
#[derive(Clone)]
pub struct StubMatchmaker {
    inner: Arc<StubInner>,
    pub addr: SocketAddr,
}

impl StubMatchmaker {
    pub async fn spawn(tags: &[&str], reply: PartnerReply) -> Result<Self> {
        let inner = Arc::new(StubInner {
            tags: tags.iter().map(|t| t.to_string()).collect(),
            reply: Mutex::new(reply),
            tag_hits: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/get-tags", get(get_tags))
            .route("/get-user-by-tags", post(get_user_by_tags))
            .with_state(inner.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .context("Failed to bind stub matchmaker")?;
        let addr = listener.local_addr()?;

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::warn!("[StubMatchmaker] server stopped: {}", e);
            }
        });

        Ok(Self { inner, addr })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn set_reply(&self, reply: PartnerReply) {
        *self.inner.reply.lock().unwrap() = reply;
    }

    pub fn tag_hits(&self) -> usize {
        self.inner.tag_hits.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<FindPartnerRequest> {
        self.inner.requests.lock().unwrap().clone()
    }
}

async fn get_tags(State(inner): State<Arc<StubInner>>) -> Json<serde_json::Value> {
    inner.tag_hits.fetch_add(1, Ordering::SeqCst);
    Json(json!({ "tags": inner.tags }))
}

async fn get_user_by_tags(
    State(inner): State<Arc<StubInner>>,
    Json(request): Json<FindPartnerRequest>,
) -> Response {
    tracing::debug!("[StubMatchmaker] request {:?}", request);
    inner.requests.lock().unwrap().push(request);

    let reply = inner.reply.lock().unwrap().clone();
    match reply {
        PartnerReply::Name(name) => Json(json!({ "username": name })).into_response(),
        PartnerReply::Empty => Json(json!({ "username": "" })).into_response(),
        PartnerReply::Missing => Json(json!({})).into_response(),
        PartnerReply::Status(code) => {
            let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, "matchmaker unavailable").into_response()
        }
        PartnerReply::Garbage => "not json".into_response(),
    }
}
