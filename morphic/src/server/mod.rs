//! Morphic server - the chat history API behind the session gate.
//!
//! Endpoints:
//! - GET / - Home page (anonymous visitors are sent to the login route)
//! - GET /auth/login - Login page
//! - GET /api/chats?offset=N - One page of chat history
//! - POST /api/chats - Create a chat
//! - DELETE /api/chats/{id} - Delete a chat
//! - WS /ws - Pushes `chat-history-updated` events
//! - GET /_next/static/* - Static assets, outside the gate
//!
//! Every route runs behind [`session_gate`].

mod store;

use std::net::SocketAddr;
use std::path::{Path as FsPath, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State, WebSocketUpgrade},
    http::StatusCode,
    middleware,
    response::{Html, IntoResponse},
    routing::{delete, get},
    Json, Router,
};
use serde::Deserialize;
use tokio::sync::RwLock;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::gate::{session_gate, SessionGate};
use crate::history::HistoryEvents;
use crate::models::{ChatPage, ChatSummary};

pub use store::{ChatStore, DEFAULT_PAGE_SIZE};

/// Generate a UUIDv7 (time-ordered, globally unique).
fn generate_uuid() -> String {
    Uuid::now_v7().to_string()
}

/// Shared server state.
pub struct ServerState {
    /// Chat history, most recent first.
    store: RwLock<ChatStore>,
    /// Broadcast bus for history changes.
    events: HistoryEvents,
}

impl ServerState {
    pub fn new(page_size: usize) -> Self {
        Self {
            store: RwLock::new(ChatStore::new(page_size)),
            events: HistoryEvents::new(),
        }
    }

    pub const fn events(&self) -> &HistoryEvents {
        &self.events
    }
}

// === Request/Response Types ===

/// Query parameters for the history API.
#[derive(Debug, Deserialize)]
pub struct PageParams {
    #[serde(default)]
    pub offset: u64,
}

/// Request to create a chat.
#[derive(Debug, Deserialize)]
pub struct CreateChatRequest {
    pub title: String,
}

// === Server Lifecycle ===

/// Options for `morphic serve`.
#[derive(Debug, Clone)]
pub struct ServeOptions {
    pub port: u16,
    pub page_size: usize,
    pub assets: Option<PathBuf>,
    pub open_browser: bool,
}

/// Build the application router wrapped in the session gate.
pub fn router(state: Arc<ServerState>, gate: Arc<SessionGate>, assets: Option<&FsPath>) -> Router {
    let mut app = Router::new()
        .route("/", get(index_handler))
        .route("/auth/login", get(login_handler))
        .route("/api/chats", get(list_chats).post(create_chat))
        .route("/api/chats/{id}", delete(delete_chat))
        .route("/ws", get(websocket_handler))
        .with_state(state);

    if let Some(dir) = assets {
        app = app.nest_service("/_next/static", ServeDir::new(dir));
    }

    app.layer(middleware::from_fn_with_state(gate, session_gate))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Start the server.
pub async fn start_server(config: &Config, options: ServeOptions) -> Result<()> {
    let gate = SessionGate::new(config).context("Failed to build session gate")?;
    if !gate.auth_enabled() {
        warn!("auth service not configured, session gating is disabled");
    }

    let state = Arc::new(ServerState::new(options.page_size));
    let app = router(state, Arc::new(gate), options.assets.as_deref());

    let addr = SocketAddr::from(([127, 0, 0, 1], options.port));
    info!(%addr, page_size = options.page_size, "morphic server starting");
    println!("Morphic server starting on http://{addr}");

    if options.open_browser {
        let _ = open::that(format!("http://{addr}"));
    }

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

// === Handlers ===

/// One canonical home page; each visit starts a fresh chat id.
async fn index_handler() -> Html<String> {
    Html(include_str!("home.html").replace("{{chat_id}}", &generate_uuid()))
}

async fn login_handler() -> Html<&'static str> {
    Html("<!doctype html><title>Sign in</title><h1>Sign in to continue</h1>")
}

async fn list_chats(
    State(state): State<Arc<ServerState>>,
    Query(params): Query<PageParams>,
) -> Json<ChatPage> {
    let store = state.store.read().await;
    Json(store.page(params.offset))
}

async fn create_chat(
    State(state): State<Arc<ServerState>>,
    Json(req): Json<CreateChatRequest>,
) -> Result<(StatusCode, Json<ChatSummary>), StatusCode> {
    let title = req.title.trim();
    if title.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let chat = ChatSummary::new(generate_uuid(), title.to_string());
    state.store.write().await.insert(chat.clone());

    let reached = state.events.publish();
    debug!(chat_id = %chat.id, listeners = reached, "chat created");

    Ok((StatusCode::CREATED, Json(chat)))
}

async fn delete_chat(State(state): State<Arc<ServerState>>, Path(id): Path<String>) -> StatusCode {
    if !state.store.write().await.delete(&id) {
        return StatusCode::NOT_FOUND;
    }

    state.events.publish();
    debug!(chat_id = %id, "chat deleted");
    StatusCode::NO_CONTENT
}

async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_websocket(socket, state))
}

async fn handle_websocket(mut socket: axum::extract::ws::WebSocket, state: Arc<ServerState>) {
    use axum::extract::ws::Message;
    use tokio::sync::broadcast::error::RecvError;

    let mut rx = state.events.subscribe();

    loop {
        match rx.recv().await {
            Ok(event) => {
                let Ok(json) = serde_json::to_string(&event) else {
                    continue;
                };
                if socket.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
            Err(RecvError::Lagged(skipped)) => debug!(skipped, "websocket client lagged"),
            Err(RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn open_gate() -> Arc<SessionGate> {
        let config = Config {
            auth: None,
            login_path: "/auth/login".to_string(),
            cache_dir: PathBuf::from("/tmp"),
        };
        Arc::new(SessionGate::new(&config).unwrap())
    }

    fn app(state: &Arc<ServerState>) -> Router {
        router(state.clone(), open_gate(), None)
    }

    async fn body_json(resp: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header("host", "localhost:3000")
            .body(Body::empty())
            .unwrap()
    }

    fn post_chat(title: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/chats")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::json!({ "title": title }).to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_list_chats_paginates() {
        let state = Arc::new(ServerState::new(2));
        for title in ["one", "two", "three"] {
            let resp = app(&state).oneshot(post_chat(title)).await.unwrap();
            assert_eq!(resp.status(), StatusCode::CREATED);
        }

        let resp = app(&state).oneshot(get_req("/api/chats?offset=0")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["x-base-url"], "http://localhost:3000");
        let page = body_json(resp).await;
        assert_eq!(page["chats"][0]["title"], "three");
        assert_eq!(page["chats"][1]["title"], "two");
        assert_eq!(page["nextOffset"], 2);

        let page = body_json(app(&state).oneshot(get_req("/api/chats?offset=2")).await.unwrap()).await;
        assert_eq!(page["chats"][0]["title"], "one");
        assert!(page["nextOffset"].is_null());
    }

    #[tokio::test]
    async fn test_invalid_offset_is_bad_request() {
        let state = Arc::new(ServerState::new(2));
        let resp = app(&state).oneshot(get_req("/api/chats?offset=-1")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_create_and_delete_publish_events() {
        let state = Arc::new(ServerState::new(20));
        let mut rx = state.events().subscribe();

        let resp = app(&state).oneshot(post_chat("Tesla vs Rivian")).await.unwrap();
        let chat = body_json(resp).await;
        rx.recv().await.unwrap();

        let id = chat["id"].as_str().unwrap();
        let delete_req = Request::builder()
            .method("DELETE")
            .uri(format!("/api/chats/{id}"))
            .body(Body::empty())
            .unwrap();
        let resp = app(&state).oneshot(delete_req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        rx.recv().await.unwrap();

        let missing = Request::builder()
            .method("DELETE")
            .uri(format!("/api/chats/{id}"))
            .body(Body::empty())
            .unwrap();
        let resp = app(&state).oneshot(missing).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_blank_title_rejected() {
        let state = Arc::new(ServerState::new(20));
        let resp = app(&state).oneshot(post_chat("   ")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(state.store.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_home_page_has_chat_id() {
        let state = Arc::new(ServerState::new(20));
        let resp = app(&state).oneshot(get_req("/")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(!html.contains("{{chat_id}}"));
        assert!(html.contains("data-chat-id=\""));
    }

    #[tokio::test]
    async fn test_static_assets_bypass_gate() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("app.js"), "console.log(1)").unwrap();
        let state = Arc::new(ServerState::new(20));
        let app = router(state, open_gate(), Some(tmp.path()));

        let resp = app.oneshot(get_req("/_next/static/app.js")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers().get("x-url").is_none());
    }
}
