#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use polychat_api::auth::jwt::{generate_access_token, JwtConfig};
use polychat_api::config::ServerConfig;
use polychat_api::presence::{ConnectionError, ConnectionHandle, PresenceRegistry};
use polychat_api::router::build_app_router;
use polychat_api::state::AppState;
use polychat_core::memory::{MemoryHistoryStore, MemoryRelationStore, MemoryUserStore};
use polychat_core::message::Message;
use polychat_core::types::DbId;
use polychat_core::user::{NewUser, UserStore};

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        ws_heartbeat_interval_secs: 30,
        ws_write_timeout_secs: 5,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            access_token_expiry_mins: 60,
        },
    }
}

/// The application router over in-memory stores, plus handles on those
/// stores for assertions.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub users: Arc<MemoryUserStore>,
    pub relations: Arc<MemoryRelationStore>,
    pub history: Arc<MemoryHistoryStore>,
}

/// Build the full application router, with every middleware layer, over
/// fresh in-memory stores.
pub fn build_test_app() -> TestApp {
    let users = Arc::new(MemoryUserStore::new());
    let relations = Arc::new(MemoryRelationStore::new());
    let history = Arc::new(MemoryHistoryStore::new());

    let state = AppState::new(
        test_config(),
        users.clone(),
        relations.clone(),
        history.clone(),
    );
    let router = build_app_router(state.clone()).expect("test config is valid");

    TestApp {
        router,
        state,
        users,
        relations,
        history,
    }
}

impl TestApp {
    pub fn app(&self) -> Router {
        self.router.clone()
    }

    /// Insert a user directly into the store and mint an access token for it.
    pub async fn create_user(&self, username: &str) -> (DbId, String) {
        let user = self
            .users
            .create(NewUser {
                username: username.to_string(),
                password_hash: "not-a-real-hash".to_string(),
                email: None,
            })
            .await
            .expect("user insert should succeed");
        (user.id, self.token_for(user.id, username))
    }

    pub fn token_for(&self, user_id: DbId, username: &str) -> String {
        generate_access_token(user_id, username, &self.state.config.jwt)
            .expect("token generation should succeed")
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None, None).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::GET, uri, Some(token), None).await
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response<Body> {
    send(app, Method::POST, uri, None, Some(body)).await
}

pub async fn post_json_auth(app: Router, uri: &str, token: &str, body: Value) -> Response<Body> {
    send(app, Method::POST, uri, Some(token), Some(body)).await
}

pub async fn put_json_auth(app: Router, uri: &str, token: &str, body: Value) -> Response<Body> {
    send(app, Method::PUT, uri, Some(token), Some(body)).await
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Assert the status and return the parsed body.
pub async fn expect_json(response: Response<Body>, status: StatusCode) -> Value {
    assert_eq!(response.status(), status);
    body_json(response).await
}

const WAIT_LIMIT: Duration = Duration::from_secs(2);
const WAIT_STEP: Duration = Duration::from_millis(10);

/// Wait until `conn` has been sent at least `count` messages.
pub async fn wait_for_sent(conn: &MockConnection, count: usize) {
    let deadline = tokio::time::Instant::now() + WAIT_LIMIT;
    while conn.sent().len() < count {
        assert!(
            tokio::time::Instant::now() < deadline,
            "expected {count} messages, got {}",
            conn.sent().len()
        );
        tokio::time::sleep(WAIT_STEP).await;
    }
}

/// Wait until the detached persistence tasks have stored `count` messages.
pub async fn wait_for_history(store: &MemoryHistoryStore, count: usize) {
    let deadline = tokio::time::Instant::now() + WAIT_LIMIT;
    while store.len().await < count {
        assert!(
            tokio::time::Instant::now() < deadline,
            "expected {count} stored messages"
        );
        tokio::time::sleep(WAIT_STEP).await;
    }
}

/// Wait until `user_id`'s presence matches `online`.
pub async fn wait_for_presence(presence: &PresenceRegistry, user_id: DbId, online: bool) {
    let deadline = tokio::time::Instant::now() + WAIT_LIMIT;
    while presence.is_online(user_id).await != online {
        assert!(
            tokio::time::Instant::now() < deadline,
            "user {user_id} never became online={online}"
        );
        tokio::time::sleep(WAIT_STEP).await;
    }
}

// ---------------------------------------------------------------------------
// Mock connection
// ---------------------------------------------------------------------------

/// In-process [`ConnectionHandle`] that records what it is sent.
#[derive(Default)]
pub struct MockConnection {
    sent: Mutex<Vec<Message>>,
    closes: AtomicUsize,
    pings: AtomicUsize,
    fail: AtomicBool,
    cancel: CancellationToken,
    gate: Option<Arc<Notify>>,
    entered: Notify,
}

impl MockConnection {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A connection whose every write fails.
    pub fn failing() -> Arc<Self> {
        let conn = Self::new();
        conn.set_failing(true);
        conn
    }

    /// A connection whose writes block until `gate` is notified, then fail.
    pub fn gated_failing(gate: Arc<Notify>) -> Arc<Self> {
        Arc::new(Self {
            fail: AtomicBool::new(true),
            gate: Some(gate),
            ..Self::default()
        })
    }

    /// Resolves once a write has reached the gate.
    pub async fn wait_for_blocked_send(&self) {
        self.entered.notified().await;
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<Message> {
        self.sent.lock().unwrap().clone()
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn ping_count(&self) -> usize {
        self.pings.load(Ordering::SeqCst)
    }

    /// Token cancelled by `close()`, for driving a router loop.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

#[async_trait]
impl ConnectionHandle for MockConnection {
    async fn send(&self, message: &Message) -> Result<(), ConnectionError> {
        if let Some(gate) = &self.gate {
            self.entered.notify_one();
            gate.notified().await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(ConnectionError::Transport("mock write failure".into()));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }

    async fn ping(&self) -> Result<(), ConnectionError> {
        self.pings.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(ConnectionError::Closed);
        }
        Ok(())
    }

    fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.cancel.cancel();
    }
}

/// Upcast a mock to the trait object the registry stores.
pub fn as_handle(conn: &Arc<MockConnection>) -> Arc<dyn ConnectionHandle> {
    conn.clone()
}
