//! Fake Proxmox API server for HTTP client tests.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use pve_client::{ClientConfig, HttpClient};
use serde_json::Value;
use tokio::net::TcpListener;

/// A request as seen by the fake server.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    /// Path and query below `/api2/json`.
    pub path: String,
    pub authorization: Option<String>,
    pub body: Option<Value>,
}

/// A canned response.
#[derive(Debug, Clone)]
pub struct Canned {
    pub status: StatusCode,
    pub body: String,
    pub delay: Option<Duration>,
}

#[derive(Default)]
struct ServerState {
    routes: Mutex<HashMap<(Method, String), Canned>>,
    requests: Mutex<Vec<Recorded>>,
}

/// Fake server bound to an ephemeral local port.
pub struct FakeProxmox {
    pub addr: SocketAddr,
    state: Arc<ServerState>,
    shutdown_tx: tokio::sync::oneshot::Sender<()>,
}

async fn handle(
    State(state): State<Arc<ServerState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, String) {
    let path = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_default()
        .trim_start_matches("/api2/json")
        .to_string();

    state.requests.lock().unwrap().push(Recorded {
        method: method.clone(),
        path: path.clone(),
        authorization: headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: serde_json::from_slice(&body).ok(),
    });

    let canned = state.routes.lock().unwrap().get(&(method, path)).cloned();
    match canned {
        Some(canned) => {
            if let Some(delay) = canned.delay {
                tokio::time::sleep(delay).await;
            }
            (canned.status, canned.body)
        }
        None => (StatusCode::NOT_FOUND, r#"{"data":null}"#.to_string()),
    }
}

impl FakeProxmox {
    pub async fn spawn() -> Self {
        let state = Arc::new(ServerState::default());
        let router = Router::new().fallback(handle).with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .expect("Server error");
        });

        Self {
            addr,
            state,
            shutdown_tx,
        }
    }

    pub fn client(&self) -> HttpClient {
        HttpClient::new(&ClientConfig {
            endpoint: format!("http://{}", self.addr),
            token_id: "root@pam!test".to_string(),
            token_secret: "s3cret".to_string(),
            insecure: false,
            timeout: None,
        })
        .expect("Failed to build client")
    }

    /// Answer `method path` with `{"data": data}`.
    pub fn respond(&self, method: Method, path: &str, data: Value) {
        self.respond_raw(
            method,
            path,
            StatusCode::OK,
            serde_json::json!({ "data": data }).to_string(),
        );
    }

    pub fn respond_raw(&self, method: Method, path: &str, status: StatusCode, body: String) {
        self.state.routes.lock().unwrap().insert(
            (method, path.to_string()),
            Canned {
                status,
                body,
                delay: None,
            },
        );
    }

    pub fn respond_slowly(&self, method: Method, path: &str, delay: Duration) {
        self.state.routes.lock().unwrap().insert(
            (method, path.to_string()),
            Canned {
                status: StatusCode::OK,
                body: r#"{"data":null}"#.to_string(),
                delay: Some(delay),
            },
        );
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
    }
}
