use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use tower_http::cors::CorsLayer;

use fleettrack_auth::IdentityGate;
use fleettrack_core::LocationUpdate;
use fleettrack_store::LocationStore;
use tokio::sync::mpsc;

use crate::connection;
use crate::dispatcher;
use crate::registry::ConnectionRegistry;

/// Server configuration.
pub struct ServerConfig {
    pub port: u16,
    /// Per-client outbound queue depth.
    pub max_send_queue: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            max_send_queue: 256,
        }
    }
}

/// Shared application state passed to Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ConnectionRegistry>,
    pub gate: Arc<IdentityGate>,
    pub store: Arc<dyn LocationStore>,
    pub updates: mpsc::Sender<LocationUpdate>,
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// Create and start the server. Returns a handle to shut it down.
pub async fn start(
    config: ServerConfig,
    gate: IdentityGate,
    store: Arc<dyn LocationStore>,
) -> Result<ServerHandle, std::io::Error> {
    let registry = Arc::new(ConnectionRegistry::new(config.max_send_queue));

    let (update_tx, update_rx) = dispatcher::broadcast_channel();
    let dispatcher_handle = dispatcher::start_dispatcher(Arc::clone(&registry), update_rx);

    let app_state = AppState {
        registry: Arc::clone(&registry),
        gate: Arc::new(gate),
        store,
        updates: update_tx,
    };

    let router = build_router(app_state);
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    tracing::info!(port = local_addr.port(), "location relay started");

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });

    Ok(ServerHandle {
        port: local_addr.port(),
        registry,
        _server: server_handle,
        _dispatcher: dispatcher_handle,
    })
}

/// Handle returned by `start()` — keeps background tasks alive.
pub struct ServerHandle {
    pub port: u16,
    pub registry: Arc<ConnectionRegistry>,
    _server: tokio::task::JoinHandle<()>,
    _dispatcher: tokio::task::JoinHandle<()>,
}

#[derive(Deserialize)]
struct WsQuery {
    token: Option<String>,
}

/// WebSocket upgrade handler. The token is verified before the
/// upgrade is accepted, so a bad credential gets a plain 401 and
/// never holds a socket.
async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Response {
    let info = match state.gate.authenticate(query.token.as_deref()) {
        Ok(info) => info,
        Err(err) => {
            tracing::warn!(reason = err.kind(), "rejecting websocket upgrade");
            return (StatusCode::UNAUTHORIZED, "unauthorized").into_response();
        }
    };

    ws.on_upgrade(move |socket| async move {
        let (id, rx) = state.registry.admit(info);
        connection::relay_connection(
            socket,
            id,
            info,
            rx,
            state.registry,
            state.store,
            state.updates,
        )
        .await;
    })
}

/// Health check HTTP endpoint.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "status": "ok",
        "connections": state.registry.count(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleettrack_store::{Database, LocationRepo};

    fn test_state() -> AppState {
        let db = Database::in_memory().unwrap();
        let repo = Arc::new(LocationRepo::new(db));
        let store: Arc<dyn LocationStore> = repo;
        let (update_tx, _update_rx) = dispatcher::broadcast_channel();

        AppState {
            registry: Arc::new(ConnectionRegistry::new(32)),
            gate: Arc::new(IdentityGate::new(b"test-secret")),
            store,
            updates: update_tx,
        }
    }

    #[tokio::test]
    async fn router_serves_health_without_a_listener() {
        use tower::ServiceExt;

        let router = build_router(test_state());
        let resp = router
            .oneshot(
                axum::http::Request::builder()
                    .uri("/health")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn server_starts_and_serves_health() {
        let db = Database::in_memory().unwrap();
        let store: Arc<dyn LocationStore> = Arc::new(LocationRepo::new(db));

        let config = ServerConfig {
            port: 0, // Random port
            ..Default::default()
        };

        let handle = start(config, IdentityGate::new(b"test-secret"), store)
            .await
            .unwrap();
        assert!(handle.port > 0);

        let url = format!("http://127.0.0.1:{}/health", handle.port);
        let resp = reqwest::get(&url).await.unwrap();
        assert_eq!(resp.status(), 200);

        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["connections"], 0);
    }

    #[tokio::test]
    async fn upgrade_without_token_is_unauthorized() {
        let db = Database::in_memory().unwrap();
        let store: Arc<dyn LocationStore> = Arc::new(LocationRepo::new(db));

        let config = ServerConfig {
            port: 0,
            ..Default::default()
        };
        let handle = start(config, IdentityGate::new(b"test-secret"), store)
            .await
            .unwrap();

        let url = format!("ws://127.0.0.1:{}/ws", handle.port);
        let err = tokio_tungstenite::connect_async(&url).await.unwrap_err();
        match err {
            tokio_tungstenite::tungstenite::Error::Http(resp) => {
                assert_eq!(resp.status(), 401);
            }
            other => panic!("expected http rejection, got {other:?}"),
        }
    }
}
