//! HTTP transport: one JSON-RPC message per `POST /mcp`

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::{HeaderName, HeaderValue, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{Incoming, McpServer, parse_message};
use crate::config::ServerConfig;
use crate::error::rpc_codes;
use crate::protocol::JsonRpcResponse;
use crate::{Error, Result};

/// Session header handed out on `initialize`
const SESSION_HEADER: HeaderName = HeaderName::from_static("mcp-session-id");

struct AppState {
    server: McpServer,
    max_body_size: usize,
}

/// Create the router
pub fn create_router(server: McpServer, max_body_size: usize) -> Router {
    let state = Arc::new(AppState {
        server,
        max_body_size,
    });

    Router::new()
        .route("/health", get(health_handler))
        .route("/mcp", post(mcp_handler))
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until Ctrl+C or SIGTERM
pub async fn serve_http(server: McpServer, config: &ServerConfig) -> Result<()> {
    let addr = SocketAddr::new(
        config
            .host
            .parse()
            .map_err(|e| Error::Config(format!("Invalid host: {e}")))?,
        config.port,
    );
    let app = create_router(server, config.max_body_size);
    let listener = TcpListener::bind(addr).await?;

    info!(host = %config.host, port = config.port, "Listening");
    info!("  POST http://{addr}/mcp  (JSON-RPC)");
    info!("  GET  http://{addr}/health");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| Error::Transport(e.to_string()))?;

    info!("HTTP server stopped");
    Ok(())
}

async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let registry = state.server.dispatcher().registry();
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "tools": registry.tools().len(),
        "readOnly": registry.read_only(),
    }))
}

/// POST /mcp
async fn mcp_handler(State(state): State<Arc<AppState>>, request: Request<Body>) -> Response {
    let body = match axum::body::to_bytes(request.into_body(), state.max_body_size).await {
        Ok(bytes) => bytes,
        Err(e) => {
            return rpc_error(StatusCode::BAD_REQUEST, rpc_codes::PARSE_ERROR, format!("Failed to read body: {e}"));
        }
    };
    let value: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(e) => {
            return rpc_error(StatusCode::BAD_REQUEST, rpc_codes::PARSE_ERROR, format!("Invalid JSON: {e}"));
        }
    };

    match parse_message(&value) {
        Ok(Incoming::Request { id, method, params }) => {
            // A dropped connection drops this future and the call with it
            let response = state
                .server
                .handle_request(id, &method, params, &CancellationToken::new())
                .await;
            let mut http_response = Json(response).into_response();
            if method == "initialize" {
                if let Ok(session) = HeaderValue::from_str(&Uuid::new_v4().to_string()) {
                    http_response.headers_mut().insert(SESSION_HEADER, session);
                }
            }
            http_response
        }
        Ok(Incoming::Notification { method, .. }) => {
            if method == "notifications/cancelled" {
                warn!("Cancellation over HTTP is not tracked; close the request instead");
            } else {
                debug!(method = %method, "Notification accepted");
            }
            StatusCode::ACCEPTED.into_response()
        }
        Ok(Incoming::Response) => StatusCode::ACCEPTED.into_response(),
        Err(response) => (StatusCode::BAD_REQUEST, Json(response)).into_response(),
    }
}

fn rpc_error(status: StatusCode, code: i32, message: String) -> Response {
    (status, Json(JsonRpcResponse::error(None, code, message))).into_response()
}

/// Shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ToolSchema;
    use crate::tools::ToolMode;
    use crate::tools::testing::MockBackend;
    use pretty_assertions::assert_eq;

    async fn serve() -> String {
        let schema = ToolSchema::embedded().unwrap();
        let server =
            McpServer::build(&schema, Arc::new(MockBackend::default()), ToolMode::Meta, true).unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, create_router(server, 1024 * 1024)).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn health_reports_surface() {
        let base = serve().await;
        let body: Value = reqwest::get(format!("{base}/health")).await.unwrap().json().await.unwrap();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["readOnly"], true);
    }

    #[tokio::test]
    async fn initialize_sets_session_header() {
        let base = serve().await;
        let response = reqwest::Client::new()
            .post(format!("{base}/mcp"))
            .json(&json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        assert!(response.headers().contains_key("mcp-session-id"));
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["result"]["serverInfo"]["name"], "portainer-mcp");
    }

    #[tokio::test]
    async fn notifications_are_accepted_without_body() {
        let base = serve().await;
        let response = reqwest::Client::new()
            .post(format!("{base}/mcp"))
            .json(&json!({"jsonrpc": "2.0", "method": "notifications/initialized"}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 202);
    }

    #[tokio::test]
    async fn invalid_json_is_parse_error() {
        let base = serve().await;
        let response = reqwest::Client::new()
            .post(format!("{base}/mcp"))
            .body("{not json")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["error"]["code"], rpc_codes::PARSE_ERROR);
    }
}
