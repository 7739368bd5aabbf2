//! MCP server: construction, JSON-RPC method handling and transports

mod http;
mod stdio;

pub use http::{create_router, serve_http};
pub use stdio::serve_stdio;

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::rpc_codes;
use crate::portainer::{PortainerBackend, PortainerClient};
use crate::protocol::{
    Info, InitializeResult, JsonRpcResponse, RequestId, ServerCapabilities, ToolsCallParams,
    ToolsCallResult, ToolsCapability, ToolsListResult, negotiate_version,
};
use crate::schema::ToolSchema;
use crate::tools::{Dispatcher, OperationCatalog, ToolContext, ToolMode, ToolRegistry, handlers};
use crate::{Error, Result};

/// Portainer `major.minor` this build is tested against
pub const SUPPORTED_PORTAINER_VERSION: &str = "2.31";

/// Name reported in `serverInfo`
pub const SERVER_NAME: &str = "portainer-mcp";

/// Fetch the backend version and check it against [`SUPPORTED_PORTAINER_VERSION`]
///
/// # Errors
///
/// Returns a backend error when the version cannot be fetched, or
/// [`Error::IncompatibleVersion`] when it does not match.
pub async fn check_backend_version(backend: &dyn PortainerBackend) -> Result<String> {
    let version = backend
        .get_version()
        .await
        .map_err(|e| Error::backend("failed to get Portainer server version", e))?;
    tool_args::version::check_compatibility(&version, SUPPORTED_PORTAINER_VERSION)?;
    Ok(version)
}

/// Protocol front end over the tool dispatcher
#[derive(Clone)]
pub struct McpServer {
    dispatcher: Dispatcher,
}

impl McpServer {
    /// Build a server from configuration
    ///
    /// Loads the tool definitions, connects the Portainer client and runs
    /// the version gate unless it is disabled.
    ///
    /// # Errors
    ///
    /// Any failure here is fatal: invalid configuration, unreadable tool
    /// definitions, an unreachable backend or an unsupported version.
    pub async fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let schema = ToolSchema::load(config.tools.path.as_deref()).await?;
        let client = PortainerClient::new(
            &config.portainer.server_url,
            &config.portainer.resolve_token(),
            config.portainer.skip_tls_verify,
            config.portainer.timeout,
        )?;

        if config.portainer.disable_version_check {
            warn!("Portainer version check disabled");
        } else {
            let version = check_backend_version(&client).await?;
            info!(version = %version, server = client.base_url(), "Connected to Portainer");
        }

        Self::build(&schema, Arc::new(client), config.tools.mode, config.tools.read_only)
    }

    /// Build a server over an arbitrary backend
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if two handlers share a name.
    pub fn build(
        schema: &ToolSchema,
        backend: Arc<dyn PortainerBackend>,
        mode: ToolMode,
        read_only: bool,
    ) -> Result<Self> {
        let catalog = OperationCatalog::from_schema(schema, &handlers::operations())?;
        let registry = Arc::new(ToolRegistry::new(catalog, mode, read_only));
        Ok(Self {
            dispatcher: Dispatcher::new(registry, ToolContext::new(backend)),
        })
    }

    /// Tool dispatcher
    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Answer one JSON-RPC request
    pub async fn handle_request(
        &self,
        id: RequestId,
        method: &str,
        params: Option<Value>,
        cancel: &CancellationToken,
    ) -> JsonRpcResponse {
        match method {
            "initialize" => {
                let requested = params
                    .as_ref()
                    .and_then(|p| p.get("protocolVersion"))
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                respond(id, &self.initialize_result(requested))
            }
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => respond(
                id,
                &ToolsListResult {
                    tools: self.dispatcher.registry().tools().to_vec(),
                    next_cursor: None,
                },
            ),
            "tools/call" => {
                let params: ToolsCallParams =
                    match serde_json::from_value(params.unwrap_or(Value::Null)) {
                        Ok(params) => params,
                        Err(e) => {
                            return JsonRpcResponse::error(
                                Some(id),
                                rpc_codes::INVALID_PARAMS,
                                format!("Invalid tools/call params: {e}"),
                            );
                        }
                    };
                let envelope = self
                    .dispatcher
                    .dispatch(&params.name, params.arguments, cancel)
                    .await;
                respond(id, &ToolsCallResult::from(envelope))
            }
            _ => {
                debug!(method, "Unknown method");
                JsonRpcResponse::error(
                    Some(id),
                    rpc_codes::METHOD_NOT_FOUND,
                    format!("Method not found: {method}"),
                )
            }
        }
    }

    fn initialize_result(&self, requested: &str) -> InitializeResult {
        let protocol_version = negotiate_version(requested);
        debug!(requested, negotiated = protocol_version, "Initialize");

        let registry = self.dispatcher.registry();
        let mut instructions = String::from(
            "Manage a Portainer server: environments, stacks, access control, users, \
             registries, templates, edge jobs, backups and raw Docker/Kubernetes API calls.",
        );
        if registry.mode() == ToolMode::Meta {
            instructions.push_str(" Each tool takes an `action` argument naming the operation.");
        }
        if registry.read_only() {
            instructions.push_str(" This server is read-only: operations that modify Portainer are not available.");
        }

        InitializeResult {
            protocol_version: protocol_version.to_string(),
            capabilities: ServerCapabilities {
                logging: None,
                tools: Some(ToolsCapability { list_changed: false }),
            },
            server_info: Info {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: Some("Portainer MCP".to_string()),
            },
            instructions: Some(instructions),
        }
    }
}

/// Serialize a result into a success response
fn respond<T: Serialize>(id: RequestId, result: &T) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => JsonRpcResponse::error(
            Some(id),
            rpc_codes::INTERNAL_ERROR,
            format!("failed to serialize result: {e}"),
        ),
    }
}

/// Extract a `RequestId` from a JSON value.
///
/// Supports string and integer ID values per JSON-RPC 2.0 spec.
fn extract_request_id(value: &Value) -> Option<RequestId> {
    match value {
        Value::String(s) => Some(RequestId::String(s.clone())),
        Value::Number(n) => n.as_i64().map(RequestId::Number),
        _ => None,
    }
}

/// Check whether a method name represents a notification (no response expected).
fn is_notification_method(method: &str) -> bool {
    method.starts_with("notifications/")
}

/// A decoded incoming JSON-RPC message
#[derive(Debug, Clone, PartialEq)]
enum Incoming {
    Request {
        id: RequestId,
        method: String,
        params: Option<Value>,
    },
    Notification {
        method: String,
        params: Option<Value>,
    },
    /// A response from the client; this server sends no requests, so ignored
    Response,
}

/// Parse a JSON-RPC request or notification
#[allow(clippy::result_large_err)]
fn parse_message(value: &Value) -> std::result::Result<Incoming, JsonRpcResponse> {
    let jsonrpc = value.get("jsonrpc").and_then(Value::as_str);
    if jsonrpc != Some("2.0") {
        return Err(JsonRpcResponse::error(
            None,
            rpc_codes::INVALID_REQUEST,
            "Invalid JSON-RPC version",
        ));
    }

    let id = value.get("id").and_then(extract_request_id);

    let Some(method) = value.get("method").and_then(Value::as_str) else {
        if value.get("result").is_some() || value.get("error").is_some() {
            return Ok(Incoming::Response);
        }
        return Err(JsonRpcResponse::error(id, rpc_codes::INVALID_REQUEST, "Missing method"));
    };
    let params = value.get("params").cloned();

    if is_notification_method(method) {
        return Ok(Incoming::Notification {
            method: method.to_string(),
            params,
        });
    }
    match id {
        Some(id) => Ok(Incoming::Request {
            id,
            method: method.to_string(),
            params,
        }),
        None => Err(JsonRpcResponse::error(None, rpc_codes::INVALID_REQUEST, "Missing id")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::MockBackend;
    use pretty_assertions::assert_eq;

    fn server(mode: ToolMode, read_only: bool) -> (McpServer, Arc<MockBackend>) {
        let backend = Arc::new(MockBackend::default());
        let schema = ToolSchema::embedded().unwrap();
        let server = McpServer::build(&schema, backend.clone(), mode, read_only).unwrap();
        (server, backend)
    }

    async fn request(server: &McpServer, method: &str, params: Value) -> Value {
        let response = server
            .handle_request(RequestId::Number(1), method, Some(params), &CancellationToken::new())
            .await;
        serde_json::to_value(response).unwrap()
    }

    #[test]
    fn parse_message_distinguishes_kinds() {
        let request = parse_message(&json!({"jsonrpc": "2.0", "id": "a", "method": "ping"})).unwrap();
        assert_eq!(
            request,
            Incoming::Request {
                id: RequestId::String("a".into()),
                method: "ping".into(),
                params: None
            }
        );

        let notification =
            parse_message(&json!({"jsonrpc": "2.0", "method": "notifications/initialized"})).unwrap();
        assert!(matches!(notification, Incoming::Notification { .. }));

        let response = parse_message(&json!({"jsonrpc": "2.0", "id": 3, "result": {}})).unwrap();
        assert_eq!(response, Incoming::Response);
    }

    #[test]
    fn parse_message_rejects_malformed() {
        for value in [
            json!({"id": 1, "method": "ping"}),
            json!({"jsonrpc": "1.0", "id": 1, "method": "ping"}),
            json!({"jsonrpc": "2.0", "id": 1}),
            json!({"jsonrpc": "2.0", "method": "tools/list"}),
            json!({"jsonrpc": "2.0", "id": null, "method": "tools/list"}),
        ] {
            let err = parse_message(&value).unwrap_err();
            assert_eq!(err.error.unwrap().code, rpc_codes::INVALID_REQUEST, "{value}");
        }
    }

    #[test]
    fn extract_request_id_variants() {
        assert_eq!(extract_request_id(&json!(0)), Some(RequestId::Number(0)));
        assert_eq!(extract_request_id(&json!(-4)), Some(RequestId::Number(-4)));
        assert_eq!(extract_request_id(&json!("x")), Some(RequestId::String("x".into())));
        assert_eq!(extract_request_id(&json!(1.5)), None);
        assert_eq!(extract_request_id(&json!(true)), None);
    }

    #[tokio::test]
    async fn initialize_negotiates_version() {
        let (server, _) = server(ToolMode::Meta, true);

        let response = request(&server, "initialize", json!({"protocolVersion": "2024-11-05"})).await;
        assert_eq!(response["result"]["protocolVersion"], "2024-11-05");
        assert_eq!(response["result"]["serverInfo"]["name"], SERVER_NAME);
        assert!(
            response["result"]["instructions"]
                .as_str()
                .unwrap()
                .contains("read-only")
        );

        let response = request(&server, "initialize", json!({"protocolVersion": "1999-01-01"})).await;
        assert_eq!(response["result"]["protocolVersion"], crate::protocol::PROTOCOL_VERSION);
    }

    #[tokio::test]
    async fn tools_list_returns_registry_surface() {
        let (server, _) = server(ToolMode::Meta, false);
        let response = request(&server, "tools/list", json!({})).await;
        let tools = response["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), server.dispatcher().registry().tools().len());
        assert!(tools.iter().any(|t| t["name"] == "manage_environments"));
    }

    #[tokio::test]
    async fn tools_call_wraps_envelope() {
        let (server, backend) = server(ToolMode::Meta, false);

        let response = request(
            &server,
            "tools/call",
            json!({"name": "manage_system", "arguments": {"action": "get_system_status"}}),
        )
        .await;

        assert_eq!(response["result"]["isError"], false);
        assert!(
            response["result"]["content"][0]["text"]
                .as_str()
                .unwrap()
                .contains("2.31.2")
        );
        assert_eq!(backend.calls(), vec!["get_system_status"]);
    }

    #[tokio::test]
    async fn tool_failures_are_results_not_rpc_errors() {
        let (server, _) = server(ToolMode::Meta, false);
        let response = request(&server, "tools/call", json!({"name": "nope", "arguments": {}})).await;
        assert!(response.get("error").is_none());
        assert_eq!(response["result"]["isError"], true);
    }

    #[tokio::test]
    async fn malformed_call_params_are_invalid_params() {
        let (server, _) = server(ToolMode::Meta, false);
        let response = request(&server, "tools/call", json!({"arguments": {}})).await;
        assert_eq!(response["error"]["code"], rpc_codes::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn unknown_method_is_method_not_found() {
        let (server, _) = server(ToolMode::Meta, false);
        let response = request(&server, "resources/list", json!({})).await;
        assert_eq!(response["error"]["code"], rpc_codes::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn version_gate() {
        let backend = MockBackend::default();
        assert_eq!(check_backend_version(&backend).await.unwrap(), "2.31.2");

        backend.fail_with(401, "Unauthorized");
        let err = check_backend_version(&backend).await.unwrap_err();
        assert!(err.to_string().starts_with("failed to get Portainer server version"));
    }
}
