//! Stdio transport: newline-delimited JSON-RPC on stdin/stdout
//!
//! Requests are read one line at a time. Each `tools/call` runs on its own
//! task so a later `notifications/cancelled` can reach it; all responses go
//! through a single writer task so lines never interleave.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::{Incoming, McpServer, parse_message};
use crate::error::rpc_codes;
use crate::protocol::{CancelledParams, JsonRpcResponse, RequestId};
use crate::Result;

/// Responses buffered before the reader waits on the writer
const WRITE_QUEUE: usize = 64;

/// Serve on the process's stdin/stdout until stdin closes
pub async fn serve_stdio(server: McpServer) -> Result<()> {
    info!("Serving MCP over stdio");
    serve_lines(server, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await?;
    info!("Stdin closed, shutting down");
    Ok(())
}

/// Serve on any line-oriented reader/writer pair
async fn serve_lines<R, W>(server: McpServer, reader: R, writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel::<JsonRpcResponse>(WRITE_QUEUE);
    let writer_task = tokio::spawn(write_responses(rx, writer));
    let in_flight: Arc<DashMap<RequestId, CancellationToken>> = Arc::new(DashMap::new());

    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Unparseable message");
                let response =
                    JsonRpcResponse::error(None, rpc_codes::PARSE_ERROR, format!("Parse error: {e}"));
                if tx.send(response).await.is_err() {
                    break;
                }
                continue;
            }
        };

        match parse_message(&value) {
            Ok(Incoming::Request { id, method, params }) => {
                if method == "tools/call" {
                    if let Some(rejected) = spawn_call(&server, &in_flight, &tx, id, params) {
                        if tx.send(rejected).await.is_err() {
                            break;
                        }
                    }
                } else {
                    let response = server
                        .handle_request(id, &method, params, &CancellationToken::new())
                        .await;
                    if tx.send(response).await.is_err() {
                        break;
                    }
                }
            }
            Ok(Incoming::Notification { method, params }) => {
                handle_notification(&in_flight, &method, params);
            }
            Ok(Incoming::Response) => debug!("Ignoring client response"),
            Err(response) => {
                if tx.send(response).await.is_err() {
                    break;
                }
            }
        }
    }

    // Outstanding calls hold their own senders; the writer drains them
    drop(tx);
    match writer_task.await {
        Ok(result) => result,
        Err(e) => {
            error!(error = %e, "Writer task failed");
            Ok(())
        }
    }
}

/// Run a `tools/call` on its own task; an id that is still in flight is
/// answered with an error instead
fn spawn_call(
    server: &McpServer,
    in_flight: &Arc<DashMap<RequestId, CancellationToken>>,
    tx: &mpsc::Sender<JsonRpcResponse>,
    id: RequestId,
    params: Option<Value>,
) -> Option<JsonRpcResponse> {
    let token = CancellationToken::new();
    match in_flight.entry(id.clone()) {
        Entry::Occupied(_) => {
            warn!(id = %id, "Duplicate in-flight request id");
            return Some(JsonRpcResponse::error(
                Some(id.clone()),
                rpc_codes::INVALID_REQUEST,
                format!("request id {id} is already in flight"),
            ));
        }
        Entry::Vacant(slot) => {
            slot.insert(token.clone());
        }
    }

    let server = server.clone();
    let in_flight = Arc::clone(in_flight);
    let tx = tx.clone();
    tokio::spawn(async move {
        let response = server
            .handle_request(id.clone(), "tools/call", params, &token)
            .await;
        in_flight.remove(&id);
        if tx.send(response).await.is_err() {
            debug!(id = %id, "Writer closed before response was sent");
        }
    });
    None
}

fn handle_notification(
    in_flight: &DashMap<RequestId, CancellationToken>,
    method: &str,
    params: Option<Value>,
) {
    match method {
        "notifications/initialized" => debug!("Client initialized"),
        "notifications/cancelled" => {
            let Some(params) = params
                .and_then(|p| serde_json::from_value::<CancelledParams>(p).ok())
            else {
                warn!("Malformed cancellation notification");
                return;
            };
            match in_flight.get(&params.request_id) {
                Some(token) => {
                    info!(id = %params.request_id, reason = ?params.reason, "Cancelling request");
                    token.cancel();
                }
                None => debug!(id = %params.request_id, "Cancellation for unknown or finished request"),
            }
        }
        other => debug!(method = other, "Ignoring notification"),
    }
}

async fn write_responses<W>(mut rx: mpsc::Receiver<JsonRpcResponse>, mut writer: W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = rx.recv().await {
        let mut line = serde_json::to_vec(&response)?;
        line.push(b'\n');
        writer.write_all(&line).await?;
        writer.flush().await?;
    }
    Ok(())
}
