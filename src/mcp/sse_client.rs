//! Persistent streaming (SSE) transport for the tool-invocation
//! protocol.
//!
//! The server's event stream first announces a `message` endpoint URL
//! via an `endpoint` event; requests are POSTed there and responses
//! arrive back on the stream as `message` events, matched to callers
//! by request id.

use crate::mcp::protocol::{
    CallToolResult, JsonRpcRequest, JsonRpcResponse, ListToolsResult, ToolDescriptor,
    initialize_params,
};
use dashmap::DashMap;
use futures_util::StreamExt;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::oneshot;
use url::Url;

/// One complete SSE event (event name + joined data lines)
#[derive(Debug, Default, Clone, PartialEq)]
struct SseEvent {
    event: String,
    data: String,
}

pub struct McpSseClient {
    name: String,
    message_url: String,
    poster: reqwest::Client,
    pending: Arc<DashMap<u64, oneshot::Sender<JsonRpcResponse>>>,
    next_id: Arc<AtomicU64>,
    reader: tokio::task::JoinHandle<()>,
    call_timeout: Duration,
}

impl Drop for McpSseClient {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

impl McpSseClient {
    /// Open the event stream, wait for the message endpoint, perform
    /// the capability handshake and return a ready client.
    pub async fn connect(
        name: &str,
        sse_url: &str,
        call_timeout: Duration,
    ) -> Result<Self, String> {
        // The stream stays open for the lifetime of the client, so the
        // streaming GET uses a client with no overall timeout.
        let streamer = reqwest::Client::builder()
            .build()
            .map_err(|e| format!("Failed to create HTTP client: {}", e))?;
        let poster = reqwest::Client::builder()
            .timeout(call_timeout)
            .build()
            .map_err(|e| format!("Failed to create HTTP client: {}", e))?;

        let response = streamer
            .get(sse_url)
            .header("Accept", "text/event-stream")
            .send()
            .await
            .map_err(|e| format!("failed to open SSE stream at '{}': {}", sse_url, e))?;
        if !response.status().is_success() {
            return Err(format!(
                "SSE endpoint '{}' returned status {}",
                sse_url,
                response.status()
            ));
        }

        let pending: Arc<DashMap<u64, oneshot::Sender<JsonRpcResponse>>> =
            Arc::new(DashMap::new());
        let (endpoint_tx, endpoint_rx) = oneshot::channel::<String>();

        let base_url = sse_url.to_string();
        let routing = pending.clone();
        let server_name = name.to_string();
        let reader = tokio::spawn(async move {
            let mut endpoint_tx = Some(endpoint_tx);
            let mut stream = response.bytes_stream();
            let mut buffer = String::new();

            while let Some(chunk) = stream.next().await {
                let chunk = match chunk {
                    Ok(c) => c,
                    Err(e) => {
                        log::error!("[SSE:{}] stream error: {}", server_name, e);
                        break;
                    }
                };
                buffer.push_str(&String::from_utf8_lossy(&chunk));

                // Events are separated by a blank line
                while let Some(split) = buffer.find("\n\n") {
                    let raw = buffer[..split].to_string();
                    buffer.drain(..split + 2);
                    let event = parse_sse_event(&raw);

                    match event.event.as_str() {
                        "endpoint" => {
                            if let Some(tx) = endpoint_tx.take() {
                                match resolve_endpoint(&base_url, &event.data) {
                                    Ok(resolved) => {
                                        let _ = tx.send(resolved);
                                    }
                                    Err(e) => {
                                        log::error!("[SSE:{}] bad endpoint event: {}", server_name, e);
                                    }
                                }
                            }
                        }
                        "message" | "" => {
                            route_message(&server_name, &routing, &event.data);
                        }
                        other => {
                            log::debug!("[SSE:{}] ignoring event '{}'", server_name, other);
                        }
                    }
                }
            }
            log::warn!("[SSE:{}] event stream closed", server_name);
        });

        let message_url = match tokio::time::timeout(call_timeout, endpoint_rx).await {
            Ok(Ok(url)) => url,
            Ok(Err(_)) => {
                reader.abort();
                return Err(format!(
                    "SSE stream for '{}' closed before endpoint event",
                    sse_url
                ));
            }
            Err(_) => {
                reader.abort();
                return Err(format!(
                    "timed out waiting for endpoint event from '{}'",
                    sse_url
                ));
            }
        };

        let client = Self {
            name: name.to_string(),
            message_url,
            poster,
            pending,
            next_id: Arc::new(AtomicU64::new(1)),
            reader,
            call_timeout,
        };

        let client_name = format!("mcp-bridge-{}", name);
        client
            .request("initialize", Some(initialize_params(&client_name)))
            .await
            .map_err(|e| format!("initialize failed for upstream '{}': {}", name, e))?;

        Ok(client)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, String> {
        let result = self.request("tools/list", None).await?;
        let listed: ListToolsResult = serde_json::from_value(result)
            .map_err(|e| format!("Malformed tools/list result from '{}': {}", self.name, e))?;
        Ok(listed.tools)
    }

    /// Forward one tool call and return the raw result value, leaving
    /// content untouched for relaying.
    pub async fn call_tool_raw(
        &self,
        tool_name: &str,
        arguments: Map<String, Value>,
    ) -> Result<CallToolResult, String> {
        let params = json!({"name": tool_name, "arguments": arguments});
        let result = self.request("tools/call", Some(params)).await?;
        serde_json::from_value(result)
            .map_err(|e| format!("Malformed tools/call result from '{}': {}", self.name, e))
    }

    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value, String> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let request = JsonRpcRequest::new(id, method, params);

        let (tx, rx) = oneshot::channel();
        self.pending.insert(id, tx);

        let posted = self
            .poster
            .post(&self.message_url)
            .json(&request)
            .send()
            .await;
        if let Err(e) = posted {
            self.pending.remove(&id);
            return Err(format!("failed to post to '{}': {}", self.message_url, e));
        }

        let response = match tokio::time::timeout(self.call_timeout, rx).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => {
                return Err(format!("upstream '{}' dropped the response channel", self.name));
            }
            Err(_) => {
                self.pending.remove(&id);
                return Err(format!(
                    "timed out after {:?} waiting for '{}' response",
                    self.call_timeout, method
                ));
            }
        };

        if let Some(error) = response.error {
            return Err(format!("MCP error {}: {}", error.code, error.message));
        }

        Ok(response.result.unwrap_or(Value::Null))
    }
}

/// Parse the `event:`/`data:` fields out of one raw SSE block
fn parse_sse_event(raw: &str) -> SseEvent {
    let mut event = SseEvent::default();
    let mut data_lines = Vec::new();
    for line in raw.lines() {
        if let Some(rest) = line.strip_prefix("event:") {
            event.event = rest.trim().to_string();
        } else if let Some(rest) = line.strip_prefix("data:") {
            data_lines.push(rest.trim_start().trim_end_matches('\r').to_string());
        }
    }
    event.data = data_lines.join("\n");
    event
}

/// The endpoint event carries either an absolute URL or a path
/// relative to the stream origin.
fn resolve_endpoint(sse_url: &str, endpoint: &str) -> Result<String, String> {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        return Ok(endpoint.to_string());
    }
    let base = Url::parse(sse_url).map_err(|e| format!("invalid SSE url '{}': {}", sse_url, e))?;
    base.join(endpoint)
        .map(|u| u.to_string())
        .map_err(|e| format!("invalid endpoint '{}': {}", endpoint, e))
}

fn route_message(
    server_name: &str,
    pending: &DashMap<u64, oneshot::Sender<JsonRpcResponse>>,
    data: &str,
) {
    if data.trim().is_empty() {
        return;
    }
    let response: JsonRpcResponse = match serde_json::from_str(data) {
        Ok(r) => r,
        Err(e) => {
            log::warn!("[SSE:{}] unparseable message event: {}", server_name, e);
            return;
        }
    };
    let Some(id) = response.id.as_ref().and_then(|v| v.as_u64()) else {
        log::debug!("[SSE:{}] message without numeric id, ignoring", server_name);
        return;
    };
    if let Some((_, tx)) = pending.remove(&id) {
        let _ = tx.send(response);
    } else {
        log::warn!("[SSE:{}] response for unknown id {}", server_name, id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_event_and_multiline_data() {
        let raw = "event: message\ndata: {\"a\":\ndata: 1}";
        let event = parse_sse_event(raw);
        assert_eq!(event.event, "message");
        assert_eq!(event.data, "{\"a\":\n1}");
    }

    #[test]
    fn resolves_relative_endpoint_against_stream_origin() {
        let resolved =
            resolve_endpoint("http://localhost:3003/sse", "/messages?sessionId=abc").unwrap();
        assert_eq!(resolved, "http://localhost:3003/messages?sessionId=abc");
    }

    #[test]
    fn keeps_absolute_endpoint_as_is() {
        let resolved =
            resolve_endpoint("http://localhost:3003/sse", "http://other:9999/messages").unwrap();
        assert_eq!(resolved, "http://other:9999/messages");
    }

    #[test]
    fn routes_message_to_pending_caller() {
        let pending: DashMap<u64, oneshot::Sender<JsonRpcResponse>> = DashMap::new();
        let (tx, mut rx) = oneshot::channel();
        pending.insert(7, tx);

        route_message(
            "test",
            &pending,
            r#"{"jsonrpc":"2.0","id":7,"result":{"ok":true}}"#,
        );

        let response = rx.try_recv().unwrap();
        assert_eq!(response.result.unwrap()["ok"], true);
        assert!(pending.is_empty());
    }
}
