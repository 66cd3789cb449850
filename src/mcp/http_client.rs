//! Request/response HTTP transport for the tool-invocation protocol.
//!
//! One client per backend server. The capability handshake happens in
//! `connect`; afterwards the client only issues `tools/list` and
//! `tools/call`.

use crate::mcp::protocol::{
    CallToolResult, JsonRpcRequest, JsonRpcResponse, ListToolsResult, ToolDescriptor,
    initialize_params,
};
use reqwest::Client;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct McpHttpClient {
    name: String,
    base_url: String,
    client: Client,
    next_id: Arc<AtomicU64>,
}

impl McpHttpClient {
    /// Perform the capability handshake against `base_url` and return
    /// a ready client. The initialize response body is discarded; only
    /// transport and protocol-level errors matter here.
    pub async fn connect(name: &str, base_url: &str, timeout: Duration) -> Result<Self, String> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| format!("Failed to create HTTP client: {}", e))?;

        let mcp = Self {
            name: name.to_string(),
            base_url: base_url.to_string(),
            client,
            next_id: Arc::new(AtomicU64::new(1)),
        };

        let client_name = format!("mentions-agent-{}", name);
        mcp.request("initialize", Some(initialize_params(&client_name)))
            .await
            .map_err(|e| format!("initialize failed for backend '{}': {}", name, e))?;

        Ok(mcp)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// List the tools the backend advertises
    pub async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, String> {
        let result = self.request("tools/list", None).await?;
        let listed: ListToolsResult = serde_json::from_value(result)
            .map_err(|e| format!("Malformed tools/list result from '{}': {}", self.name, e))?;
        Ok(listed.tools)
    }

    /// Invoke one tool and return the concatenated text of the result
    pub async fn call_tool(
        &self,
        tool_name: &str,
        arguments: Map<String, Value>,
    ) -> Result<String, String> {
        let params = json!({"name": tool_name, "arguments": arguments});
        let result = self.request("tools/call", Some(params)).await?;
        let call_result: CallToolResult = serde_json::from_value(result)
            .map_err(|e| format!("Malformed tools/call result from '{}': {}", self.name, e))?;
        Ok(call_result.joined_text())
    }

    /// Send one JSON-RPC request and return its `result` value.
    /// A top-level `error` supersedes whatever `result` carries.
    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value, String> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let request = JsonRpcRequest::new(id, method, params);

        let http_response = self
            .client
            .post(&self.base_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| format!("request to '{}' failed: {}", self.base_url, e))?;

        let status = http_response.status();
        if !status.is_success() {
            return Err(format!("backend '{}' returned status {}", self.name, status));
        }

        let response: JsonRpcResponse = http_response
            .json()
            .await
            .map_err(|e| format!("failed to decode response from '{}': {}", self.name, e))?;

        if let Some(error) = response.error {
            return Err(format!("MCP error {}: {}", error.code, error.message));
        }

        Ok(response.result.unwrap_or(Value::Null))
    }
}
