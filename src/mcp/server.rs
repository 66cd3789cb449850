//! Stateless MCP server core: method dispatch over registered tools.
//!
//! The actix binaries mount `mcp_endpoint` at POST /mcp and hand every
//! JSON-RPC request to `McpServer::handle`. Tool handlers report
//! failures as tool results (`isError`), not protocol errors, so the
//! calling agent sees the failure text as an observation.

use crate::mcp::protocol::{
    CallToolParams, CallToolResult, ERR_INVALID_PARAMS, ERR_METHOD_NOT_FOUND, JsonRpcRequest,
    JsonRpcResponse, PROTOCOL_VERSION, ToolDescriptor,
};
use actix_web::{HttpResponse, Responder, web};
use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::sync::Arc;

#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, arguments: Map<String, Value>) -> Result<String, String>;

    /// Full-result variant; the default wraps `call`'s text or error.
    /// Relaying handlers override this to pass upstream results
    /// through unchanged.
    async fn call_raw(&self, arguments: Map<String, Value>) -> Result<CallToolResult, String> {
        Ok(match self.call(arguments).await {
            Ok(text) => CallToolResult::text(text),
            Err(e) => CallToolResult::error(e),
        })
    }
}

struct RegisteredTool {
    descriptor: ToolDescriptor,
    handler: Arc<dyn ToolHandler>,
}

pub struct McpServer {
    name: String,
    tools: Vec<RegisteredTool>,
}

impl McpServer {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            tools: Vec::new(),
        }
    }

    pub fn add_tool(&mut self, descriptor: ToolDescriptor, handler: Arc<dyn ToolHandler>) {
        self.tools.push(RegisteredTool {
            descriptor,
            handler,
        });
    }

    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }

    pub async fn handle(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        // Notifications carry no id and get no response
        let id = request.id.clone()?;

        let response = match request.method.as_str() {
            "initialize" => JsonRpcResponse::result(
                Some(id),
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {"tools": {}},
                    "serverInfo": {"name": self.name, "version": env!("CARGO_PKG_VERSION")},
                }),
            ),
            "tools/list" => {
                let tools: Vec<&ToolDescriptor> =
                    self.tools.iter().map(|t| &t.descriptor).collect();
                JsonRpcResponse::result(Some(id), json!({ "tools": tools }))
            }
            "tools/call" => self.handle_call(id, request.params).await,
            other => {
                log::warn!("[MCP:{}] Unknown method '{}'", self.name, other);
                JsonRpcResponse::error(
                    Some(id),
                    ERR_METHOD_NOT_FOUND,
                    &format!("method not found: {}", other),
                )
            }
        };

        Some(response)
    }

    async fn handle_call(&self, id: Value, params: Option<Value>) -> JsonRpcResponse {
        let params: CallToolParams = match params.map(serde_json::from_value).transpose() {
            Ok(Some(p)) => p,
            Ok(None) => {
                return JsonRpcResponse::error(Some(id), ERR_INVALID_PARAMS, "missing params");
            }
            Err(e) => {
                return JsonRpcResponse::error(
                    Some(id),
                    ERR_INVALID_PARAMS,
                    &format!("invalid params: {}", e),
                );
            }
        };

        let tool = match self.tools.iter().find(|t| t.descriptor.name == params.name) {
            Some(t) => t,
            None => {
                return JsonRpcResponse::error(
                    Some(id),
                    ERR_INVALID_PARAMS,
                    &format!("unknown tool: {}", params.name),
                );
            }
        };

        log::info!("[MCP:{}] tools/call {}", self.name, params.name);
        let result = match tool.handler.call_raw(params.arguments).await {
            Ok(result) => result,
            Err(e) => {
                log::warn!("[MCP:{}] tool '{}' failed: {}", self.name, params.name, e);
                CallToolResult::error(e)
            }
        };

        match serde_json::to_value(&result) {
            Ok(value) => JsonRpcResponse::result(Some(id), value),
            Err(e) => JsonRpcResponse::error(
                Some(id),
                ERR_INVALID_PARAMS,
                &format!("failed to encode result: {}", e),
            ),
        }
    }
}

/// POST /mcp endpoint shared by every MCP server binary
pub async fn mcp_endpoint(
    server: web::Data<Arc<McpServer>>,
    body: web::Json<JsonRpcRequest>,
) -> impl Responder {
    match server.handle(body.into_inner()).await {
        Some(response) => HttpResponse::Ok().json(response),
        None => HttpResponse::Accepted().finish(),
    }
}
