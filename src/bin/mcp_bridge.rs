//! Protocol bridge: re-exposes a tool set discovered over a persistent
//! SSE connection as a stateless HTTP MCP server. Pure relay - same
//! tool names, same arguments, results passed through unchanged.

use actix_web::{App, HttpServer, middleware::Logger, web};
use async_trait::async_trait;
use dotenv::dotenv;
use mentions_bot::config::{defaults, env_vars};
use mentions_bot::mcp::protocol::CallToolResult;
use mentions_bot::mcp::{McpServer, McpSseClient, ToolHandler, mcp_endpoint};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

/// Forwards one tool's calls to the upstream connection
struct ForwardingHandler {
    upstream: Arc<McpSseClient>,
    tool_name: String,
}

#[async_trait]
impl ToolHandler for ForwardingHandler {
    async fn call(&self, arguments: Map<String, Value>) -> Result<String, String> {
        self.call_raw(arguments)
            .await
            .map(|result| result.joined_text())
    }

    async fn call_raw(&self, arguments: Map<String, Value>) -> Result<CallToolResult, String> {
        log::info!("[BRIDGE] forwarding tools/call {}", self.tool_name);
        self.upstream.call_tool_raw(&self.tool_name, arguments).await
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let upstream_url = std::env::var(env_vars::UPSTREAM_MCP_SSE)
        .expect("UPSTREAM_MCP_SSE is required (e.g., http://localhost:3003/sse)");
    let port: u16 = std::env::var(env_vars::PORT)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(defaults::BRIDGE_PORT);

    let call_timeout = Duration::from_secs(defaults::BRIDGE_CALL_TIMEOUT_SECS);
    let upstream = Arc::new(
        McpSseClient::connect("upstream", &upstream_url, call_timeout)
            .await
            .expect("Failed to connect to upstream MCP server"),
    );

    // Tool list is retrieved once at startup and mirrored verbatim
    let descriptors = upstream
        .list_tools()
        .await
        .expect("Failed to list tools from upstream");

    let mut server = McpServer::new("mcp-bridge");
    for descriptor in descriptors {
        let handler = ForwardingHandler {
            upstream: Arc::clone(&upstream),
            tool_name: descriptor.name.clone(),
        };
        server.add_tool(descriptor, Arc::new(handler));
    }
    let server = Arc::new(server);

    log::info!(
        "mcp-bridge serving {} tools on :{}/mcp (forwarding to SSE {})",
        server.tool_count(),
        port,
        upstream_url
    );

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(Arc::clone(&server)))
            .wrap(Logger::default())
            .route("/mcp", web::post().to(mcp_endpoint))
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
