pub mod http_client;
pub mod protocol;
pub mod server;
pub mod sse_client;

pub use http_client::McpHttpClient;
pub use protocol::{CallToolResult, JsonRpcRequest, JsonRpcResponse, ToolDescriptor};
pub use server::{McpServer, ToolHandler, mcp_endpoint};
pub use sse_client::McpSseClient;
