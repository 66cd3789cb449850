//! Per-backend tool discovery and aggregation.
//!
//! Each configured backend gets a capability handshake followed by
//! `tools/list`; every advertised descriptor is wrapped as a
//! [`RemoteTool`] under a backend-prefixed name. A backend that fails
//! to handshake or list is logged and left out; partial availability
//! never aborts the discovery phase.

use crate::config::BackendEndpoint;
use crate::mcp::McpHttpClient;
use crate::mcp::protocol::ToolDescriptor;
use crate::tools::{Tool, ToolRegistry};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

/// A discovered backend tool exposed under a namespaced name
pub struct RemoteTool {
    client: McpHttpClient,
    remote_name: String,
    exposed_name: String,
    description: String,
}

impl RemoteTool {
    pub fn from_descriptor(client: McpHttpClient, descriptor: ToolDescriptor) -> Self {
        let backend = client.name().to_string();
        let mut description = format!("[{}] {}", backend, descriptor.description);
        // Embed the declared schema so a text-only reasoning backend
        // can still produce well-formed arguments.
        if let Some(schema) = &descriptor.input_schema {
            if let Ok(schema_json) = serde_json::to_string(schema) {
                description = format!("{}\n\nInput JSON schema: {}", description, schema_json);
            }
        }
        Self {
            client,
            exposed_name: format!("{}_{}", backend, descriptor.name),
            remote_name: descriptor.name,
            description,
        }
    }
}

#[async_trait]
impl Tool for RemoteTool {
    fn name(&self) -> String {
        self.exposed_name.clone()
    }

    fn description(&self) -> String {
        self.description.clone()
    }

    async fn call(&self, input: &str) -> Result<String, String> {
        let arguments = parse_arguments(input);
        self.client.call_tool(&self.remote_name, arguments).await
    }
}

/// Interpret the reasoning backend's raw tool input as a JSON object;
/// anything else degrades to a single `input` string argument rather
/// than failing the turn.
pub fn parse_arguments(input: &str) -> Map<String, Value> {
    match serde_json::from_str::<Value>(input) {
        Ok(Value::Object(map)) => map,
        _ => {
            let mut map = Map::new();
            map.insert("input".to_string(), Value::String(input.to_string()));
            map
        }
    }
}

/// Discover one backend's tools; `Err` means the whole backend is
/// unavailable this run.
async fn discover_backend(
    endpoint: &BackendEndpoint,
    timeout: Duration,
) -> Result<Vec<Arc<dyn Tool>>, String> {
    let client = McpHttpClient::connect(&endpoint.name, &endpoint.url, timeout).await?;
    let descriptors = client.list_tools().await?;

    let mut tools: Vec<Arc<dyn Tool>> = Vec::with_capacity(descriptors.len());
    for descriptor in descriptors {
        if descriptor.name.is_empty() {
            continue;
        }
        tools.push(Arc::new(RemoteTool::from_descriptor(
            client.clone(),
            descriptor,
        )));
    }
    Ok(tools)
}

/// Discover every configured backend concurrently and aggregate the
/// results into one registry. Failed backends are omitted.
pub async fn discover_all(backends: &[BackendEndpoint], timeout: Duration) -> ToolRegistry {
    let futures = backends
        .iter()
        .map(|endpoint| discover_backend(endpoint, timeout));
    let results = futures_util::future::join_all(futures).await;

    let mut registry = ToolRegistry::new();
    for (endpoint, result) in backends.iter().zip(results) {
        match result {
            Ok(tools) => {
                log::info!(
                    "[DISCOVERY] backend '{}' advertised {} tools",
                    endpoint.name,
                    tools.len()
                );
                for tool in tools {
                    registry.register(tool);
                }
            }
            Err(e) => {
                log::warn!("[DISCOVERY] backend '{}' omitted: {}", endpoint.name, e);
            }
        }
    }
    registry
}
