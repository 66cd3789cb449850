//! Wallet capabilities exposed as MCP tools.
//!
//! These handlers are what the reasoning loop discovers from the
//! wallet backend; each maps a tool invocation onto the lifecycle
//! service or the signer.

use crate::mcp::protocol::ToolDescriptor;
use crate::mcp::server::{McpServer, ToolHandler};
use crate::wallet::service::WalletService;
use crate::wallet::signer::{TxSigner, parse_calldata, parse_u256};
use async_trait::async_trait;
use ethers::types::U256;
use serde_json::{Map, Value, json};
use std::sync::Arc;

fn require_str(arguments: &Map<String, Value>, key: &str) -> Result<String, String> {
    arguments
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("missing required parameter: {}", key))
}

fn optional_str(arguments: &Map<String, Value>, key: &str) -> Option<String> {
    arguments
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn object_schema(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

struct CreateWalletHandler {
    service: Arc<WalletService>,
}

#[async_trait]
impl ToolHandler for CreateWalletHandler {
    async fn call(&self, arguments: Map<String, Value>) -> Result<String, String> {
        let twitter_id = require_str(&arguments, "twitter_id")?;
        let record = self
            .service
            .create_or_get(&twitter_id)
            .map_err(|e| format!("failed to create wallet: {}", e))?;
        Ok(record.keys.eth.public_address)
    }
}

struct ReadWalletHandler {
    service: Arc<WalletService>,
}

#[async_trait]
impl ToolHandler for ReadWalletHandler {
    async fn call(&self, arguments: Map<String, Value>) -> Result<String, String> {
        let twitter_id = require_str(&arguments, "twitter_id")?;
        match self.service.get(&twitter_id)? {
            Some(record) => Ok(record.keys.eth.public_address),
            None => Err("user not found".to_string()),
        }
    }
}

struct WalletBalanceHandler {
    signer: Arc<TxSigner>,
}

#[async_trait]
impl ToolHandler for WalletBalanceHandler {
    async fn call(&self, arguments: Map<String, Value>) -> Result<String, String> {
        let twitter_id = require_str(&arguments, "twitter_id")?;
        let chain_id = optional_str(&arguments, "chain_id").unwrap_or_default();
        let balance = self.signer.balance(&chain_id, &twitter_id).await?;
        Ok(balance.to_string())
    }
}

struct SignTransactionHandler {
    signer: Arc<TxSigner>,
}

#[async_trait]
impl ToolHandler for SignTransactionHandler {
    async fn call(&self, arguments: Map<String, Value>) -> Result<String, String> {
        let chain_id = require_str(&arguments, "chain_id")?;
        let to_address = require_str(&arguments, "to_address")?;
        let twitter_id = require_str(&arguments, "twitter_id")?;
        let data = match optional_str(&arguments, "data") {
            Some(raw) => parse_calldata(&raw)?,
            None => Vec::new(),
        };
        let value = match optional_str(&arguments, "value") {
            Some(raw) => parse_u256(&raw).map_err(|_| "invalid value parameter".to_string())?,
            None => U256::zero(),
        };

        self.signer
            .sign_and_submit(&chain_id, &twitter_id, &to_address, data, value)
            .await
    }
}

struct TransferAssetHandler {
    signer: Arc<TxSigner>,
}

#[async_trait]
impl ToolHandler for TransferAssetHandler {
    async fn call(&self, arguments: Map<String, Value>) -> Result<String, String> {
        let chain_id = require_str(&arguments, "chain_id")?;
        let to_address = require_str(&arguments, "to_address")?;
        let twitter_id = require_str(&arguments, "twitter_id")?;
        let amount = parse_u256(&require_str(&arguments, "amount")?)
            .map_err(|_| "invalid amount parameter".to_string())?;

        self.signer
            .transfer(&chain_id, &twitter_id, &to_address, amount)
            .await
    }
}

/// Assemble the wallet MCP server with its full toolset
pub fn build_wallet_server(service: Arc<WalletService>, signer: Arc<TxSigner>) -> McpServer {
    let mut server = McpServer::new("wallet-mcp");

    server.add_tool(
        ToolDescriptor {
            name: "create_wallet".to_string(),
            description: "Create a new wallet for a given Twitter ID, or return an existing \
                          wallet if one already exists."
                .to_string(),
            input_schema: Some(object_schema(
                json!({
                    "twitter_id": {"type": "string", "description": "Twitter id of the user"},
                }),
                &["twitter_id"],
            )),
        },
        Arc::new(CreateWalletHandler {
            service: service.clone(),
        }),
    );

    server.add_tool(
        ToolDescriptor {
            name: "read_wallet".to_string(),
            description: "Read a wallet's public address for the current Twitter ID".to_string(),
            input_schema: Some(object_schema(
                json!({
                    "twitter_id": {"type": "string", "description": "Twitter id of the user"},
                }),
                &["twitter_id"],
            )),
        },
        Arc::new(ReadWalletHandler { service }),
    );

    server.add_tool(
        ToolDescriptor {
            name: "wallet_balance".to_string(),
            description: "Get the native token balance (in wei) of the user's wallet".to_string(),
            input_schema: Some(object_schema(
                json!({
                    "twitter_id": {"type": "string", "description": "Twitter id of the user"},
                    "chain_id": {"type": "string", "description": "Chain ID to query; defaults to the configured RPC"},
                }),
                &["twitter_id"],
            )),
        },
        Arc::new(WalletBalanceHandler {
            signer: signer.clone(),
        }),
    );

    server.add_tool(
        ToolDescriptor {
            name: "sign_transaction".to_string(),
            description: "Sign and submit a transaction".to_string(),
            input_schema: Some(object_schema(
                json!({
                    "chain_id": {"type": "string", "description": "Chain ID to use"},
                    "to_address": {"type": "string", "description": "Destination address"},
                    "data": {"type": "string", "description": "Hex-encoded transaction data. If you don't have any data, send empty byte array"},
                    "value": {"type": "string", "description": "Amount of native token to send (in wei). If you don't send anything, use 0"},
                    "twitter_id": {"type": "string", "description": "Twitter id of the user"},
                }),
                &["chain_id", "to_address", "twitter_id"],
            )),
        },
        Arc::new(SignTransactionHandler {
            signer: signer.clone(),
        }),
    );

    server.add_tool(
        ToolDescriptor {
            name: "transfer_asset".to_string(),
            description: "Transfer native tokens from the user's wallet to a destination address"
                .to_string(),
            input_schema: Some(object_schema(
                json!({
                    "chain_id": {"type": "string", "description": "Chain ID to use"},
                    "to_address": {"type": "string", "description": "Destination address"},
                    "amount": {"type": "string", "description": "Amount of native token to send (in wei)"},
                    "twitter_id": {"type": "string", "description": "Twitter id of the user"},
                }),
                &["chain_id", "to_address", "amount", "twitter_id"],
            )),
        },
        Arc::new(TransferAssetHandler { signer }),
    );

    server
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::protocol::{CallToolResult, JsonRpcRequest};
    use crate::wallet::store::WalletStore;

    fn wallet_server() -> (McpServer, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wallets.db");
        let store = Arc::new(WalletStore::new(path.to_str().unwrap()).unwrap());
        let service = Arc::new(WalletService::new(store));
        let signer = Arc::new(TxSigner::new(service.clone()));
        (build_wallet_server(service, signer), dir)
    }

    async fn call(server: &McpServer, name: &str, arguments: Value) -> CallToolResult {
        let params = json!({"name": name, "arguments": arguments});
        let response = server
            .handle(JsonRpcRequest::new(1, "tools/call", Some(params)))
            .await
            .unwrap();
        serde_json::from_value(response.result.unwrap()).unwrap()
    }

    #[tokio::test]
    async fn wallet_server_lists_all_five_tools() {
        let (server, _dir) = wallet_server();
        assert_eq!(server.tool_count(), 5);
    }

    #[tokio::test]
    async fn create_wallet_is_idempotent_through_the_tool() {
        let (server, _dir) = wallet_server();

        let first = call(&server, "create_wallet", json!({"twitter_id": "u1"})).await;
        assert!(first.is_error.is_none());
        let address = first.joined_text();
        assert!(address.starts_with("0x"));

        let second = call(&server, "create_wallet", json!({"twitter_id": "u1"})).await;
        assert_eq!(second.joined_text(), address);

        let third = call(&server, "create_wallet", json!({"twitter_id": "u2"})).await;
        assert_ne!(third.joined_text(), address);
    }

    #[tokio::test]
    async fn read_wallet_unknown_user_is_tool_error() {
        let (server, _dir) = wallet_server();
        let result = call(&server, "read_wallet", json!({"twitter_id": "ghost"})).await;
        assert_eq!(result.is_error, Some(true));
        assert_eq!(result.joined_text(), "user not found");
    }

    #[tokio::test]
    async fn missing_twitter_id_is_reported() {
        let (server, _dir) = wallet_server();
        let result = call(&server, "create_wallet", json!({})).await;
        assert_eq!(result.is_error, Some(true));
        assert!(result.joined_text().contains("twitter_id"));
    }

    #[tokio::test]
    async fn transfer_requires_valid_amount() {
        let (server, _dir) = wallet_server();
        call(&server, "create_wallet", json!({"twitter_id": "u1"})).await;

        let result = call(
            &server,
            "transfer_asset",
            json!({
                "chain_id": "97",
                "to_address": "0x000000000000000000000000000000000000dead",
                "amount": "not-a-number",
                "twitter_id": "u1",
            }),
        )
        .await;
        assert_eq!(result.is_error, Some(true));
        assert!(result.joined_text().contains("invalid amount"));
    }
}
