use std::env;
use std::time::Duration;

/// Environment variable names - single source of truth
pub mod env_vars {
    pub const X_MCP_HTTP: &str = "X_MCP_HTTP";
    pub const WALLET_MCP_HTTP: &str = "WALLET_MCP_HTTP";
    pub const BNB_MCP_HTTP: &str = "BNB_MCP_HTTP";
    pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
    pub const OPENAI_BASE_URL: &str = "OPENAI_BASE_URL";
    pub const OPENAI_MODEL: &str = "OPENAI_MODEL";
    pub const AGENT_MAX_ITERATIONS: &str = "AGENT_MAX_ITERATIONS";
    pub const MCP_TIMEOUT_SECS: &str = "MCP_TIMEOUT_SECS";
    pub const PORT: &str = "PORT";
    pub const DATABASE_URL: &str = "DATABASE_URL";
    pub const WEBHOOK_SECRET: &str = "WEBHOOK_SECRET";
    pub const XAUTH_TOKEN: &str = "XAUTH_TOKEN";
    pub const BNB_RPC: &str = "BNB_RPC";
    pub const BNB_OP_MAINNET: &str = "BNB_OP_MAINNET";
    pub const BNB_OP_TESTNET: &str = "BNB_OP_TESTNET";
    pub const WALLET_MCP_PORT: &str = "WALLET_MCP_PORT";
    pub const UPSTREAM_MCP_SSE: &str = "UPSTREAM_MCP_SSE";
}

/// Default values
pub mod defaults {
    pub const PORT: u16 = 8080;
    pub const WALLET_MCP_PORT: u16 = 8085;
    pub const BRIDGE_PORT: u16 = 8086;
    pub const DATABASE_URL: &str = "./.db/wallets.db";
    pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
    pub const OPENAI_MODEL: &str = "gpt-4.1-mini";
    pub const MAX_ITERATIONS: usize = 10;
    pub const MAX_PARSE_RETRIES: usize = 3;
    pub const MCP_TIMEOUT_SECS: u64 = 60;
    pub const SIGNER_TIMEOUT_SECS: u64 = 120;
    pub const BRIDGE_CALL_TIMEOUT_SECS: u64 = 120;
}

/// Get the reasoning model identifier from environment or default
pub fn openai_model() -> String {
    env::var(env_vars::OPENAI_MODEL).unwrap_or_else(|_| defaults::OPENAI_MODEL.to_string())
}

/// Outbound timeout for MCP discovery and tool calls
pub fn mcp_timeout() -> Duration {
    let secs = env::var(env_vars::MCP_TIMEOUT_SECS)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(defaults::MCP_TIMEOUT_SECS);
    Duration::from_secs(secs)
}

/// Maximum think/act/observe cycles per agent run
pub fn max_iterations() -> usize {
    env::var(env_vars::AGENT_MAX_ITERATIONS)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(defaults::MAX_ITERATIONS)
}

/// Resolve the RPC endpoint for a chain id.
///
/// Known chain ids get their dedicated env var; everything else falls
/// back to BNB_RPC.
pub fn rpc_endpoint_for_chain(chain_id: &str) -> Option<String> {
    let var = match chain_id {
        "204" => env_vars::BNB_OP_MAINNET,
        "97" => env_vars::BNB_OP_TESTNET,
        _ => env_vars::BNB_RPC,
    };
    env::var(var).ok().filter(|v| !v.is_empty()).or_else(|| {
        env::var(env_vars::BNB_RPC).ok().filter(|v| !v.is_empty())
    })
}

/// One configured MCP backend endpoint
#[derive(Debug, Clone)]
pub struct BackendEndpoint {
    pub name: String,
    pub url: String,
}

#[derive(Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub x_mcp_url: Option<String>,
    pub wallet_mcp_url: Option<String>,
    pub bnb_mcp_url: Option<String>,
    pub webhook_secret: Option<String>,
    pub xauth_token: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            port: env::var(env_vars::PORT)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults::PORT),
            database_url: env::var(env_vars::DATABASE_URL)
                .unwrap_or_else(|_| defaults::DATABASE_URL.to_string()),
            x_mcp_url: env::var(env_vars::X_MCP_HTTP).ok().filter(|v| !v.is_empty()),
            wallet_mcp_url: env::var(env_vars::WALLET_MCP_HTTP)
                .ok()
                .filter(|v| !v.is_empty()),
            bnb_mcp_url: env::var(env_vars::BNB_MCP_HTTP)
                .ok()
                .filter(|v| !v.is_empty()),
            webhook_secret: env::var(env_vars::WEBHOOK_SECRET)
                .ok()
                .filter(|v| !v.is_empty()),
            xauth_token: env::var(env_vars::XAUTH_TOKEN)
                .ok()
                .filter(|v| !v.is_empty()),
        }
    }

    /// Backends to discover tools from. A missing endpoint silently
    /// disables that backend; the posting backend is listed too so the
    /// reply tool and discovery share one client per server.
    pub fn backend_endpoints(&self) -> Vec<BackendEndpoint> {
        let mut out = Vec::new();
        if let Some(url) = &self.wallet_mcp_url {
            out.push(BackendEndpoint {
                name: "wallet".to_string(),
                url: url.clone(),
            });
        }
        if let Some(url) = &self.bnb_mcp_url {
            out.push(BackendEndpoint {
                name: "bnb".to_string(),
                url: url.clone(),
            });
        }
        out
    }
}
