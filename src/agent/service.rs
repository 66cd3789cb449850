//! One self-contained agent run: guarantee the wallet, discover the
//! tool set fresh, drive the loop, sanitize, and post the reply when a
//! target was given.

use crate::agent::executor::{AgentError, AgentExecutor};
use crate::agent::{prompt, sanitize_final_answer};
use crate::ai::ReasoningBackend;
use crate::config::Config;
use crate::mcp::McpHttpClient;
use crate::tools::{PostReplyTool, discover_all};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// X replies get truncated to fit the platform limit
const MAX_TWEET_LEN: usize = 270;

pub struct AgentService {
    config: Config,
    backend: Arc<dyn ReasoningBackend>,
}

impl AgentService {
    pub fn new(config: Config, backend: Arc<dyn ReasoningBackend>) -> Self {
        Self { config, backend }
    }

    /// Run the agent for one inbound request. With `reply_to` set the
    /// sanitized answer is also posted under that tweet.
    pub async fn answer(
        &self,
        question: &str,
        external_id: &str,
        reply_to: Option<&str>,
        mentioned_ids: &[String],
        cancel: CancellationToken,
    ) -> Result<String, AgentError> {
        let timeout = crate::config::mcp_timeout();

        // The posting backend is privileged: without it a reply-required
        // run cannot complete at all.
        let x_client = match &self.config.x_mcp_url {
            Some(url) => match McpHttpClient::connect("x", url, timeout).await {
                Ok(client) => Some(client),
                Err(e) => {
                    log::warn!("[AGENT] X backend unavailable: {}", e);
                    None
                }
            },
            None => None,
        };
        if reply_to.is_some() && x_client.is_none() {
            return Err(plain_error(
                "reply requested but the X backend is not available",
            ));
        }

        // Guarantee a wallet exists before the loop runs, so identity-
        // scoped tools always find a record. Failure is logged, not
        // fatal: the loop can still create one through the tool.
        if let Some(url) = &self.config.wallet_mcp_url {
            match McpHttpClient::connect("wallet", url, timeout).await {
                Ok(client) => {
                    let mut arguments = serde_json::Map::new();
                    arguments.insert(
                        "twitter_id".to_string(),
                        serde_json::Value::String(external_id.to_string()),
                    );
                    match client.call_tool("create_wallet", arguments).await {
                        Ok(address) => {
                            log::info!("[AGENT] wallet ensured for {}: {}", external_id, address)
                        }
                        Err(e) => log::warn!("[AGENT] failed to ensure wallet: {}", e),
                    }
                }
                Err(e) => log::warn!("[AGENT] wallet backend unavailable: {}", e),
            }
        }

        // Fresh discovery on every run; failed backends are omitted.
        let mut registry = discover_all(&self.config.backend_endpoints(), timeout).await;
        if let Some(client) = &x_client {
            registry.register(Arc::new(PostReplyTool::new(client.clone())));
        }
        log::info!("[AGENT] registry holds {} tools", registry.len());

        let task = prompt::build_task_prompt(question, external_id, reply_to, mentioned_ids);
        log::debug!("[AGENT] task prompt: {}", task);

        let executor = AgentExecutor::new(self.backend.clone(), registry)
            .with_cancellation(cancel);
        let run = executor.run(&task).await?;

        let answer = sanitize_final_answer(&run.answer);

        if let (Some(tweet_id), Some(client)) = (reply_to, &x_client) {
            if answer.is_empty() {
                return Err(plain_error("agent produced empty answer; cannot post reply"));
            }
            let truncated = truncate_reply(&answer);
            let poster = PostReplyTool::new(client.clone());
            poster
                .post(tweet_id, &truncated)
                .await
                .map_err(|e| AgentError {
                    message: format!("failed to post reply: {}", e),
                    partial_output: Some(answer.clone()),
                })?;
            log::info!("[AGENT] posted reply under tweet {}", tweet_id);
        }

        Ok(answer)
    }
}

fn plain_error(message: &str) -> AgentError {
    AgentError {
        message: message.to_string(),
        partial_output: None,
    }
}

/// Best-effort truncation to the platform limit, in characters
fn truncate_reply(answer: &str) -> String {
    let chars: Vec<char> = answer.chars().collect();
    if chars.len() > MAX_TWEET_LEN {
        let mut cut: String = chars[..MAX_TWEET_LEN].iter().collect();
        cut.push('…');
        cut
    } else {
        answer.to_string()
    }
}
