//! The privileged posting tool.
//!
//! Unlike discovered tools this one keeps a fixed, unprefixed name so
//! the prompt can reference it directly, and it always targets the X
//! backend's `twitter.post_reply` capability.

use crate::mcp::McpHttpClient;
use crate::tools::Tool;
use crate::tools::discovery::parse_arguments;
use async_trait::async_trait;

pub const POST_REPLY_TOOL: &str = "x_post_reply";

pub struct PostReplyTool {
    client: McpHttpClient,
}

impl PostReplyTool {
    pub fn new(client: McpHttpClient) -> Self {
        Self { client }
    }

    /// Post directly, bypassing the reasoning loop. Used when the
    /// caller wants to guarantee the sanitized answer gets posted.
    pub async fn post(&self, in_reply_to: &str, text: &str) -> Result<String, String> {
        let mut arguments = serde_json::Map::new();
        arguments.insert(
            "in_reply_to_tweet_id".to_string(),
            serde_json::Value::String(in_reply_to.to_string()),
        );
        arguments.insert(
            "text".to_string(),
            serde_json::Value::String(text.to_string()),
        );
        self.client.call_tool("twitter.post_reply", arguments).await
    }
}

#[async_trait]
impl Tool for PostReplyTool {
    fn name(&self) -> String {
        POST_REPLY_TOOL.to_string()
    }

    fn description(&self) -> String {
        "Reply under a tweet via the X backend. Input JSON: \
         {\"in_reply_to_tweet_id\":\"...\",\"text\":\"...\"}"
            .to_string()
    }

    async fn call(&self, input: &str) -> Result<String, String> {
        let arguments = parse_arguments(input);
        self.client.call_tool("twitter.post_reply", arguments).await
    }
}
