//! Prompt assembly for the reasoning loop.
//!
//! The system prompt carries the tool catalogue and the ReAct format
//! contract; the task prompt embeds the requester's external identity
//! and, when a reply target exists, the posting instructions.

use crate::tools::ToolRegistry;
use crate::tools::post_reply::POST_REPLY_TOOL;

/// Render the system prompt listing every registered tool
pub fn render_system_prompt(registry: &ToolRegistry) -> String {
    let mut catalogue = String::new();
    for tool in registry.tools() {
        catalogue.push_str(&format!("{}: {}\n", tool.name(), tool.description()));
    }
    let tool_names = registry.names().join(", ");

    format!(
        "Answer the following questions as best you can. You have access to the following tools:\n\n\
         {catalogue}\n\
         Use the following format:\n\n\
         Question: the input question you must answer\n\
         Thought: you should always think about what to do\n\
         Action: the action to take, should be one of [{tool_names}]\n\
         Action Input: the input to the action\n\
         Observation: the result of the action\n\
         ... (this Thought/Action/Action Input/Observation can repeat N times)\n\
         Thought: I now know the final answer\n\
         Final Answer: the final answer to the original input question"
    )
}

/// Compose the task prompt. The identity always rides along so
/// identity-scoped tools act on the right record; the reply variant
/// adds the posting contract.
pub fn build_task_prompt(
    question: &str,
    external_id: &str,
    reply_to: Option<&str>,
    mentioned_ids: &[String],
) -> String {
    let mut prompt = format!("{} . User's twitter_id is {}", question.trim(), external_id);

    if !mentioned_ids.is_empty() {
        prompt = format!(
            "{} . X ids of users mentioned in the tweet: {}",
            prompt,
            mentioned_ids.join(", ")
        );
    }

    if let Some(tweet_id) = reply_to {
        prompt = format!(
            "{} Answer this question using the available tools. You are an AI agent that manages \
             user wallets via tweet commands. Your reply will be posted on X; write concise, \
             user-facing text. Never share private keys or the twitter_id in the reply. Then reply \
             to tweet {} using {}. Also user's twitter_id is {}. If a blockchain transaction is \
             executed (e.g., a transfer), include its transaction hash; for wallet creation or \
             reads, provide the wallet address.",
            prompt, tweet_id, POST_REPLY_TOOL, external_id
        );
    }

    prompt
}
