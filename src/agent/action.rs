//! Parsing the reasoning backend's output into directives, and
//! scrubbing reasoning scaffolding out of final answers.

use once_cell::sync::Lazy;
use regex::Regex;

/// What the reasoning backend asked for this turn
#[derive(Debug, Clone, PartialEq)]
pub enum AgentDirective {
    /// Call the named tool with the given raw input
    Act { tool: String, input: String },
    /// Stop with a final answer
    Finish { answer: String },
}

static ACTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)Action\s*:\s*(.+?)\s*Action\s*Input\s*:\s*(.*)")
        .expect("valid action regex")
});

static SCAFFOLDING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(action|action input|observation|thought|tool|intermediate steps)\s*:")
        .expect("valid scaffolding regex")
});

/// Parse one completion into a directive. `Final Answer:` wins over
/// any action text; otherwise the `Action:`/`Action Input:` pair is
/// required.
pub fn parse_directive(text: &str) -> Result<AgentDirective, String> {
    let trimmed = text.trim();

    if let Some(pos) = trimmed.find("Final Answer:") {
        let answer = trimmed[pos + "Final Answer:".len()..].trim().to_string();
        return Ok(AgentDirective::Finish { answer });
    }

    if let Some(caps) = ACTION_RE.captures(trimmed) {
        let tool = caps[1].trim().trim_matches('`').trim_matches('"').to_string();
        let input = strip_fences(caps[2].trim());
        if !tool.is_empty() {
            return Ok(AgentDirective::Act { tool, input });
        }
    }

    Err(format!(
        "could not parse agent output: {:?}",
        truncate_for_log(trimmed)
    ))
}

/// Drop surrounding code fences from a tool input block
fn strip_fences(input: &str) -> String {
    let mut s = input.trim();
    if s.starts_with("```") {
        s = s.trim_start_matches("```");
        // A language tag may follow the opening fence
        if let Some(newline) = s.find('\n') {
            let first_line = &s[..newline];
            if !first_line.trim_start().starts_with('{') && first_line.len() < 16 {
                s = &s[newline + 1..];
            }
        }
    }
    s.trim_end_matches("```").trim().to_string()
}

fn truncate_for_log(s: &str) -> String {
    const MAX: usize = 200;
    if s.chars().count() > MAX {
        let cut: String = s.chars().take(MAX).collect();
        format!("{}…", cut)
    } else {
        s.to_string()
    }
}

/// Remove ReAct artifacts so only the answer remains. Idempotent.
pub fn sanitize_final_answer(answer: &str) -> String {
    let mut s = answer.trim();
    if s.is_empty() {
        return String::new();
    }
    s = s.strip_prefix("Final Answer:").unwrap_or(s).trim();

    let filtered: Vec<&str> = s
        .lines()
        .filter(|line| !SCAFFOLDING_RE.is_match(line.trim()))
        .collect();

    filtered.join("\n").replace("```", "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_action_with_json_input() {
        let text = "Thought: I need the wallet.\nAction: wallet_create_wallet\nAction Input: {\"twitter_id\": \"u1\"}";
        let directive = parse_directive(text).unwrap();
        assert_eq!(
            directive,
            AgentDirective::Act {
                tool: "wallet_create_wallet".to_string(),
                input: "{\"twitter_id\": \"u1\"}".to_string(),
            }
        );
    }

    #[test]
    fn parses_multiline_action_input() {
        let text = "Action: x_post_reply\nAction Input: {\n  \"in_reply_to_tweet_id\": \"1\",\n  \"text\": \"hi\"\n}";
        match parse_directive(text).unwrap() {
            AgentDirective::Act { tool, input } => {
                assert_eq!(tool, "x_post_reply");
                assert!(input.contains("\"text\": \"hi\""));
            }
            other => panic!("expected Act, got {:?}", other),
        }
    }

    #[test]
    fn parses_fenced_action_input() {
        let text = "Action: wallet_read_wallet\nAction Input: ```json\n{\"twitter_id\": \"u1\"}\n```";
        match parse_directive(text).unwrap() {
            AgentDirective::Act { input, .. } => {
                assert_eq!(input, "{\"twitter_id\": \"u1\"}");
            }
            other => panic!("expected Act, got {:?}", other),
        }
    }

    #[test]
    fn final_answer_wins_over_action_text() {
        let text = "Thought: done\nFinal Answer: Your wallet is 0xabc";
        assert_eq!(
            parse_directive(text).unwrap(),
            AgentDirective::Finish {
                answer: "Your wallet is 0xabc".to_string()
            }
        );
    }

    #[test]
    fn garbage_is_a_parse_error() {
        assert!(parse_directive("I will now do something vague").is_err());
        assert!(parse_directive("").is_err());
    }

    #[test]
    fn sanitize_strips_label_and_scaffolding_lines() {
        let raw = "Final Answer: Wallet created.\nThought: that went well\nAction: none\nYour address is 0xabc";
        let clean = sanitize_final_answer(raw);
        assert_eq!(clean, "Wallet created.\nYour address is 0xabc");
        assert!(!clean.to_lowercase().contains("thought:"));
        assert!(!clean.to_lowercase().contains("action:"));
    }

    #[test]
    fn sanitize_removes_code_fences() {
        let raw = "Here you go:\n```\n0xabc\n```";
        let clean = sanitize_final_answer(raw);
        assert!(!clean.contains("```"));
        assert!(clean.contains("0xabc"));
    }

    #[test]
    fn sanitize_is_idempotent() {
        let raw = "Final Answer: done\nObservation: noise\n```code```";
        let once = sanitize_final_answer(raw);
        let twice = sanitize_final_answer(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn sanitize_passes_clean_text_through() {
        let clean = "Your balance is 5 BNB.";
        assert_eq!(sanitize_final_answer(clean), clean);
        assert_eq!(sanitize_final_answer("  padded  "), "padded");
    }

    #[test]
    fn sanitize_is_case_insensitive_on_labels() {
        let raw = "ACTION: hidden\nanswer line";
        assert_eq!(sanitize_final_answer(raw), "answer line");
    }
}
