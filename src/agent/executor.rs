//! Bounded think/act/observe loop.
//!
//! States: Thinking -> Acting -> Observing -> (Thinking | Done |
//! Failed). The loop is strictly sequential; every tool call's text
//! (or error text) flows back into the transcript as an observation.
//! Side effects of already-invoked tools stand even if a later turn
//! fails.

use crate::agent::action::{AgentDirective, parse_directive};
use crate::ai::{Message, ReasoningBackend};
use crate::tools::ToolRegistry;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// One completed think/act/observe cycle
#[derive(Debug, Clone)]
pub struct AgentStep {
    pub tool: String,
    pub input: String,
    pub observation: String,
}

#[derive(Debug, Clone)]
pub struct AgentRun {
    pub answer: String,
    pub steps: Vec<AgentStep>,
}

/// Loop failure, carrying whatever partial text exists so callers can
/// still surface it next to the error.
#[derive(Debug, Clone)]
pub struct AgentError {
    pub message: String,
    pub partial_output: Option<String>,
}

impl std::fmt::Display for AgentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

enum LoopState {
    Thinking,
    Acting {
        completion: String,
        tool: String,
        input: String,
    },
    Observing {
        completion: String,
        step: AgentStep,
    },
    Done {
        answer: String,
    },
    Failed {
        message: String,
    },
}

pub struct AgentExecutor {
    backend: Arc<dyn ReasoningBackend>,
    registry: ToolRegistry,
    system_prompt: String,
    max_iterations: usize,
    max_parse_retries: usize,
    cancel: CancellationToken,
}

impl AgentExecutor {
    pub fn new(backend: Arc<dyn ReasoningBackend>, registry: ToolRegistry) -> Self {
        let system_prompt = crate::agent::prompt::render_system_prompt(&registry);
        Self {
            backend,
            registry,
            system_prompt,
            max_iterations: crate::config::max_iterations(),
            max_parse_retries: crate::config::defaults::MAX_PARSE_RETRIES,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_max_parse_retries(mut self, max_parse_retries: usize) -> Self {
        self.max_parse_retries = max_parse_retries;
        self
    }

    /// Cooperative cancellation: no further turns are scheduled once
    /// the token fires, but nothing already submitted is reversed.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Drive the loop to a final answer or a failure
    pub async fn run(&self, task: &str) -> Result<AgentRun, AgentError> {
        let mut state = LoopState::Thinking;
        let mut steps: Vec<AgentStep> = Vec::new();
        let mut scratchpad = String::new();
        let mut iterations = 0usize;
        let mut parse_failures = 0usize;

        loop {
            state = match state {
                LoopState::Thinking => {
                    if self.cancel.is_cancelled() {
                        LoopState::Failed {
                            message: "agent run cancelled".to_string(),
                        }
                    } else if iterations >= self.max_iterations {
                        LoopState::Failed {
                            message: format!(
                                "agent exceeded {} iterations without a final answer",
                                self.max_iterations
                            ),
                        }
                    } else {
                        let messages = vec![
                            Message::system(self.system_prompt.clone()),
                            Message::user(format!("Question: {}\n{}Thought:", task, scratchpad)),
                        ];
                        match self.backend.complete(messages).await {
                            Err(e) => LoopState::Failed {
                                message: format!("reasoning backend error: {}", e),
                            },
                            Ok(completion) => match parse_directive(&completion) {
                                Ok(AgentDirective::Finish { answer }) => {
                                    LoopState::Done { answer }
                                }
                                Ok(AgentDirective::Act { tool, input }) => {
                                    parse_failures = 0;
                                    LoopState::Acting {
                                        completion,
                                        tool,
                                        input,
                                    }
                                }
                                Err(parse_error) => {
                                    parse_failures += 1;
                                    log::warn!(
                                        "[AGENT] parse failure {}/{}: {}",
                                        parse_failures,
                                        self.max_parse_retries,
                                        parse_error
                                    );
                                    if parse_failures > self.max_parse_retries {
                                        LoopState::Failed {
                                            message: format!(
                                                "unparseable agent output after {} corrective attempts: {}",
                                                self.max_parse_retries, parse_error
                                            ),
                                        }
                                    } else {
                                        // Corrective re-prompt: the
                                        // format reminder goes back as
                                        // an observation.
                                        scratchpad.push_str(&format!(
                                            "Thought: {}\nObservation: Invalid format. Either use\nAction: <tool name>\nAction Input: <tool input>\nor finish with\nFinal Answer: <answer>\n",
                                            strip_thought_label(&completion)
                                        ));
                                        LoopState::Thinking
                                    }
                                }
                            },
                        }
                    }
                }

                LoopState::Acting {
                    completion,
                    tool,
                    input,
                } => {
                    let observation = match self.registry.get(&tool) {
                        None => {
                            log::warn!("[AGENT] unknown tool requested: {}", tool);
                            format!("{} is not a valid tool, try another one.", tool)
                        }
                        Some(found) => {
                            log::info!("[AGENT] calling tool '{}'", tool);
                            match found.call(&input).await {
                                Ok(text) => text,
                                Err(e) => {
                                    log::warn!("[AGENT] tool '{}' failed: {}", tool, e);
                                    format!("Tool error: {}", e)
                                }
                            }
                        }
                    };
                    LoopState::Observing {
                        completion,
                        step: AgentStep {
                            tool,
                            input,
                            observation,
                        },
                    }
                }

                LoopState::Observing { completion, step } => {
                    scratchpad.push_str(&format!(
                        "Thought: {}\nObservation: {}\n",
                        strip_thought_label(&completion),
                        step.observation
                    ));
                    steps.push(step);
                    iterations += 1;
                    LoopState::Thinking
                }

                LoopState::Done { answer } => {
                    log::info!("[AGENT] finished after {} tool calls", steps.len());
                    return Ok(AgentRun { answer, steps });
                }

                LoopState::Failed { message } => {
                    let partial_output = steps.last().map(|s| s.observation.clone());
                    return Err(AgentError {
                        message,
                        partial_output,
                    });
                }
            };
        }
    }
}

/// Completions are primed with a trailing "Thought:", so a model that
/// echoes the label back would otherwise double it in the transcript.
fn strip_thought_label(completion: &str) -> &str {
    let trimmed = completion.trim();
    trimmed
        .strip_prefix("Thought:")
        .map(str::trim_start)
        .unwrap_or(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::Tool;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Scripted backend: returns canned completions in order and
    /// records every prompt it was given.
    struct ScriptedBackend {
        responses: Mutex<Vec<String>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedBackend {
        fn new(responses: Vec<&str>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.iter().rev().map(|s| s.to_string()).collect()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ReasoningBackend for ScriptedBackend {
        async fn complete(&self, messages: Vec<Message>) -> Result<String, String> {
            let prompt = messages
                .last()
                .map(|m| m.content.clone())
                .unwrap_or_default();
            self.prompts.lock().unwrap().push(prompt);
            self.responses
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| "script exhausted".to_string())
        }
    }

    struct RecordingTool {
        name: &'static str,
        reply: &'static str,
        calls: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Tool for RecordingTool {
        fn name(&self) -> String {
            self.name.to_string()
        }
        fn description(&self) -> String {
            "test tool".to_string()
        }
        async fn call(&self, input: &str) -> Result<String, String> {
            self.calls.lock().unwrap().push(input.to_string());
            Ok(self.reply.to_string())
        }
    }

    fn registry_with(tool: RecordingTool) -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(tool));
        registry
    }

    #[tokio::test]
    async fn tool_call_then_final_answer() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let registry = registry_with(RecordingTool {
            name: "wallet_read_wallet",
            reply: "0xabc",
            calls: calls.clone(),
        });
        let backend = ScriptedBackend::new(vec![
            "Thought: look it up\nAction: wallet_read_wallet\nAction Input: {\"twitter_id\":\"u1\"}",
            "Thought: done\nFinal Answer: Your address is 0xabc",
        ]);

        let executor = AgentExecutor::new(backend.clone(), registry);
        let run = executor.run("what is my wallet").await.unwrap();

        assert_eq!(run.answer, "Your address is 0xabc");
        assert_eq!(run.steps.len(), 1);
        assert_eq!(run.steps[0].observation, "0xabc");
        assert_eq!(calls.lock().unwrap().len(), 1);

        // The observation must have reached the second prompt
        let prompts = backend.prompts();
        assert!(prompts[1].contains("Observation: 0xabc"));
    }

    #[tokio::test]
    async fn unknown_tool_becomes_observation_and_loop_continues() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let registry = registry_with(RecordingTool {
            name: "wallet_read_wallet",
            reply: "0xabc",
            calls: calls.clone(),
        });
        let backend = ScriptedBackend::new(vec![
            "Action: zzz_nope\nAction Input: {}",
            "Action: wallet_read_wallet\nAction Input: {}",
            "Final Answer: found it",
        ]);

        let executor = AgentExecutor::new(backend.clone(), registry);
        let run = executor.run("q").await.unwrap();

        assert_eq!(run.answer, "found it");
        assert_eq!(run.steps.len(), 2);
        assert!(run.steps[0].observation.contains("not a valid tool"));
        // The bad name surfaced as an observation, then a real call
        // still went through.
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn never_well_formed_output_terminates_at_parse_ceiling() {
        let registry = ToolRegistry::new();
        let backend = ScriptedBackend::new(vec![
            "I refuse to follow the format",
            "still not following it",
            "nope",
            "never",
            "not once",
        ]);

        let executor = AgentExecutor::new(backend.clone(), registry)
            .with_max_parse_retries(2)
            .with_max_iterations(10);
        let err = executor.run("q").await.unwrap_err();

        assert!(err.message.contains("corrective attempts"));
        // 1 initial + 2 corrective re-prompts, never more
        assert_eq!(backend.prompts().len(), 3);
    }

    #[tokio::test]
    async fn iteration_ceiling_is_enforced() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let registry = registry_with(RecordingTool {
            name: "spin",
            reply: "again",
            calls: calls.clone(),
        });
        let backend = ScriptedBackend::new(vec![
            "Action: spin\nAction Input: {}",
            "Action: spin\nAction Input: {}",
            "Action: spin\nAction Input: {}",
            "Action: spin\nAction Input: {}",
        ]);

        let executor = AgentExecutor::new(backend, registry).with_max_iterations(3);
        let err = executor.run("q").await.unwrap_err();

        assert!(err.message.contains("exceeded 3 iterations"));
        assert_eq!(calls.lock().unwrap().len(), 3);
        // Partial output (the last observation) rides along
        assert_eq!(err.partial_output.as_deref(), Some("again"));
    }

    #[tokio::test]
    async fn backend_error_fails_the_run() {
        let registry = ToolRegistry::new();
        let backend = ScriptedBackend::new(vec![]);

        let executor = AgentExecutor::new(backend, registry);
        let err = executor.run("q").await.unwrap_err();
        assert!(err.message.contains("reasoning backend error"));
        assert!(err.partial_output.is_none());
    }

    #[tokio::test]
    async fn cancellation_stops_scheduling_turns() {
        let registry = ToolRegistry::new();
        let backend = ScriptedBackend::new(vec!["Final Answer: too late"]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let executor = AgentExecutor::new(backend.clone(), registry).with_cancellation(cancel);
        let err = executor.run("q").await.unwrap_err();

        assert!(err.message.contains("cancelled"));
        assert!(backend.prompts().is_empty());
    }
}
