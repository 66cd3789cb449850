pub mod action;
pub mod executor;
pub mod prompt;
pub mod service;

pub use action::{AgentDirective, parse_directive, sanitize_final_answer};
pub use executor::{AgentError, AgentExecutor, AgentRun, AgentStep};
pub use service::AgentService;
