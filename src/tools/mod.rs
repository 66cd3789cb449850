pub mod discovery;
pub mod post_reply;

pub use discovery::{RemoteTool, discover_all};
pub use post_reply::PostReplyTool;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// One invocable capability. Input is the raw text the reasoning
/// backend produced for the tool; each implementation decides how to
/// interpret it.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> String;
    fn description(&self) -> String;
    async fn call(&self, input: &str) -> Result<String, String>;
}

/// Aggregate namespace over every discovered tool, rebuilt fresh for
/// each agent run.
#[derive(Default)]
pub struct ToolRegistry {
    order: Vec<String>,
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name();
        if self.tools.insert(name.clone(), tool).is_some() {
            log::warn!("[TOOLS] duplicate tool name '{}' overwritten", name);
        } else {
            self.order.push(name);
        }
    }

    /// Look a tool up by exact name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Tools in registration order
    pub fn tools(&self) -> Vec<Arc<dyn Tool>> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name).cloned())
            .collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.order.clone()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
