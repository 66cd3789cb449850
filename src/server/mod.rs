pub mod ask;
pub mod mentions;

use crate::agent::AgentService;
use crate::config::Config;
use std::sync::Arc;

pub struct AppState {
    pub config: Config,
    pub agent: Arc<AgentService>,
}
