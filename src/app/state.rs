//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::StageHandle;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub stage: StageHandle,
}

impl AppState {
    pub fn new(config: Config, stage: StageHandle) -> Self {
        Self {
            config: Arc::new(config),
            stage,
        }
    }
}
