use std::sync::Arc;

use crate::config::Config;
use crate::gateway::ResumePersistenceGateway;
use crate::wizard::SessionStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Remote résumé API, or the in-memory store when none is configured.
    pub gateway: Arc<dyn ResumePersistenceGateway>,
    pub sessions: Arc<SessionStore>,
    pub config: Config,
}

impl AppState {
    pub fn new(gateway: Arc<dyn ResumePersistenceGateway>, config: Config) -> Self {
        Self {
            gateway,
            sessions: Arc::new(SessionStore::new()),
            config,
        }
    }
}
