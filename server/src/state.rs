use crate::config::ServerConfig;
use exifrelay_jobs::JobCoordinator;
use std::sync::Arc;
use tokio::sync::Notify;

/// Shared state handed to every handler. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: JobCoordinator,
    pub config: Arc<ServerConfig>,
    /// Fired by `POST /shutdown`.
    pub shutdown: Arc<Notify>,
}

impl AppState {
    /// Spawns the job coordinator, so it must be called inside a tokio runtime.
    pub fn new(config: ServerConfig) -> Self {
        let coordinator = JobCoordinator::spawn(config.message_capacity, config.retention());
        Self {
            coordinator,
            config: Arc::new(config),
            shutdown: Arc::new(Notify::new()),
        }
    }
}
