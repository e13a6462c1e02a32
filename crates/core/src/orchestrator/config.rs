//! Orchestrator configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the build orchestrator's queue worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Enable/disable the background queue worker.
    /// When disabled, jobs can still be built inline via the synchronous
    /// endpoint, but enqueued jobs stay queued.
    #[serde(default)]
    pub enabled: bool,

    /// How often to poll for queued jobs (milliseconds).
    /// The worker processes one job at a time; builds are long and the
    /// native toolchain is resource-hungry.
    #[serde(default = "default_queue_interval")]
    pub queue_poll_interval_ms: u64,
}

fn default_queue_interval() -> u64 {
    3000 // 3 seconds
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            queue_poll_interval_ms: default_queue_interval(),
        }
    }
}
