use std::sync::Arc;

use packsmith_core::{BuildOrchestrator, Config, JobStore, SanitizedConfig};

/// Shared application state
pub struct AppState {
    config: Config,
    job_store: Arc<dyn JobStore>,
    orchestrator: BuildOrchestrator,
    metrics_registry: prometheus::Registry,
}

impl AppState {
    pub fn new(
        config: Config,
        job_store: Arc<dyn JobStore>,
        orchestrator: BuildOrchestrator,
        metrics_registry: prometheus::Registry,
    ) -> Self {
        Self {
            config,
            job_store,
            orchestrator,
            metrics_registry,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn job_store(&self) -> &dyn JobStore {
        self.job_store.as_ref()
    }

    pub fn orchestrator(&self) -> &BuildOrchestrator {
        &self.orchestrator
    }

    pub fn metrics_registry(&self) -> &prometheus::Registry {
        &self.metrics_registry
    }
}
