//! Application state for the HTTP server

use std::sync::Arc;
use std::time::Instant;

use crate::config::RagConfig;
use crate::pipeline::RagPipeline;
use crate::session::SessionStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration the server was started with
    config: RagConfig,
    /// Ingest/query orchestrator
    pipeline: RagPipeline,
    /// Process start, for uptime reporting
    started_at: Instant,
}

impl AppState {
    /// Wrap a pipeline
    pub fn new(config: RagConfig, pipeline: RagPipeline) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pipeline,
                started_at: Instant::now(),
            }),
        }
    }

    /// Build the pipeline from configuration
    pub fn from_config(config: RagConfig) -> crate::error::Result<Self> {
        let pipeline = RagPipeline::from_config(&config)?;
        Ok(Self::new(config, pipeline))
    }

    /// Get configuration
    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    /// Get the pipeline
    pub fn pipeline(&self) -> &RagPipeline {
        &self.inner.pipeline
    }

    /// Get the session store
    pub fn sessions(&self) -> &Arc<SessionStore> {
        self.inner.pipeline.sessions()
    }

    /// Seconds since the state was created
    pub fn uptime_secs(&self) -> u64 {
        self.inner.started_at.elapsed().as_secs()
    }
}
