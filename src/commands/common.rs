//! Resources shared by every command.

use crate::config::Config;
use crate::metrics::MetricsEngine;
use crate::query::QueryService;
use crate::storage::Repository;
use crate::Result;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Context containing the resources most commands need
pub struct CommandContext {
    pub config: Config,
    pub repo: Arc<Repository>,
}

impl CommandContext {
    /// Open the configured store.
    pub fn new(config: Config) -> Result<Self> {
        debug!(database = ?config.database, "opening store");
        let repo = Arc::new(Repository::open(&config.database)?);
        Ok(Self { config, repo })
    }

    /// Context over an existing repository.
    pub fn with_repository(config: Config, repo: Arc<Repository>) -> Self {
        Self { config, repo }
    }

    pub fn engine(&self) -> MetricsEngine {
        MetricsEngine::new(self.config.fip_constants.clone())
    }

    pub fn query_service(&self) -> QueryService {
        QueryService::new(Arc::clone(&self.repo), self.engine())
    }
}

/// Pretty JSON for `--json` output.
pub fn to_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
