//! Explicit session registry.
//!
//! Maps session ids to owned correlation engines, constructed lazily from the
//! tenant config source and the live transport registry. Every entry point
//! looks engines up here; there is no ambient singleton. Re-initialization
//! after a configuration fix is explicit and idempotent.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;

use iris_helpdesk::{HelpdeskApi, HelpdeskApiError, HelpdeskConfig, HelpdeskRestApi};
use iris_transport::TransportClientRegistry;

use crate::correlation_engine::CorrelationEngine;
use crate::correlation_error::CorrelationError;

/// Source of per-tenant helpdesk configuration records.
pub trait TenantConfigSource: Send + Sync {
    fn load_config(&self, session_id: &str) -> anyhow::Result<Option<HelpdeskConfig>>;
}

/// Builds the helpdesk API binding for a validated tenant config.
pub trait HelpdeskApiFactory: Send + Sync {
    fn build(&self, config: &HelpdeskConfig) -> Result<Arc<dyn HelpdeskApi>, HelpdeskApiError>;
}

#[derive(Default)]
/// Production factory producing REST bindings.
pub struct RestHelpdeskApiFactory;

impl HelpdeskApiFactory for RestHelpdeskApiFactory {
    fn build(&self, config: &HelpdeskConfig) -> Result<Arc<dyn HelpdeskApi>, HelpdeskApiError> {
        Ok(Arc::new(HelpdeskRestApi::from_config(config)?))
    }
}

/// Registry of per-session correlation engines.
pub struct SessionRegistry {
    engines: Mutex<HashMap<String, Arc<Mutex<CorrelationEngine>>>>,
    configs: Arc<dyn TenantConfigSource>,
    transports: Arc<TransportClientRegistry>,
    helpdesk_factory: Arc<dyn HelpdeskApiFactory>,
    mapping_snapshot_dir: Option<PathBuf>,
}

impl SessionRegistry {
    pub fn new(
        configs: Arc<dyn TenantConfigSource>,
        transports: Arc<TransportClientRegistry>,
        helpdesk_factory: Arc<dyn HelpdeskApiFactory>,
        mapping_snapshot_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            engines: Mutex::new(HashMap::new()),
            configs,
            transports,
            helpdesk_factory,
            mapping_snapshot_dir,
        }
    }

    /// Looks up the session's engine, constructing it on first use. The map
    /// lock is held across construction so exactly one engine ever exists per
    /// session.
    pub async fn engine_for(
        &self,
        session_id: &str,
    ) -> Result<Arc<Mutex<CorrelationEngine>>, CorrelationError> {
        let session_id = session_id.trim();
        let mut engines = self.engines.lock().await;
        if let Some(engine) = engines.get(session_id) {
            return Ok(engine.clone());
        }
        let engine = self.build_engine(session_id).await?;
        engines.insert(session_id.to_string(), engine.clone());
        Ok(engine)
    }

    /// Drops any cached engine and rebuilds from current configuration.
    pub async fn reinitialize(
        &self,
        session_id: &str,
    ) -> Result<Arc<Mutex<CorrelationEngine>>, CorrelationError> {
        let session_id = session_id.trim();
        let mut engines = self.engines.lock().await;
        engines.remove(session_id);
        let engine = self.build_engine(session_id).await?;
        engines.insert(session_id.to_string(), engine.clone());
        Ok(engine)
    }

    pub async fn remove(&self, session_id: &str) {
        let mut engines = self.engines.lock().await;
        engines.remove(session_id.trim());
    }

    pub async fn active_session_count(&self) -> usize {
        self.engines.lock().await.len()
    }

    async fn build_engine(
        &self,
        session_id: &str,
    ) -> Result<Arc<Mutex<CorrelationEngine>>, CorrelationError> {
        let config = self
            .configs
            .load_config(session_id)
            .map_err(|error| CorrelationError::ConfigurationMissing(error.to_string()))?
            .ok_or_else(|| {
                CorrelationError::ConfigurationMissing(format!(
                    "no helpdesk configuration for session '{session_id}'"
                ))
            })?;
        let transport = self
            .transports
            .client_for(session_id)
            .await
            .ok_or(CorrelationError::NotConnected)?;
        let helpdesk = self.helpdesk_factory.build(&config)?;
        let snapshot_path = self
            .mapping_snapshot_dir
            .as_ref()
            .map(|dir| dir.join(format!("{session_id}.json")));
        let engine =
            CorrelationEngine::new(session_id, &config, helpdesk, transport, snapshot_path)?;
        Ok(Arc::new(Mutex::new(engine)))
    }
}
