//! Process-wide client bundle.

use std::sync::Arc;

use anyhow::{Context, Result};
use criticart_cache::KeyValueStore;
use criticart_data::{Backend, HttpBackend};
use tracing::info;

use crate::access::DataAccess;
use crate::auth::{AuthClient, SessionHandle};
use crate::config::ClientConfig;
use crate::preferences::Preferences;

/// Everything the site needs, wired to one backend and one session.
///
/// Built once at startup and shared.
pub struct CritiCart<B> {
    pub data: DataAccess<B>,
    pub auth: AuthClient<B>,
    pub preferences: Preferences,
    config: ClientConfig,
}

impl CritiCart<HttpBackend> {
    /// Validate `config`, connect over HTTP and restore any stored session.
    pub fn connect(config: ClientConfig, storage: Arc<dyn KeyValueStore>) -> Result<Self> {
        config.validate()?;
        let backend = HttpBackend::with_timeout(
            config.supabase_url.clone(),
            config.anon_key.clone(),
            config.request_timeout(),
        )
        .context("Failed to create backend client")?;

        let client = Self::with_backend(Arc::new(backend), config, storage);
        let restored = client.auth.restore().is_some();
        info!(url = %client.config.supabase_url, restored, "client ready");
        Ok(client)
    }
}

impl<B: Backend> CritiCart<B> {
    /// Wire a client around any backend. Does not touch stored state.
    pub fn with_backend(backend: Arc<B>, config: ClientConfig, storage: Arc<dyn KeyValueStore>) -> Self {
        let session = SessionHandle::new();
        Self {
            data: DataAccess::from_config(backend.clone(), session.clone(), &config),
            auth: AuthClient::new(backend, storage.clone(), session),
            preferences: Preferences::new(storage),
            config,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}
