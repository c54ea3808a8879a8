//! A builder pattern implementation for constructing a
//! [`ConfigurationTemplateManager`] instance.
//!
//! Initializes with production-ready defaults (in-memory record store, empty
//! type registry, settings loaded from files and environment) and allows
//! overriding each component via setter methods.

use std::sync::Arc;

use tracing::info;

use crate::ConfigurationTemplateManager;
use crate::InMemoryRecordStore;
use crate::RecordStore;
use crate::Result;
use crate::Settings;
use crate::TypeRegistry;

/// Fluent assembly of the engine: settings, record store, and type registry.
pub struct EngineBuilder {
    settings: Settings,
    store: Option<Arc<dyn RecordStore>>,
    registry: Option<Arc<TypeRegistry>>,
}

impl EngineBuilder {
    /// Start from settings loaded from files and `STRATUM_`-prefixed
    /// environment variables.
    ///
    /// # Errors
    ///
    /// - Return [`crate::Error::Config`] when loading or deserializing the
    ///   settings fails.
    pub fn from_files(config_path: Option<&str>) -> Result<Self> {
        if let Some(path) = config_path {
            info!("loading engine settings from '{path}'");
        }
        Ok(Self::new(Settings::load(config_path)?))
    }

    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            store: None,
            registry: None,
        }
    }

    /// Override the default in-memory record store.
    pub fn store(
        mut self,
        store: Arc<dyn RecordStore>,
    ) -> Self {
        self.store = Some(store);
        self
    }

    /// Override the default empty type registry.
    pub fn registry(
        mut self,
        registry: Arc<TypeRegistry>,
    ) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Assemble the engine, validating the settings.
    ///
    /// # Errors
    ///
    /// - Return [`crate::Error::Config`] when the settings fail validation.
    pub fn build(self) -> Result<ConfigurationTemplateManager> {
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(InMemoryRecordStore::new()));
        let registry = self.registry.unwrap_or_else(|| Arc::new(TypeRegistry::new()));

        ConfigurationTemplateManager::new(self.settings, store, registry)
    }
}
