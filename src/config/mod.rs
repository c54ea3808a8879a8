//! Engine settings.
//!
//! Loaded from an optional settings file with an environment-variable
//! overlay (highest priority), then validated before the engine is built.

mod engine;
mod scopes;


#[doc(hidden)]
pub use engine::*;
#[doc(hidden)]
pub use scopes::*;

//---
use std::collections::HashSet;

use config::Config;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;

use crate::Error;
use crate::Result;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    /// Core engine bounds and policies
    #[serde(default)]
    pub engine: EngineConfig,

    /// Declared configuration scopes (path roots)
    #[serde(default)]
    pub scopes: Vec<ScopeConfig>,
}

impl Settings {
    /// Load settings with priority:
    /// 1. Defaults (hardcoded)
    /// 2. Settings file (when given)
    /// 3. Environment variables prefixed `STRATUM_` (highest priority)
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path).required(true));
        }
        builder = builder.add_source(Environment::with_prefix("STRATUM").separator("__"));

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validates all engine subsystem configurations
    pub fn validate(&self) -> Result<()> {
        self.engine.validate()?;

        let mut seen = HashSet::new();
        for scope in &self.scopes {
            if scope.name.is_empty() {
                return Err(Error::Config(ConfigError::Message(
                    "scope name must not be empty".into(),
                )));
            }
            if !seen.insert(scope.name.as_str()) {
                return Err(Error::Config(ConfigError::Message(format!(
                    "scope '{}' is declared more than once",
                    scope.name
                ))));
            }
        }

        Ok(())
    }

    pub fn scope(
        &self,
        name: &str,
    ) -> Option<&ScopeConfig> {
        self.scopes.iter().find(|scope| scope.name == name)
    }

    /// Declare a scope programmatically; used by embedding code and tests.
    pub fn declare_scope(
        &mut self,
        name: impl Into<String>,
        templated: bool,
    ) -> &mut Self {
        self.scopes.push(ScopeConfig {
            name: name.into(),
            templated,
        });
        self
    }
}
