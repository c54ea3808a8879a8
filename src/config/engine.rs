use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Core engine bounds and policies.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EngineConfig {
    /// Maximum inheritance chain length. A chain longer than this signals a
    /// cycle or a runaway hierarchy; resolution is refused before any
    /// traversal. Default value is set via default_max_chain_depth().
    #[serde(default = "default_max_chain_depth")]
    pub max_chain_depth: usize,

    /// What happens to the template children of a deleted record
    #[serde(default)]
    pub delete_policy: DeletePolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_chain_depth: default_max_chain_depth(),
            delete_policy: DeletePolicy::default(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_chain_depth == 0 {
            return Err(Error::Config(ConfigError::Message(
                "max_chain_depth must be greater than 0".into(),
            )));
        }

        Ok(())
    }
}

fn default_max_chain_depth() -> usize {
    32
}

/// Reparenting policy applied when a template record with children is
/// deleted.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeletePolicy {
    /// Re-link direct children to the deleted record's parent
    #[default]
    Reparent,
    /// Refuse the delete while template children depend on the record
    Restrict,
}
