use serde::Deserialize;
use serde::Serialize;

/// A declared configuration scope: the root context of a path.
///
/// Records may only be stored under declared scopes. A scope declared
/// templated participates in inheritance: its records form parent-linked
/// hierarchies and mutations cascade to non-overriding descendants.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ScopeConfig {
    pub name: String,

    #[serde(default)]
    pub templated: bool,
}
