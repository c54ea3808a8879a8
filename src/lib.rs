//! A hierarchical template configuration engine.
//!
//! Typed records live at hierarchical paths grouped into scopes. Templated
//! scopes link records into inheritance chains: a record inherits every
//! field it does not set or explicitly clear, and resolved reads flatten the
//! chain on demand. Mutations pass through a transactional façade that
//! validates against registered type schemas, cascades changes to
//! non-overriding descendants, and surrounds each operation with pre-commit
//! (cancellable) and post-commit (informational) events.

mod config;
mod engine;
mod errors;
mod record;
mod store;
mod template;
mod types;

pub use config::*;
pub use engine::*;
pub use errors::*;
pub use record::*;
pub use store::*;
pub use template::*;
pub use types::*;
