//! The transactional façade and its event machinery.
//!
//! A mutation request enters the configuration template manager, is
//! validated against the type registry, resolved against the template
//! manager's inheritance chain, applied to the record store, cascaded to
//! descendant templates, and surrounded by pre-commit (cancellable) and
//! post-commit (informational) events.

mod builder;
mod bus;
mod event;
mod manager;
mod transaction;


#[doc(hidden)]
pub use builder::*;
#[doc(hidden)]
pub use bus::*;
#[doc(hidden)]
pub use event::*;
#[doc(hidden)]
pub use manager::*;
#[doc(hidden)]
pub use transaction::*;
