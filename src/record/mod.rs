//! Record and path model.
//!
//! The atomic unit of stored configuration is the [`Record`]: an ordered,
//! typed container of scalar and collection values. Records are addressed by
//! hierarchical [`Path`]s whose first segment names the owning scope.

mod path;
mod record;


#[doc(hidden)]
pub use path::*;
#[doc(hidden)]
pub use record::*;
