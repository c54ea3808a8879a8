//! Durable keyed storage of records by path, independent of inheritance
//! semantics.

mod in_memory;
mod record_store;


#[doc(hidden)]
pub use in_memory::*;
#[doc(hidden)]
pub use record_store::*;
