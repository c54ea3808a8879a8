//! Type registry and value codec.
//!
//! Every record carries a symbolic type name resolved against the
//! [`TypeRegistry`], which determines the legal fields and their codecs.
//! The codec ("squeezer") converts between typed domain values and the
//! canonical string form used for storage and form round-tripping.

mod registry;
mod squeezer;


#[doc(hidden)]
pub use registry::*;
#[doc(hidden)]
pub use squeezer::*;
