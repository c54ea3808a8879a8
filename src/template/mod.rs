//! Template inheritance.
//!
//! Records in a templated scope form parent-linked hierarchies. A record's
//! effective value for a field is resolved by walking its inheritance chain
//! from leaf to root, returning the first record that defines or explicitly
//! clears the field.

mod manager;
mod template_record;

#[cfg(test)]
mod manager_test;

#[doc(hidden)]
pub use manager::*;
#[doc(hidden)]
pub use template_record::*;
