//! Core business logic for Re-Source.
//!
//! Services own the consistency rules of the marketplace: listing
//! validation, wishlist set semantics, conversation membership and the
//! report lifecycle. They depend on repositories from `resource-db` and on
//! two remote text collaborators reached through traits.

pub mod services;

pub use services::*;

#[cfg(test)]
pub(crate) mod fixtures;
