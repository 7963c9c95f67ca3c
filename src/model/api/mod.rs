//! API-compatible types.
//!
//! The types in this module are serialised in an API-friendly way, e.g.
//! IDs are `id` rather than `_id` and field names are camelCase.

pub mod identity;
pub mod question;
pub mod vote;
