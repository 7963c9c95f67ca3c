//! Database types.

pub mod question;
pub mod vote;
