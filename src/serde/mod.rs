//! Serde helpers for configuration and wire types.

pub mod amount;
pub mod duration;
