//! Core data types.

pub mod events;
pub mod metadata;
