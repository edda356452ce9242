//! Value types shared across the crate surface.
//!
//! # Responsibility
//! - Define the result envelopes returned by every public operation.
//! - Define the `Entity` mapping contract implemented by persisted records.

pub mod entity;
pub mod status;
