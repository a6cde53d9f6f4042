//! Settings domain model.
//!
//! # Responsibility
//! - Define the composite keys used for registry and activation lookups.
//! - Define persisted extension and static capabilities records.
//!
//! # Invariants
//! - Keys and records are plain values; identity is the full key tuple or
//!   the record identifier (plus offering for offering extensions).

pub mod activatable;
pub mod extension;
pub mod key;
