//! Settings use-case services.
//!
//! # Responsibility
//! - Combine repository calls with per-category caches into facade APIs.
//! - Keep CLI and host layers decoupled from storage details.

pub mod activation_service;
pub mod capabilities_service;
pub mod offering_catalog;
