//! Repository layer over the settings database.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from cache and facade orchestration.
//!
//! # Invariants
//! - Repositories borrow one connection or transaction and never open their
//!   own; atomicity belongs to `db::SessionFactory`.
//! - Repository APIs return semantic errors (`NoSuchExtension`) in addition
//!   to store errors.

pub mod activation_repo;
pub mod capabilities_repo;
