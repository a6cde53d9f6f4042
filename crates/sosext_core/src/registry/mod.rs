//! Provider registries for capabilities and offering extensions.
//!
//! Providers are registered explicitly by the host at startup; repositories
//! only index what they are given and filter it by activation state.

pub mod provider;
pub mod repository;
