//! Value wrapper carrying an activation flag.

use serde::{Deserialize, Serialize};

/// Pairs a value with its activation state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activatable<T> {
    value: T,
    active: bool,
}

impl<T> Activatable<T> {
    pub fn new(value: T, active: bool) -> Self {
        Self { value, active }
    }

    pub fn active(value: T) -> Self {
        Self::new(value, true)
    }

    pub fn inactive(value: T) -> Self {
        Self::new(value, false)
    }

    /// Returns the value only when active.
    pub fn get(&self) -> Option<&T> {
        self.active.then_some(&self.value)
    }

    /// Returns the value regardless of activation state.
    pub fn get_internal(&self) -> &T {
        &self.value
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn with_active(self, active: bool) -> Self {
        Self::new(self.value, active)
    }

    pub fn into_inner(self) -> T {
        self.value
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Activatable<U> {
        Activatable::new(f(self.value), self.active)
    }
}
