//! Router configuration.

use serde::{Deserialize, Serialize};

/// Tuning for the channels an [`EffectRouter`](crate::EffectRouter) wires
/// up on each application. Missing fields deserialize to their defaults.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Events buffered between the branches and the consumer. Branches
    /// wait while it is full.
    pub output_capacity: usize,
}

impl RouterConfig {
    /// Set the merged output capacity.
    pub fn with_output_capacity(mut self, capacity: usize) -> Self {
        self.output_capacity = capacity;
        self
    }

    // Tokio channels reject a zero capacity.
    pub(crate) fn output_channel_capacity(&self) -> usize {
        self.output_capacity.max(1)
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            output_capacity: 64,
        }
    }
}
