//! Shared primitive types used across the aggregation core.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Global Customer Identifier — the dedup key unifying one real-world
/// person across all source systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Gcid(pub Uuid);

impl Gcid {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for Gcid {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Gcid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of one registered data source.
pub type SourceId = Uuid;
