//! Wiki configuration.

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Configuration of one wiki instance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WikiConfig {
    /// Wiki identifier sent with every store call (several wikis may share a store).
    pub wiki_id: u64,

    /// Authorization group guarding this wiki.
    pub group_id: u64,

    /// Maximum number of documents kept in the latest-revision cache.
    /// `None` keeps every document seen.
    pub cache_capacity: Option<usize>,
}

impl Default for WikiConfig {
    fn default() -> Self {
        Self {
            wiki_id: 0,
            group_id: 0,
            cache_capacity: None,
        }
    }
}

impl WikiConfig {
    pub fn new(wiki_id: u64, group_id: u64) -> Self {
        Self {
            wiki_id,
            group_id,
            ..Default::default()
        }
    }

    /// Bound the latest-revision cache.
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = Some(capacity);
        self
    }

    /// Parse a JSON configuration; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
