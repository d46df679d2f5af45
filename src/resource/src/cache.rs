//! Batch-fetched cache index
//!
//! Built once per permission-map population from a single batched query and
//! read-only afterwards. Entries are raw rows; materialization into typed
//! entities happens on read.

use crate::types::RawRow;
use serde::Serialize;
use std::collections::HashMap;

/// Index key → raw row
#[derive(Debug, Clone, Default)]
pub struct CacheIndex {
    rows: HashMap<String, RawRow>,
}

impl CacheIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from fetched rows, keying each row with `key_of`.
    /// Rows for which `key_of` yields `None` are skipped and counted.
    pub fn from_rows<F>(rows: Vec<RawRow>, key_of: F) -> (Self, usize)
    where
        F: Fn(&RawRow) -> Option<String>,
    {
        let mut index = HashMap::with_capacity(rows.len());
        let mut skipped = 0;

        for row in rows {
            match key_of(&row) {
                Some(key) => {
                    index.insert(key, row);
                }
                None => skipped += 1,
            }
        }

        (Self { rows: index }, skipped)
    }

    pub fn get(&self, key: &str) -> Option<&RawRow> {
        self.rows.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.rows.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Statistics about cache index usage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Resolutions served from the index
    pub hits: usize,
    /// Resolutions that fell back to a direct lookup
    pub misses: usize,
    /// Rows held by the index
    pub entries: usize,
}

impl CacheStats {
    /// Calculates the cache hit rate
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
