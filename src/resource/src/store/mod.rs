//! Storage collaborator interface

use crate::config::TableNames;
use crate::error::StorageResult;
use crate::types::{Post, RawRow, Term};
use async_trait::async_trait;

pub mod memory;
#[cfg(feature = "mysql")]
pub mod mysql;

pub use memory::{InMemoryResourceStore, StoreStats};
#[cfg(feature = "mysql")]
pub use mysql::MySqlResourceStore;

/// One batched set-membership query over numeric ids
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchQuery {
    /// Single-table post lookup: `ID, post_type, post_author`
    Posts { ids: Vec<u64> },

    /// Terms joined with their term-taxonomy rows on `term_id`
    TermsWithTaxonomy { ids: Vec<u64> },
}

impl BatchQuery {
    pub fn ids(&self) -> &[u64] {
        match self {
            Self::Posts { ids } | Self::TermsWithTaxonomy { ids } => ids,
        }
    }

    /// SQL up to and including the opening parenthesis of the `IN` list.
    /// Callers append one placeholder per id and the closing parenthesis.
    pub fn select_prefix(&self, tables: &TableNames) -> String {
        match self {
            Self::Posts { .. } => format!(
                "SELECT ID, post_type, post_author FROM {} WHERE ID IN (",
                tables.posts
            ),
            Self::TermsWithTaxonomy { .. } => format!(
                "SELECT t.*, tt.* FROM {} AS t INNER JOIN {} AS tt ON t.term_id = tt.term_id \
                 WHERE t.term_id IN (",
                tables.terms, tables.term_taxonomy
            ),
        }
    }

    /// Complete SQL with `?` placeholders
    pub fn to_sql(&self, tables: &TableNames) -> String {
        let placeholders = vec!["?"; self.ids().len()].join(", ");
        format!("{}{})", self.select_prefix(tables), placeholders)
    }
}

/// Storage backend for resource rows
///
/// `execute` returns raw rows; the direct lookups return materialized
/// entities and `Ok(None)` when nothing is stored under the id.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Run one batched query
    async fn execute(&self, query: &BatchQuery) -> StorageResult<Vec<RawRow>>;

    /// Look up a single post by id
    async fn get_post(&self, id: u64) -> StorageResult<Option<Post>>;

    /// Look up a single term by id within a taxonomy
    async fn get_term(&self, id: u64, taxonomy: &str) -> StorageResult<Option<Term>>;
}
