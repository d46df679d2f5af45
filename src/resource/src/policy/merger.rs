//! Policy merger: statements → per-key permission fragments

use super::{PolicySource, SlugResolver, Statement, StatementConverter};
use crate::adapter::{PostAdapter, ResourceAdapter, TermAdapter};
use crate::error::Result;
use crate::key::{CompositeKey, KEY_DELIMITER};
use crate::types::{PermissionMap, ResourceKind};
use std::sync::Arc;
use tracing::{debug, warn};

/// Context handed to the post-processing filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterContext {
    /// Resource kind whose policies were merged
    pub kind: ResourceKind,
    /// Statement pattern used to select the statements
    pub pattern: String,
}

/// Post-processing hook applied to the merged map
pub type PolicyFilter = Arc<dyn Fn(PermissionMap, &FilterContext) -> PermissionMap + Send + Sync>;

/// Filter that returns the map unchanged
pub fn identity_filter() -> PolicyFilter {
    Arc::new(|map: PermissionMap, _: &FilterContext| map)
}

/// Merger for post statements
pub type PostPolicyMerger = PolicyMerger<PostAdapter>;

/// Merger for term statements
pub type TermPolicyMerger = PolicyMerger<TermAdapter>;

/// Translates the policy statements of one resource kind into a permission map
///
/// Statements are applied in source order; a later statement for the same key
/// overwrites the fields it sets and keeps the rest.
pub struct PolicyMerger<A: ResourceAdapter> {
    adapter: A,
    source: Arc<dyn PolicySource>,
    converter: Arc<dyn StatementConverter>,
    slugs: Arc<dyn SlugResolver>,
    filter: PolicyFilter,
}

impl<A: ResourceAdapter + Default> PolicyMerger<A> {
    pub fn new(
        source: Arc<dyn PolicySource>,
        converter: Arc<dyn StatementConverter>,
        slugs: Arc<dyn SlugResolver>,
    ) -> Self {
        Self {
            adapter: A::default(),
            source,
            converter,
            slugs,
            filter: identity_filter(),
        }
    }
}

impl<A: ResourceAdapter> PolicyMerger<A> {
    /// Replace the post-processing filter
    pub fn with_filter(mut self, filter: PolicyFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Merge every statement of this kind into one permission map
    pub async fn merge_policies(&self) -> Result<PermissionMap> {
        let kind = self.adapter.kind();
        let pattern = kind.statement_pattern();
        let statements = self.source.statements_matching(&pattern).await?;

        let mut merged = PermissionMap::new();
        let mut skipped = 0usize;

        for statement in &statements {
            let Some(key) = self.statement_key(statement).await else {
                skipped += 1;
                continue;
            };

            let fragment = self.converter.to_permission_fragment(statement, kind);
            merged.entry(key).or_default().merge(fragment);
        }

        debug!(
            "Merged {} {} statements into {} keys ({} skipped)",
            statements.len(),
            kind,
            merged.len(),
            skipped
        );

        let context = FilterContext { kind, pattern };
        Ok((self.filter)(merged, &context))
    }

    /// Composite key addressed by a statement, `None` when the statement has
    /// another resource shape or its slug does not resolve
    async fn statement_key(&self, statement: &Statement) -> Option<CompositeKey> {
        let bits: Vec<&str> = statement.resource.split(':').collect();

        let [_, scope, target] = bits.as_slice() else {
            debug!("Skipping statement for '{}': not a 3-segment path", statement.resource);
            return None;
        };

        if scope.contains(KEY_DELIMITER) || target.contains(KEY_DELIMITER) {
            warn!(
                "Skipping statement for '{}': segment contains '{}'",
                statement.resource, KEY_DELIMITER
            );
            return None;
        }

        if let Ok(id) = target.parse::<u64>() {
            return Some(CompositeKey::from_parts(&[id.to_string().as_str(), *scope]));
        }

        match self.adapter.resolve_slug(self.slugs.as_ref(), target, scope).await {
            Ok(Some(entity)) => Some(self.adapter.encode(&entity)),
            Ok(None) => {
                debug!("Skipping statement for '{}': slug not found", statement.resource);
                None
            }
            Err(e) => {
                warn!(
                    "Skipping statement for '{}': slug lookup failed: {}",
                    statement.resource, e
                );
                None
            }
        }
    }
}
