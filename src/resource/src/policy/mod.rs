//! Policy statements and the collaborators that supply and convert them

use crate::error::{ResourceError, Result};
use crate::types::{PermissionFragment, ResourceKind};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tokio::sync::RwLock;

pub mod merger;
pub mod slug;

pub use merger::{identity_filter, FilterContext, PolicyFilter, PolicyMerger};
pub use slug::{InMemorySlugResolver, SlugResolver};

/// Policy effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyEffect {
    /// Allow the action
    Allow,
    /// Deny the action
    Deny,
}

impl PolicyEffect {
    /// Parse an effect name, ignoring case
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "allow" => Some(Self::Allow),
            "deny" => Some(Self::Deny),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Deny => "deny",
        }
    }
}

/// Externally authored policy statement
///
/// `Resource` has the shape `{Kind}:{discriminator1}:{discriminator2}`, e.g.
/// `Post:page:42` or `Term:category:news`. Every other attribute is kept
/// verbatim for the statement converter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    /// Resource path
    #[serde(rename = "Resource")]
    pub resource: String,

    /// Remaining statement attributes (`Effect`, `Action`, ...)
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Statement {
    /// Create a statement for a resource path
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            attributes: Map::new(),
        }
    }

    /// Add an attribute to the statement
    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// Statement effect, if present and recognised
    pub fn effect(&self) -> Option<PolicyEffect> {
        self.attributes
            .get("Effect")
            .and_then(Value::as_str)
            .and_then(PolicyEffect::parse)
    }

    /// Actions named by the statement (`Action` may be a string or an array)
    pub fn actions(&self) -> Vec<String> {
        match self.attributes.get("Action") {
            Some(Value::String(action)) => vec![action.clone()],
            Some(Value::Array(actions)) => actions
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Source of policy statements
#[async_trait]
pub trait PolicySource: Send + Sync {
    /// Statements whose resource matches `pattern`, in policy order
    async fn statements_matching(&self, pattern: &str) -> Result<Vec<Statement>>;
}

/// Converts a statement into a kind-specific permission fragment
pub trait StatementConverter: Send + Sync {
    fn to_permission_fragment(&self, statement: &Statement, kind: ResourceKind)
        -> PermissionFragment;
}

/// Default converter: one `{ "<action>": { "effect": "<effect>" } }` field per
/// action named in the statement. Statements without a recognised effect
/// convert to an empty fragment.
#[derive(Debug, Clone, Copy, Default)]
pub struct EffectActionConverter;

impl StatementConverter for EffectActionConverter {
    fn to_permission_fragment(
        &self,
        statement: &Statement,
        _kind: ResourceKind,
    ) -> PermissionFragment {
        let mut fragment = PermissionFragment::new();

        let Some(effect) = statement.effect() else {
            return fragment;
        };

        for action in statement.actions() {
            fragment.insert(
                action.to_lowercase(),
                json!({ "effect": effect.as_str() }),
            );
        }

        fragment
    }
}

/// In-memory ordered statement list
pub struct InMemoryPolicySource {
    statements: Arc<RwLock<Vec<Statement>>>,
}

impl InMemoryPolicySource {
    /// Create a new in-memory policy source
    pub fn new() -> Self {
        Self::with_statements(Vec::new())
    }

    pub fn with_statements(statements: Vec<Statement>) -> Self {
        Self {
            statements: Arc::new(RwLock::new(statements)),
        }
    }
}

impl Default for InMemoryPolicySource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PolicySource for InMemoryPolicySource {
    async fn statements_matching(&self, pattern: &str) -> Result<Vec<Statement>> {
        let regex_pattern = regex::escape(pattern).replace(r"\*", ".*");
        let regex = regex::Regex::new(&format!("^{}$", regex_pattern))
            .map_err(|e| ResourceError::PolicySource(format!("Invalid pattern '{}': {}", pattern, e)))?;

        let statements = self.statements.read().await;
        Ok(statements
            .iter()
            .filter(|s| regex.is_match(&s.resource))
            .cloned()
            .collect())
    }
}
