use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use async_trait::async_trait;
use hrdesk_core::{AppError, AppResult};
use hrdesk_domain::{OperationKey, OperationKind, validate_segment};
use serde_json::Value;

use crate::instrumentation::OperationCall;

mod catalog;

#[cfg(test)]
mod tests;

pub use catalog::{RegistryVisitor, extract_catalog, walk_registry};

/// Deepest group or mount nesting the registry walks before giving up.
pub const MAX_REGISTRY_DEPTH: usize = 32;

/// Callable body of one registered operation.
///
/// The request context arrives through `call`; handlers never look it up
/// from ambient state.
#[async_trait]
pub trait OperationHandler: Send + Sync {
    /// Runs the operation with its JSON input.
    async fn handle(&self, call: &OperationCall<'_>, input: Value) -> AppResult<Value>;
}

/// Who may invoke an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationAccess {
    /// Callable without a session.
    Public,
    /// Requires an allow-list entry; the message is returned on denial.
    Protected {
        /// Denial text shown to callers lacking the permission.
        denial_message: String,
    },
}

/// Leaf descriptor: kind tag plus callable body.
#[derive(Clone)]
pub struct OperationDescriptor {
    kind: OperationKind,
    access: OperationAccess,
    handler: Arc<dyn OperationHandler>,
}

impl OperationDescriptor {
    /// Creates a protected operation with a handler-specific denial message.
    #[must_use]
    pub fn protected(
        kind: OperationKind,
        denial_message: impl Into<String>,
        handler: Arc<dyn OperationHandler>,
    ) -> Self {
        Self {
            kind,
            access: OperationAccess::Protected {
                denial_message: denial_message.into(),
            },
            handler,
        }
    }

    /// Creates an operation anonymous callers may invoke.
    #[must_use]
    pub fn public(kind: OperationKind, handler: Arc<dyn OperationHandler>) -> Self {
        Self {
            kind,
            access: OperationAccess::Public,
            handler,
        }
    }

    /// Returns the operation kind.
    #[must_use]
    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// Returns the access policy.
    #[must_use]
    pub fn access(&self) -> &OperationAccess {
        &self.access
    }

    /// Returns the handler.
    #[must_use]
    pub fn handler(&self) -> &dyn OperationHandler {
        self.handler.as_ref()
    }
}

impl Debug for OperationDescriptor {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("OperationDescriptor")
            .field("kind", &self.kind)
            .field("access", &self.access)
            .finish_non_exhaustive()
    }
}

type RegistryLoader = dyn Fn() -> AppResult<OperationRegistry> + Send + Sync;

/// Sub-registry contributed lazily by a feature module.
///
/// Loading may fail; the catalog then skips the subtree and keeps the rest.
#[derive(Clone)]
pub struct RegistryMount {
    loader: Arc<RegistryLoader>,
}

impl RegistryMount {
    /// Creates a mount from a loader function.
    pub fn new(loader: impl Fn() -> AppResult<OperationRegistry> + Send + Sync + 'static) -> Self {
        Self {
            loader: Arc::new(loader),
        }
    }

    /// Loads the mounted registry.
    pub fn load(&self) -> AppResult<OperationRegistry> {
        (self.loader)()
    }
}

impl Debug for RegistryMount {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str("RegistryMount")
    }
}

/// One node of the operation tree.
#[derive(Debug, Clone)]
pub enum OperationNode {
    /// Namespace holding further nodes.
    Group(OperationRegistry),
    /// Callable operation.
    Leaf(OperationDescriptor),
    /// Lazily loaded namespace.
    Mount(RegistryMount),
    /// Registry metadata this version does not understand.
    Unknown(String),
}

/// Nested mapping from names to operations, ordered by name.
#[derive(Debug, Clone, Default)]
pub struct OperationRegistry {
    children: BTreeMap<String, OperationNode>,
}

impl OperationRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node under a validated, not yet used name.
    pub fn insert(&mut self, name: impl Into<String>, node: OperationNode) -> AppResult<()> {
        let name = name.into();
        validate_segment(name.as_str())?;

        if self.children.contains_key(&name) {
            return Err(AppError::Conflict(format!(
                "operation registry entry '{name}' is already defined"
            )));
        }

        self.children.insert(name, node);
        Ok(())
    }

    /// Builder form of [`OperationRegistry::insert`] for a nested group.
    pub fn with_group(
        mut self,
        name: impl Into<String>,
        group: OperationRegistry,
    ) -> AppResult<Self> {
        self.insert(name, OperationNode::Group(group))?;
        Ok(self)
    }

    /// Builder form of [`OperationRegistry::insert`] for a leaf.
    pub fn with_operation(
        mut self,
        name: impl Into<String>,
        descriptor: OperationDescriptor,
    ) -> AppResult<Self> {
        self.insert(name, OperationNode::Leaf(descriptor))?;
        Ok(self)
    }

    /// Builder form of [`OperationRegistry::insert`] for a lazy mount.
    pub fn with_mount(mut self, name: impl Into<String>, mount: RegistryMount) -> AppResult<Self> {
        self.insert(name, OperationNode::Mount(mount))?;
        Ok(self)
    }

    /// Merges the top-level nodes of another registry into this one.
    pub fn merge(mut self, other: OperationRegistry) -> AppResult<Self> {
        for (name, node) in other.children {
            self.insert(name, node)?;
        }

        Ok(self)
    }

    /// Iterates direct children in name order.
    pub fn children(&self) -> impl Iterator<Item = (&str, &OperationNode)> {
        self.children
            .iter()
            .map(|(name, node)| (name.as_str(), node))
    }

    /// Returns true when the registry has no children.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Finds the leaf addressed by a key, loading mounts along the way.
    pub fn resolve(&self, key: &OperationKey) -> AppResult<Option<OperationDescriptor>> {
        let mut segments: Vec<&str> = if key.module().is_empty() {
            Vec::new()
        } else {
            key.module().split('.').collect()
        };
        segments.push(key.action());
        if segments.len() > MAX_REGISTRY_DEPTH {
            return Ok(None);
        }

        resolve_segments(self, segments.as_slice())
    }
}

fn resolve_segments(
    registry: &OperationRegistry,
    segments: &[&str],
) -> AppResult<Option<OperationDescriptor>> {
    let Some((head, rest)) = segments.split_first() else {
        return Ok(None);
    };

    match (registry.children.get(*head), rest.is_empty()) {
        (Some(OperationNode::Leaf(descriptor)), true) => Ok(Some(descriptor.clone())),
        (Some(OperationNode::Group(group)), false) => resolve_segments(group, rest),
        (Some(OperationNode::Mount(mount)), false) => resolve_segments(&mount.load()?, rest),
        _ => Ok(None),
    }
}
