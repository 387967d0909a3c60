use std::collections::BTreeSet;

use hrdesk_core::AppResult;
use serde::{Deserialize, Serialize};

use crate::operation::{OperationKey, OperationKind, validate_module_path, validate_segment};

/// One allow/deny decision for one role on one operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionEntry {
    /// Dotted module path.
    pub module: String,
    /// Action name.
    pub action: String,
    /// Operation kind the row was granted for.
    pub kind: OperationKind,
    /// Whether the operation is allowed.
    pub allow: bool,
}

impl PermissionEntry {
    /// Creates a validated permission entry.
    pub fn new(
        module: impl Into<String>,
        action: impl Into<String>,
        kind: OperationKind,
        allow: bool,
    ) -> AppResult<Self> {
        let entry = Self {
            module: module.into(),
            action: action.into(),
            kind,
            allow,
        };
        entry.validate()?;

        Ok(entry)
    }

    /// Checks module and action formatting.
    pub fn validate(&self) -> AppResult<()> {
        validate_module_path(self.module.as_str())?;
        validate_segment(self.action.as_str())
    }

    /// Returns the authorization key for this entry.
    #[must_use]
    pub fn key(&self) -> OperationKey {
        OperationKey::lookup(self.module.as_str(), self.action.as_str())
    }
}

/// Snapshot of the `(module, action)` pairs a role may invoke.
///
/// Built once per request context; later edits to the store are not observed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSet {
    keys: BTreeSet<OperationKey>,
}

impl PermissionSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the set from the allowed subset of permission entries.
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a PermissionEntry>) -> Self {
        entries
            .into_iter()
            .filter(|entry| entry.allow)
            .map(PermissionEntry::key)
            .collect()
    }

    /// Returns whether the pair is allowed.
    #[must_use]
    pub fn contains(&self, module: &str, action: &str) -> bool {
        self.keys.contains(&OperationKey::lookup(module, action))
    }

    /// Inserts one allowed pair.
    pub fn insert(&mut self, key: OperationKey) -> bool {
        self.keys.insert(key)
    }

    /// Returns the number of allowed pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns true when nothing is allowed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Iterates allowed pairs in stable order.
    pub fn iter(&self) -> impl Iterator<Item = &OperationKey> {
        self.keys.iter()
    }
}

impl FromIterator<OperationKey> for PermissionSet {
    fn from_iter<T: IntoIterator<Item = OperationKey>>(iter: T) -> Self {
        Self {
            keys: iter.into_iter().collect(),
        }
    }
}
