use std::fmt::{Display, Formatter};
use std::str::FromStr;

use hrdesk_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Whether an operation reads, writes, or streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Read-only operation.
    Query,
    /// State-changing operation; audited.
    Mutation,
    /// Streaming operation.
    Subscription,
}

impl OperationKind {
    /// Returns a stable storage value for this kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Mutation => "mutation",
            Self::Subscription => "subscription",
        }
    }

    /// Returns all known kinds.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[OperationKind] = &[
            OperationKind::Query,
            OperationKind::Mutation,
            OperationKind::Subscription,
        ];

        ALL
    }
}

impl FromStr for OperationKind {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "query" => Ok(Self::Query),
            "mutation" => Ok(Self::Mutation),
            "subscription" => Ok(Self::Subscription),
            _ => Err(AppError::Validation(format!(
                "unknown operation kind '{value}'"
            ))),
        }
    }
}

impl Display for OperationKind {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Validates one registry path segment.
///
/// Segments are joined with `.` to build module paths, so a dot inside a
/// segment would make two different tree positions collide.
pub fn validate_segment(segment: &str) -> AppResult<()> {
    if segment.is_empty() {
        return Err(AppError::Validation(
            "operation path segment must not be empty".to_owned(),
        ));
    }

    if segment
        .chars()
        .any(|character| character == '.' || character.is_whitespace())
    {
        return Err(AppError::Validation(format!(
            "operation path segment '{segment}' must not contain dots or whitespace"
        )));
    }

    Ok(())
}

/// Validates a dotted module path. The empty path denotes the registry root.
pub fn validate_module_path(module: &str) -> AppResult<()> {
    if module.is_empty() {
        return Ok(());
    }

    module.split('.').try_for_each(validate_segment)
}

/// The `(module, action)` pair authorization is keyed by.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OperationKey {
    module: String,
    action: String,
}

impl OperationKey {
    /// Creates a validated operation key.
    pub fn new(module: impl Into<String>, action: impl Into<String>) -> AppResult<Self> {
        let module = module.into();
        let action = action.into();
        validate_module_path(module.as_str())?;
        validate_segment(action.as_str())?;

        Ok(Self { module, action })
    }

    pub(crate) fn lookup(module: &str, action: &str) -> Self {
        Self {
            module: module.to_owned(),
            action: action.to_owned(),
        }
    }

    /// Splits a dotted operation path into module and action.
    ///
    /// The last segment is the action; everything before it is the module.
    pub fn parse_path(path: &str) -> AppResult<Self> {
        match path.rsplit_once('.') {
            Some((module, action)) => Self::new(module, action),
            None => Self::new("", path),
        }
    }

    /// Returns the dotted module path.
    #[must_use]
    pub fn module(&self) -> &str {
        self.module.as_str()
    }

    /// Returns the action name.
    #[must_use]
    pub fn action(&self) -> &str {
        self.action.as_str()
    }

    /// Returns the full dotted path, which is also the audit action label.
    #[must_use]
    pub fn path(&self) -> String {
        if self.module.is_empty() {
            return self.action.clone();
        }

        format!("{}.{}", self.module, self.action)
    }
}

impl Display for OperationKey {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.path().as_str())
    }
}

/// One derived catalog row describing a callable operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Dotted module path.
    pub module: String,
    /// Action name.
    pub action: String,
    /// Operation kind.
    pub kind: OperationKind,
}

impl CatalogEntry {
    /// Returns the authorization key for this entry.
    #[must_use]
    pub fn key(&self) -> OperationKey {
        OperationKey {
            module: self.module.clone(),
            action: self.action.clone(),
        }
    }
}
