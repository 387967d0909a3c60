use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hrdesk_core::AppResult;
use serde::{Deserialize, Serialize};

/// Audit row produced by the audit interceptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAuditLogEntry {
    /// Subject that invoked the mutation, if any.
    pub user_id: Option<String>,
    /// Dotted `module.action` label.
    pub action: String,
    /// Module the mutation belongs to.
    pub entity: String,
    /// Serialized input.
    pub payload: String,
    /// Serialized operation input.
    pub request: String,
    /// Serialized result or error.
    pub response: String,
}

/// Persisted audit row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditLogEntry {
    /// Stable entry identifier.
    pub id: String,
    /// Subject that invoked the mutation, if any.
    pub user_id: Option<String>,
    /// Dotted `module.action` label.
    pub action: String,
    /// Module the mutation belongs to.
    pub entity: String,
    /// Serialized input.
    pub payload: String,
    /// Serialized operation input.
    pub request: String,
    /// Serialized result or error.
    pub response: String,
    /// Append timestamp.
    pub created_at: DateTime<Utc>,
}

/// Filter and pagination for audit log reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AuditLogQuery {
    /// Maximum rows returned.
    #[serde(default = "default_audit_log_limit")]
    pub limit: usize,
    /// Number of rows skipped for offset pagination.
    #[serde(default)]
    pub offset: usize,
    /// Optional subject filter.
    #[serde(default)]
    pub user_id: Option<String>,
    /// Optional `module.action` filter.
    #[serde(default)]
    pub action: Option<String>,
    /// Optional module filter.
    #[serde(default)]
    pub entity: Option<String>,
    /// Inclusive lower bound on `created_at`.
    #[serde(default)]
    pub created_from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `created_at`.
    #[serde(default)]
    pub created_to: Option<DateTime<Utc>>,
}

/// Largest page the audit log read returns.
pub const AUDIT_LOG_MAX_LIMIT: usize = 200;

fn default_audit_log_limit() -> usize {
    50
}

impl AuditLogQuery {
    /// Returns the limit clamped to `1..=AUDIT_LOG_MAX_LIMIT`.
    #[must_use]
    pub fn capped_limit(&self) -> usize {
        self.limit.clamp(1, AUDIT_LOG_MAX_LIMIT)
    }

    /// Returns whether an entry passes every filter of this query.
    #[must_use]
    pub fn matches(&self, entry: &AuditLogEntry) -> bool {
        self.user_id
            .as_deref()
            .is_none_or(|user_id| entry.user_id.as_deref() == Some(user_id))
            && self
                .action
                .as_deref()
                .is_none_or(|action| entry.action == action)
            && self
                .entity
                .as_deref()
                .is_none_or(|entity| entry.entity == entity)
            && self
                .created_from
                .is_none_or(|from| entry.created_at >= from)
            && self.created_to.is_none_or(|to| entry.created_at < to)
    }
}

/// Port for persisting append-only audit rows.
#[async_trait]
pub trait AuditRepository: Send + Sync {
    /// Persists one audit row.
    async fn append_entry(&self, entry: NewAuditLogEntry) -> AppResult<()>;
}

/// Port for reading audit rows, newest first.
#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    /// Lists entries matching the query.
    async fn list_entries(&self, query: AuditLogQuery) -> AppResult<Vec<AuditLogEntry>>;
}
