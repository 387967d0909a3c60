use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use hrdesk_application::{
    AuditLogEntry, AuditLogQuery, AuditLogRepository, AuditRepository, NewAuditLogEntry,
};
use hrdesk_core::{AppError, AppResult};
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory audit log for tests and local development.
#[derive(Debug, Default)]
pub struct InMemoryAuditRepository {
    entries: RwLock<Vec<AuditLogEntry>>,
    unavailable: AtomicBool,
}

impl InMemoryAuditRepository {
    /// Creates an empty audit log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates an unreachable audit sink.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Returns every stored entry in append order.
    pub async fn entries(&self) -> Vec<AuditLogEntry> {
        self.entries.read().await.clone()
    }
}

#[async_trait]
impl AuditRepository for InMemoryAuditRepository {
    async fn append_entry(&self, entry: NewAuditLogEntry) -> AppResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::Internal(
                "failed to append audit entry: sink unavailable".to_owned(),
            ));
        }

        self.entries.write().await.push(AuditLogEntry {
            id: Uuid::new_v4().to_string(),
            user_id: entry.user_id,
            action: entry.action,
            entity: entry.entity,
            payload: entry.payload,
            request: entry.request,
            response: entry.response,
            created_at: Utc::now(),
        });

        Ok(())
    }
}

#[async_trait]
impl AuditLogRepository for InMemoryAuditRepository {
    async fn list_entries(&self, query: AuditLogQuery) -> AppResult<Vec<AuditLogEntry>> {
        Ok(self
            .entries
            .read()
            .await
            .iter()
            .rev()
            .filter(|entry| query.matches(entry))
            .skip(query.offset)
            .take(query.capped_limit())
            .cloned()
            .collect())
    }
}
