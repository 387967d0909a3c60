use std::sync::Arc;

use hrdesk_core::{AppError, AppResult};

use crate::audit_ports::{AuditLogEntry, AuditLogQuery, AuditLogRepository};

/// Read side of the append-only audit log.
#[derive(Clone)]
pub struct AuditLogService {
    repository: Arc<dyn AuditLogRepository>,
}

impl AuditLogService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(repository: Arc<dyn AuditLogRepository>) -> Self {
        Self { repository }
    }

    /// Lists entries newest first with a bounded page size.
    pub async fn list_entries(&self, query: AuditLogQuery) -> AppResult<Vec<AuditLogEntry>> {
        if let (Some(from), Some(to)) = (query.created_from, query.created_to)
            && from > to
        {
            return Err(AppError::Validation(
                "created_from must not be later than created_to".to_owned(),
            ));
        }

        let limit = query.capped_limit();
        self.repository
            .list_entries(AuditLogQuery { limit, ..query })
            .await
    }
}
