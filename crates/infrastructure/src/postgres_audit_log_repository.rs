use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use hrdesk_application::{AuditLogEntry, AuditLogQuery, AuditLogRepository};
use hrdesk_core::{AppError, AppResult};

#[cfg(test)]
mod tests;

/// PostgreSQL-backed repository for audit log reads.
#[derive(Clone)]
pub struct PostgresAuditLogRepository {
    pool: PgPool,
}

impl PostgresAuditLogRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct AuditLogRow {
    id: uuid::Uuid,
    user_id: Option<String>,
    action: String,
    entity: String,
    payload: String,
    request: String,
    response: String,
    created_at: DateTime<Utc>,
}

#[async_trait]
impl AuditLogRepository for PostgresAuditLogRepository {
    async fn list_entries(&self, query: AuditLogQuery) -> AppResult<Vec<AuditLogEntry>> {
        let capped_limit = i64::try_from(query.capped_limit()).unwrap_or(i64::MAX);
        let offset = i64::try_from(query.offset).unwrap_or(i64::MAX);
        let rows = sqlx::query_as::<_, AuditLogRow>(
            r#"
            SELECT
                id,
                user_id,
                action,
                entity,
                payload,
                request,
                response,
                created_at
            FROM audit_log
            WHERE ($1::TEXT IS NULL OR user_id = $1)
                AND ($2::TEXT IS NULL OR action = $2)
                AND ($3::TEXT IS NULL OR entity = $3)
                AND ($4::TIMESTAMPTZ IS NULL OR created_at >= $4)
                AND ($5::TIMESTAMPTZ IS NULL OR created_at < $5)
            ORDER BY created_at DESC, id DESC
            LIMIT $6
            OFFSET $7
            "#,
        )
        .bind(query.user_id)
        .bind(query.action)
        .bind(query.entity)
        .bind(query.created_from)
        .bind(query.created_to)
        .bind(capped_limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list audit log entries: {error}"))
        })?;

        Ok(rows
            .into_iter()
            .map(|row| AuditLogEntry {
                id: row.id.to_string(),
                user_id: row.user_id,
                action: row.action,
                entity: row.entity,
                payload: row.payload,
                request: row.request,
                response: row.response,
                created_at: row.created_at,
            })
            .collect())
    }
}
