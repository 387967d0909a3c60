use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use tracing::{debug, warn};

use hrdesk_application::PermissionRepository;
use hrdesk_core::{AppError, AppResult, RoleId};
use hrdesk_domain::{OperationKey, PermissionEntry, PermissionSet};


/// PostgreSQL-backed permission allow-list.
#[derive(Clone)]
pub struct PostgresPermissionRepository {
    pool: PgPool,
}

impl PostgresPermissionRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct AllowedOperationRow {
    module: String,
    action: String,
}

fn map_permission_write_error(error: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(database_error) = &error
        && database_error.code().as_deref() == Some("23505")
    {
        return AppError::Validation(format!("duplicate permission entry: {database_error}"));
    }

    AppError::Internal(format!("failed to persist permissions: {error}"))
}

#[async_trait]
impl PermissionRepository for PostgresPermissionRepository {
    async fn replace_permissions_for_role(
        &self,
        role_id: RoleId,
        entries: &[PermissionEntry],
    ) -> AppResult<()> {
        let mut transaction =
            self.pool.begin().await.map_err(|error| {
                AppError::Internal(format!("failed to begin transaction: {error}"))
            })?;

        // Row lock serializes concurrent replacements of the same role.
        sqlx::query_scalar::<_, uuid::Uuid>(
            r#"
            SELECT id
            FROM roles
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(role_id.as_uuid())
        .fetch_optional(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to resolve role: {error}")))?
        .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' was not found")))?;

        sqlx::query(
            r#"
            DELETE FROM permissions
            WHERE role_id = $1
            "#,
        )
        .bind(role_id.as_uuid())
        .execute(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to clear permissions: {error}")))?;

        for entry in entries {
            sqlx::query(
                r#"
                INSERT INTO permissions (role_id, module, action, kind, allow)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(role_id.as_uuid())
            .bind(entry.module.as_str())
            .bind(entry.action.as_str())
            .bind(entry.kind.as_str())
            .bind(entry.allow)
            .execute(&mut *transaction)
            .await
            .map_err(map_permission_write_error)?;
        }

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit transaction: {error}"))
        })?;

        debug!(%role_id, count = entries.len(), "replaced role permissions");
        Ok(())
    }

    async fn list_allowed_operations_for_role(&self, role_id: RoleId) -> AppResult<PermissionSet> {
        let rows = sqlx::query_as::<_, AllowedOperationRow>(
            r#"
            SELECT module, action
            FROM permissions
            WHERE role_id = $1 AND allow
            "#,
        )
        .bind(role_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list permissions: {error}")))?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                OperationKey::new(row.module.as_str(), row.action.as_str())
                    .inspect_err(|error| {
                        warn!(
                            %role_id,
                            module = %row.module,
                            action = %row.action,
                            %error,
                            "ignoring malformed permission row"
                        );
                    })
                    .ok()
            })
            .collect())
    }

    async fn is_operation_allowed(
        &self,
        role_id: RoleId,
        module: &str,
        action: &str,
    ) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM permissions
                WHERE role_id = $1 AND module = $2 AND action = $3 AND allow
            )
            "#,
        )
        .bind(role_id.as_uuid())
        .bind(module)
        .bind(action)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to check permission: {error}")))
    }
}
