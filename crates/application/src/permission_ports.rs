use async_trait::async_trait;
use hrdesk_core::{AppResult, RoleId};
use hrdesk_domain::{PermissionEntry, PermissionSet, Role};
use serde::Deserialize;

/// Input payload for creating roles.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreateRoleInput {
    /// Unique role name.
    pub name: String,
    /// Optional free-form description.
    #[serde(default)]
    pub description: Option<String>,
}

/// Repository port for the persistent allow-list.
#[async_trait]
pub trait PermissionRepository: Send + Sync {
    /// Replaces every row of a role in one transaction.
    ///
    /// Fails with `NotFound` for unknown roles. Any failure leaves the
    /// previous rows in place.
    async fn replace_permissions_for_role(
        &self,
        role_id: RoleId,
        entries: &[PermissionEntry],
    ) -> AppResult<()>;

    /// Lists the allowed `(module, action)` pairs of a role.
    async fn list_allowed_operations_for_role(&self, role_id: RoleId) -> AppResult<PermissionSet>;

    /// Point lookup for one pair.
    async fn is_operation_allowed(
        &self,
        role_id: RoleId,
        module: &str,
        action: &str,
    ) -> AppResult<bool>;
}

/// Repository port for role administration.
#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// Creates a role; duplicate names fail with `Conflict`.
    async fn create_role(&self, role: Role) -> AppResult<Role>;

    /// Lists roles ordered by name.
    async fn list_roles(&self) -> AppResult<Vec<Role>>;

    /// Finds a role by identifier.
    async fn find_role(&self, role_id: RoleId) -> AppResult<Option<Role>>;

    /// Finds a role by its unique name.
    async fn find_role_by_name(&self, name: &str) -> AppResult<Option<Role>>;
}
