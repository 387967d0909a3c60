use std::collections::HashSet;
use std::sync::Arc;

use hrdesk_core::{AppError, AppResult, RoleId};
use hrdesk_domain::{CatalogEntry, PermissionEntry, PermissionSet, Role};

use crate::operation_registry::{OperationRegistry, extract_catalog};
use crate::permission_ports::{CreateRoleInput, PermissionRepository, RoleRepository};


/// Application service over the permission allow-list and its roles.
#[derive(Clone)]
pub struct PermissionService {
    permission_repository: Arc<dyn PermissionRepository>,
    role_repository: Arc<dyn RoleRepository>,
}

impl PermissionService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        permission_repository: Arc<dyn PermissionRepository>,
        role_repository: Arc<dyn RoleRepository>,
    ) -> Self {
        Self {
            permission_repository,
            role_repository,
        }
    }

    /// Returns every operation the live registry exposes.
    #[must_use]
    pub fn list_catalog(&self, registry: &OperationRegistry) -> Vec<CatalogEntry> {
        extract_catalog(registry)
    }

    /// Atomically replaces the full permission set of a role.
    pub async fn replace_permissions(
        &self,
        role_id: RoleId,
        entries: Vec<PermissionEntry>,
    ) -> AppResult<()> {
        let mut seen = HashSet::with_capacity(entries.len());
        for entry in &entries {
            entry.validate()?;

            if !seen.insert((entry.module.as_str(), entry.action.as_str(), entry.kind)) {
                return Err(AppError::Validation(format!(
                    "duplicate permission entry for '{}' ({})",
                    entry.key(),
                    entry.kind
                )));
            }
        }

        if self.role_repository.find_role(role_id).await?.is_none() {
            return Err(AppError::NotFound(format!("role '{role_id}' does not exist")));
        }

        self.permission_repository
            .replace_permissions_for_role(role_id, entries.as_slice())
            .await
    }

    /// Returns the allowed `(module, action)` pairs of a role.
    pub async fn get_permissions_for_role(&self, role_id: RoleId) -> AppResult<PermissionSet> {
        self.permission_repository
            .list_allowed_operations_for_role(role_id)
            .await
    }

    /// Point lookup without a preloaded set.
    pub async fn is_allowed(&self, role_id: RoleId, module: &str, action: &str) -> AppResult<bool> {
        self.permission_repository
            .is_operation_allowed(role_id, module, action)
            .await
    }

    /// Creates a role with a unique name.
    pub async fn create_role(&self, input: CreateRoleInput) -> AppResult<Role> {
        let role = Role::new(RoleId::new(), input.name, input.description)?;

        if self
            .role_repository
            .find_role_by_name(role.name().as_str())
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(format!(
                "role '{}' already exists",
                role.name().as_str()
            )));
        }

        self.role_repository.create_role(role).await
    }

    /// Lists roles ordered by name.
    pub async fn list_roles(&self) -> AppResult<Vec<Role>> {
        self.role_repository.list_roles().await
    }

    /// Looks up a role by its unique name.
    pub async fn find_role_by_name(&self, name: &str) -> AppResult<Option<Role>> {
        self.role_repository.find_role_by_name(name).await
    }
}
