use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use hrdesk_application::{PermissionRepository, RoleRepository};
use hrdesk_core::{AppError, AppResult, RoleId};
use hrdesk_domain::{OperationKey, OperationKind, PermissionEntry, PermissionSet, Role};
use tokio::sync::RwLock;

type PermissionRowKey = (String, String, OperationKind);

/// In-memory roles and permission rows.
///
/// Writes go to a staged copy that only replaces the live rows once every
/// insert succeeded.
#[derive(Debug, Default)]
pub struct InMemorySecurityRepository {
    roles: RwLock<HashMap<RoleId, Role>>,
    permissions: RwLock<HashMap<RoleId, BTreeMap<PermissionRowKey, bool>>>,
    fail_after_inserts: RwLock<Option<usize>>,
}

impl InMemorySecurityRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next replacements fail after `count` rows were staged.
    pub async fn fail_after_inserts(&self, count: Option<usize>) {
        *self.fail_after_inserts.write().await = count;
    }
}

#[async_trait]
impl PermissionRepository for InMemorySecurityRepository {
    async fn replace_permissions_for_role(
        &self,
        role_id: RoleId,
        entries: &[PermissionEntry],
    ) -> AppResult<()> {
        if !self.roles.read().await.contains_key(&role_id) {
            return Err(AppError::NotFound(format!("role '{role_id}' was not found")));
        }

        let fail_after_inserts = *self.fail_after_inserts.read().await;
        let mut permissions = self.permissions.write().await;
        let mut staged = BTreeMap::new();

        for (inserted, entry) in entries.iter().enumerate() {
            if fail_after_inserts == Some(inserted) {
                return Err(AppError::Internal(format!(
                    "failed to persist permissions: injected failure after {inserted} rows"
                )));
            }

            let key = (entry.module.clone(), entry.action.clone(), entry.kind);
            if staged.insert(key, entry.allow).is_some() {
                return Err(AppError::Validation(format!(
                    "duplicate permission entry for '{}' ({})",
                    entry.key(),
                    entry.kind
                )));
            }
        }

        permissions.insert(role_id, staged);
        Ok(())
    }

    async fn list_allowed_operations_for_role(&self, role_id: RoleId) -> AppResult<PermissionSet> {
        let permissions = self.permissions.read().await;
        let Some(rows) = permissions.get(&role_id) else {
            return Ok(PermissionSet::new());
        };

        rows.iter()
            .filter(|(_, allow)| **allow)
            .map(|((module, action, _), _)| {
                OperationKey::new(module.as_str(), action.as_str())
            })
            .collect::<AppResult<Vec<_>>>()
            .map(|keys| keys.into_iter().collect())
    }

    async fn is_operation_allowed(
        &self,
        role_id: RoleId,
        module: &str,
        action: &str,
    ) -> AppResult<bool> {
        Ok(self.permissions.read().await.get(&role_id).is_some_and(|rows| {
            rows.iter().any(|((stored_module, stored_action, _), allow)| {
                *allow && stored_module == module && stored_action == action
            })
        }))
    }
}

#[async_trait]
impl RoleRepository for InMemorySecurityRepository {
    async fn create_role(&self, role: Role) -> AppResult<Role> {
        let mut roles = self.roles.write().await;

        if roles
            .values()
            .any(|stored| stored.name().as_str() == role.name().as_str())
        {
            return Err(AppError::Conflict(format!(
                "role '{}' already exists",
                role.name().as_str()
            )));
        }

        roles.insert(role.id(), role.clone());
        Ok(role)
    }

    async fn list_roles(&self) -> AppResult<Vec<Role>> {
        let mut roles: Vec<Role> = self.roles.read().await.values().cloned().collect();
        roles.sort_by(|left, right| left.name().as_str().cmp(right.name().as_str()));
        Ok(roles)
    }

    async fn find_role(&self, role_id: RoleId) -> AppResult<Option<Role>> {
        Ok(self.roles.read().await.get(&role_id).cloned())
    }

    async fn find_role_by_name(&self, name: &str) -> AppResult<Option<Role>> {
        Ok(self
            .roles
            .read()
            .await
            .values()
            .find(|role| role.name().as_str() == name.trim())
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use hrdesk_application::{PermissionRepository, RoleRepository};
    use hrdesk_core::{AppError, RoleId};
    use hrdesk_domain::{OperationKind, PermissionEntry, Role};

    use super::InMemorySecurityRepository;

    fn entry(module: &str, action: &str, allow: bool) -> PermissionEntry {
        PermissionEntry {
            module: module.to_owned(),
            action: action.to_owned(),
            kind: OperationKind::Mutation,
            allow,
        }
    }

    async fn repository_with_role() -> (InMemorySecurityRepository, RoleId) {
        let repository = InMemorySecurityRepository::new();
        let Ok(role) = Role::new(RoleId::new(), "editor", None) else {
            panic!("role should be valid");
        };
        let role_id = role.id();
        assert!(repository.create_role(role).await.is_ok());

        (repository, role_id)
    }

    #[tokio::test]
    async fn injected_mid_write_failure_keeps_previous_rows() {
        let (repository, role_id) = repository_with_role().await;
        let seeded = repository
            .replace_permissions_for_role(role_id, &[entry("posts", "create", true)])
            .await;
        assert!(seeded.is_ok());

        repository.fail_after_inserts(Some(1)).await;
        let failed = repository
            .replace_permissions_for_role(
                role_id,
                &[entry("posts", "delete", true), entry("posts", "archive", true)],
            )
            .await;
        assert!(matches!(failed, Err(AppError::Internal(_))));

        let permissions = repository.list_allowed_operations_for_role(role_id).await;
        assert!(matches!(
            &permissions,
            Ok(set) if set.len() == 1 && set.contains("posts", "create")
        ));

        repository.fail_after_inserts(None).await;
        let recovered = repository
            .replace_permissions_for_role(role_id, &[entry("posts", "delete", true)])
            .await;
        assert!(recovered.is_ok());
        assert!(matches!(
            repository.is_operation_allowed(role_id, "posts", "create").await,
            Ok(false)
        ));
    }

    #[tokio::test]
    async fn denied_rows_are_stored_but_not_listed() {
        let (repository, role_id) = repository_with_role().await;
        let stored = repository
            .replace_permissions_for_role(
                role_id,
                &[entry("posts", "create", true), entry("posts", "delete", false)],
            )
            .await;
        assert!(stored.is_ok());

        assert!(matches!(
            repository.list_allowed_operations_for_role(role_id).await,
            Ok(set) if set.len() == 1
        ));
        assert!(matches!(
            repository.is_operation_allowed(role_id, "posts", "delete").await,
            Ok(false)
        ));
    }

    #[tokio::test]
    async fn unknown_roles_and_duplicate_names_are_rejected() {
        let (repository, _) = repository_with_role().await;

        let unknown = repository
            .replace_permissions_for_role(RoleId::new(), &[])
            .await;
        assert!(matches!(unknown, Err(AppError::NotFound(_))));

        let Ok(duplicate) = Role::new(RoleId::new(), " editor ", None) else {
            panic!("role should be valid");
        };
        assert!(matches!(
            repository.create_role(duplicate).await,
            Err(AppError::Conflict(_))
        ));
    }
}
