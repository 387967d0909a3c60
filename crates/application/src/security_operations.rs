use std::sync::Arc;

use async_trait::async_trait;
use hrdesk_core::{AppError, AppResult, RoleId};
use hrdesk_domain::{OperationKind, PermissionEntry};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::audit_ports::AuditLogQuery;
use crate::audit_log_service::AuditLogService;
use crate::instrumentation::OperationCall;
use crate::operation_registry::{OperationDescriptor, OperationHandler, OperationRegistry};
use crate::permission_ports::CreateRoleInput;
use crate::permission_service::PermissionService;

#[derive(Debug, Deserialize)]
struct RoleScopedInput {
    role_id: RoleId,
}

#[derive(Debug, Deserialize)]
struct CheckPermissionInput {
    role_id: RoleId,
    module: String,
    action: String,
}

#[derive(Debug, Deserialize)]
struct ReplacePermissionsInput {
    role_id: RoleId,
    entries: Vec<PermissionEntry>,
}

#[derive(Debug, Serialize)]
struct RolePermissionsOutput {
    role_id: RoleId,
    operations: Vec<String>,
}

#[derive(Debug, Serialize)]
struct CheckPermissionOutput {
    allowed: bool,
}

#[derive(Debug, Clone, Copy)]
enum SecurityOperation {
    Catalog,
    PermissionsForRole,
    CheckPermission,
    ReplacePermissions,
    ListRoles,
    CreateRole,
    ListAuditLog,
}

struct SecurityOperationHandler {
    operation: SecurityOperation,
    permissions: PermissionService,
    audit_log: AuditLogService,
}

#[async_trait]
impl OperationHandler for SecurityOperationHandler {
    async fn handle(&self, call: &OperationCall<'_>, input: Value) -> AppResult<Value> {
        match self.operation {
            SecurityOperation::Catalog => to_output(self.permissions.list_catalog(call.registry)),
            SecurityOperation::PermissionsForRole => {
                let input: RoleScopedInput = parse_input(input)?;
                let permissions = self
                    .permissions
                    .get_permissions_for_role(input.role_id)
                    .await?;
                to_output(RolePermissionsOutput {
                    role_id: input.role_id,
                    operations: permissions.iter().map(|key| key.path()).collect(),
                })
            }
            SecurityOperation::CheckPermission => {
                let input: CheckPermissionInput = parse_input(input)?;
                let allowed = self
                    .permissions
                    .is_allowed(input.role_id, input.module.as_str(), input.action.as_str())
                    .await?;
                to_output(CheckPermissionOutput { allowed })
            }
            SecurityOperation::ReplacePermissions => {
                let input: ReplacePermissionsInput = parse_input(input)?;
                self.permissions
                    .replace_permissions(input.role_id, input.entries)
                    .await?;
                let permissions = self
                    .permissions
                    .get_permissions_for_role(input.role_id)
                    .await?;
                to_output(RolePermissionsOutput {
                    role_id: input.role_id,
                    operations: permissions.iter().map(|key| key.path()).collect(),
                })
            }
            SecurityOperation::ListRoles => to_output(self.permissions.list_roles().await?),
            SecurityOperation::CreateRole => {
                let input: CreateRoleInput = parse_input(input)?;
                to_output(self.permissions.create_role(input).await?)
            }
            SecurityOperation::ListAuditLog => {
                let query: AuditLogQuery = parse_input(input)?;
                to_output(self.audit_log.list_entries(query).await?)
            }
        }
    }
}

fn parse_input<T: DeserializeOwned>(input: Value) -> AppResult<T> {
    let input = if input.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        input
    };

    serde_json::from_value(input)
        .map_err(|error| AppError::Validation(format!("invalid operation input: {error}")))
}

fn to_output(value: impl Serialize) -> AppResult<Value> {
    serde_json::to_value(value).map_err(|error| {
        AppError::Internal(format!("failed to serialize operation output: {error}"))
    })
}

/// Builds the `permission`, `role` and `auditLog` operation groups.
pub fn security_operations(
    permissions: PermissionService,
    audit_log: AuditLogService,
) -> AppResult<OperationRegistry> {
    let leaf = |operation, kind, denial_message: &str| {
        OperationDescriptor::protected(
            kind,
            denial_message,
            Arc::new(SecurityOperationHandler {
                operation,
                permissions: permissions.clone(),
                audit_log: audit_log.clone(),
            }),
        )
    };

    let permission = OperationRegistry::new()
        .with_operation(
            "catalog",
            leaf(
                SecurityOperation::Catalog,
                OperationKind::Query,
                "You are not allowed to view the operation catalog",
            ),
        )?
        .with_operation(
            "forRole",
            leaf(
                SecurityOperation::PermissionsForRole,
                OperationKind::Query,
                "You are not allowed to view role permissions",
            ),
        )?
        .with_operation(
            "check",
            leaf(
                SecurityOperation::CheckPermission,
                OperationKind::Query,
                "You are not allowed to check role permissions",
            ),
        )?
        .with_operation(
            "replace",
            leaf(
                SecurityOperation::ReplacePermissions,
                OperationKind::Mutation,
                "You are not allowed to edit role permissions",
            ),
        )?;

    let role = OperationRegistry::new()
        .with_operation(
            "list",
            leaf(
                SecurityOperation::ListRoles,
                OperationKind::Query,
                "You are not allowed to view roles",
            ),
        )?
        .with_operation(
            "create",
            leaf(
                SecurityOperation::CreateRole,
                OperationKind::Mutation,
                "You are not allowed to create roles",
            ),
        )?;

    let audit_log_group = OperationRegistry::new().with_operation(
        "list",
        leaf(
            SecurityOperation::ListAuditLog,
            OperationKind::Query,
            "You are not allowed to view the audit log",
        ),
    )?;

    OperationRegistry::new()
        .with_group("permission", permission)?
        .with_group("role", role)?
        .with_group("auditLog", audit_log_group)
}
