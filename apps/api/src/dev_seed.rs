use chrono::Duration;
use hrdesk_application::CreateRoleInput;
use hrdesk_core::{AppResult, UserIdentity};
use hrdesk_domain::PermissionEntry;
use hrdesk_infrastructure::JwtTokenService;
use tracing::{info, warn};

use crate::api_config::{ApiConfig, AppEnvironment};
use crate::state::AppState;

const DEV_SEED_ADMIN_ROLE: &str = "admin";
const DEV_SEED_ADMIN_SUBJECT: &str = "dev-admin";
const DEV_SEED_TOKEN_HOURS: i64 = 12;

/// Grants the `admin` role every operation in the live catalog.
pub async fn run(state: &AppState, config: &ApiConfig) -> AppResult<()> {
    if config.app_env == AppEnvironment::Production {
        warn!("DEV_SEED is ignored in production");
        return Ok(());
    }

    let permission_service = &state.permission_service;
    let role = match permission_service
        .find_role_by_name(DEV_SEED_ADMIN_ROLE)
        .await?
    {
        Some(role) => role,
        None => {
            permission_service
                .create_role(CreateRoleInput {
                    name: DEV_SEED_ADMIN_ROLE.to_owned(),
                    description: Some("Development role with every operation".to_owned()),
                })
                .await?
        }
    };

    let entries: Vec<PermissionEntry> = permission_service
        .list_catalog(state.dispatcher.registry())
        .into_iter()
        .map(|entry| PermissionEntry {
            module: entry.module,
            action: entry.action,
            kind: entry.kind,
            allow: true,
        })
        .collect();
    let granted = entries.len();
    permission_service
        .replace_permissions(role.id(), entries)
        .await?;

    info!(role_id = %role.id(), granted, "dev seed granted the admin role every operation");

    let tokens = JwtTokenService::new(config.token_secret.as_str(), config.token_issuer.clone())?;
    let token = tokens.issue(
        &UserIdentity::new(DEV_SEED_ADMIN_SUBJECT, role.id(), None),
        Duration::hours(DEV_SEED_TOKEN_HOURS),
    )?;
    info!(
        subject = DEV_SEED_ADMIN_SUBJECT,
        %token,
        "dev admin bearer token"
    );

    Ok(())
}
