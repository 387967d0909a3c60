use std::sync::Arc;

use hrdesk_application::{
    AuditInterceptor, AuditLogService, ContextAssembler, OperationDispatcher, OperationPipeline,
    PermissionService, TimingInterceptor, security_operations,
};
use hrdesk_core::AppError;
use hrdesk_infrastructure::{
    JwtTokenService, PostgresAuditLogRepository, PostgresAuditRepository,
    PostgresPermissionRepository, PostgresRoleRepository,
};
use sqlx::PgPool;
use tracing::info;

use crate::api_config::{ApiConfig, SessionStoreConfig};
use crate::state::AppState;

use super::redis::build_redis_client;

pub fn build_app_state(pool: PgPool, config: &ApiConfig) -> Result<AppState, AppError> {
    let redis_client = match &config.session_store {
        SessionStoreConfig::Redis { redis_url } => Some(build_redis_client(redis_url)?),
        SessionStoreConfig::Postgres => None,
    };

    let permission_repository = Arc::new(PostgresPermissionRepository::new(pool.clone()));
    let role_repository = Arc::new(PostgresRoleRepository::new(pool.clone()));
    let audit_repository = Arc::new(PostgresAuditRepository::new(pool.clone()));
    let audit_log_repository = Arc::new(PostgresAuditLogRepository::new(pool.clone()));

    let permission_service =
        PermissionService::new(permission_repository.clone(), role_repository);
    let audit_log_service = AuditLogService::new(audit_log_repository);

    let registry = Arc::new(security_operations(
        permission_service.clone(),
        audit_log_service,
    )?);

    let timing = TimingInterceptor::with_jitter(config.latency_jitter);
    if let Some(jitter) = timing.jitter() {
        info!(
            min_ms = jitter.min_ms(),
            max_ms = jitter.max_ms(),
            "development latency jitter enabled"
        );
    }
    let pipeline = OperationPipeline::standard(
        timing,
        AuditInterceptor::new(audit_repository, config.audit_settings),
    );

    let token_service = Arc::new(JwtTokenService::new(
        config.token_secret.as_str(),
        config.token_issuer.clone(),
    )?);

    Ok(AppState {
        dispatcher: OperationDispatcher::new(registry, pipeline),
        context_assembler: ContextAssembler::new(token_service, permission_repository),
        permission_service,
        frontend_url: config.frontend_url.clone(),
        postgres_pool: pool,
        redis_client,
    })
}
