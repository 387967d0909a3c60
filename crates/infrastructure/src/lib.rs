//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_audit_repository;
mod in_memory_security_repository;
mod jwt_token_service;
mod postgres_audit_log_repository;
mod postgres_audit_repository;
mod postgres_permission_repository;
mod postgres_role_repository;

pub use in_memory_audit_repository::InMemoryAuditRepository;
pub use in_memory_security_repository::InMemorySecurityRepository;
pub use jwt_token_service::{JwtTokenService, MIN_TOKEN_SECRET_LEN};
pub use postgres_audit_log_repository::PostgresAuditLogRepository;
pub use postgres_audit_repository::PostgresAuditRepository;
pub use postgres_permission_repository::PostgresPermissionRepository;
pub use postgres_role_repository::PostgresRoleRepository;

/// Embedded SQL migrations for the pipeline tables.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
