//! Application services and ports.

#![forbid(unsafe_code)]

mod audit_log_service;
mod audit_ports;
mod authorization;
mod context_assembler;
mod instrumentation;
mod operation_dispatcher;
mod operation_registry;
mod permission_ports;
mod permission_service;
mod request_context;
mod security_operations;

pub use audit_log_service::AuditLogService;
pub use audit_ports::{
    AUDIT_LOG_MAX_LIMIT, AuditLogEntry, AuditLogQuery, AuditLogRepository, AuditRepository,
    NewAuditLogEntry,
};
pub use authorization::{AUTHENTICATION_REQUIRED_MESSAGE, enforce};
pub use context_assembler::{
    ContextAssembler, RequestCredentials, SessionIdentitySource, TokenClaims, TokenVerifier,
};
pub use instrumentation::{
    AuditInterceptor, AuditSettings, AuthorizationGuard, LatencyJitter, MAX_LATENCY_JITTER_MS,
    Next, OperationCall, OperationInterceptor, OperationPipeline, TimingInterceptor,
};
pub use operation_dispatcher::{BatchCall, OperationDispatcher};
pub use operation_registry::{
    MAX_REGISTRY_DEPTH, OperationAccess, OperationDescriptor, OperationHandler, OperationNode,
    OperationRegistry, RegistryMount, RegistryVisitor, extract_catalog, walk_registry,
};
pub use permission_ports::{CreateRoleInput, PermissionRepository, RoleRepository};
pub use permission_service::PermissionService;
pub use request_context::{RequestContext, SessionContext};
pub use security_operations::security_operations;
