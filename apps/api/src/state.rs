use hrdesk_application::{ContextAssembler, OperationDispatcher, PermissionService};
use sqlx::PgPool;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: OperationDispatcher,
    pub context_assembler: ContextAssembler,
    pub permission_service: PermissionService,
    pub frontend_url: String,
    pub postgres_pool: PgPool,
    pub redis_client: Option<redis::Client>,
}
