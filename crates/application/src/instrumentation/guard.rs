use async_trait::async_trait;
use hrdesk_core::AppResult;
use serde_json::Value;

use crate::enforce;
use crate::operation_registry::OperationAccess;

use super::{Next, OperationCall, OperationInterceptor};

/// Chain link that enforces the allow-list before any inner link runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthorizationGuard;

#[async_trait]
impl OperationInterceptor for AuthorizationGuard {
    async fn intercept(
        &self,
        call: &OperationCall<'_>,
        input: Value,
        next: Next<'_>,
    ) -> AppResult<Value> {
        if let OperationAccess::Protected { denial_message } = call.access {
            enforce(
                call.context,
                call.key.module(),
                call.key.action(),
                denial_message.as_str(),
            )?;
        }

        next.run(call, input).await
    }
}
