use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hrdesk_core::AppResult;
use hrdesk_domain::OperationKind;
use serde_json::{Value, json};
use tracing::warn;

use crate::{AuditRepository, NewAuditLogEntry};

use super::{Next, OperationCall, OperationInterceptor};

/// Bounds applied to every audit write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditSettings {
    /// Upper bound on one append.
    pub write_timeout: Duration,
    /// Maximum characters kept per serialized field.
    pub max_chars: usize,
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self {
            write_timeout: Duration::from_secs(2),
            max_chars: 500,
        }
    }
}

/// Innermost chain link: records one row per mutation, best effort.
#[derive(Clone)]
pub struct AuditInterceptor {
    repository: Arc<dyn AuditRepository>,
    settings: AuditSettings,
}

impl AuditInterceptor {
    /// Creates an audit interceptor.
    #[must_use]
    pub fn new(repository: Arc<dyn AuditRepository>, settings: AuditSettings) -> Self {
        Self {
            repository,
            settings,
        }
    }

    fn truncate(&self, value: String) -> String {
        match value.char_indices().nth(self.settings.max_chars) {
            Some((byte_index, _)) => value[..byte_index].to_owned(),
            None => value,
        }
    }

    async fn append(&self, call: &OperationCall<'_>, entry: NewAuditLogEntry) {
        match tokio::time::timeout(
            self.settings.write_timeout,
            self.repository.append_entry(entry),
        )
        .await
        {
            Ok(Ok(())) => {}
            Ok(Err(error)) => {
                warn!(operation = %call.key, %error, "failed to write audit log entry");
            }
            Err(_) => {
                warn!(
                    operation = %call.key,
                    timeout_ms = u64::try_from(self.settings.write_timeout.as_millis())
                        .unwrap_or(u64::MAX),
                    "audit log write timed out"
                );
            }
        }
    }
}

#[async_trait]
impl OperationInterceptor for AuditInterceptor {
    async fn intercept(
        &self,
        call: &OperationCall<'_>,
        input: Value,
        next: Next<'_>,
    ) -> AppResult<Value> {
        if call.kind != OperationKind::Mutation {
            return next.run(call, input).await;
        }

        // Both columns carry the serialized input.
        let payload = self.truncate(input.to_string());
        let request = payload.clone();

        let result = next.run(call, input).await;

        if matches!(&result, Err(error) if error.is_access_denied()) {
            return result;
        }

        let response = match &result {
            Ok(value) => value.to_string(),
            Err(error) => json!({ "error": error.to_string() }).to_string(),
        };

        let entry = NewAuditLogEntry {
            user_id: call.context.subject().map(str::to_owned),
            action: call.key.path(),
            entity: call.key.module().to_owned(),
            payload,
            request,
            response: self.truncate(response),
        };
        self.append(call, entry).await;

        result
    }
}
