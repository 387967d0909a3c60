use std::sync::Arc;

use hrdesk_core::{AppError, AppResult};
use hrdesk_domain::OperationKey;
use serde::Deserialize;
use serde_json::Value;

use crate::authorization::AUTHENTICATION_REQUIRED_MESSAGE;
use crate::instrumentation::{OperationCall, OperationPipeline};
use crate::operation_registry::{OperationDescriptor, OperationRegistry};
use crate::RequestContext;

/// One element of a batch request.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BatchCall {
    /// Dotted operation path.
    pub operation: String,
    /// Operation input; absent means `null`.
    #[serde(default)]
    pub input: Value,
}

/// Resolves operation paths and runs them through the instrumentation chain.
#[derive(Clone)]
pub struct OperationDispatcher {
    registry: Arc<OperationRegistry>,
    pipeline: OperationPipeline,
}

impl OperationDispatcher {
    /// Creates a dispatcher over a live registry.
    #[must_use]
    pub fn new(registry: Arc<OperationRegistry>, pipeline: OperationPipeline) -> Self {
        Self { registry, pipeline }
    }

    /// Returns the registry calls are resolved against.
    #[must_use]
    pub fn registry(&self) -> &OperationRegistry {
        self.registry.as_ref()
    }

    /// Invokes one operation with an already assembled context.
    pub async fn dispatch(
        &self,
        context: &RequestContext,
        path: &str,
        input: Value,
    ) -> AppResult<Value> {
        let (key, descriptor) = self.resolve(context, path)?;
        let call = OperationCall {
            context,
            key: &key,
            kind: descriptor.kind(),
            access: descriptor.access(),
            registry: self.registry.as_ref(),
        };

        self.pipeline
            .invoke(&call, descriptor.handler(), input)
            .await
    }

    /// Invokes calls in order, sharing one context and its permission snapshot.
    pub async fn dispatch_batch(
        &self,
        context: &RequestContext,
        calls: Vec<BatchCall>,
    ) -> Vec<AppResult<Value>> {
        let mut results = Vec::with_capacity(calls.len());
        for call in calls {
            results.push(self.dispatch(context, call.operation.as_str(), call.input).await);
        }

        results
    }

    fn resolve(
        &self,
        context: &RequestContext,
        path: &str,
    ) -> AppResult<(OperationKey, OperationDescriptor)> {
        let resolved = match OperationKey::parse_path(path) {
            Ok(key) => self
                .registry
                .resolve(&key)?
                .map(|descriptor| (key, descriptor)),
            Err(_) => None,
        };

        match resolved {
            Some(resolved) => Ok(resolved),
            // Anonymous callers cannot tell which operations exist.
            None if context.session().is_none() => Err(AppError::Unauthorized(
                AUTHENTICATION_REQUIRED_MESSAGE.to_owned(),
            )),
            None => Err(AppError::NotFound(format!("operation '{path}' does not exist"))),
        }
    }
}
