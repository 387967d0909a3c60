use std::sync::Arc;

use async_trait::async_trait;
use hrdesk_core::AppResult;
use hrdesk_domain::{OperationKey, OperationKind};
use serde_json::Value;

use crate::RequestContext;
use crate::operation_registry::{OperationAccess, OperationHandler, OperationRegistry};

mod audit;
mod guard;
mod timing;

#[cfg(test)]
mod tests;

pub use audit::{AuditInterceptor, AuditSettings};
pub use guard::AuthorizationGuard;
pub use timing::{LatencyJitter, MAX_LATENCY_JITTER_MS, TimingInterceptor};

/// Everything an interceptor or handler knows about the call in flight.
#[derive(Debug, Clone, Copy)]
pub struct OperationCall<'a> {
    /// Context assembled once for the inbound request.
    pub context: &'a RequestContext,
    /// Resolved operation address.
    pub key: &'a OperationKey,
    /// Operation kind from the registry leaf.
    pub kind: OperationKind,
    /// Access policy from the registry leaf.
    pub access: &'a OperationAccess,
    /// Live registry the operation was resolved from.
    pub registry: &'a OperationRegistry,
}

/// One link of the instrumentation chain.
#[async_trait]
pub trait OperationInterceptor: Send + Sync {
    /// Handles the call, usually by delegating to `next`.
    async fn intercept(
        &self,
        call: &OperationCall<'_>,
        input: Value,
        next: Next<'_>,
    ) -> AppResult<Value>;
}

/// Remainder of the chain after the current interceptor.
pub struct Next<'a> {
    interceptors: &'a [Arc<dyn OperationInterceptor>],
    handler: &'a dyn OperationHandler,
}

impl Next<'_> {
    /// Runs the next interceptor, or the handler once the chain is exhausted.
    pub async fn run(self, call: &OperationCall<'_>, input: Value) -> AppResult<Value> {
        match self.interceptors.split_first() {
            Some((interceptor, rest)) => {
                let next = Next {
                    interceptors: rest,
                    handler: self.handler,
                };
                interceptor.intercept(call, input, next).await
            }
            None => self.handler.handle(call, input).await,
        }
    }
}

/// Ordered interceptors with the authorization guard always in the middle.
#[derive(Clone)]
pub struct OperationPipeline {
    interceptors: Vec<Arc<dyn OperationInterceptor>>,
}

impl OperationPipeline {
    /// Builds `outer → AuthorizationGuard → inner → handler`.
    #[must_use]
    pub fn new(
        outer: Vec<Arc<dyn OperationInterceptor>>,
        inner: Vec<Arc<dyn OperationInterceptor>>,
    ) -> Self {
        let mut interceptors = outer;
        interceptors.push(Arc::new(AuthorizationGuard));
        interceptors.extend(inner);

        Self { interceptors }
    }

    /// Builds `Timing → AuthorizationGuard → Audit → handler`.
    #[must_use]
    pub fn standard(timing: TimingInterceptor, audit: AuditInterceptor) -> Self {
        Self::new(vec![Arc::new(timing)], vec![Arc::new(audit)])
    }

    /// Runs the chain around a handler.
    pub async fn invoke(
        &self,
        call: &OperationCall<'_>,
        handler: &dyn OperationHandler,
        input: Value,
    ) -> AppResult<Value> {
        Next {
            interceptors: self.interceptors.as_slice(),
            handler,
        }
        .run(call, input)
        .await
    }
}
