use std::str::FromStr;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use hrdesk_core::{AppError, AppResult};
use serde_json::Value;
use tracing::{info, warn};

use super::{Next, OperationCall, OperationInterceptor};

/// Upper bound accepted for artificial development latency.
pub const MAX_LATENCY_JITTER_MS: u64 = 60_000;

/// Inclusive millisecond range for artificial development latency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencyJitter {
    min_ms: u64,
    max_ms: u64,
}

impl LatencyJitter {
    /// Creates a jitter range.
    pub fn new(min_ms: u64, max_ms: u64) -> AppResult<Self> {
        if min_ms > max_ms {
            return Err(AppError::Validation(format!(
                "latency jitter minimum {min_ms}ms exceeds maximum {max_ms}ms"
            )));
        }
        if max_ms > MAX_LATENCY_JITTER_MS {
            return Err(AppError::Validation(format!(
                "latency jitter maximum {max_ms}ms exceeds {MAX_LATENCY_JITTER_MS}ms"
            )));
        }

        Ok(Self { min_ms, max_ms })
    }

    /// Returns the lower bound in milliseconds.
    #[must_use]
    pub fn min_ms(&self) -> u64 {
        self.min_ms
    }

    /// Returns the upper bound in milliseconds.
    #[must_use]
    pub fn max_ms(&self) -> u64 {
        self.max_ms
    }

    /// Draws a delay uniformly enough for development use.
    pub fn sample(&self) -> AppResult<Duration> {
        let mut bytes = [0u8; 8];
        getrandom::fill(&mut bytes).map_err(|error| {
            AppError::Internal(format!("failed to sample latency jitter: {error}"))
        })?;

        let span = (self.max_ms - self.min_ms).saturating_add(1);
        let offset = u64::from_le_bytes(bytes) % span;
        Ok(Duration::from_millis(self.min_ms.saturating_add(offset)))
    }
}

impl FromStr for LatencyJitter {
    type Err = AppError;

    /// Parses `min-max` or a single fixed value.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let parse = |part: &str| {
            part.trim().parse::<u64>().map_err(|error| {
                AppError::Validation(format!("invalid latency jitter '{value}': {error}"))
            })
        };

        match value.split_once('-') {
            Some((min, max)) => Self::new(parse(min)?, parse(max)?),
            None => {
                let fixed = parse(value)?;
                Self::new(fixed, fixed)
            }
        }
    }
}

/// Outermost chain link: measures latency and logs the outcome.
#[derive(Debug, Clone, Default)]
pub struct TimingInterceptor {
    jitter: Option<LatencyJitter>,
}

impl TimingInterceptor {
    /// Creates a timing interceptor without jitter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a timing interceptor that delays calls in debug builds.
    ///
    /// Release builds drop the jitter.
    #[must_use]
    pub fn with_jitter(jitter: Option<LatencyJitter>) -> Self {
        Self {
            jitter: jitter.filter(|_| cfg!(debug_assertions)),
        }
    }

    /// Returns the active jitter, if any.
    #[must_use]
    pub fn jitter(&self) -> Option<LatencyJitter> {
        self.jitter
    }
}

#[async_trait]
impl OperationInterceptor for TimingInterceptor {
    async fn intercept(
        &self,
        call: &OperationCall<'_>,
        input: Value,
        next: Next<'_>,
    ) -> AppResult<Value> {
        let started_at = Instant::now();

        if let Some(jitter) = self.jitter {
            match jitter.sample() {
                Ok(delay) => tokio::time::sleep(delay).await,
                Err(error) => warn!(%error, "skipping latency jitter"),
            }
        }

        let result = next.run(call, input).await;

        let duration_ms = u64::try_from(started_at.elapsed().as_millis()).unwrap_or(u64::MAX);
        let outcome = match &result {
            Ok(_) => "ok",
            Err(error) if error.is_access_denied() => "rejected",
            Err(_) => "error",
        };
        info!(
            operation = %call.key,
            kind = %call.kind,
            duration_ms,
            outcome,
            "operation completed"
        );

        result
    }
}
