use hrdesk_application::RequestContext;
use serde::Serialize;
use ts_rs::TS;

/// Health response payload.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/health-response.ts"
)]
pub struct HealthResponse {
    pub status: &'static str,
    pub ready: bool,
    pub postgres: HealthDependencyStatus,
    pub redis: HealthDependencyStatus,
}

/// One runtime dependency health status.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/health-dependency-status.ts"
)]
pub struct HealthDependencyStatus {
    pub status: &'static str,
    pub detail: Option<String>,
}

/// Caller identity and the operations their role may invoke.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/identity-response.ts"
)]
pub struct IdentityResponse {
    pub subject: String,
    pub role_id: String,
    pub email: Option<String>,
    /// Allowed `module.action` paths, sorted.
    pub permissions: Vec<String>,
}

impl IdentityResponse {
    /// Returns `None` for anonymous contexts.
    pub fn from_context(context: &RequestContext) -> Option<Self> {
        let session = context.session()?;
        let identity = session.identity();

        let mut permissions: Vec<String> =
            session.permissions().iter().map(|key| key.path()).collect();
        permissions.sort();

        Some(Self {
            subject: identity.subject().to_owned(),
            role_id: identity.role_id().to_string(),
            email: identity.email().map(ToOwned::to_owned),
            permissions,
        })
    }
}
