use std::sync::Arc;

use async_trait::async_trait;
use hrdesk_core::{AppResult, RoleId, UserIdentity};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::RequestContext;
use crate::permission_ports::PermissionRepository;


/// Claims carried by a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject identifier.
    pub sub: String,
    /// Role the subject acts under.
    pub role_id: String,
    /// Optional email for display and audit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Expiry as seconds since the Unix epoch.
    pub exp: u64,
    /// Optional token issuer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

impl TokenClaims {
    /// Builds the caller identity without an identity-store round trip.
    pub fn into_identity(self) -> AppResult<UserIdentity> {
        let role_id = self.role_id.parse::<RoleId>()?;
        Ok(UserIdentity::new(self.sub, role_id, self.email))
    }
}

/// Port for verifying signed bearer tokens.
pub trait TokenVerifier: Send + Sync {
    /// Verifies signature, expiry and issuer, returning the claims.
    fn verify(&self, token: &str) -> AppResult<TokenClaims>;
}

/// Port for reading the identity stored in a cookie-backed session.
#[async_trait]
pub trait SessionIdentitySource: Send + Sync {
    /// Returns the stored identity, if the session holds one.
    async fn load_identity(&self) -> AppResult<Option<UserIdentity>>;
}

/// Raw credentials extracted from an inbound request.
#[derive(Clone, Copy, Default)]
pub struct RequestCredentials<'a> {
    /// Token from an `Authorization: Bearer` header.
    pub bearer_token: Option<&'a str>,
    /// Cookie session attached to the request.
    pub session: Option<&'a dyn SessionIdentitySource>,
}

/// Resolves the caller and snapshots their permissions once per request.
#[derive(Clone)]
pub struct ContextAssembler {
    token_verifier: Arc<dyn TokenVerifier>,
    permission_repository: Arc<dyn PermissionRepository>,
}

impl ContextAssembler {
    /// Creates a new assembler from required dependencies.
    #[must_use]
    pub fn new(
        token_verifier: Arc<dyn TokenVerifier>,
        permission_repository: Arc<dyn PermissionRepository>,
    ) -> Self {
        Self {
            token_verifier,
            permission_repository,
        }
    }

    /// Builds the request context. Failures degrade to an anonymous context.
    pub async fn build_context(&self, credentials: RequestCredentials<'_>) -> RequestContext {
        let Some(identity) = self.resolve_identity(credentials).await else {
            return RequestContext::anonymous();
        };

        match self
            .permission_repository
            .list_allowed_operations_for_role(identity.role_id())
            .await
        {
            Ok(permissions) => RequestContext::authenticated(identity, permissions),
            Err(error) => {
                warn!(
                    subject = identity.subject(),
                    role_id = %identity.role_id(),
                    %error,
                    "failed to load permissions, continuing anonymously"
                );
                RequestContext::anonymous()
            }
        }
    }

    async fn resolve_identity(&self, credentials: RequestCredentials<'_>) -> Option<UserIdentity> {
        // A presented token is authoritative; a bad one does not fall back to the cookie.
        if let Some(token) = credentials.bearer_token {
            return match self
                .token_verifier
                .verify(token)
                .and_then(TokenClaims::into_identity)
            {
                Ok(identity) => Some(identity),
                Err(error) => {
                    warn!(%error, "rejecting bearer token, continuing anonymously");
                    None
                }
            };
        }

        match credentials.session?.load_identity().await {
            Ok(identity) => identity,
            Err(error) => {
                warn!(%error, "failed to read session identity, continuing anonymously");
                None
            }
        }
    }
}
