use hrdesk_core::UserIdentity;
use hrdesk_domain::PermissionSet;

/// Resolved caller plus the permission snapshot taken when the context was built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    identity: UserIdentity,
    permissions: PermissionSet,
}

impl SessionContext {
    /// Creates a session context.
    #[must_use]
    pub fn new(identity: UserIdentity, permissions: PermissionSet) -> Self {
        Self {
            identity,
            permissions,
        }
    }

    /// Returns the caller identity.
    #[must_use]
    pub fn identity(&self) -> &UserIdentity {
        &self.identity
    }

    /// Returns the permission snapshot.
    #[must_use]
    pub fn permissions(&self) -> &PermissionSet {
        &self.permissions
    }
}

/// Per-request value passed explicitly to every interceptor and handler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    session: Option<SessionContext>,
}

impl RequestContext {
    /// Creates a context without a session.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Creates a context for a resolved identity.
    #[must_use]
    pub fn authenticated(identity: UserIdentity, permissions: PermissionSet) -> Self {
        Self {
            session: Some(SessionContext::new(identity, permissions)),
        }
    }

    /// Returns the session, if one was resolved.
    #[must_use]
    pub fn session(&self) -> Option<&SessionContext> {
        self.session.as_ref()
    }

    /// Returns the caller subject, if one was resolved.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.session
            .as_ref()
            .map(|session| session.identity.subject())
    }
}
