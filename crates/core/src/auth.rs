use serde::{Deserialize, Serialize};

use crate::RoleId;

/// Caller identity stored in the cookie session or synthesized from token claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    subject: String,
    role_id: RoleId,
    email: Option<String>,
}

impl UserIdentity {
    /// Creates a user identity from authentication data.
    #[must_use]
    pub fn new(subject: impl Into<String>, role_id: RoleId, email: Option<String>) -> Self {
        Self {
            subject: subject.into(),
            role_id,
            email,
        }
    }

    /// Returns the stable subject identifier.
    #[must_use]
    pub fn subject(&self) -> &str {
        self.subject.as_str()
    }

    /// Returns the role whose permissions apply to this identity.
    #[must_use]
    pub fn role_id(&self) -> RoleId {
        self.role_id
    }

    /// Returns the email, if known.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }
}
