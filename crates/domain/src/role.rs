use hrdesk_core::{AppResult, NonEmptyString, RoleId};
use serde::{Deserialize, Serialize};

/// Role that users reference and permission rows belong to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    id: RoleId,
    name: NonEmptyString,
    description: Option<String>,
}

impl Role {
    /// Creates a role, trimming the name and dropping blank descriptions.
    pub fn new(
        id: RoleId,
        name: impl Into<String>,
        description: Option<String>,
    ) -> AppResult<Self> {
        let name = NonEmptyString::new(name.into().trim())?;
        let description = description
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty());

        Ok(Self {
            id,
            name,
            description,
        })
    }

    /// Returns the role identifier.
    #[must_use]
    pub fn id(&self) -> RoleId {
        self.id
    }

    /// Returns the unique role name.
    #[must_use]
    pub fn name(&self) -> &NonEmptyString {
        &self.name
    }

    /// Returns the optional description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}
