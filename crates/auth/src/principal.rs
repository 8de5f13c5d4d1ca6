use serde::{Deserialize, Deserializer, Serialize};

use crate::Role;

/// The acting user, as far as authorization is concerned: a set of roles.
///
/// Authentication is not handled here; callers derive the principal from their
/// session and pass it in. An unauthenticated caller is simply `None` (or a
/// principal without roles) and is never granted anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Roles in the order they were supplied. API user payloads carry either a
    /// single role string or an array, under the `role` key.
    #[serde(rename = "role", default, deserialize_with = "one_or_many")]
    pub roles: Vec<Role>,
}

impl Principal {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn from_role(role: impl Into<Role>) -> Self {
        Self {
            roles: vec![role.into()],
        }
    }

    pub fn from_roles<I, R>(roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<Role>,
    {
        Self {
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    pub fn is_anonymous(&self) -> bool {
        self.roles.is_empty()
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<Role>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(Role),
        Many(Vec<Role>),
        Missing(()),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(role) => vec![role],
        OneOrMany::Many(roles) => roles,
        OneOrMany::Missing(()) => Vec::new(),
    })
}
