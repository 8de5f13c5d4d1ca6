//! Declarative rule table: role → action → rule.

use std::collections::BTreeMap;

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use crate::{Action, Resource, Role};

/// Allow-set of a rule: every resource, or an explicit ordered list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Can {
    All,
    Only(Vec<Resource>),
}

impl Can {
    pub fn contains(&self, resource: &str) -> bool {
        match self {
            Can::All => true,
            Can::Only(list) => list.iter().any(|r| r.as_str() == resource),
        }
    }
}

impl Serialize for Can {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Can::All => serializer.serialize_str("all"),
            Can::Only(list) => list.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Can {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Keyword(String),
            List(Vec<Resource>),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Keyword(k) if k == "all" => Ok(Can::All),
            Raw::Keyword(k) => Err(de::Error::custom(format!(
                "expected \"all\" or a list of resources, got \"{k}\""
            ))),
            Raw::List(list) => Ok(Can::Only(list)),
        }
    }
}

/// A role's permission statement for a single action.
///
/// `cannot` always wins over `can`, including when `can` is [`Can::All`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub can: Can,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cannot: Option<Vec<Resource>>,
}

impl Rule {
    pub fn all() -> Self {
        Self {
            can: Can::All,
            cannot: None,
        }
    }

    pub fn only<I, R>(resources: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<Resource>,
    {
        Self {
            can: Can::Only(resources.into_iter().map(Into::into).collect()),
            cannot: None,
        }
    }

    pub fn except<I, R>(mut self, resources: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<Resource>,
    {
        self.cannot
            .get_or_insert_with(Vec::new)
            .extend(resources.into_iter().map(Into::into));
        self
    }

    pub fn denies(&self, resource: &str) -> bool {
        self.cannot
            .as_ref()
            .is_some_and(|list| list.iter().any(|r| r.as_str() == resource))
    }

    /// Whether this rule grants access to `resource`.
    pub fn grants(&self, resource: &str) -> bool {
        self.can.contains(resource) && !self.denies(resource)
    }
}

/// Rules of a single role, keyed by action.
pub type RoleRules = BTreeMap<Action, Rule>;

/// The full rule table, keyed by role.
pub type Rules = BTreeMap<Role, RoleRules>;
