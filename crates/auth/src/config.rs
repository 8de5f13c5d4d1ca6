//! Static RBAC configuration supplied once at application boot.

use std::path::Path;

use serde::{Deserialize, Serialize};

use dashkit_core::{ConfigError, ConfigResult};

use crate::{Resource, Role, RoleRules, Rules};

/// Display label for a role (e.g. for role pickers).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleLabel {
    pub label: String,
    pub value: String,
}

/// RBAC configuration.
///
/// ```json
/// {
///   "roles": ["admin", "user"],
///   "resources": ["posts", "comments"],
///   "rules": {
///     "admin": { "manage": { "can": "all" } },
///     "user":  { "read": { "can": ["posts", "comments"] } }
///   },
///   "defaultResource": "auth"
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RbacConfig {
    pub roles: Vec<Role>,
    pub resources: Vec<Resource>,
    pub rules: Rules,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub role_labels: Vec<RoleLabel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_resource: Option<Resource>,
}

impl RbacConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(raw: &str) -> ConfigResult<Self> {
        serde_json::from_str(raw).map_err(|e| ConfigError::invalid(e.to_string()))
    }

    pub fn from_path(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::io(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&raw)
    }

    pub fn with_resources<I, R>(mut self, resources: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<Resource>,
    {
        self.resources = resources.into_iter().map(Into::into).collect();
        self
    }

    /// Register a role together with its rules.
    pub fn with_role(mut self, role: impl Into<Role>, rules: RoleRules) -> Self {
        let role = role.into();
        if !self.roles.contains(&role) {
            self.roles.push(role.clone());
        }
        self.rules.insert(role, rules);
        self
    }

    pub fn with_default_resource(mut self, resource: impl Into<Resource>) -> Self {
        self.default_resource = Some(resource.into());
        self
    }

    pub fn label_for(&self, role: &str) -> Option<&str> {
        self.role_labels
            .iter()
            .find(|l| l.value == role)
            .map(|l| l.label.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Action, Can, Rule};

    const SAMPLE: &str = r#"{
        "roles": ["admin", "user"],
        "resources": ["posts", "comments"],
        "rules": {
            "admin": { "manage": { "can": "all" }, "create": { "can": "all" } },
            "user": { "read": { "can": ["posts", "comments"] }, "create": { "can": ["comments"] } }
        },
        "roleLabels": [
            { "label": "Administrator", "value": "admin" },
            { "label": "User", "value": "user" }
        ],
        "defaultResource": "auth"
    }"#;

    #[test]
    fn loads_json_configuration() {
        let config = RbacConfig::from_json_str(SAMPLE).unwrap();
        assert_eq!(config.roles.len(), 2);
        assert_eq!(config.resources[1].as_str(), "comments");
        assert_eq!(config.rules["admin"]["create"].can, Can::All);
        assert_eq!(config.default_resource, Some(Resource::from_static("auth")));
        assert_eq!(config.label_for("admin"), Some("Administrator"));
        assert_eq!(config.label_for("ghost"), None);
    }

    #[test]
    fn missing_rules_is_a_config_error() {
        let err = RbacConfig::from_json_str(r#"{"roles": [], "resources": []}"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidConfig(msg) if msg.contains("rules")));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = RbacConfig::from_path("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn builder_registers_roles_once() {
        let config = RbacConfig::new()
            .with_role("admin", RoleRules::from([(Action::READ, Rule::all())]))
            .with_role("admin", RoleRules::from([(Action::CREATE, Rule::all())]));
        assert_eq!(config.roles.len(), 1);
        assert!(config.rules["admin"].contains_key("create"));
        assert!(!config.rules["admin"].contains_key("read"));
    }
}
