use serde::Serialize;

use dashkit_core::{ConfigError, ConfigResult};

use crate::{Principal, RbacConfig, Resource, Role, Rules, resource_for_url};

/// Strict rule evaluation.
///
/// - The default resource, when configured, is **never** granted here.
/// - Roles are tried in order; the first role whose rule for `action` grants
///   `resource` wins.
/// - Missing roles, actions or resources simply do not grant.
///
/// This is deliberately not the same policy as [`AccessControl::is_allowed`],
/// which treats the default resource as public.
pub fn user_can(
    roles: &[Role],
    action: &str,
    resource: &str,
    rules: &Rules,
    default_resource: Option<&Resource>,
) -> bool {
    if default_resource.is_some_and(|d| d.as_str() == resource) {
        return false;
    }

    granting_role(roles, action, resource, rules).is_some()
}

fn granting_role<'a>(
    roles: &'a [Role],
    action: &str,
    resource: &str,
    rules: &Rules,
) -> Option<&'a Role> {
    roles.iter().find(|role| {
        rules
            .get(role.as_str())
            .and_then(|role_rules| role_rules.get(action))
            .is_some_and(|rule| rule.grants(resource))
    })
}

/// UI-facing access control over a fixed RBAC configuration.
#[derive(Debug, Clone)]
pub struct AccessControl {
    config: RbacConfig,
}

impl AccessControl {
    /// Build the access layer from configuration loaded at boot.
    ///
    /// A configuration with neither roles nor rules is treated as "nothing was
    /// configured" and rejected.
    pub fn new(config: RbacConfig) -> ConfigResult<Self> {
        if config.rules.is_empty() && config.roles.is_empty() {
            return Err(ConfigError::MissingRules);
        }

        for role in config.rules.keys() {
            if !config.roles.contains(role) {
                tracing::warn!(role = %role, "rule table mentions a role that is not declared");
            }
        }

        Ok(Self { config })
    }

    pub fn config(&self) -> &RbacConfig {
        &self.config
    }

    pub fn resources(&self) -> &[Resource] {
        &self.config.resources
    }

    pub fn default_resource(&self) -> Option<&Resource> {
        self.config.default_resource.as_ref()
    }

    /// Whether `resource` is the configured public (default) resource.
    pub fn is_public_resource(&self, resource: &str) -> bool {
        self.default_resource()
            .is_some_and(|d| d.as_str() == resource)
    }

    /// Rendering decision: may this principal perform `action` on `resource`?
    ///
    /// The public resource is always allowed, even for anonymous callers. Any
    /// other resource requires a principal with at least one granting role.
    pub fn is_allowed(&self, principal: Option<&Principal>, action: &str, resource: &str) -> bool {
        if self.is_public_resource(resource) {
            return true;
        }

        let Some(principal) = principal.filter(|p| !p.is_anonymous()) else {
            return false;
        };

        user_can(
            principal.roles(),
            action,
            resource,
            &self.config.rules,
            self.default_resource(),
        )
    }

    /// Strict evaluation against this configuration (see [`user_can`]).
    pub fn evaluate(&self, roles: &[Role], action: &str, resource: &str) -> bool {
        user_can(roles, action, resource, &self.config.rules, self.default_resource())
    }

    pub fn resource_for_url(&self, url: &str) -> Resource {
        resource_for_url(url, &self.config.resources, self.default_resource())
    }

    /// Explain the decision [`AccessControl::is_allowed`] would make.
    pub fn explain(&self, principal: Option<&Principal>, action: &str, resource: &str) -> Decision {
        let roles: Vec<Role> = principal.map(|p| p.roles().to_vec()).unwrap_or_default();

        let reason = if self.is_public_resource(resource) {
            DecisionReason::PublicResource
        } else if roles.is_empty() {
            DecisionReason::NoPrincipal
        } else {
            match granting_role(&roles, action, resource, &self.config.rules) {
                Some(role) => DecisionReason::GrantedBy(role.clone()),
                None => DecisionReason::Denied,
            }
        };

        let denied_by: Vec<Role> = roles
            .iter()
            .filter(|role| {
                self.config
                    .rules
                    .get(role.as_str())
                    .and_then(|r| r.get(action))
                    .is_some_and(|rule| rule.can.contains(resource) && rule.denies(resource))
            })
            .cloned()
            .collect();

        Decision {
            action: action.to_string(),
            resource: resource.to_string(),
            granted: matches!(
                reason,
                DecisionReason::PublicResource | DecisionReason::GrantedBy(_)
            ),
            evaluated_roles: roles,
            denied_by,
            reason,
        }
    }
}

/// Auditable explanation of an authorization decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub action: String,
    pub resource: String,
    pub granted: bool,
    pub reason: DecisionReason,
    /// Roles held by the principal, in evaluation order.
    pub evaluated_roles: Vec<Role>,
    /// Roles whose `can` matched but whose `cannot` list excluded the resource.
    pub denied_by: Vec<Role>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "role")]
pub enum DecisionReason {
    /// The resource is the configured public resource.
    PublicResource,
    /// No principal, or a principal without roles.
    NoPrincipal,
    /// The first granting role.
    GrantedBy(Role),
    /// No role grants the action on the resource.
    Denied,
}
