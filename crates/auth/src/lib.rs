//! `dashkit-auth`: role-based access control for dashboard UIs.
//!
//! Pure decision logic: no IO, no panics. Configuration is loaded once at boot
//! and handed to [`AccessControl`]; nothing here mutates it afterwards.

/// Opaque, string-backed identifier newtype (roles, actions, resources).
macro_rules! impl_name_newtype {
    ($(#[$meta:meta])* $t:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $t(std::borrow::Cow<'static, str>);

        impl $t {
            pub fn new(name: impl Into<std::borrow::Cow<'static, str>>) -> Self {
                Self(name.into())
            }

            pub const fn from_static(name: &'static str) -> Self {
                Self(std::borrow::Cow::Borrowed(name))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl core::borrow::Borrow<str> for $t {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl From<&'static str> for $t {
            fn from(value: &'static str) -> Self {
                Self::from_static(value)
            }
        }

        impl From<String> for $t {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }
    };
}

pub mod actions;
pub mod authorize;
pub mod config;
pub mod principal;
pub mod resource;
pub mod roles;
pub mod rules;

pub use actions::Action;
pub use authorize::{AccessControl, Decision, DecisionReason, user_can};
pub use config::{RbacConfig, RoleLabel};
pub use principal::Principal;
pub use resource::{Resource, resource_for_url};
pub use roles::Role;
pub use rules::{Can, Rule, RoleRules, Rules};
