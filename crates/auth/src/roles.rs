impl_name_newtype!(
    /// Role identifier used for RBAC.
    ///
    /// Roles are opaque strings at this layer; what a role may do is described by
    /// the rule table (see [`crate::Rules`]).
    Role
);
