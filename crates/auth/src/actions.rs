impl_name_newtype!(
    /// Action identifier (e.g. "create", "read").
    ///
    /// Actions are opaque strings; the constants below are the common ones, callers
    /// may use any other name their rule table mentions.
    Action
);

impl Action {
    pub const MANAGE: Action = Action::from_static("manage");
    pub const CREATE: Action = Action::from_static("create");
    pub const READ: Action = Action::from_static("read");
    pub const UPDATE: Action = Action::from_static("update");
    pub const DELETE: Action = Action::from_static("delete");
}
