//! Resources and URL → resource matching.

impl_name_newtype!(
    /// Identifier of a protected entity or collection (e.g. "users").
    ///
    /// By convention a resource is the first path segment of its API URL.
    Resource
);

impl Resource {
    /// The empty resource, returned when nothing matches and no default is set.
    pub const NONE: Resource = Resource::from_static("");

    pub fn is_empty(&self) -> bool {
        self.as_str().is_empty()
    }
}

/// Derive the resource addressed by an API URL.
///
/// Resources are tried in configured order and the first one whose `"/" + name`
/// prefixes the URL wins. This is first-match, not longest-prefix: with
/// `["user", "users"]`, `/users/5` resolves to `"user"`.
///
/// Falls back to `default_resource`, or [`Resource::NONE`] when none is set.
pub fn resource_for_url(
    url: &str,
    resources: &[Resource],
    default_resource: Option<&Resource>,
) -> Resource {
    resources
        .iter()
        .find(|r| {
            url.strip_prefix('/')
                .is_some_and(|rest| rest.starts_with(r.as_str()))
        })
        .cloned()
        .or_else(|| default_resource.cloned())
        .unwrap_or(Resource::NONE)
}
