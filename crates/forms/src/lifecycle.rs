//! Create-or-update submission for a single bound entity.
//!
//! A [`FormLifecycle`] owns the entity state of one form: the bound item,
//! whether the form creates or edits, the in-flight flag, and the field and
//! root errors. Each accepted submit validates, formats, and issues exactly one
//! request (`POST url` or `PATCH url/{id}`), then reconciles state, cache,
//! callbacks and notifications.
//!
//! At most one submit is in flight per form. A second call while `loading` is
//! rejected with [`SubmitOutcome::Busy`]; the flag is cleared on every exit path,
//! including a dropped submit future.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::Instrument;
use uuid::Uuid;

use dashkit_auth::{AccessControl, Action, Principal, Resource};
use dashkit_client::{ApiClient, ApiRequest, QueryCache, unwrap_entity};
use dashkit_core::{ConfigError, ConfigResult, Entity, Notification, Notifier, TracingNotifier, entity_id, has_id};

use crate::{
    FieldErrors, FieldValue, FormBinding, FormValues, FormatterPipeline, PermissiveSchema, RootError,
    Schema, SubmitError, root_error_for,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveKind {
    Add,
    Edit,
}

impl SaveKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaveKind::Add => "add",
            SaveKind::Edit => "edit",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormPhase {
    #[default]
    Idle,
    Validating,
    Submitting,
    Succeeded,
    Failed,
}

/// Snapshot of a form's entity state.
#[derive(Debug, Clone, PartialEq)]
pub struct FormState {
    pub item: Option<Entity>,
    /// True iff there is no item or the item has no `id`.
    pub is_create: bool,
    pub loading: bool,
    pub field_errors: FieldErrors,
    pub root_error: Option<RootError>,
    pub phase: FormPhase,
}

impl FormState {
    fn for_item(item: Option<Entity>) -> Self {
        Self {
            is_create: !has_id(item.as_ref()),
            item,
            loading: false,
            field_errors: FieldErrors::new(),
            root_error: None,
            phase: FormPhase::Idle,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Another submit is in flight; nothing was sent.
    Busy,
    /// The principal may not perform this form's action; nothing was sent.
    Hidden,
    Invalid(FieldErrors),
    Saved { entity: Entity, kind: SaveKind },
    Failed(RootError),
}

pub type SuccessCallback = Arc<dyn Fn(&Entity, SaveKind) + Send + Sync>;
pub type ErrorCallback = Arc<dyn Fn(&SubmitError) + Send + Sync>;

struct Shared {
    form: FormState,
    principal: Option<Principal>,
    visible: bool,
    values: FormValues,
    registered: BTreeSet<String>,
}

fn seed(item: Option<&Entity>, name: &str) -> FieldValue {
    item.and_then(|i| i.get(name))
        .map(|v| FieldValue::Json(v.clone()))
        .unwrap_or_else(FieldValue::null)
}

struct Inner {
    client: Arc<dyn ApiClient>,
    access: Arc<AccessControl>,
    url: String,
    resource: Resource,
    schema: Option<Arc<dyn Schema>>,
    formatters: FormatterPipeline,
    reset_after_save: bool,
    cache: Option<(QueryCache, String)>,
    notifier: Arc<dyn Notifier>,
    on_success: Option<SuccessCallback>,
    on_error: Option<ErrorCallback>,
    shared: Mutex<Shared>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Create forms need `create`, edit forms need `update` on the URL's resource.
    fn refresh_gate(&self, shared: &mut Shared) {
        let action = if shared.form.is_create {
            Action::CREATE
        } else {
            Action::UPDATE
        };
        let visible = self
            .access
            .is_allowed(shared.principal.as_ref(), action.as_str(), self.resource.as_str());

        if visible != shared.visible {
            tracing::debug!(url = %self.url, resource = %self.resource, action = %action, visible, "form visibility changed");
        }
        shared.visible = visible;
    }

    fn bind_item(&self, shared: &mut Shared, item: Option<Entity>) {
        shared.form.is_create = !has_id(item.as_ref());
        shared.form.item = item;
        shared.form.field_errors.clear();
        shared.form.root_error = None;
        shared.values = shared
            .registered
            .iter()
            .map(|name| (name.clone(), seed(shared.form.item.as_ref(), name)))
            .collect();
        self.refresh_gate(shared);
    }
}

/// Clears `loading` when the submit ends, however it ends.
struct LoadingGuard<'a> {
    inner: &'a Inner,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        let mut shared = self.inner.lock();
        shared.form.loading = false;
        if matches!(shared.form.phase, FormPhase::Validating | FormPhase::Submitting) {
            shared.form.phase = FormPhase::Idle;
        }
    }
}

pub struct FormLifecycleBuilder {
    client: Arc<dyn ApiClient>,
    access: Arc<AccessControl>,
    url: String,
    item: Option<Entity>,
    schema: Option<Arc<dyn Schema>>,
    formatters: FormatterPipeline,
    principal: Option<Principal>,
    reset_after_save: bool,
    cache: Option<(QueryCache, String)>,
    notifier: Option<Arc<dyn Notifier>>,
    on_success: Option<SuccessCallback>,
    on_error: Option<ErrorCallback>,
}

impl FormLifecycleBuilder {
    pub fn item(mut self, item: Entity) -> Self {
        self.item = Some(item);
        self
    }

    pub fn schema(mut self, schema: impl Schema + 'static) -> Self {
        self.schema = Some(Arc::new(schema));
        self
    }

    pub fn formatters(mut self, formatters: FormatterPipeline) -> Self {
        self.formatters = formatters;
        self
    }

    pub fn principal(mut self, principal: Principal) -> Self {
        self.principal = Some(principal);
        self
    }

    /// After a successful create, go back to an empty create form.
    pub fn reset_after_save(mut self, reset: bool) -> Self {
        self.reset_after_save = reset;
        self
    }

    /// Invalidate `key` in `cache` after each successful create.
    pub fn cache(mut self, cache: QueryCache, key: impl Into<String>) -> Self {
        self.cache = Some((cache, key.into()));
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn on_success(mut self, f: impl Fn(&Entity, SaveKind) + Send + Sync + 'static) -> Self {
        self.on_success = Some(Arc::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(&SubmitError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }

    pub fn build(self) -> ConfigResult<FormLifecycle> {
        if self.schema.is_none() && self.item.is_none() {
            return Err(ConfigError::MissingSchema);
        }

        let resource = self.access.resource_for_url(&self.url);
        let inner = Inner {
            client: self.client,
            access: self.access,
            url: self.url,
            resource,
            schema: self.schema,
            formatters: self.formatters,
            reset_after_save: self.reset_after_save,
            cache: self.cache,
            notifier: self.notifier.unwrap_or_else(|| Arc::new(TracingNotifier)),
            on_success: self.on_success,
            on_error: self.on_error,
            shared: Mutex::new(Shared {
                form: FormState::for_item(self.item),
                principal: self.principal,
                visible: false,
                values: FormValues::new(),
                registered: BTreeSet::new(),
            }),
        };

        {
            let mut shared = inner.lock();
            inner.refresh_gate(&mut shared);
        }

        Ok(FormLifecycle {
            inner: Arc::new(inner),
        })
    }
}

/// Cloneable handle to one form's lifecycle. Clones share state.
#[derive(Clone)]
pub struct FormLifecycle {
    inner: Arc<Inner>,
}

impl fmt::Debug for FormLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormLifecycle")
            .field("url", &self.inner.url)
            .field("resource", &self.inner.resource)
            .field("formatters", &self.inner.formatters)
            .finish_non_exhaustive()
    }
}

impl FormLifecycle {
    pub fn builder(
        client: Arc<dyn ApiClient>,
        access: Arc<AccessControl>,
        url: impl Into<String>,
    ) -> FormLifecycleBuilder {
        FormLifecycleBuilder {
            client,
            access,
            url: url.into(),
            item: None,
            schema: None,
            formatters: FormatterPipeline::new(),
            principal: None,
            reset_after_save: false,
            cache: None,
            notifier: None,
            on_success: None,
            on_error: None,
        }
    }

    pub fn url(&self) -> &str {
        &self.inner.url
    }

    /// Resource the form's URL maps to; the visibility gate checks it.
    pub fn resource(&self) -> &Resource {
        &self.inner.resource
    }

    pub fn state(&self) -> FormState {
        self.inner.lock().form.clone()
    }

    pub fn is_create(&self) -> bool {
        self.inner.lock().form.is_create
    }

    pub fn loading(&self) -> bool {
        self.inner.lock().form.loading
    }

    /// Whether the current principal may use this form at all.
    pub fn is_visible(&self) -> bool {
        self.inner.lock().visible
    }

    pub fn binding(&self) -> FormBinding {
        FormBinding::new(self.clone())
    }

    /// Bind a new item (or none, for a create form).
    pub fn set_item(&self, item: Option<Entity>) {
        let mut shared = self.inner.lock();
        self.inner.bind_item(&mut shared, item);
    }

    pub fn set_principal(&self, principal: Option<Principal>) {
        let mut shared = self.inner.lock();
        shared.principal = principal;
        self.inner.refresh_gate(&mut shared);
    }

    /// Drop edits and errors; registered fields go back to the item's values.
    pub fn reset(&self) {
        let mut shared = self.inner.lock();
        let item = shared.form.item.take();
        self.inner.bind_item(&mut shared, item);
        if !shared.form.loading {
            shared.form.phase = FormPhase::Idle;
        }
    }

    pub(crate) fn register_field(&self, name: &str) -> FieldValue {
        let mut shared = self.inner.lock();
        shared.registered.insert(name.to_string());
        let seeded = seed(shared.form.item.as_ref(), name);
        shared.values.entry(name.to_string()).or_insert(seeded).clone()
    }

    pub(crate) fn set_field(&self, name: &str, value: FieldValue) {
        let mut shared = self.inner.lock();
        shared.registered.insert(name.to_string());
        shared.values.insert(name.to_string(), value);
    }

    pub(crate) fn field(&self, name: &str) -> Option<FieldValue> {
        self.inner.lock().values.get(name).cloned()
    }

    pub(crate) fn fields(&self) -> FormValues {
        self.inner.lock().values.clone()
    }

    pub async fn submit(&self, values: FormValues) -> SubmitOutcome {
        let (item, is_create) = {
            let mut shared = self.inner.lock();
            if shared.form.loading {
                tracing::warn!(url = %self.inner.url, "submit rejected: another submit is in flight");
                return SubmitOutcome::Busy;
            }
            if !shared.visible {
                tracing::debug!(url = %self.inner.url, "submit ignored: form is hidden");
                return SubmitOutcome::Hidden;
            }
            shared.form.loading = true;
            shared.form.phase = FormPhase::Validating;
            shared.form.field_errors.clear();
            shared.form.root_error = None;
            (shared.form.item.clone(), shared.form.is_create)
        };
        let _guard = LoadingGuard { inner: &self.inner };

        let span = tracing::info_span!(
            "form_submit",
            submission_id = %Uuid::now_v7(),
            url = %self.inner.url,
            create = is_create,
        );
        self.run(values, item, is_create).instrument(span).await
    }

    async fn run(&self, values: FormValues, item: Option<Entity>, is_create: bool) -> SubmitOutcome {
        let validated = match &self.inner.schema {
            Some(schema) => schema.validate(&values),
            None => item
                .as_ref()
                .map(PermissiveSchema::from_item)
                .unwrap_or_default()
                .validate(&values),
        };

        let validated = match validated {
            Ok(values) => values,
            Err(errors) => {
                tracing::debug!(fields = errors.len(), "validation failed");
                let mut shared = self.inner.lock();
                shared.form.field_errors = errors.clone();
                shared.form.phase = FormPhase::Idle;
                return SubmitOutcome::Invalid(errors);
            }
        };

        let payload = match self.inner.formatters.apply(validated) {
            Ok(payload) => payload,
            Err(err) => return self.fail(err.into()),
        };

        let request = match item.as_ref().and_then(entity_id) {
            Some(id) if !is_create => ApiRequest::patch(format!("{}/{}", self.inner.url, id), payload),
            _ => ApiRequest::post(self.inner.url.as_str(), payload),
        };

        self.inner.lock().form.phase = FormPhase::Submitting;
        tracing::debug!(
            method = %request.method,
            path = %request.path,
            multipart = request.body.as_ref().is_some_and(|b| b.is_multipart()),
            "submitting form"
        );

        match self.inner.client.send(request).await {
            Ok(body) => self.succeed(body, item, is_create),
            Err(err) => self.fail(err.into()),
        }
    }

    fn succeed(&self, body: Value, previous: Option<Entity>, is_create: bool) -> SubmitOutcome {
        let kind = if is_create { SaveKind::Add } else { SaveKind::Edit };
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .map(str::to_string);

        let entity = match unwrap_entity(body) {
            Value::Object(map) => map,
            other => {
                tracing::warn!(kind = kind.as_str(), body = %other, "response carried no entity");
                previous.unwrap_or_default()
            }
        };

        {
            let mut shared = self.inner.lock();
            let next = if is_create && self.inner.reset_after_save {
                None
            } else {
                Some(entity.clone())
            };
            self.inner.bind_item(&mut shared, next);
            shared.form.phase = FormPhase::Succeeded;
        }

        if is_create {
            if let Some((cache, key)) = &self.inner.cache {
                cache.invalidate(key);
            }
        }

        tracing::info!(kind = kind.as_str(), id = ?entity_id(&entity), "form saved");

        if let Some(on_success) = &self.inner.on_success {
            on_success(&entity, kind);
        }

        let title = message.unwrap_or_else(|| match kind {
            SaveKind::Add => "Created successfully".to_string(),
            SaveKind::Edit => "Updated successfully".to_string(),
        });
        self.inner.notifier.notify(Notification::success(title));

        SubmitOutcome::Saved { entity, kind }
    }

    fn fail(&self, err: SubmitError) -> SubmitOutcome {
        let root = root_error_for(&err);
        tracing::warn!(error = %err, "form submit failed");

        {
            let mut shared = self.inner.lock();
            shared.form.root_error = Some(root.clone());
            shared.form.phase = FormPhase::Failed;
        }

        if let Some(on_error) = &self.inner.on_error {
            on_error(&err);
        }
        self.inner.notifier.notify(Notification::destructive(err.summary()));

        SubmitOutcome::Failed(root)
    }
}
