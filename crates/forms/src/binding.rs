use crate::{FieldErrors, FieldValue, FormLifecycle, FormValues, RootError, SubmitOutcome};

/// Handle given to input components: field registration, current values,
/// errors, and the submit/reset triggers of one form.
///
/// Passed down explicitly; clones refer to the same form.
#[derive(Debug, Clone)]
pub struct FormBinding {
    form: FormLifecycle,
}

impl FormBinding {
    pub(crate) fn new(form: FormLifecycle) -> Self {
        Self { form }
    }

    /// Register a field, seeding it from the bound item the first time.
    pub fn register(&self, name: &str) -> FieldValue {
        self.form.register_field(name)
    }

    pub fn set_value(&self, name: &str, value: impl Into<FieldValue>) {
        self.form.set_field(name, value.into());
    }

    pub fn value(&self, name: &str) -> Option<FieldValue> {
        self.form.field(name)
    }

    pub fn values(&self) -> FormValues {
        self.form.fields()
    }

    pub fn errors(&self) -> FieldErrors {
        self.form.state().field_errors
    }

    pub fn root_error(&self) -> Option<RootError> {
        self.form.state().root_error
    }

    pub fn is_create(&self) -> bool {
        self.form.is_create()
    }

    pub fn loading(&self) -> bool {
        self.form.loading()
    }

    /// Submit the current values.
    pub async fn submit(&self) -> SubmitOutcome {
        self.form.submit(self.values()).await
    }

    pub fn reset(&self) {
        self.form.reset();
    }

    pub fn form(&self) -> &FormLifecycle {
        &self.form
    }
}
