//! `dashkit-forms`
//!
//! **Responsibility:** the submission lifecycle of a single editable entity.
//!
//! This crate provides:
//! - Field values, validation schemas and per-field errors
//! - A keyed formatter pipeline producing JSON or multipart payloads
//! - Root-level error extraction for the form-wide banner
//! - [`FormLifecycle`], the create-or-update controller, and [`FormBinding`],
//!   the explicit handle passed to input components

pub mod binding;
pub mod errors;
pub mod format;
pub mod lifecycle;
pub mod schema;
pub mod values;

pub use binding::FormBinding;
pub use errors::{RootError, SubmitError, format_error_list, root_error_for};
pub use format::{
    Attachment, BooleanFlag, CheckedKeys, FieldFormatter, FormatError, FormatterPipeline, JsonEach, Omit,
    PayloadBuilder, attachment, boolean_flag, checked_keys, json_each, omit,
};
pub use lifecycle::{
    ErrorCallback, FormLifecycle, FormLifecycleBuilder, FormPhase, FormState, SaveKind, SubmitOutcome,
    SuccessCallback,
};
pub use schema::{FieldRule, ObjectSchema, PermissiveSchema, Schema};
pub use values::{FieldErrors, FieldValue, FormValues, values_from_entity};
