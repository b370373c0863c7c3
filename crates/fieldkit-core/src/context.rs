#![forbid(unsafe_code)]

//! The boundary between field arrays and the form that owns their values.
//!
//! A [`FormContext`] stores the value tree, per-field metadata (errors,
//! touched flags, binding attrs) and the array registrations. Field-array
//! controllers never own raw values: they read through the context and
//! commit structural edits with [`FormContext::set_field_array_value`],
//! handing over the [`ArrayTransform`] so the context can replay the same
//! edit on its index-keyed metadata.
//!
//! All methods take `&self`; implementations use interior mutability and
//! are expected to live on a single UI thread.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::error::FormError;
use crate::path::FieldPath;
use crate::transform::ArrayTransform;

/// Binding attributes of a field, keyed by attribute name.
pub type FieldAttrs = BTreeMap<String, Value>;

/// Array-level validator: receives the committed sequence and returns an
/// error message, or `None` when the sequence is valid.
pub type ArrayValidator = Rc<dyn Fn(&[Value]) -> Option<String>>;

/// What a field array hands to its context when it mounts.
#[derive(Clone)]
pub struct FieldArrayRegistration {
    /// Optional array-level validator.
    pub validate: Option<ArrayValidator>,
    /// Rebuilds the array's entries from the context's current value.
    /// Invoked on form reset and when the array's value is replaced from
    /// outside the controller.
    pub reset: Rc<dyn Fn()>,
}

impl FieldArrayRegistration {
    /// Registration with a reset hook and no validator.
    #[must_use]
    pub fn new(reset: impl Fn() + 'static) -> Self {
        Self {
            validate: None,
            reset: Rc::new(reset),
        }
    }

    /// Attach an array-level validator.
    #[must_use]
    pub fn with_validator(mut self, validate: Option<ArrayValidator>) -> Self {
        self.validate = validate;
        self
    }
}

impl fmt::Debug for FieldArrayRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldArrayRegistration")
            .field("validate", &self.validate.is_some())
            .finish_non_exhaustive()
    }
}

/// Storage and metadata services a field array relies on.
pub trait FormContext {
    /// Current value at `path`, if anything is stored there.
    fn field_value(&self, path: &FieldPath) -> Option<Value>;

    /// Point write of a single field.
    fn set_field_value(&self, path: &FieldPath, value: Value);

    /// Validation error currently attached to `path`.
    fn field_error(&self, path: &FieldPath) -> Option<String>;

    /// Whether the field has been focused and blurred at least once.
    fn field_touched(&self, path: &FieldPath) -> bool;

    /// Whether the field's value differs from its initial value.
    fn field_dirty(&self, path: &FieldPath) -> bool;

    /// Binding attributes for `path`, including its `name`.
    fn field_attrs(&self, path: &FieldPath) -> FieldAttrs;

    /// Register an array for the lifetime of its controller.
    fn register_field_array(
        &self,
        name: &FieldPath,
        registration: FieldArrayRegistration,
    ) -> Result<(), FormError>;

    /// Drop a registration made by [`register_field_array`](Self::register_field_array).
    fn unregister_field_array(&self, name: &FieldPath);

    /// Commit the sequence produced by `transform`.
    ///
    /// Implementations must apply `transform` to any metadata they keep by
    /// index below `name`, and skip array-level revalidation when
    /// `revalidate` is `false`.
    fn set_field_array_value(
        &self,
        name: &FieldPath,
        values: Vec<Value>,
        transform: &ArrayTransform,
        revalidate: bool,
    );
}
