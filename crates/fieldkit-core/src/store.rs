#![forbid(unsafe_code)]

//! In-memory [`FormContext`] implementation.
//!
//! [`FormStore`] keeps the value tree in an [`Observable`] and three
//! path-keyed side tables: errors, touched flags and binding attrs. Dirty
//! state is not stored; it is derived by comparing the current and initial
//! value at a path.
//!
//! # Structural edits
//!
//! [`FormContext::set_field_array_value`] writes the new sequence and then
//! replays the received [`ArrayTransform`] on every side-table key of the
//! form `"<array>.<index>…"`. Keys are grouped into one row per index, the
//! rows are edited exactly like the value sequence, and the keys are written
//! back under their new index.
//!
//! # Invariants
//!
//! 1. Reset hooks and validators are called with no interior borrow held,
//!    so they may call back into the store.
//! 2. Hooks fire in path order, independent of registration order.
//! 3. A point write at or above a registered array path counts as an
//!    external replacement and fires that array's reset hook; writes below
//!    it do not.
//! 4. After an external replacement no side-table row survives at an index
//!    at or past the array's new length, and replay only ever sees rows
//!    below the length of the sequence it edits.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;
use serde_json::Value;

use fieldkit_reactive::{Observable, Subscription};

use crate::config::FormConfig;
use crate::context::{FieldArrayRegistration, FieldAttrs, FormContext};
use crate::error::FormError;
use crate::path::{FieldPath, relative_index};
use crate::transform::ArrayTransform;

/// Reference form-state store.
pub struct FormStore {
    config: FormConfig,
    values: Observable<Value>,
    initial: RefCell<Value>,
    errors: RefCell<BTreeMap<String, String>>,
    touched: RefCell<BTreeMap<String, bool>>,
    attrs: RefCell<BTreeMap<String, FieldAttrs>>,
    arrays: RefCell<AHashMap<FieldPath, FieldArrayRegistration>>,
}

impl fmt::Debug for FormStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormStore")
            .field("values", &self.values)
            .field("errors", &self.errors.borrow())
            .field("arrays", &self.arrays.borrow().len())
            .finish_non_exhaustive()
    }
}

impl Default for FormStore {
    fn default() -> Self {
        Self::new(FormConfig::default())
    }
}

impl FormStore {
    /// Create a store holding `config.initial_values`.
    #[must_use]
    pub fn new(config: FormConfig) -> Self {
        let initial = config.initial_values.clone();
        Self {
            values: Observable::new(initial.clone()),
            initial: RefCell::new(initial),
            config,
            errors: RefCell::new(BTreeMap::new()),
            touched: RefCell::new(BTreeMap::new()),
            attrs: RefCell::new(BTreeMap::new()),
            arrays: RefCell::new(AHashMap::new()),
        }
    }

    /// Shorthand for a store starting from `initial` with default switches.
    #[must_use]
    pub fn with_initial_values(initial: Value) -> Self {
        Self::new(FormConfig::default().with_initial_values(initial))
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &FormConfig {
        &self.config
    }

    /// Snapshot of the whole value tree.
    #[must_use]
    pub fn values(&self) -> Value {
        self.values.get()
    }

    /// Number of value-tree changes so far.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.values.version()
    }

    /// Observe every change of the value tree.
    pub fn subscribe_values(&self, callback: impl Fn(&Value) + 'static) -> Subscription {
        self.values.subscribe(callback)
    }

    /// Replace the whole value tree from outside; every array rebuilds.
    pub fn set_values(&self, values: Value) {
        self.values.set(values);
        self.fire_resets(|_| true);
    }

    /// Attach or clear the error at `path`.
    pub fn set_field_error(&self, path: &FieldPath, error: Option<String>) {
        let mut errors = self.errors.borrow_mut();
        match error {
            Some(message) => {
                errors.insert(path.to_string(), message);
            }
            None => {
                errors.remove(path.as_str());
            }
        }
    }

    /// Mark `path` as touched or untouched.
    pub fn set_field_touched(&self, path: &FieldPath, touched: bool) {
        let mut table = self.touched.borrow_mut();
        if touched {
            table.insert(path.to_string(), true);
        } else {
            table.remove(path.as_str());
        }
    }

    /// Store binding attrs for `path`. A `name` key is ignored; it is
    /// always derived from the path.
    pub fn set_field_attrs(&self, path: &FieldPath, mut attrs: FieldAttrs) {
        attrs.remove("name");
        let mut table = self.attrs.borrow_mut();
        if attrs.is_empty() {
            table.remove(path.as_str());
        } else {
            table.insert(path.to_string(), attrs);
        }
    }

    /// Whether an array is registered under `name`.
    #[must_use]
    pub fn is_array_registered(&self, name: &FieldPath) -> bool {
        self.arrays.borrow().contains_key(name)
    }

    /// Names of all registered arrays, sorted.
    #[must_use]
    pub fn registered_arrays(&self) -> Vec<FieldPath> {
        let mut names: Vec<FieldPath> = self.arrays.borrow().keys().cloned().collect();
        names.sort();
        names
    }

    /// Run the validator registered for `name` against its current value and
    /// store the outcome as the array-level error.
    ///
    /// Returns the error, or `None` when the array is valid or has no
    /// validator.
    pub fn validate_field_array(&self, name: &FieldPath) -> Option<String> {
        let validate = self
            .arrays
            .borrow()
            .get(name)
            .and_then(|registration| registration.validate.clone())?;
        let items = match self.field_value(name) {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        };
        let outcome = validate(&items);
        #[cfg(feature = "tracing")]
        Self::log_validate(name, outcome.as_deref());
        self.set_field_error(name, outcome.clone());
        outcome
    }

    /// Restore the initial values (optionally replacing them first), clear
    /// errors and touched flags, then rebuild every array.
    pub fn reset_form(&self, initial: Option<Value>) {
        if let Some(initial) = initial {
            *self.initial.borrow_mut() = initial;
        }
        let snapshot = self.initial.borrow().clone();
        self.values.set(snapshot);
        self.errors.borrow_mut().clear();
        self.touched.borrow_mut().clear();
        self.fire_resets(|_| true);
    }

    fn fire_resets(&self, mut matches: impl FnMut(&FieldPath) -> bool) {
        let selected: Vec<(FieldPath, Rc<dyn Fn()>)> = {
            let arrays = self.arrays.borrow();
            let mut selected: Vec<(FieldPath, Rc<dyn Fn()>)> = arrays
                .iter()
                .filter(|(name, _)| matches(*name))
                .map(|(name, registration)| (name.clone(), Rc::clone(&registration.reset)))
                .collect();
            selected.sort_by(|a, b| a.0.cmp(&b.0));
            selected
        };
        for (name, _) in &selected {
            self.prune_rows(name);
        }
        for (_, hook) in selected {
            hook();
        }
    }

    /// Drop side-table rows of `name` that sit at or past its current length.
    fn prune_rows(&self, name: &FieldPath) {
        let len = self.array_len(name);
        let _pruned = prune(&mut *self.errors.borrow_mut(), name, len)
            + prune(&mut *self.touched.borrow_mut(), name, len)
            + prune(&mut *self.attrs.borrow_mut(), name, len);
        #[cfg(feature = "tracing")]
        if _pruned > 0 {
            tracing::trace!(message = "form_store.prune", array = %name, len, pruned = _pruned);
        }
    }

    fn array_len(&self, name: &FieldPath) -> usize {
        self.values.with(|tree| match name.lookup(tree) {
            Some(Value::Array(items)) => items.len(),
            _ => 0,
        })
    }

    fn arrays_containing(&self, path: &FieldPath) -> Vec<FieldPath> {
        let mut names: Vec<FieldPath> = self
            .arrays
            .borrow()
            .keys()
            .filter(|name| *name != path && name.covers(path))
            .cloned()
            .collect();
        names.sort();
        names
    }

    #[cfg(feature = "tracing")]
    fn log_replay(name: &FieldPath, transform: &ArrayTransform, rows: usize) {
        tracing::trace!(
            message = "form_store.replay",
            array = %name,
            op = transform.label(),
            rows
        );
    }

    #[cfg(feature = "tracing")]
    fn log_validate(name: &FieldPath, error: Option<&str>) {
        tracing::debug!(
            message = "form_store.validate",
            array = %name,
            valid = error.is_none()
        );
    }
}

/// Keys of `table` below `array` with their row index and the suffix after
/// it (leading dot included, or empty).
fn row_keys<V>(table: &BTreeMap<String, V>, array: &FieldPath) -> Vec<(String, usize, String)> {
    let prefix = format!("{}.", array);
    table
        .range(prefix.clone()..)
        .take_while(|(key, _)| key.starts_with(&prefix))
        .filter_map(|(key, _)| {
            relative_index(key, array.as_str())
                .map(|(index, suffix)| (key.clone(), index, suffix.to_string()))
        })
        .collect()
}

/// Remove the rows of `table` below `array` whose index is `len` or more.
/// Returns how many keys were dropped.
fn prune<V>(table: &mut BTreeMap<String, V>, array: &FieldPath, len: usize) -> usize {
    let dead: Vec<String> = row_keys(table, array)
        .into_iter()
        .filter(|(_, index, _)| *index >= len)
        .map(|(key, _, _)| key)
        .collect();
    for key in &dead {
        table.remove(key);
    }
    dead.len()
}

/// Apply `transform` to the rows of `table` that sit below `array`.
///
/// `len` is the array length before the edit. Rows without metadata are
/// padded in and rows at or past `len` are discarded, so positional
/// arguments clamp exactly as they do on the value sequence.
fn replay<V>(table: &mut BTreeMap<String, V>, array: &FieldPath, transform: &ArrayTransform, len: usize) {
    let mut rows: Vec<Vec<(String, V)>> = Vec::new();
    rows.resize_with(len, Vec::new);
    for (key, index, suffix) in row_keys(table, array) {
        let Some(value) = table.remove(&key) else {
            continue;
        };
        if let Some(row) = rows.get_mut(index) {
            row.push((suffix, value));
        }
    }

    transform.apply(&mut rows, Vec::new);

    for (index, row) in rows.into_iter().enumerate() {
        for (suffix, value) in row {
            table.insert(format!("{}.{}{}", array, index, suffix), value);
        }
    }
}

impl FormContext for FormStore {
    fn field_value(&self, path: &FieldPath) -> Option<Value> {
        self.values.with(|tree| path.lookup(tree).cloned())
    }

    fn set_field_value(&self, path: &FieldPath, value: Value) {
        let mut written = false;
        self.values.update(|tree| written = path.assign(tree, value));
        if !written {
            #[cfg(feature = "tracing")]
            tracing::warn!(message = "form_store.write_refused", path = %path);
            return;
        }
        self.fire_resets(|name| path.covers(name));
        if self.config.validate_on_value_change {
            for name in self.arrays_containing(path) {
                self.validate_field_array(&name);
            }
        }
    }

    fn field_error(&self, path: &FieldPath) -> Option<String> {
        self.errors.borrow().get(path.as_str()).cloned()
    }

    fn field_touched(&self, path: &FieldPath) -> bool {
        self.touched
            .borrow()
            .get(path.as_str())
            .copied()
            .unwrap_or(false)
    }

    fn field_dirty(&self, path: &FieldPath) -> bool {
        let initial = self.initial.borrow();
        self.values
            .with(|tree| path.lookup(tree) != path.lookup(&initial))
    }

    fn field_attrs(&self, path: &FieldPath) -> FieldAttrs {
        let mut attrs = self
            .attrs
            .borrow()
            .get(path.as_str())
            .cloned()
            .unwrap_or_default();
        attrs.insert("name".to_string(), Value::String(path.to_string()));
        attrs
    }

    fn register_field_array(
        &self,
        name: &FieldPath,
        registration: FieldArrayRegistration,
    ) -> Result<(), FormError> {
        let mut arrays = self.arrays.borrow_mut();
        if arrays.contains_key(name) {
            return Err(FormError::DuplicateArray(name.to_string()));
        }
        arrays.insert(name.clone(), registration);
        Ok(())
    }

    fn unregister_field_array(&self, name: &FieldPath) {
        self.arrays.borrow_mut().remove(name);
    }

    fn set_field_array_value(
        &self,
        name: &FieldPath,
        values: Vec<Value>,
        transform: &ArrayTransform,
        revalidate: bool,
    ) {
        let len = self.array_len(name);
        self.values
            .update(|tree| {
                name.assign(tree, Value::Array(values));
            });

        if transform.reshapes() {
            replay(&mut *self.errors.borrow_mut(), name, transform, len);
            replay(&mut *self.touched.borrow_mut(), name, transform, len);
            replay(&mut *self.attrs.borrow_mut(), name, transform, len);
            #[cfg(feature = "tracing")]
            Self::log_replay(name, transform, len);
        }

        if revalidate && self.config.validate_on_array_change {
            self.validate_field_array(name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::Cell;

    fn p(s: &str) -> FieldPath {
        FieldPath::parse(s).unwrap()
    }

    fn store_with_items() -> FormStore {
        FormStore::with_initial_values(json!({ "items": ["a", "b", "c"] }))
    }

    #[test]
    fn reads_and_point_writes() {
        let store = store_with_items();
        assert_eq!(store.field_value(&p("items.1")), Some(json!("b")));
        store.set_field_value(&p("items.1"), json!("B"));
        assert_eq!(store.field_value(&p("items.1")), Some(json!("B")));
        assert!(store.field_dirty(&p("items.1")));
        assert!(!store.field_dirty(&p("items.0")));
        assert_eq!(store.revision(), 1);
    }

    #[test]
    fn attrs_always_carry_name() {
        let store = store_with_items();
        let mut attrs = FieldAttrs::new();
        attrs.insert("placeholder".into(), json!("Item"));
        attrs.insert("name".into(), json!("ignored"));
        store.set_field_attrs(&p("items.0"), attrs);

        let read = store.field_attrs(&p("items.0"));
        assert_eq!(read.get("name"), Some(&json!("items.0")));
        assert_eq!(read.get("placeholder"), Some(&json!("Item")));
        assert_eq!(store.field_attrs(&p("items.2")).len(), 1);
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let store = store_with_items();
        let name = p("items");
        store
            .register_field_array(&name, FieldArrayRegistration::new(|| {}))
            .unwrap();
        let err = store
            .register_field_array(&name, FieldArrayRegistration::new(|| {}))
            .unwrap_err();
        assert_eq!(err, FormError::DuplicateArray("items".into()));

        store.unregister_field_array(&name);
        assert!(!store.is_array_registered(&name));
    }

    #[test]
    fn swap_replays_metadata() {
        let store = store_with_items();
        let name = p("items");
        store.set_field_error(&p("items.0"), Some("bad a".into()));
        store.set_field_touched(&p("items.2"), true);
        store.set_field_error(&name, Some("array level".into()));

        store.set_field_array_value(
            &name,
            vec![json!("c"), json!("b"), json!("a")],
            &ArrayTransform::Swap { a: 0, b: 2 },
            false,
        );

        assert_eq!(store.field_error(&p("items.2")), Some("bad a".into()));
        assert_eq!(store.field_error(&p("items.0")), None);
        assert!(store.field_touched(&p("items.0")));
        assert!(!store.field_touched(&p("items.2")));
        assert_eq!(store.field_error(&name), Some("array level".into()));
    }

    #[test]
    fn prepend_shifts_nested_metadata() {
        let store = FormStore::with_initial_values(json!({ "rows": [{ "qty": 1 }] }));
        let name = p("rows");
        store.set_field_error(&p("rows.0.qty"), Some("too low".into()));

        store.set_field_array_value(
            &name,
            vec![json!({ "qty": 0 }), json!({ "qty": 1 })],
            &ArrayTransform::Prepend,
            false,
        );

        assert_eq!(store.field_error(&p("rows.1.qty")), Some("too low".into()));
        assert_eq!(store.field_error(&p("rows.0.qty")), None);
    }

    #[test]
    fn remove_drops_row_metadata() {
        let store = store_with_items();
        store.set_field_touched(&p("items.1"), true);
        store.set_field_touched(&p("items.2"), true);
        store.set_field_array_value(
            &p("items"),
            vec![json!("a"), json!("c")],
            &ArrayTransform::Remove { index: Some(1) },
            false,
        );
        assert!(store.field_touched(&p("items.1")));
        assert!(!store.field_touched(&p("items.2")));
    }

    #[test]
    fn update_keeps_metadata_in_place() {
        let store = store_with_items();
        store.set_field_error(&p("items.1"), Some("bad".into()));
        store.set_field_array_value(
            &p("items"),
            vec![json!("a"), json!("v"), json!("c")],
            &ArrayTransform::Update { index: 1 },
            false,
        );
        assert_eq!(store.field_error(&p("items.1")), Some("bad".into()));
        assert_eq!(store.field_value(&p("items.1")), Some(json!("v")));
    }

    #[test]
    fn revalidate_flag_controls_validator() {
        let store = store_with_items();
        let name = p("items");
        let runs = Rc::new(Cell::new(0u32));
        let runs_in = Rc::clone(&runs);
        let validate: crate::context::ArrayValidator = Rc::new(move |items: &[Value]| {
            runs_in.set(runs_in.get() + 1);
            (items.len() > 3).then(|| "at most 3 items".to_string())
        });
        store
            .register_field_array(
                &name,
                FieldArrayRegistration::new(|| {}).with_validator(Some(validate)),
            )
            .unwrap();

        store.set_field_array_value(
            &name,
            vec![json!("b"), json!("a"), json!("c")],
            &ArrayTransform::Swap { a: 0, b: 1 },
            false,
        );
        assert_eq!(runs.get(), 0);

        store.set_field_array_value(
            &name,
            vec![json!("b"), json!("a"), json!("c"), json!("d")],
            &ArrayTransform::Append,
            true,
        );
        assert_eq!(runs.get(), 1);
        assert_eq!(store.field_error(&name), Some("at most 3 items".into()));
    }

    #[test]
    fn external_replacement_fires_reset_hooks() {
        let store = Rc::new(store_with_items());
        let resets = Rc::new(Cell::new(0u32));
        let resets_in = Rc::clone(&resets);
        let reader = Rc::clone(&store);
        store
            .register_field_array(
                &p("items"),
                FieldArrayRegistration::new(move || {
                    // Hooks may read back into the store.
                    let _ = reader.field_value(&p("items"));
                    resets_in.set(resets_in.get() + 1);
                }),
            )
            .unwrap();

        store.set_field_value(&p("items.0"), json!("x"));
        assert_eq!(resets.get(), 0);

        store.set_field_value(&p("items"), json!(["z"]));
        assert_eq!(resets.get(), 1);

        store.set_values(json!({ "items": [] }));
        assert_eq!(resets.get(), 2);

        store.reset_form(None);
        assert_eq!(resets.get(), 3);
        assert_eq!(store.values(), json!({ "items": ["a", "b", "c"] }));
    }

    #[test]
    fn external_replacement_prunes_dead_rows() {
        let store = FormStore::with_initial_values(json!({ "items": ["a", "b", "c", "d", "e"] }));
        let name = p("items");
        store
            .register_field_array(&name, FieldArrayRegistration::new(|| {}))
            .unwrap();
        let mut attrs = FieldAttrs::new();
        attrs.insert("placeholder".into(), json!("Item"));
        store.set_field_attrs(&p("items.4"), attrs);
        store.set_field_error(&p("items.4.label"), Some("required".into()));
        store.set_field_touched(&p("items.4"), true);
        store.set_field_error(&p("items.1"), Some("kept".into()));

        store.set_field_value(&name, json!(["x", "y"]));
        assert_eq!(store.field_error(&p("items.4.label")), None);
        assert!(!store.field_touched(&p("items.4")));
        assert_eq!(store.field_attrs(&p("items.4")).len(), 1);
        assert_eq!(store.field_error(&p("items.1")), Some("kept".into()));

        let mut values = vec![json!("x"), json!("y")];
        for fresh in ["p", "q", "r"] {
            values.push(json!(fresh));
            store.set_field_array_value(&name, values.clone(), &ArrayTransform::Append, false);
        }
        assert_eq!(store.field_error(&p("items.4.label")), None);
        assert!(!store.field_touched(&p("items.4")));
    }

    #[test]
    fn replay_ignores_rows_past_the_length() {
        let store = store_with_items();
        let name = p("items");
        store.set_field_error(&p("items.4"), Some("orphan".into()));
        store.set_field_error(&p("items.0"), Some("x-err".into()));

        store.set_field_array_value(
            &name,
            vec![json!("b"), json!("c"), json!("a")],
            &ArrayTransform::Move { from: 0, to: 10 },
            false,
        );

        assert_eq!(store.field_error(&p("items.2")), Some("x-err".into()));
        assert_eq!(store.field_error(&p("items.0")), None);
        assert_eq!(store.field_error(&p("items.4")), None);
    }

    #[test]
    fn far_out_point_write_is_refused() {
        let store = store_with_items();
        store.set_field_value(&p("items.18446744073709551615"), json!("x"));
        store.set_field_value(&p("items.999999999999"), json!("x"));
        assert_eq!(store.revision(), 0);
        assert_eq!(store.values(), json!({ "items": ["a", "b", "c"] }));
    }

    #[test]
    fn reset_form_clears_metadata() {
        let store = store_with_items();
        store.set_field_error(&p("items.0"), Some("bad".into()));
        store.set_field_touched(&p("items.0"), true);
        store.reset_form(Some(json!({ "items": ["q"] })));
        assert_eq!(store.field_error(&p("items.0")), None);
        assert!(!store.field_touched(&p("items.0")));
        assert_eq!(store.field_value(&p("items.0")), Some(json!("q")));
        assert!(!store.field_dirty(&p("items.0")));
    }

    #[test]
    fn value_change_validation_is_opt_in() {
        let store = FormStore::new(
            FormConfig::default()
                .with_initial_values(json!({ "items": [""] }))
                .with_validate_on_value_change(true),
        );
        let name = p("items");
        let validate: crate::context::ArrayValidator = Rc::new(|items: &[Value]| {
            items
                .iter()
                .any(|v| v == &json!(""))
                .then(|| "blank item".to_string())
        });
        store
            .register_field_array(
                &name,
                FieldArrayRegistration::new(|| {}).with_validator(Some(validate)),
            )
            .unwrap();

        store.set_field_value(&p("items.0"), json!(""));
        assert_eq!(store.field_error(&name), Some("blank item".into()));
        store.set_field_value(&p("items.0"), json!("ok"));
        assert_eq!(store.field_error(&name), None);
    }
}
