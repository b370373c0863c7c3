#![forbid(unsafe_code)]

//! The field-array controller.
//!
//! [`FieldArray`] binds a keyed entry list to one array path of a
//! [`FormContext`]. Every structural mutator runs the same three steps:
//!
//! 1. build the new raw value sequence by applying an [`ArrayTransform`]
//!    to the context's current sequence;
//! 2. build the new entry list by applying the same transform to the
//!    existing [`Entry`] handles (fresh handles are allocated for inserted
//!    rows, surviving handles are moved, never copied or rekeyed);
//! 3. commit the values to the context, then publish the entry list.
//!
//! Publication is a single [`Observable::set`] of the key order, so
//! observers only ever see a finished edit, and the value sequence they
//! read back is already consistent with it.
//!
//! # Invariants
//!
//! 1. After every mutator the value sequence and the entry list have the
//!    same length and order, and entry `i` is named `"<array>.<i>"`.
//! 2. Keys are unique within the array and never reused.
//! 3. An edit with an out-of-range index commits nothing and returns
//!    `false`.
//! 4. `swap` and `move_entry` commit with revalidation suppressed.
//!
//! # Failure Modes
//!
//! - **External writer bypasses the reset hook**: the context's sequence
//!   and the entry list drift apart in length. The next mutator logs a
//!   warning (with the `tracing` feature) and still applies the edit to
//!   both sides; `reset()` resynchronizes.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use ahash::AHashMap;
use serde_json::Value;

use fieldkit_core::{
    ArrayTransform, ArrayValidator, FieldArrayRegistration, FieldPath, FormContext, FormError,
};
use fieldkit_reactive::{Computed, Observable, Subscription};

use crate::entry::{Entry, Positions};
use crate::key::{EntryKey, KeyAllocator};

/// Mount-time options for a [`FieldArray`].
#[derive(Clone, Default)]
pub struct FieldArrayOptions {
    /// Array-level validator forwarded to the form context.
    pub validator: Option<ArrayValidator>,
}

impl FieldArrayOptions {
    /// Attach an array-level validator.
    #[must_use]
    pub fn with_validator(mut self, validate: impl Fn(&[Value]) -> Option<String> + 'static) -> Self {
        self.validator = Some(Rc::new(validate));
        self
    }
}

impl fmt::Debug for FieldArrayOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldArrayOptions")
            .field("validator", &self.validator.is_some())
            .finish()
    }
}

struct Shared {
    name: FieldPath,
    ctx: Rc<dyn FormContext>,
    keys: KeyAllocator,
    order: Observable<Vec<EntryKey>>,
    positions: Positions,
    entries: RefCell<Vec<Entry>>,
}

impl Shared {
    fn new_entry(&self, initial: Value) -> Entry {
        Entry::new(
            self.keys.next(),
            self.name.clone(),
            Rc::clone(&self.ctx),
            self.positions.clone(),
            initial,
        )
    }

    fn current_values(&self) -> Vec<Value> {
        match self.ctx.field_value(&self.name) {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        }
    }

    fn publish(&self, entries: Vec<Entry>) {
        let order: Vec<EntryKey> = entries.iter().map(Entry::key).collect();
        *self.entries.borrow_mut() = entries;
        self.order.set(order);
    }

    fn reset(&self) {
        let items = match self.ctx.field_value(&self.name) {
            Some(Value::Array(items)) => items,
            None | Some(Value::Null) => Vec::new(),
            Some(_other) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    message = "field_array.non_array",
                    array = %self.name,
                    found = %_other
                );
                Vec::new()
            }
        };
        let entries: Vec<Entry> = items.into_iter().map(|v| self.new_entry(v)).collect();
        #[cfg(feature = "tracing")]
        tracing::debug!(message = "field_array.reset", array = %self.name, len = entries.len());
        self.publish(entries);
    }

    fn commit(&self, transform: ArrayTransform, payload: Option<Value>) -> bool {
        let len = self.entries.borrow().len();
        if !transform.is_applicable(len) {
            #[cfg(feature = "tracing")]
            tracing::trace!(
                message = "field_array.noop",
                array = %self.name,
                op = transform.label(),
                len
            );
            return false;
        }

        let mut values = self.current_values();
        if values.len() != len {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                message = "field_array.desync",
                array = %self.name,
                values = values.len(),
                entries = len
            );
        }
        let inserted = payload.clone().unwrap_or(Value::Null);
        transform.apply(&mut values, move || inserted);

        let reshaped = if transform.reshapes() {
            let mut entries = self.entries.borrow().clone();
            let initial = payload.unwrap_or(Value::Null);
            transform.apply(&mut entries, || self.new_entry(initial));
            Some(entries)
        } else {
            None
        };

        self.ctx
            .set_field_array_value(&self.name, values, &transform, !transform.is_reorder());
        if let Some(entries) = reshaped {
            self.publish(entries);
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            message = "field_array.commit",
            array = %self.name,
            op = transform.label(),
            len = self.entries.borrow().len()
        );
        true
    }

    fn replace(&self, items: Vec<Value>) {
        let entries: Vec<Entry> = items.iter().cloned().map(|v| self.new_entry(v)).collect();
        self.ctx
            .set_field_array_value(&self.name, items, &ArrayTransform::Replace, true);
        self.publish(entries);

        #[cfg(feature = "tracing")]
        tracing::debug!(
            message = "field_array.commit",
            array = %self.name,
            op = ArrayTransform::Replace.label(),
            len = self.entries.borrow().len()
        );
    }
}

/// A reactive list of keyed entries bound to one array path of a form.
///
/// Dropping the controller unregisters it from the form context and
/// publishes an empty order, so every entry handle obtained from
/// [`fields`](Self::fields) turns stale: it reads back its creation value
/// and refuses writes.
pub struct FieldArray {
    shared: Rc<Shared>,
}

impl FieldArray {
    /// Mount a field array at `name` with default options.
    pub fn new(ctx: Rc<dyn FormContext>, name: &str) -> Result<Self, FormError> {
        Self::with_options(ctx, name, FieldArrayOptions::default())
    }

    /// Mount a field array at `name`.
    ///
    /// Registers the reset hook (and validator, if any) with `ctx`, then
    /// builds the entry list from the current value at `name`.
    pub fn with_options(
        ctx: Rc<dyn FormContext>,
        name: &str,
        options: FieldArrayOptions,
    ) -> Result<Self, FormError> {
        let name = FieldPath::parse(name)?;
        let order = Observable::new(Vec::new());
        let positions = Computed::from_observable(&order, |keys: &Vec<EntryKey>| {
            keys.iter()
                .enumerate()
                .map(|(index, key)| (*key, index))
                .collect::<AHashMap<EntryKey, usize>>()
        });
        let shared = Rc::new(Shared {
            name,
            ctx,
            keys: KeyAllocator::new(),
            order,
            positions,
            entries: RefCell::new(Vec::new()),
        });

        let weak: Weak<Shared> = Rc::downgrade(&shared);
        let registration = FieldArrayRegistration::new(move || {
            if let Some(shared) = weak.upgrade() {
                shared.reset();
            }
        })
        .with_validator(options.validator);
        shared
            .ctx
            .register_field_array(&shared.name, registration)?;

        shared.reset();
        Ok(Self { shared })
    }

    /// The array's path in the form.
    #[must_use]
    pub fn name(&self) -> &FieldPath {
        &self.shared.name
    }

    /// Snapshot of the current entry list.
    #[must_use]
    pub fn fields(&self) -> Vec<Entry> {
        self.shared.entries.borrow().clone()
    }

    /// Entry at `index`, if any.
    #[must_use]
    pub fn entry(&self, index: usize) -> Option<Entry> {
        self.shared.entries.borrow().get(index).cloned()
    }

    /// Keys in their current order.
    #[must_use]
    pub fn keys(&self) -> Vec<EntryKey> {
        self.shared.order.get()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.entries.borrow().len()
    }

    /// Whether the array has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Observe every publication of a new entry order.
    pub fn subscribe(&self, callback: impl Fn(&[EntryKey]) + 'static) -> Subscription {
        self.shared
            .order
            .subscribe(move |keys: &Vec<EntryKey>| callback(keys))
    }

    /// Add `value` as a new last entry.
    pub fn append(&self, value: impl Into<Value>) -> bool {
        self.shared
            .commit(ArrayTransform::Append, Some(value.into()))
    }

    /// Add `value` as a new first entry.
    pub fn prepend(&self, value: impl Into<Value>) -> bool {
        self.shared
            .commit(ArrayTransform::Prepend, Some(value.into()))
    }

    /// Insert `value` at `index`; indices past the end append.
    pub fn insert(&self, index: usize, value: impl Into<Value>) -> bool {
        self.shared
            .commit(ArrayTransform::Insert { index }, Some(value.into()))
    }

    /// Overwrite the value at `index`. Keys are untouched.
    pub fn update(&self, index: usize, value: impl Into<Value>) -> bool {
        self.shared
            .commit(ArrayTransform::Update { index }, Some(value.into()))
    }

    /// Delete the entry at `index`.
    pub fn remove(&self, index: usize) -> bool {
        self.shared
            .commit(ArrayTransform::Remove { index: Some(index) }, None)
    }

    /// Delete every entry.
    pub fn clear(&self) -> bool {
        self.shared
            .commit(ArrayTransform::Remove { index: None }, None)
    }

    /// Exchange the entries at `a` and `b`.
    pub fn swap(&self, a: usize, b: usize) -> bool {
        self.shared.commit(ArrayTransform::Swap { a, b }, None)
    }

    /// Move the entry at `from` to `to` (clamped to the last position).
    pub fn move_entry(&self, from: usize, to: usize) -> bool {
        self.shared.commit(ArrayTransform::Move { from, to }, None)
    }

    /// Replace the whole array; every entry gets a fresh key.
    pub fn replace(&self, values: impl IntoIterator<Item = Value>) {
        self.shared.replace(values.into_iter().collect());
    }

    /// Rebuild the entry list from the form's current value, discarding
    /// every existing key.
    pub fn reset(&self) {
        self.shared.reset();
    }
}

impl Drop for FieldArray {
    fn drop(&mut self) {
        self.shared.ctx.unregister_field_array(&self.shared.name);
        self.shared.publish(Vec::new());
    }
}

impl fmt::Debug for FieldArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldArray")
            .field("name", &self.shared.name)
            .field("keys", &self.shared.order.get())
            .finish()
    }
}
