#![forbid(unsafe_code)]

//! Entry handles: a stable key plus index-addressed projections.
//!
//! An [`Entry`] stores nothing positional. Its index is looked up by key in
//! the array's position map, a [`Computed`] derived from the published key
//! order, and every other field is read from the form context at
//! `"<array>.<index>"` on demand. Reordering the array therefore needs no
//! per-entry bookkeeping: the next read simply resolves the new index.
//!
//! A handle whose key is no longer published is *stale*. It reports no
//! index, returns the value captured when it was created, and ignores
//! writes.

use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;
use serde_json::Value;

use fieldkit_core::{FieldAttrs, FieldPath, FormContext};
use fieldkit_reactive::Computed;

use crate::key::EntryKey;

/// Key-to-index map shared by every entry of one array.
pub(crate) type Positions = Computed<AHashMap<EntryKey, usize>>;

struct EntryInner {
    key: EntryKey,
    array: FieldPath,
    ctx: Rc<dyn FormContext>,
    positions: Positions,
    initial: Value,
}

/// One row of a field array.
///
/// Cloning an `Entry` yields another handle to the same row. Handles compare
/// equal when they share array name and key.
#[derive(Clone)]
pub struct Entry {
    inner: Rc<EntryInner>,
}

impl Entry {
    pub(crate) fn new(
        key: EntryKey,
        array: FieldPath,
        ctx: Rc<dyn FormContext>,
        positions: Positions,
        initial: Value,
    ) -> Self {
        Self {
            inner: Rc::new(EntryInner {
                key,
                array,
                ctx,
                positions,
                initial,
            }),
        }
    }

    /// Stable identity of this row.
    #[must_use]
    pub fn key(&self) -> EntryKey {
        self.inner.key
    }

    /// Current position, or `None` once the row has been removed.
    #[must_use]
    pub fn index(&self) -> Option<usize> {
        let key = self.inner.key;
        self.inner.positions.with(|positions| positions.get(&key).copied())
    }

    /// Whether the row is no longer part of its array.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.index().is_none()
    }

    /// Whether the row currently sits at index 0.
    #[must_use]
    pub fn is_first(&self) -> bool {
        self.index() == Some(0)
    }

    /// Whether the row currently sits at the last index.
    #[must_use]
    pub fn is_last(&self) -> bool {
        let len = self.inner.positions.with(|positions| positions.len());
        matches!(self.index(), Some(i) if i + 1 == len)
    }

    /// Dotted path of the row, `"<array>.<index>"`.
    #[must_use]
    pub fn name(&self) -> Option<FieldPath> {
        self.index().map(|i| self.inner.array.index(i))
    }

    /// The row's value in the form, or the value it was created with if the
    /// row is stale.
    #[must_use]
    pub fn value(&self) -> Value {
        match self.name() {
            Some(path) => self.inner.ctx.field_value(&path).unwrap_or(Value::Null),
            None => self.inner.initial.clone(),
        }
    }

    /// Write the row's value through the form context.
    ///
    /// Returns `false` and drops the write when the row is stale.
    pub fn set_value(&self, value: impl Into<Value>) -> bool {
        match self.name() {
            Some(path) => {
                self.inner.ctx.set_field_value(&path, value.into());
                true
            }
            None => {
                #[cfg(feature = "tracing")]
                tracing::trace!(
                    message = "field_array.stale_write",
                    array = %self.inner.array,
                    key = self.inner.key.raw()
                );
                false
            }
        }
    }

    /// Validation error attached to the row.
    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.name()
            .and_then(|path| self.inner.ctx.field_error(&path))
    }

    /// Whether the row has been touched.
    #[must_use]
    pub fn touched(&self) -> bool {
        self.name()
            .is_some_and(|path| self.inner.ctx.field_touched(&path))
    }

    /// Whether the row's value differs from its initial value.
    #[must_use]
    pub fn dirty(&self) -> bool {
        self.name()
            .is_some_and(|path| self.inner.ctx.field_dirty(&path))
    }

    /// Binding attributes for the row, without `name`.
    #[must_use]
    pub fn attrs(&self) -> FieldAttrs {
        let Some(path) = self.name() else {
            return FieldAttrs::new();
        };
        let mut attrs = self.inner.ctx.field_attrs(&path);
        attrs.remove("name");
        attrs
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.inner.key == other.inner.key && self.inner.array == other.inner.array
    }
}

impl Eq for Entry {}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("key", &self.inner.key)
            .field("array", &self.inner.array)
            .field("index", &self.index())
            .finish()
    }
}
