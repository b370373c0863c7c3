#![forbid(unsafe_code)]

//! Field arrays: reorder-stable lists of sub-form entries.
//!
//! A [`FieldArray`] mirrors one array path of a
//! [`FormContext`](fieldkit_core::FormContext) as a list of [`Entry`]
//! handles. Each entry keeps a stable [`EntryKey`] for its whole life and
//! derives its index, name, value and metadata from the current order, so
//! swaps and moves never leave an entry pointing at someone else's row.
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//! use fieldkit_array::FieldArray;
//! use fieldkit_core::FormStore;
//! use serde_json::json;
//!
//! let store = Rc::new(FormStore::with_initial_values(json!({ "tags": ["a", "b"] })));
//! let tags = FieldArray::new(store.clone(), "tags").unwrap();
//!
//! let first = tags.entry(0).unwrap();
//! tags.swap(0, 1);
//! assert_eq!(first.index(), Some(1));
//! assert_eq!(first.value(), json!("a"));
//! ```

pub mod controller;
pub mod entry;
pub mod key;

pub use controller::{FieldArray, FieldArrayOptions};
pub use entry::Entry;
pub use key::{EntryKey, KeyAllocator};
