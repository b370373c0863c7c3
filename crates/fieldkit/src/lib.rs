#![forbid(unsafe_code)]

//! fieldkit public facade crate.
//!
//! Reactive form state with reorder-stable field arrays. The member crates
//! are re-exported whole; [`prelude`] pulls in the types most callers need.

pub use fieldkit_array as array;
pub use fieldkit_core as core;
pub use fieldkit_reactive as reactive;

pub use fieldkit_array::{Entry, EntryKey, FieldArray, FieldArrayOptions};
pub use fieldkit_core::{
    ArrayTransform, FieldAttrs, FieldPath, FormConfig, FormContext, FormError, FormStore,
};

pub mod prelude {
    pub use fieldkit_array::{Entry, EntryKey, FieldArray, FieldArrayOptions};
    pub use fieldkit_core::{
        ArrayTransform, ArrayValidator, FieldArrayRegistration, FieldAttrs, FieldPath, FormConfig,
        FormContext, FormError, FormStore,
    };
    pub use fieldkit_reactive::{Computed, Observable, Subscription};
    pub use serde_json::{Value, json};
}
