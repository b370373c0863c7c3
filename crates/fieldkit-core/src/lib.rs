#![forbid(unsafe_code)]

//! Core: field paths, structural edit descriptors, and the form context
//! that field arrays bind to.
//!
//! The [`FormContext`] trait is the whole contract between a field array
//! and the form that owns its values. [`FormStore`] is an in-memory
//! implementation suitable for tests and for hosts without a store of
//! their own.

pub mod config;
pub mod context;
pub mod error;
pub mod path;
pub mod store;
pub mod transform;

pub use config::FormConfig;
pub use context::{ArrayValidator, FieldArrayRegistration, FieldAttrs, FormContext};
pub use error::FormError;
pub use path::{FieldPath, MAX_INDEX_GAP, Segment};
pub use store::FormStore;
pub use transform::ArrayTransform;
