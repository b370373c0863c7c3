#![forbid(unsafe_code)]

//! Errors raised at the form-context boundary.
//!
//! Structural edits never fail loudly (an out-of-range edit is a silent
//! no-op); the only fallible steps are naming a field and registering an
//! array under that name.

use std::fmt;

/// Errors from path parsing and field-array registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    /// The path string is not a well-formed dotted path.
    InvalidPath {
        /// The rejected input.
        path: String,
        /// What is wrong with it.
        reason: &'static str,
    },
    /// A field array is already registered under this name.
    DuplicateArray(String),
}

impl fmt::Display for FormError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPath { path, reason } => {
                write!(f, "invalid field path '{}': {}", path, reason)
            }
            Self::DuplicateArray(name) => {
                write!(f, "field array '{}' is already registered", name)
            }
        }
    }
}

impl std::error::Error for FormError {}
