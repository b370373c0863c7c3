#![forbid(unsafe_code)]

//! Structural edit descriptors for field arrays.
//!
//! An [`ArrayTransform`] names one edit together with its positional
//! arguments. The same descriptor is applied to the raw value sequence, to
//! the controller's entry list, and to every index-keyed side table the
//! store keeps (errors, touched flags, attrs), which is what keeps all of
//! them aligned without diffing.
//!
//! # Invariants
//!
//! - `apply` never panics, whatever the arguments and sequence length.
//! - For any two sequences of equal length, applying the same transform
//!   leaves them at equal length again.
//! - `is_applicable(len)` is `false` exactly when `apply` would leave a
//!   sequence of length `len` untouched because an index is out of range.

use std::fmt;

/// One structural edit of a field array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrayTransform {
    /// Push one element at the end.
    Append,
    /// Insert one element at the front.
    Prepend,
    /// Insert one element at `index`, shifting later elements right.
    /// Indices past the end are clamped to the length.
    Insert { index: usize },
    /// Overwrite the element at `index` in place.
    Update { index: usize },
    /// Delete the element at `index`, or every element when `None`.
    Remove { index: Option<usize> },
    /// Exchange the elements at `a` and `b`.
    Swap { a: usize, b: usize },
    /// Take the element at `from` out and reinsert it at `to`.
    /// `to` is clamped to the length after removal.
    Move { from: usize, to: usize },
    /// Discard the whole sequence; the caller supplies the new contents.
    Replace,
}

impl ArrayTransform {
    /// Apply the edit to `seq`.
    ///
    /// `fill` produces the inserted or overwriting element and is only
    /// called by `Append`, `Prepend`, `Insert` and `Update`. `Replace`
    /// clears `seq`.
    pub fn apply<T>(&self, seq: &mut Vec<T>, fill: impl FnOnce() -> T) {
        match *self {
            Self::Append => seq.push(fill()),
            Self::Prepend => seq.insert(0, fill()),
            Self::Insert { index } => {
                let at = index.min(seq.len());
                seq.insert(at, fill());
            }
            Self::Update { index } => {
                if let Some(slot) = seq.get_mut(index) {
                    *slot = fill();
                }
            }
            Self::Remove { index: Some(index) } => {
                if index < seq.len() {
                    seq.remove(index);
                }
            }
            Self::Remove { index: None } | Self::Replace => seq.clear(),
            Self::Swap { a, b } => {
                if a < seq.len() && b < seq.len() {
                    seq.swap(a, b);
                }
            }
            Self::Move { from, to } => {
                if from < seq.len() {
                    let item = seq.remove(from);
                    let at = to.min(seq.len());
                    seq.insert(at, item);
                }
            }
        }
    }

    /// Whether the edit changes a sequence of length `len`.
    #[must_use]
    pub fn is_applicable(&self, len: usize) -> bool {
        match *self {
            Self::Append | Self::Prepend | Self::Insert { .. } | Self::Replace => true,
            Self::Remove { index: None } => true,
            Self::Update { index } | Self::Remove { index: Some(index) } => index < len,
            Self::Swap { a, b } => a < len && b < len,
            Self::Move { from, .. } => from < len,
        }
    }

    /// Pure reorderings: element set unchanged, only positions move.
    #[must_use]
    pub fn is_reorder(&self) -> bool {
        matches!(self, Self::Swap { .. } | Self::Move { .. })
    }

    /// Whether the edit changes which row sits at which index.
    ///
    /// `Update` rewrites one value in place; metadata keyed by index stays
    /// where it is.
    #[must_use]
    pub fn reshapes(&self) -> bool {
        !matches!(self, Self::Update { .. })
    }

    /// Stable lowercase name, used in log events.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Append => "append",
            Self::Prepend => "prepend",
            Self::Insert { .. } => "insert",
            Self::Update { .. } => "update",
            Self::Remove { index: Some(_) } => "remove",
            Self::Remove { index: None } => "clear",
            Self::Swap { .. } => "swap",
            Self::Move { .. } => "move",
            Self::Replace => "replace",
        }
    }
}

impl fmt::Display for ArrayTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Insert { index } | Self::Update { index } => {
                write!(f, "{}({})", self.label(), index)
            }
            Self::Remove { index: Some(index) } => write!(f, "remove({})", index),
            Self::Swap { a, b } => write!(f, "swap({}, {})", a, b),
            Self::Move { from, to } => write!(f, "move({} -> {})", from, to),
            _ => f.write_str(self.label()),
        }
    }
}
