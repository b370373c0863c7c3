#![forbid(unsafe_code)]

//! Dotted field paths and their resolution against a JSON value tree.
//!
//! A path such as `"users.2.email"` is split on `.`; segments made only of
//! ASCII digits address array elements, everything else addresses object
//! members. Paths are validated once at construction so the rest of the
//! crate can treat every [`FieldPath`] as well formed.
//!
//! An index has exactly one spelling: `"01"` is rejected so that `items.01`
//! and `items.1` can never name the same slot under different keys.

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};

use crate::error::FormError;

/// Largest number of `null` slots [`FieldPath::assign`] will pad an array
/// with to reach an index. Writes further out are refused.
pub const MAX_INDEX_GAP: usize = 4096;

/// One resolved component of a [`FieldPath`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Object member name.
    Key(&'a str),
    /// Array position.
    Index(usize),
}

impl<'a> Segment<'a> {
    fn classify(raw: &'a str) -> Self {
        if raw.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(i) = raw.parse() {
                return Self::Index(i);
            }
        }
        Self::Key(raw)
    }
}

/// A validated dotted path into the form's value tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldPath {
    raw: String,
}

impl FieldPath {
    /// Parse and validate a dotted path.
    pub fn parse(path: &str) -> Result<Self, FormError> {
        if path.is_empty() {
            return Err(FormError::InvalidPath {
                path: path.to_string(),
                reason: "path is empty",
            });
        }
        if path.split('.').any(str::is_empty) {
            return Err(FormError::InvalidPath {
                path: path.to_string(),
                reason: "empty segment",
            });
        }
        if path.split('.').any(has_leading_zero) {
            return Err(FormError::InvalidPath {
                path: path.to_string(),
                reason: "index with leading zero",
            });
        }
        Ok(Self {
            raw: path.to_string(),
        })
    }

    /// The path as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Iterate over the resolved segments.
    pub fn segments(&self) -> impl Iterator<Item = Segment<'_>> {
        self.raw.split('.').map(Segment::classify)
    }

    /// Append a member or index segment given as text.
    pub fn child(&self, segment: &str) -> Result<Self, FormError> {
        Self::parse(&format!("{}.{}", self.raw, segment))
    }

    /// Append a numeric segment: `"items"` becomes `"items.<i>"`.
    #[must_use]
    pub fn index(&self, i: usize) -> Self {
        Self {
            raw: format!("{}.{}", self.raw, i),
        }
    }

    /// The path without its last segment, or `None` for a single segment.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        self.raw.rsplit_once('.').map(|(head, _)| Self {
            raw: head.to_string(),
        })
    }

    /// Whether `other` is this path or lies beneath it.
    #[must_use]
    pub fn covers(&self, other: &FieldPath) -> bool {
        match other.raw.strip_prefix(&self.raw) {
            Some(rest) => rest.is_empty() || rest.starts_with('.'),
            None => false,
        }
    }

    /// Split a path below `array` into the element index and the remaining
    /// suffix (with its leading dot, or empty).
    ///
    /// `"items.3.name"` relative to `"items"` is `Some((3, ".name"))`.
    #[must_use]
    pub fn relative_index<'a>(&'a self, array: &FieldPath) -> Option<(usize, &'a str)> {
        relative_index(&self.raw, &array.raw)
    }

    /// Resolve this path in `root`.
    #[must_use]
    pub fn lookup<'v>(&self, root: &'v Value) -> Option<&'v Value> {
        self.segments().try_fold(root, |node, seg| match (node, seg) {
            (Value::Object(map), Segment::Key(key)) => map.get(key),
            (Value::Object(map), Segment::Index(i)) => map.get(&i.to_string()),
            (Value::Array(items), Segment::Index(i)) => items.get(i),
            _ => None,
        })
    }

    /// Write `value` at this path in `root`, creating containers on the way.
    ///
    /// A numeric segment creates an array (padded with `null`), any other
    /// segment an object. Scalars standing where a container is needed are
    /// overwritten.
    ///
    /// Returns `false` and leaves `root` untouched when reaching an index
    /// would pad an array by more than [`MAX_INDEX_GAP`] slots.
    pub fn assign(&self, root: &mut Value, value: Value) -> bool {
        let segments: Vec<Segment<'_>> = self.segments().collect();
        if !within_gap(root, &segments) {
            return false;
        }
        assign_at(root, &segments, value);
        true
    }
}

fn has_leading_zero(segment: &str) -> bool {
    segment.len() > 1 && segment.starts_with('0') && segment.bytes().all(|b| b.is_ascii_digit())
}

/// Dry run of [`assign_at`]: check every index against the array it will
/// land in, treating containers that do not exist yet as empty.
fn within_gap(root: &Value, segments: &[Segment<'_>]) -> bool {
    let mut node = Some(root);
    for seg in segments {
        if let Segment::Index(i) = *seg {
            let len = match node {
                Some(Value::Object(_)) => None,
                Some(Value::Array(items)) => Some(items.len()),
                _ => Some(0),
            };
            if len.is_some_and(|len| i.saturating_sub(len) > MAX_INDEX_GAP) {
                return false;
            }
        }
        node = node.and_then(|n| match (n, *seg) {
            (Value::Object(map), Segment::Key(key)) => map.get(key),
            (Value::Object(map), Segment::Index(i)) => map.get(&i.to_string()),
            (Value::Array(items), Segment::Index(i)) => items.get(i),
            _ => None,
        });
    }
    true
}

fn assign_at(slot: &mut Value, segments: &[Segment<'_>], value: Value) {
    let Some((head, rest)) = segments.split_first() else {
        *slot = value;
        return;
    };
    let fits = matches!(
        (&*slot, head),
        (Value::Object(_), _) | (Value::Array(_), Segment::Index(_))
    );
    if !fits {
        *slot = match head {
            Segment::Index(_) => Value::Array(Vec::new()),
            Segment::Key(_) => Value::Object(Map::new()),
        };
    }
    let next = match (slot, *head) {
        (Value::Object(map), Segment::Key(key)) => {
            map.entry(key.to_string()).or_insert(Value::Null)
        }
        (Value::Object(map), Segment::Index(i)) => map.entry(i.to_string()).or_insert(Value::Null),
        (Value::Array(items), Segment::Index(i)) => {
            let Some(needed) = i.checked_add(1) else {
                return;
            };
            if items.len() < needed {
                items.resize(needed, Value::Null);
            }
            &mut items[i]
        }
        _ => return,
    };
    assign_at(next, rest, value);
}

/// String-level form of [`FieldPath::relative_index`], usable on raw
/// side-table keys.
pub(crate) fn relative_index<'a>(path: &'a str, array: &str) -> Option<(usize, &'a str)> {
    let below = path.strip_prefix(array)?.strip_prefix('.')?;
    let (head, suffix) = match below.find('.') {
        Some(dot) => below.split_at(dot),
        None => (below, ""),
    };
    if has_leading_zero(head) {
        return None;
    }
    match Segment::classify(head) {
        Segment::Index(i) => Some((i, suffix)),
        Segment::Key(_) => None,
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl AsRef<str> for FieldPath {
    fn as_ref(&self) -> &str {
        &self.raw
    }
}

impl FromStr for FieldPath {
    type Err = FormError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for FieldPath {
    type Error = FormError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}
