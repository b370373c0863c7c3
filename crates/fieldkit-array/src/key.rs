#![forbid(unsafe_code)]

//! Stable entry identities.

use std::cell::Cell;
use std::fmt;

/// Identity of one field-array entry.
///
/// Keys are issued once and never reused or renumbered within an array, so
/// two handles with the same key always refer to the same logical row,
/// wherever that row currently sits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryKey(pub u64);

impl EntryKey {
    /// The raw counter value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for EntryKey {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Per-array monotonic key counter, starting at 0.
#[derive(Debug, Default)]
pub struct KeyAllocator {
    next: Cell<u64>,
}

impl KeyAllocator {
    /// A counter whose first key is 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the next key.
    pub fn next(&self) -> EntryKey {
        let key = self.next.get();
        self.next.set(key + 1);
        EntryKey(key)
    }

    /// The key the next call to [`next`](Self::next) will return.
    #[must_use]
    pub fn peek(&self) -> EntryKey {
        EntryKey(self.next.get())
    }
}
