#![forbid(unsafe_code)]

//! Lazy values derived from an [`Observable`].
//!
//! A [`Computed<T>`] owns a derivation closure and its last result. The
//! source subscription only marks the cache dirty; the closure runs on the
//! next [`get`](Computed::get) or [`with`](Computed::with), so a burst of
//! source changes costs one recomputation.
//!
//! # Invariants
//!
//! 1. `get()` reflects the source as it is at the time of the call.
//! 2. The derivation runs at most once per dirty cycle.
//! 3. `version` increments by exactly 1 per recomputation.
//!
//! # Failure Modes
//!
//! - **Source dropped**: the subscription goes inert and the last cached
//!   value is served forever.
//! - **Derivation panics**: the dirty flag stays set; the next read retries.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use super::observable::{Observable, Subscription};

struct ComputedInner<T> {
    derive: Box<dyn Fn() -> T>,
    cached: Option<T>,
    dirty: Cell<bool>,
    version: u64,
    // Held only to keep the source callbacks registered.
    _subscriptions: Vec<Subscription>,
}

impl<T> ComputedInner<T> {
    fn refresh(&mut self) {
        if self.dirty.get() || self.cached.is_none() {
            self.cached = Some((self.derive)());
            self.dirty.set(false);
            self.version += 1;
        }
    }
}

/// A memoized value derived from an [`Observable`].
///
/// Cloning a `Computed` creates a new handle to the **same** cache.
pub struct Computed<T> {
    inner: Rc<RefCell<ComputedInner<T>>>,
}

impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Computed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Computed")
            .field("cached", &inner.cached)
            .field("dirty", &inner.dirty.get())
            .field("version", &inner.version)
            .finish()
    }
}

impl<T: Clone + 'static> Computed<T> {
    /// Derive a value from `source` through `map`.
    pub fn from_observable<S: Clone + PartialEq + 'static>(
        source: &Observable<S>,
        map: impl Fn(&S) -> T + 'static,
    ) -> Self {
        let reader = source.clone();
        let computed = Self::from_fn(move || reader.with(|v| map(v)), Vec::new());

        let weak = Rc::downgrade(&computed.inner);
        let sub = source.subscribe(move |_| {
            if let Some(inner) = weak.upgrade() {
                // `try_borrow` so a notification raised while this value is
                // being derived cannot panic; the refresh in progress
                // already observes the new source value.
                if let Ok(inner) = inner.try_borrow() {
                    inner.dirty.set(true);
                }
            }
        });
        computed.inner.borrow_mut()._subscriptions.push(sub);
        computed
    }

    /// Low-level constructor: `derive` plus caller-managed subscriptions.
    ///
    /// Nothing marks the result dirty automatically; callers wire that up
    /// or call [`invalidate`](Self::invalidate).
    pub fn from_fn(derive: impl Fn() -> T + 'static, subscriptions: Vec<Subscription>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ComputedInner {
                derive: Box::new(derive),
                cached: None,
                dirty: Cell::new(true),
                version: 0,
                _subscriptions: subscriptions,
            })),
        }
    }

    /// Current value, recomputed first if any source changed.
    #[must_use]
    pub fn get(&self) -> T {
        self.with(T::clone)
    }

    /// Borrow the current value without cloning it.
    ///
    /// # Panics
    ///
    /// Panics if `f` reads this same `Computed` (re-entrant borrow).
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.inner.borrow_mut().refresh();
        let inner = self.inner.borrow();
        match inner.cached.as_ref() {
            Some(value) => f(value),
            None => unreachable!("refresh always populates the cache"),
        }
    }

    /// Whether the next read will recompute.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.inner.borrow().dirty.get()
    }

    /// Force the next read to recompute.
    pub fn invalidate(&self) {
        self.inner.borrow().dirty.set(true);
    }

    /// Number of recomputations so far.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }
}
