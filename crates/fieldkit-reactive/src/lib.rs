#![forbid(unsafe_code)]

//! Change-tracking primitives used by fieldkit's form state.
//!
//! - [`Observable`]: a shared, version-tracked value with subscriber
//!   callbacks.
//! - [`Subscription`]: RAII guard that unsubscribes on drop.
//! - [`Computed`]: a lazily evaluated, memoized value derived from one
//!   `Observable`.
//!
//! # Architecture
//!
//! Everything here is single-threaded. `Observable<T>` keeps its state in
//! `Rc<RefCell<..>>`; subscribers are held as `Weak` callbacks so the
//! observable never keeps a listener alive on its own. `Computed<T>`
//! subscribes to its source and only flips a dirty flag on change; the
//! derivation runs on the next read.
//!
//! # Invariants
//!
//! 1. Version increments exactly once per mutation that changes the value.
//! 2. Subscribers are notified in registration order.
//! 3. Setting a value equal to the current value is a no-op.
//! 4. Callbacks run after the interior borrow is released, so a callback
//!    may read the observable that notified it.
//! 5. `Computed::get()` never returns a value stale with respect to its
//!    source.

pub mod computed;
pub mod observable;

pub use computed::Computed;
pub use observable::{Observable, Subscription};
