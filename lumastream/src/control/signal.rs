//! One-shot and level signal primitives.
//!
//! Two flavours of boolean signal cover every flag in the control
//! state:
//!
//! - [`Pulse`]: a one-shot request. The consumer takes it with an
//!   atomic swap, so a single external request yields exactly one
//!   effect even with concurrent writers.
//! - [`Level`]: a persistent flag that stays in effect until
//!   explicitly cleared, independent of how many times it is observed.

use std::sync::atomic::{AtomicBool, Ordering};

/// A one-shot signal.
///
/// Raised by a producer, consumed exactly once by [`Pulse::take`].
/// The consume is an atomic swap-to-false, avoiding the
/// check-then-clear race that separate `is_set`/`clear` calls would
/// have. A duplicate raise arriving after the take simply produces one
/// more (cheap) consumption on the next poll.
#[derive(Debug, Default)]
pub struct Pulse(AtomicBool);

impl Pulse {
    /// Create a new, un-raised pulse.
    pub fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Raise the pulse. Idempotent.
    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Consume the pulse, returning whether it was raised.
    ///
    /// Atomically clears the flag, so concurrent consumers see at most
    /// one `true` per raise.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }

    /// Observe the pulse without consuming it.
    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A level signal.
///
/// The effect persists until [`Level::clear`] is called; observation
/// never consumes.
#[derive(Debug, Default)]
pub struct Level(AtomicBool);

impl Level {
    /// Create a new, cleared level.
    pub fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Set the level. Idempotent.
    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Clear the level. Idempotent.
    pub fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    /// Observe the level.
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
