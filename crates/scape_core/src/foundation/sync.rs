//! Internal lock helpers.

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Acquire `mutex`, recovering the guard if a panicking thread poisoned it.
/// The pools and tracker lists only hold plain data, so a poisoned lock does
/// not leave them in a half-updated state worth propagating.
pub(crate) fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
