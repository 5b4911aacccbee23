//! Ambient transaction detection.
//!
//! When an externally managed transaction scope is active the handle must
//! not start its own transaction. `ThreadAmbientTransaction` tracks scopes
//! entered on the current thread with `AmbientTransactionScope`.

use std::cell::Cell;
use std::marker::PhantomData;

/// Reports whether an ambient transaction scope is active
pub trait AmbientTransaction: Send + Sync {
    fn is_active(&self) -> bool;
}

/// Never reports an ambient transaction
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAmbientTransaction;

impl AmbientTransaction for NoAmbientTransaction {
    fn is_active(&self) -> bool {
        false
    }
}

thread_local! {
    static SCOPE_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Active while at least one `AmbientTransactionScope` is alive on this thread
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadAmbientTransaction;

impl AmbientTransaction for ThreadAmbientTransaction {
    fn is_active(&self) -> bool {
        SCOPE_DEPTH.with(|depth| depth.get() > 0)
    }
}

/// Guard marking an ambient transaction scope on the current thread
///
/// Scopes nest; the ambient transaction ends when the outermost guard drops.
#[derive(Debug)]
pub struct AmbientTransactionScope {
    // Bound to the thread whose depth counter it incremented
    _not_send: PhantomData<*const ()>,
}

impl AmbientTransactionScope {
    pub fn enter() -> Self {
        SCOPE_DEPTH.with(|depth| depth.set(depth.get() + 1));
        Self {
            _not_send: PhantomData,
        }
    }

    /// Number of scopes currently entered on this thread
    pub fn depth() -> usize {
        SCOPE_DEPTH.with(Cell::get)
    }
}

impl Drop for AmbientTransactionScope {
    fn drop(&mut self) {
        SCOPE_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}
