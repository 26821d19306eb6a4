//! Process-wide interop counters
//!
//! Relaxed atomics: the numbers are informational and never used to order
//! other memory operations.

use std::sync::atomic::{AtomicUsize, Ordering};

static CALLS_MADE: AtomicUsize = AtomicUsize::new(0);
static ARITY_ERRORS: AtomicUsize = AtomicUsize::new(0);
static RECEIVER_ERRORS: AtomicUsize = AtomicUsize::new(0);
static MARSHALING_ERRORS: AtomicUsize = AtomicUsize::new(0);
static PROXIES_BOUND: AtomicUsize = AtomicUsize::new(0);

/// Interop statistics for monitoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InteropStats {
    pub calls_made: usize,
    pub arity_errors: usize,
    /// Thiscall dispatches with no receiver word
    pub receiver_errors: usize,
    pub marshaling_errors: usize,
    pub proxies_bound: usize,
}

/// Snapshot the counters
pub fn stats() -> InteropStats {
    InteropStats {
        calls_made: CALLS_MADE.load(Ordering::Relaxed),
        arity_errors: ARITY_ERRORS.load(Ordering::Relaxed),
        receiver_errors: RECEIVER_ERRORS.load(Ordering::Relaxed),
        marshaling_errors: MARSHALING_ERRORS.load(Ordering::Relaxed),
        proxies_bound: PROXIES_BOUND.load(Ordering::Relaxed),
    }
}

/// Zero every counter
pub fn reset_stats() {
    CALLS_MADE.store(0, Ordering::Relaxed);
    ARITY_ERRORS.store(0, Ordering::Relaxed);
    RECEIVER_ERRORS.store(0, Ordering::Relaxed);
    MARSHALING_ERRORS.store(0, Ordering::Relaxed);
    PROXIES_BOUND.store(0, Ordering::Relaxed);
}

#[inline]
pub(crate) fn record_call() {
    CALLS_MADE.fetch_add(1, Ordering::Relaxed);
}

#[inline]
pub(crate) fn record_arity_error() {
    ARITY_ERRORS.fetch_add(1, Ordering::Relaxed);
}

#[inline]
pub(crate) fn record_receiver_error() {
    RECEIVER_ERRORS.fetch_add(1, Ordering::Relaxed);
}

#[inline]
pub(crate) fn record_marshaling_error() {
    MARSHALING_ERRORS.fetch_add(1, Ordering::Relaxed);
}

#[inline]
pub(crate) fn record_bind() {
    PROXIES_BOUND.fetch_add(1, Ordering::Relaxed);
}
