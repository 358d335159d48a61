//! Completion tokens.
//!
//! A [`Completion`] reports whether previously scheduled work has finished.
//! Deferred disposal holds memory until its token completes; nothing here
//! depends on a particular scheduler.

use crossbeam_utils::{Backoff, CachePadded};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// A handle signaling that outstanding work has finished.
pub trait Completion {
    /// Returns `true` once the work this token tracks has finished.
    fn is_complete(&self) -> bool;

    /// Blocks until [`Completion::is_complete`] returns `true`.
    fn wait(&self) {
        let backoff = Backoff::new();
        while !self.is_complete() {
            backoff.snooze();
        }
    }
}

/// A token that is complete from the start.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ready;

impl Completion for Ready {
    #[inline]
    fn is_complete(&self) -> bool {
        true
    }

    #[inline]
    fn wait(&self) {}
}

impl<T> Completion for JoinHandle<T> {
    fn is_complete(&self) -> bool {
        self.is_finished()
    }
}

impl<C: Completion + ?Sized> Completion for &C {
    fn is_complete(&self) -> bool {
        (**self).is_complete()
    }

    fn wait(&self) {
        (**self).wait();
    }
}

/// Counts outstanding readers.
///
/// Each reader holds a [`FenceGuard`] obtained from [`Fence::enter`]; the
/// fence completes once every guard has been dropped. Clones share the count.
#[derive(Debug, Clone, Default)]
pub struct Fence {
    pending: Arc<CachePadded<AtomicUsize>>,
}

impl Fence {
    /// Creates a fence with no outstanding readers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a reader.
    pub fn enter(&self) -> FenceGuard {
        self.pending.fetch_add(1, Ordering::AcqRel);
        FenceGuard {
            pending: Arc::clone(&self.pending),
        }
    }

    /// Number of readers that have not left yet.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }
}

impl Completion for Fence {
    #[inline]
    fn is_complete(&self) -> bool {
        self.pending.load(Ordering::Acquire) == 0
    }
}

/// A registered reader of a [`Fence`]. Leaves the fence on drop.
#[derive(Debug)]
#[must_use = "the reader leaves the fence as soon as the guard is dropped"]
pub struct FenceGuard {
    pending: Arc<CachePadded<AtomicUsize>>,
}

impl Drop for FenceGuard {
    fn drop(&mut self) {
        self.pending.fetch_sub(1, Ordering::Release);
    }
}
