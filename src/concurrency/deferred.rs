//! Deferred disposal.
//!
//! `dispose_after(token)` on a container moves its blocks into a
//! [`PendingDisposal`]. The blocks are freed only once the token completes, so
//! readers scheduled before the logical free can finish with the memory.

use crate::alloc::Allocation;
use crate::concurrency::Completion;

/// Container memory waiting on a completion token.
///
/// Dropping a disposal that is still pending blocks until the token
/// completes; memory is never released early.
#[must_use = "dropping a pending disposal blocks until its token completes"]
pub struct PendingDisposal<C: Completion> {
    allocations: Vec<Allocation>,
    token: C,
}

impl<C: Completion> PendingDisposal<C> {
    pub(crate) fn new(allocations: Vec<Allocation>, token: C) -> Self {
        tracing::trace!(blocks = allocations.len(), "dispose deferred");
        Self { allocations, token }
    }

    /// Number of blocks still held.
    pub fn held(&self) -> usize {
        self.allocations.len()
    }

    /// Returns `true` once the blocks have been freed.
    pub fn is_disposed(&self) -> bool {
        self.allocations.is_empty()
    }

    /// Frees the blocks if the token has completed. Returns whether the
    /// disposal is finished.
    pub fn poll(&mut self) -> bool {
        if !self.allocations.is_empty() && self.token.is_complete() {
            self.release();
        }
        self.allocations.is_empty()
    }

    /// Blocks until the token completes, frees the blocks and hands the
    /// token back.
    pub fn wait(mut self) -> C {
        self.token.wait();
        self.release();
        let mut this = core::mem::ManuallyDrop::new(self);
        // SAFETY: `this` is never used or dropped again; the allocations
        // vector is already empty, so reading both fields out leaks nothing.
        unsafe {
            core::ptr::drop_in_place(&mut this.allocations);
            core::ptr::read(&this.token)
        }
    }

    fn release(&mut self) {
        let count = self.allocations.len();
        self.allocations.clear();
        tracing::trace!(blocks = count, "deferred dispose completed");
    }
}

impl<C: Completion> Drop for PendingDisposal<C> {
    fn drop(&mut self) {
        if !self.allocations.is_empty() {
            self.token.wait();
            self.release();
        }
    }
}

impl<C: Completion> core::fmt::Debug for PendingDisposal<C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PendingDisposal")
            .field("held", &self.allocations.len())
            .field("complete", &self.token.is_complete())
            .finish()
    }
}

/// A batch of pending disposals, collected as their tokens complete.
pub struct DisposeQueue<C: Completion> {
    pending: Vec<PendingDisposal<C>>,
}

impl<C: Completion> DisposeQueue<C> {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    /// Adds a pending disposal.
    pub fn push(&mut self, disposal: PendingDisposal<C>) {
        self.pending.push(disposal);
    }

    /// Number of disposals not yet finished.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns `true` if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Frees every disposal whose token has completed. Returns how many
    /// finished.
    pub fn collect(&mut self) -> usize {
        let before = self.pending.len();
        self.pending.retain_mut(|disposal| !disposal.poll());
        before - self.pending.len()
    }

    /// Waits for and frees everything still pending.
    pub fn drain(&mut self) {
        for disposal in self.pending.drain(..) {
            disposal.wait();
        }
    }
}

impl<C: Completion> Default for DisposeQueue<C> {
    fn default() -> Self {
        Self::new()
    }
}
