//! # `rawkit` - Manually Allocated Containers
//!
//! Fixed-layout containers over raw, allocator-tagged memory. Every container
//! records the [`Allocator`] it was created with and frees through it, either
//! immediately or once a completion token reports that outstanding readers
//! are done.
//!
//! ## Containers
//!
//! - [`RawBuffer<T>`]: a fixed-length typed block. Resizing is always
//!   explicit and reallocates.
//! - [`BitSet`]: a dynamic bit vector with scans, set algebra and a binary
//!   dump format.
//! - [`SlotArray<T>`]: slots with stable indices; insertion claims the lowest
//!   free slot.
//! - [`IndexedHeap<T, P>`]: a fixed-capacity binary min-heap that can update
//!   or remove any present node.
//! - [`SortedPriorityList<T, P>`]: parallel item/priority arrays sorted by
//!   priority, highest last.
//!
//! ## Element Types
//!
//! Elements must be [`Unmanaged`]: `Copy`, valid when all-zero, and free of
//! borrowed data. Containers never run element destructors.
//!
//! ## Access Tiers
//!
//! Out-of-contract operations (bad index, unoccupied slot, pop on an empty
//! list) panic with a `contract violation:` message in checked builds. A
//! release build with the `unchecked` feature compiles those checks out; see
//! [`contract`].
//!
//! ## Disposal
//!
//! Dropping a container frees its memory. `dispose_after(token)` defers the
//! free until the token completes:
//!
//! ```rust
//! use rawkit::{Allocator, BitSet, Fence};
//!
//! let fence = Fence::new();
//! let guard = fence.enter();
//!
//! let mut set = BitSet::new(128, Allocator::TempJob);
//! set.up(3);
//!
//! let mut pending = set.dispose_after(fence.clone());
//! assert!(!pending.poll());
//!
//! drop(guard);
//! assert!(pending.poll());
//! ```

#![warn(missing_docs, clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod alloc;
pub mod collections;
pub mod concurrency;
pub mod contract;

pub use alloc::{Allocation, Allocator, MetricsSnapshot};
pub use collections::{
    BitSet, DumpError, IndexedHeap, RawBuffer, SlotArray, SlotDebugItem, SortedPriorityList,
    Unmanaged,
};
pub use concurrency::{Completion, DisposeQueue, Fence, FenceGuard, PendingDisposal, Ready};

// Compile-time assertions for container layout.
const _: () = {
    use core::mem;

    // An uncreated buffer is a null pointer; `Option<NonNull<_>>` keeps it thin.
    assert!(mem::size_of::<RawBuffer<u64>>() == mem::size_of::<usize>() * 3);

    // A bit set is its bucket buffer plus length and tail mask.
    assert!(mem::size_of::<BitSet>() <= mem::size_of::<RawBuffer<u64>>() + 16);

    // Allocator tags are written to dumps as `i32`.
    assert!(mem::size_of::<Allocator>() == mem::size_of::<i32>());
};
