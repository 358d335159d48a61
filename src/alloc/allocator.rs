//! Allocator tags and owned raw blocks.
//!
//! Every container takes an [`Allocator`] at construction and frees through
//! the same tag. Owning tags are served from the global heap with per-tag
//! accounting; [`Allocator::None`] marks memory that belongs to somebody else.

use crate::alloc::metrics;
use crate::contract::contract_assert;
use core::alloc::Layout;
use core::ptr::NonNull;
use serde::{Deserialize, Serialize};
use std::alloc::{alloc, alloc_zeroed, dealloc, handle_alloc_error};

/// Names the arena a container's memory comes from.
///
/// The discriminants are stable: they are written into the bitset dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(i32)]
pub enum Allocator {
    /// Non-owning. The container is a view over externally owned memory and
    /// disposing it frees nothing.
    None = 1,
    /// Short-lived scratch memory.
    Temp = 2,
    /// Memory handed to background work for a few frames.
    TempJob = 3,
    /// Long-lived memory.
    #[default]
    Persistent = 4,
}

impl Allocator {
    /// All tags, in discriminant order.
    pub const ALL: [Allocator; 4] = [
        Allocator::None,
        Allocator::Temp,
        Allocator::TempJob,
        Allocator::Persistent,
    ];

    /// Returns `true` if containers created with this tag own their memory.
    #[inline]
    pub const fn is_owning(self) -> bool {
        !matches!(self, Allocator::None)
    }

    /// The stable raw value of this tag.
    #[inline]
    pub const fn as_raw(self) -> i32 {
        self as i32
    }

    /// Parses a raw tag value.
    pub const fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            1 => Some(Allocator::None),
            2 => Some(Allocator::Temp),
            3 => Some(Allocator::TempJob),
            4 => Some(Allocator::Persistent),
            _ => None,
        }
    }

    /// Allocates a block for `layout`, optionally zero-filled.
    ///
    /// Zero-sized layouts return a dangling, well-aligned pointer without
    /// touching the heap. Allocation failure aborts through
    /// [`handle_alloc_error`].
    pub fn allocate(self, layout: Layout, zeroed: bool) -> NonNull<u8> {
        contract_assert!(
            self.is_owning(),
            "cannot allocate {} bytes from a non-owning allocator",
            layout.size()
        );

        if layout.size() == 0 {
            return dangling(layout);
        }

        // SAFETY: `layout` has a non-zero size.
        let ptr = unsafe {
            if zeroed {
                alloc_zeroed(layout)
            } else {
                alloc(layout)
            }
        };

        let Some(ptr) = NonNull::new(ptr) else {
            handle_alloc_error(layout);
        };

        metrics::record_alloc(self, layout.size());
        tracing::trace!(allocator = ?self, size = layout.size(), align = layout.align(), "allocate");
        ptr
    }

    /// Frees a block previously returned by [`Allocator::allocate`].
    ///
    /// # Safety
    /// `ptr` must come from `allocate` on this same tag with this same
    /// `layout`, and must not have been freed already.
    pub unsafe fn deallocate(self, ptr: NonNull<u8>, layout: Layout) {
        if layout.size() == 0 || !self.is_owning() {
            return;
        }

        dealloc(ptr.as_ptr(), layout);
        metrics::record_dealloc(self, layout.size());
        tracing::trace!(allocator = ?self, size = layout.size(), "free");
    }
}

fn dangling(layout: Layout) -> NonNull<u8> {
    // An address equal to the alignment is non-null and aligned.
    // SAFETY: `layout.align()` is a non-zero power of two.
    unsafe { NonNull::new_unchecked(layout.align() as *mut u8) }
}

/// An owned raw block: pointer, layout and the tag it came from.
///
/// Freed exactly once, either by [`Allocation::free`] or on drop. Containers
/// hand their blocks over as `Allocation`s when disposal is deferred.
pub struct Allocation {
    ptr: NonNull<u8>,
    layout: Layout,
    allocator: Allocator,
}

// SAFETY: an `Allocation` is the sole owner of its block; the block carries
// no thread affinity.
unsafe impl Send for Allocation {}
unsafe impl Sync for Allocation {}

impl Allocation {
    /// Takes ownership of a raw block.
    ///
    /// # Safety
    /// `ptr` must come from `allocator.allocate(layout, _)` and nothing else
    /// may free it.
    pub unsafe fn from_raw_parts(ptr: NonNull<u8>, layout: Layout, allocator: Allocator) -> Self {
        Self {
            ptr,
            layout,
            allocator,
        }
    }

    /// The start of the block.
    #[inline]
    pub fn ptr(&self) -> NonNull<u8> {
        self.ptr
    }

    /// The layout the block was allocated with.
    #[inline]
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// The tag the block was allocated from.
    #[inline]
    pub fn allocator(&self) -> Allocator {
        self.allocator
    }

    /// Frees the block now.
    pub fn free(self) {
        drop(self);
    }
}

impl Drop for Allocation {
    fn drop(&mut self) {
        // SAFETY: construction guarantees the block is live and owned.
        unsafe { self.allocator.deallocate(self.ptr, self.layout) }
    }
}

impl core::fmt::Debug for Allocation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Allocation")
            .field("ptr", &self.ptr)
            .field("size", &self.layout.size())
            .field("allocator", &self.allocator)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_round_trip() {
        for tag in Allocator::ALL {
            assert_eq!(Allocator::from_raw(tag.as_raw()), Some(tag));
        }
        assert_eq!(Allocator::from_raw(0), None);
        assert_eq!(Allocator::from_raw(5), None);
    }

    #[test]
    fn test_owning() {
        assert!(!Allocator::None.is_owning());
        assert!(Allocator::Temp.is_owning());
        assert!(Allocator::TempJob.is_owning());
        assert!(Allocator::Persistent.is_owning());
    }

    #[test]
    fn test_allocate_zeroed() {
        let layout = Layout::array::<u64>(16).unwrap();
        let ptr = Allocator::Temp.allocate(layout, true);
        unsafe {
            let words = core::slice::from_raw_parts(ptr.as_ptr() as *const u64, 16);
            assert!(words.iter().all(|&w| w == 0));
            Allocator::Temp.deallocate(ptr, layout);
        }
    }

    #[test]
    fn test_zero_sized_is_dangling() {
        let layout = Layout::array::<u64>(0).unwrap();
        let ptr = Allocator::Persistent.allocate(layout, false);
        assert_eq!(ptr.as_ptr() as usize % layout.align(), 0);
        unsafe { Allocator::Persistent.deallocate(ptr, layout) };
    }

    #[test]
    fn test_allocation_frees_on_drop() {
        let layout = Layout::new::<[u32; 8]>();
        let ptr = Allocator::Persistent.allocate(layout, true);
        let allocation = unsafe { Allocation::from_raw_parts(ptr, layout, Allocator::Persistent) };
        assert_eq!(allocation.layout().size(), 32);
        assert_eq!(allocation.allocator(), Allocator::Persistent);
        allocation.free();
    }

    #[cfg(any(debug_assertions, not(feature = "unchecked")))]
    #[test]
    #[should_panic(expected = "non-owning allocator")]
    fn test_allocate_from_none_panics() {
        let _ = Allocator::None.allocate(Layout::new::<u64>(), false);
    }

    #[test]
    fn test_tag_serializes_by_name() {
        let json = serde_json::to_string(&Allocator::TempJob).unwrap();
        assert_eq!(json, "\"TempJob\"");
        let back: Allocator = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Allocator::TempJob);
    }
}
