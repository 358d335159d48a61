//! `SlotArray`: a fixed-slot array with an occupancy bitmap.
//!
//! Values sit in a [`RawBuffer`]; a [`BitSet`] of the same length records
//! which slots are taken. Inserting claims the lowest free slot, releasing a
//! slot makes it the next candidate again, so indices stay stable for the
//! lifetime of an entry.

use crate::alloc::Allocator;
use crate::collections::{BitSet, RawBuffer, Unmanaged};
use crate::concurrency::{Completion, PendingDisposal};
use crate::contract::{contract_assert, contract_index};
use core::fmt;
use core::ops::{Index, IndexMut};
use serde::Serialize;

/// One slot as shown by [`SlotArray::debug_view`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SlotDebugItem<T> {
    /// The stored value, stale or zero for free slots.
    pub item: T,
    /// Whether the slot is taken.
    pub occupied: bool,
}

/// Fixed slots with lowest-free-first insertion.
pub struct SlotArray<T: Unmanaged> {
    values: RawBuffer<T>,
    occupied: BitSet,
}

impl<T: Unmanaged> SlotArray<T> {
    /// Creates `capacity` free, zeroed slots.
    pub fn new(capacity: usize, allocator: Allocator) -> Self {
        Self {
            values: RawBuffer::new(capacity, allocator),
            occupied: BitSet::new(capacity, allocator),
        }
    }

    /// Number of slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.values.len()
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.occupied.count_ones()
    }

    /// Returns `true` if no slot is occupied.
    pub fn is_empty(&self) -> bool {
        !self.occupied.any_set()
    }

    /// One past the highest occupied index, or 0 when empty.
    ///
    /// Scheduling work over `0..last_taken_count()` covers every entry.
    pub fn last_taken_count(&self) -> usize {
        self.occupied.last_one().map_or(0, |index| index + 1)
    }

    /// The tag both backing blocks belong to.
    #[inline]
    pub fn allocator(&self) -> Allocator {
        self.values.allocator()
    }

    /// The occupancy bitmap.
    #[inline]
    pub fn occupancy(&self) -> &BitSet {
        &self.occupied
    }

    /// Stores `value` in the lowest free slot.
    ///
    /// Returns `None` when every slot is taken.
    pub fn try_insert(&mut self, value: T) -> Option<usize> {
        let index = self.occupied.first_zero()?;
        self.occupied.up(index);
        self.values[index] = value;
        Some(index)
    }

    /// Stores `value` in the lowest free slot, doubling the capacity first
    /// if the array is full.
    pub fn insert(&mut self, value: T) -> usize {
        if let Some(index) = self.try_insert(value) {
            return index;
        }
        // Every slot is taken, so the first new one is free.
        let index = self.capacity();
        self.resize((index * 2).max(1));
        self.occupied.up(index);
        self.values[index] = value;
        index
    }

    /// Frees slot `index` and zeroes its value.
    pub fn release(&mut self, index: usize) {
        self.release_retaining(index);
        self.values[index] = T::new_zeroed();
    }

    /// Frees slot `index` leaving the stale value in place.
    pub fn release_retaining(&mut self, index: usize) {
        contract_assert!(
            self.occupied.has(index),
            "slot {} is not occupied",
            index
        );
        self.occupied.down(index);
    }

    /// Returns `true` if slot `index` exists and is taken.
    #[inline]
    pub fn is_occupied(&self, index: usize) -> bool {
        self.occupied.has(index)
    }

    /// The value in slot `index`, if occupied.
    pub fn try_get(&self, index: usize) -> Option<&T> {
        if self.is_occupied(index) {
            self.values.get(index)
        } else {
            None
        }
    }

    /// The value in slot `index`, if occupied.
    pub fn try_get_mut(&mut self, index: usize) -> Option<&mut T> {
        if self.is_occupied(index) {
            self.values.get_mut(index)
        } else {
            None
        }
    }

    /// Grows to `new_capacity` slots, keeping values and occupancy.
    pub fn resize(&mut self, new_capacity: usize) {
        contract_assert!(
            new_capacity >= self.capacity(),
            "cannot shrink a slot array from {} to {}",
            self.capacity(),
            new_capacity
        );
        if new_capacity == self.capacity() {
            return;
        }
        tracing::debug!(
            from = self.capacity(),
            to = new_capacity,
            "slot array resized"
        );
        self.values.resize(new_capacity);
        self.occupied.ensure_capacity(new_capacity);
    }

    /// Occupied values in ascending slot order.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.occupied.iter_ones().map(|index| &self.values[index])
    }

    /// Occupied `(index, value)` pairs in ascending slot order.
    pub fn iter_indexed(&self) -> impl Iterator<Item = (usize, &T)> + '_ {
        self.occupied
            .iter_ones()
            .map(|index| (index, &self.values[index]))
    }

    /// Occupied values in ascending slot order, mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> + '_ {
        let base = self.values.as_mut_ptr();
        self.occupied.iter_ones().map(move |index| {
            // SAFETY: the bitmap is as long as the value buffer, so every set
            // index is in bounds, and each index is yielded once, so the
            // returned references never alias. `&mut self` is held for the
            // iterator's lifetime.
            unsafe { &mut *base.add(index) }
        })
    }

    /// Every slot, free or taken, for inspection.
    pub fn debug_view(&self) -> Vec<SlotDebugItem<T>> {
        self.values
            .iter()
            .enumerate()
            .map(|(index, &item)| SlotDebugItem {
                item,
                occupied: self.occupied.get(index),
            })
            .collect()
    }

    /// Frees both backing blocks now.
    pub fn dispose(self) {
        drop(self);
    }

    /// Frees both backing blocks once `token` completes.
    pub fn dispose_after<C: Completion>(self, token: C) -> PendingDisposal<C> {
        let mut allocations = Vec::with_capacity(2);
        allocations.extend(self.values.into_allocation());
        allocations.extend(self.occupied.into_allocation());
        PendingDisposal::new(allocations, token)
    }
}

impl<T: Unmanaged> Index<usize> for SlotArray<T> {
    type Output = T;

    #[inline]
    fn index(&self, index: usize) -> &T {
        contract_index!(index, self.capacity());
        contract_assert!(
            self.occupied.get(index),
            "slot {} is not occupied",
            index
        );
        // SAFETY: checked against the capacity above, or trusted in
        // unchecked builds.
        unsafe { self.values.get_unchecked(index) }
    }
}

impl<T: Unmanaged> IndexMut<usize> for SlotArray<T> {
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut T {
        contract_index!(index, self.capacity());
        contract_assert!(
            self.occupied.get(index),
            "slot {} is not occupied",
            index
        );
        // SAFETY: as in `index`.
        unsafe { self.values.get_unchecked_mut(index) }
    }
}

impl<T: Unmanaged + fmt::Debug> fmt::Debug for SlotArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter_indexed()).finish()
    }
}
