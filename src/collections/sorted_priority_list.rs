//! `SortedPriorityList`: parallel item/priority arrays sorted by priority.
//!
//! Priorities ascend with the index, so the highest-priority entry is the
//! last one: popping it and walking from the back are both cheap.

use crate::alloc::Allocator;
use crate::collections::{RawBuffer, Unmanaged};
use crate::concurrency::{Completion, PendingDisposal};
use crate::contract::{contract_assert, contract_index};
use core::cmp::Ordering;
use core::fmt;

/// Items kept in ascending priority order.
pub struct SortedPriorityList<T: Unmanaged, P: Unmanaged + Ord> {
    items: RawBuffer<T>,
    priorities: RawBuffer<P>,
    count: usize,
}

impl<T: Unmanaged, P: Unmanaged + Ord> SortedPriorityList<T, P> {
    /// Creates an empty list with room for `capacity` entries.
    pub fn new(capacity: usize, allocator: Allocator) -> Self {
        Self {
            items: RawBuffer::new(capacity, allocator),
            priorities: RawBuffer::new(capacity, allocator),
            count: 0,
        }
    }

    /// Number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    /// Returns `true` if the list has no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Number of entries the list can hold before growing.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.items.len()
    }

    /// The tag both backing blocks belong to.
    #[inline]
    pub fn allocator(&self) -> Allocator {
        self.items.allocator()
    }

    /// Items in ascending priority order.
    #[inline]
    pub fn items(&self) -> &[T] {
        &self.items.as_slice()[..self.count]
    }

    /// Priorities in ascending order, parallel to [`items`](Self::items).
    #[inline]
    pub fn priorities(&self) -> &[P] {
        &self.priorities.as_slice()[..self.count]
    }

    /// The entry at `index`.
    pub fn get(&self, index: usize) -> (&T, &P) {
        contract_index!(index, self.count);
        (&self.items[index], &self.priorities[index])
    }

    /// Entries from the highest priority down.
    pub fn iter_rev(&self) -> impl Iterator<Item = (&T, &P)> + '_ {
        self.items().iter().zip(self.priorities()).rev()
    }

    /// Inserts `item` at its priority's position.
    ///
    /// An entry with an equal priority found by the search is shifted up, so
    /// the new entry lands in front of it.
    pub fn add(&mut self, item: T, priority: P) {
        self.ensure_capacity();

        let index = match self.search(&priority) {
            Ok(index) | Err(index) => index,
        };

        let count = self.count;
        self.items
            .as_mut_slice()
            .copy_within(index..count, index + 1);
        self.priorities
            .as_mut_slice()
            .copy_within(index..count, index + 1);

        self.items[index] = item;
        self.priorities[index] = priority;
        self.count += 1;
    }

    /// Removes the highest-index entry whose item satisfies `matcher`.
    ///
    /// Returns `false` if nothing matched.
    pub fn remove<F>(&mut self, mut matcher: F) -> bool
    where
        F: FnMut(&T) -> bool,
    {
        let Some(index) = self.items().iter().rposition(|item| matcher(item)) else {
            return false;
        };

        let count = self.count;
        if index + 1 < count {
            self.items
                .as_mut_slice()
                .copy_within(index + 1..count, index);
            self.priorities
                .as_mut_slice()
                .copy_within(index + 1..count, index);
        }
        self.count -= 1;
        true
    }

    /// Removes the highest-index entry equal to `item`.
    pub fn remove_item(&mut self, item: &T) -> bool
    where
        T: PartialEq,
    {
        self.remove(|candidate| candidate == item)
    }

    /// Removes and returns the highest-priority item.
    pub fn pop(&mut self) -> T {
        contract_assert!(self.count > 0, "cannot pop an empty priority list");
        self.count -= 1;
        self.items[self.count]
    }

    /// Removes and returns the highest-priority item, if any.
    pub fn try_pop(&mut self) -> Option<T> {
        if self.count == 0 {
            None
        } else {
            Some(self.pop())
        }
    }

    /// Forgets every entry. Capacity is kept.
    pub fn clear(&mut self) {
        self.count = 0;
    }

    /// Frees both backing blocks now.
    pub fn dispose(self) {
        drop(self);
    }

    /// Frees both backing blocks once `token` completes.
    pub fn dispose_after<C: Completion>(self, token: C) -> PendingDisposal<C> {
        let mut allocations = Vec::with_capacity(2);
        allocations.extend(self.items.into_allocation());
        allocations.extend(self.priorities.into_allocation());
        PendingDisposal::new(allocations, token)
    }

    fn ensure_capacity(&mut self) {
        if self.count != self.capacity() {
            return;
        }
        let grown = (self.count * 2).max(1);
        tracing::debug!(from = self.count, to = grown, "priority list grown");
        self.items.resize(grown);
        self.priorities.resize(grown);
    }

    /// Binary search that stops at the first exact match it probes.
    ///
    /// `Err` carries the insertion point.
    fn search(&self, priority: &P) -> Result<usize, usize> {
        let priorities = self.priorities();
        let mut low = 0;
        // Exclusive upper bound; the probe is the midpoint of the inclusive
        // range `low..=high - 1`.
        let mut high = priorities.len();
        while low < high {
            let mid = (low + high - 1) / 2;
            match priorities[mid].cmp(priority) {
                Ordering::Equal => return Ok(mid),
                Ordering::Less => low = mid + 1,
                Ordering::Greater => high = mid,
            }
        }
        Err(low)
    }
}

impl<T, P> fmt::Debug for SortedPriorityList<T, P>
where
    T: Unmanaged + fmt::Debug,
    P: Unmanaged + Ord + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.items().iter().zip(self.priorities()))
            .finish()
    }
}
