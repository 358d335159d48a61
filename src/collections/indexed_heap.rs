//! `IndexedHeap`: a fixed-capacity binary min-heap with node lookup.
//!
//! Nodes are stored 1-indexed: slot 0 of the backing buffers is never used,
//! so the parent of `i` is `i / 2` and its children are `2i` and `2i + 1`.
//! A side table maps every present node to its slot, which makes
//! [`IndexedHeap::contains`], [`IndexedHeap::update_priority`] and
//! [`IndexedHeap::remove`] independent of the heap size.
//!
//! Lower priority values come out first. Cascades move a hole rather than
//! swapping, so every level costs one write per buffer.

use crate::alloc::Allocator;
use crate::collections::{RawBuffer, Unmanaged};
use crate::concurrency::{Completion, PendingDisposal};
use crate::contract::contract_assert;
use core::fmt;
use core::hash::Hash;
use std::collections::HashMap;

/// A min-heap of at most `capacity` distinct nodes.
pub struct IndexedHeap<T, P>
where
    T: Unmanaged + Hash + Eq,
    P: Unmanaged + PartialOrd,
{
    items: RawBuffer<T>,
    priorities: RawBuffer<P>,
    positions: HashMap<T, usize>,
    count: usize,
}

impl<T, P> IndexedHeap<T, P>
where
    T: Unmanaged + Hash + Eq,
    P: Unmanaged + PartialOrd,
{
    /// Creates a heap that holds up to `max_nodes` nodes.
    pub fn new(max_nodes: usize, allocator: Allocator) -> Self {
        Self {
            items: RawBuffer::new(max_nodes + 1, allocator),
            priorities: RawBuffer::new(max_nodes + 1, allocator),
            positions: HashMap::with_capacity(max_nodes),
            count: 0,
        }
    }

    /// Number of nodes present.
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    /// Returns `true` if no node is present.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Maximum number of nodes.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.items.len().saturating_sub(1)
    }

    /// The tag the node buffers belong to.
    #[inline]
    pub fn allocator(&self) -> Allocator {
        self.items.allocator()
    }

    /// Returns `true` if `node` is in the heap.
    #[inline]
    pub fn contains(&self, node: &T) -> bool {
        self.positions.contains_key(node)
    }

    /// The node with the lowest priority.
    pub fn first(&self) -> Option<&T> {
        if self.count == 0 {
            None
        } else {
            Some(&self.items[1])
        }
    }

    /// The priority `node` was enqueued or last updated with.
    pub fn priority_of(&self, node: &T) -> Option<P> {
        self.positions
            .get(node)
            .map(|&index| self.priorities[index])
    }

    /// Adds `node` with `priority`.
    ///
    /// Returns `false` if the heap is full. `node` must not already be
    /// present.
    pub fn enqueue(&mut self, node: T, priority: P) -> bool {
        contract_assert!(!self.contains(&node), "node is already enqueued");
        if self.count == self.capacity() {
            return false;
        }

        self.count += 1;
        let index = self.count;
        self.positions.insert(node, index);
        self.place(index, node, priority);
        self.cascade_up(index);
        true
    }

    /// Removes and returns the node with the lowest priority.
    pub fn dequeue(&mut self) -> Option<T> {
        if self.count == 0 {
            return None;
        }

        let root = self.items[1];
        self.positions.remove(&root);

        if self.count == 1 {
            self.count = 0;
            return Some(root);
        }

        let last = self.count;
        self.count -= 1;
        self.place(1, self.items[last], self.priorities[last]);
        self.cascade_down(1);
        Some(root)
    }

    /// Changes the priority of a present node and restores heap order.
    pub fn update_priority(&mut self, node: &T, priority: P) {
        let index = self.position(node);
        self.priorities[index] = priority;
        self.on_node_updated(index);
    }

    /// Removes a present node.
    pub fn remove(&mut self, node: &T) {
        let index = self.position(node);
        self.positions.remove(node);

        let last = self.count;
        self.count -= 1;
        if index == last {
            return;
        }

        self.place(index, self.items[last], self.priorities[last]);
        self.on_node_updated(index);
    }

    /// Removes every node.
    pub fn clear(&mut self) {
        self.positions.clear();
        self.items.as_mut_slice()[1..=self.count].fill(T::new_zeroed());
        self.priorities.as_mut_slice()[1..=self.count].fill(P::new_zeroed());
        self.count = 0;
    }

    /// Present nodes with their priorities, in heap-array order.
    pub fn iter(&self) -> impl Iterator<Item = (&T, &P)> + '_ {
        let range = 1..=self.count;
        self.items.as_slice()[range.clone()]
            .iter()
            .zip(&self.priorities.as_slice()[range])
    }

    /// Checks the heap property and the side table over all present nodes.
    pub fn is_valid(&self) -> bool {
        if self.positions.len() != self.count {
            return false;
        }
        (1..=self.count).all(|index| {
            let parent_ok =
                index == 1 || !Self::precedes(&self.priorities[index], &self.priorities[index / 2]);
            parent_ok && self.positions.get(&self.items[index]) == Some(&index)
        })
    }

    /// Frees the node buffers now.
    pub fn dispose(self) {
        drop(self);
    }

    /// Frees the node buffers once `token` completes.
    ///
    /// The side table is dropped immediately; only the node buffers are
    /// shared with outside readers.
    pub fn dispose_after<C: Completion>(self, token: C) -> PendingDisposal<C> {
        let mut allocations = Vec::with_capacity(2);
        allocations.extend(self.items.into_allocation());
        allocations.extend(self.priorities.into_allocation());
        PendingDisposal::new(allocations, token)
    }

    #[inline]
    fn precedes(a: &P, b: &P) -> bool {
        a < b
    }

    fn position(&self, node: &T) -> usize {
        let index = self.positions.get(node).copied();
        contract_assert!(index.is_some(), "node is not in the heap");
        index.unwrap_or_default()
    }

    #[inline]
    fn place(&mut self, index: usize, node: T, priority: P) {
        self.items[index] = node;
        self.priorities[index] = priority;
        if let Some(slot) = self.positions.get_mut(&node) {
            *slot = index;
        }
    }

    fn on_node_updated(&mut self, index: usize) {
        let parent = index / 2;
        if parent > 0 && Self::precedes(&self.priorities[index], &self.priorities[parent]) {
            self.cascade_up(index);
        } else {
            self.cascade_down(index);
        }
    }

    fn cascade_up(&mut self, mut index: usize) {
        let node = self.items[index];
        let priority = self.priorities[index];

        while index > 1 {
            let parent = index / 2;
            if !Self::precedes(&priority, &self.priorities[parent]) {
                break;
            }
            self.place(index, self.items[parent], self.priorities[parent]);
            index = parent;
        }
        self.place(index, node, priority);
    }

    fn cascade_down(&mut self, mut index: usize) {
        let node = self.items[index];
        let priority = self.priorities[index];

        loop {
            let left = index * 2;
            if left > self.count {
                break;
            }
            let right = left + 1;
            // Ties go to the left child.
            let child = if right <= self.count
                && Self::precedes(&self.priorities[right], &self.priorities[left])
            {
                right
            } else {
                left
            };
            if !Self::precedes(&self.priorities[child], &priority) {
                break;
            }
            self.place(index, self.items[child], self.priorities[child]);
            index = child;
        }
        self.place(index, node, priority);
    }
}

impl<T, P> fmt::Debug for IndexedHeap<T, P>
where
    T: Unmanaged + Hash + Eq + fmt::Debug,
    P: Unmanaged + PartialOrd + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexedHeap")
            .field("len", &self.count)
            .field("capacity", &self.capacity())
            .field("nodes", &self.iter().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(heap: &mut IndexedHeap<u32, f32>) -> Vec<u32> {
        core::iter::from_fn(|| heap.dequeue()).collect()
    }

    #[test]
    fn test_dequeue_in_priority_order() {
        let mut heap = IndexedHeap::<u32, f32>::new(8, Allocator::Temp);
        for (node, priority) in [(1, 5.0), (2, 1.0), (3, 4.0), (4, 2.0), (5, 3.0)] {
            assert!(heap.enqueue(node, priority));
        }
        assert!(heap.is_valid());
        assert_eq!(heap.first(), Some(&2));
        assert_eq!(drain(&mut heap), vec![2, 4, 5, 3, 1]);
        assert!(heap.is_empty());
        assert_eq!(heap.dequeue(), None);
    }

    #[test]
    fn test_enqueue_full_returns_false() {
        let mut heap = IndexedHeap::<u32, i32>::new(2, Allocator::Temp);
        assert_eq!(heap.capacity(), 2);
        assert!(heap.enqueue(1, 1));
        assert!(heap.enqueue(2, 2));
        assert!(!heap.enqueue(3, 0));
        assert!(!heap.contains(&3));
        assert_eq!(heap.len(), 2);
    }

    #[test]
    fn test_update_priority_both_directions() {
        let mut heap = IndexedHeap::<u32, f32>::new(8, Allocator::Temp);
        for node in 0..6 {
            heap.enqueue(node, node as f32);
        }
        heap.update_priority(&5, -1.0);
        assert_eq!(heap.first(), Some(&5));
        assert!(heap.is_valid());
        heap.update_priority(&5, 10.0);
        assert_eq!(heap.priority_of(&5), Some(10.0));
        assert!(heap.is_valid());
        assert_eq!(drain(&mut heap), vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_remove_middle_and_last() {
        let mut heap = IndexedHeap::<u32, f32>::new(8, Allocator::Temp);
        for node in 0..7 {
            heap.enqueue(node, node as f32);
        }
        heap.remove(&6);
        heap.remove(&1);
        assert!(!heap.contains(&1));
        assert!(heap.is_valid());
        assert_eq!(heap.priority_of(&1), None);
        assert_eq!(drain(&mut heap), vec![0, 2, 3, 4, 5]);
    }

    #[test]
    fn test_equal_priorities_drain() {
        let mut heap = IndexedHeap::<u32, i32>::new(4, Allocator::Temp);
        for node in 0..4 {
            heap.enqueue(node, 7);
        }
        assert!(heap.is_valid());
        let mut drained = core::iter::from_fn(|| heap.dequeue()).collect::<Vec<_>>();
        drained.sort_unstable();
        assert_eq!(drained, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_clear_and_reuse() {
        let mut heap = IndexedHeap::<u64, u32>::new(3, Allocator::Persistent);
        heap.enqueue(10, 3);
        heap.enqueue(11, 1);
        heap.clear();
        assert!(heap.is_empty());
        assert!(!heap.contains(&11));
        assert!(heap.enqueue(11, 2));
        assert_eq!(heap.iter().collect::<Vec<_>>(), vec![(&11, &2)]);
    }

    #[test]
    fn test_zero_capacity() {
        let mut heap = IndexedHeap::<u32, u32>::new(0, Allocator::Temp);
        assert_eq!(heap.capacity(), 0);
        assert!(!heap.enqueue(1, 1));
        assert!(heap.is_valid());
    }

    #[cfg(any(debug_assertions, not(feature = "unchecked")))]
    #[test]
    #[should_panic(expected = "node is already enqueued")]
    fn test_duplicate_enqueue_is_violation() {
        let mut heap = IndexedHeap::<u32, u32>::new(4, Allocator::Temp);
        heap.enqueue(1, 1);
        heap.enqueue(1, 2);
    }

    #[cfg(any(debug_assertions, not(feature = "unchecked")))]
    #[test]
    #[should_panic(expected = "node is not in the heap")]
    fn test_update_absent_is_violation() {
        let mut heap = IndexedHeap::<u32, u32>::new(4, Allocator::Temp);
        heap.update_priority(&9, 1);
    }

    #[cfg(any(debug_assertions, not(feature = "unchecked")))]
    #[test]
    #[should_panic(expected = "node is not in the heap")]
    fn test_remove_absent_is_violation() {
        let mut heap = IndexedHeap::<u32, u32>::new(4, Allocator::Temp);
        heap.enqueue(1, 1);
        heap.remove(&2);
    }
}
