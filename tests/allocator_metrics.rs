//! Allocator counters are process-wide, so this file holds a single test.

use rawkit::alloc::metrics;
use rawkit::{Allocator, BitSet, IndexedHeap, RawBuffer, SlotArray, SortedPriorityList};

#[test]
fn test_every_container_returns_its_memory() {
    let before = metrics::snapshot(Allocator::TempJob);

    {
        let mut buffer = RawBuffer::<u64>::new(100, Allocator::TempJob);
        buffer.resize(300);
        let mut set = BitSet::new(65, Allocator::TempJob);
        set.ensure_capacity(1000);
        let mut slots = SlotArray::<u32>::new(1, Allocator::TempJob);
        for i in 0..40 {
            slots.insert(i);
        }
        let mut heap = IndexedHeap::<u32, f32>::new(16, Allocator::TempJob);
        heap.enqueue(1, 1.0);
        let mut list = SortedPriorityList::<u32, u32>::new(0, Allocator::TempJob);
        for i in 0..20 {
            list.add(i, 20 - i);
        }

        let during = metrics::snapshot(Allocator::TempJob);
        assert!(during.live_bytes() > before.live_bytes());
        assert_eq!(during.live_count(), before.live_count() + 8);

        set.dispose();
        list.dispose();
    }

    let mut moved = vec![7u32; 32];
    let adopted = RawBuffer::move_from(&mut moved, Allocator::TempJob);
    assert!(moved.is_empty());
    assert_eq!(adopted.len(), 32);
    drop(adopted);

    let after = metrics::snapshot(Allocator::TempJob);
    assert_eq!(after.live_bytes(), before.live_bytes());
    assert_eq!(after.live_count(), before.live_count());
    assert!(after.allocated_count > before.allocated_count);
}
