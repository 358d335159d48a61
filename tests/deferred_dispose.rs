use rawkit::{
    Allocator, BitSet, DisposeQueue, Fence, IndexedHeap, RawBuffer, Ready, SlotArray,
    SortedPriorityList,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[test]
fn test_fence_holds_memory_until_readers_leave() {
    let fence = Fence::new();
    let mut buffer = RawBuffer::<u64>::new(1024, Allocator::TempJob);
    buffer.iter_mut().enumerate().for_each(|(i, v)| *v = i as u64);

    let view_ptr = buffer.as_ptr() as usize;
    let guard = fence.enter();
    let reader = thread::spawn(move || {
        // SAFETY: the buffer stays allocated until `guard` is dropped.
        let data = unsafe { std::slice::from_raw_parts(view_ptr as *const u64, 1024) };
        let sum: u64 = data.iter().sum();
        drop(guard);
        sum
    });

    let pending = buffer.dispose_after(fence.clone());
    assert_eq!(pending.held(), 1);

    let sum = reader.join().unwrap();
    assert_eq!(sum, (0..1024u64).sum::<u64>());

    let token = pending.wait();
    assert_eq!(token.pending(), 0);
}

#[test]
fn test_join_handle_as_token() {
    let done = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&done);
    let worker = thread::spawn(move || {
        thread::sleep(Duration::from_millis(5));
        flag.store(true, Ordering::Release);
    });

    let slots = SlotArray::<u32>::new(16, Allocator::TempJob);
    let pending = slots.dispose_after(worker);
    assert_eq!(pending.held(), 2);

    let worker = pending.wait();
    assert!(done.load(Ordering::Acquire));
    worker.join().unwrap();
}

#[test]
fn test_heap_and_list_wait_for_fence() {
    let fence = Fence::new();
    let guard = fence.enter();

    let mut heap = IndexedHeap::<u32, i32>::new(8, Allocator::TempJob);
    heap.enqueue(1, 5);
    heap.enqueue(2, 3);
    let mut list = SortedPriorityList::<u32, i32>::new(8, Allocator::TempJob);
    list.add(1, 5);

    let mut heap_pending = heap.dispose_after(fence.clone());
    let mut list_pending = list.dispose_after(fence.clone());
    assert_eq!(heap_pending.held(), 2);
    assert_eq!(list_pending.held(), 2);
    assert!(!heap_pending.poll());
    assert!(!list_pending.poll());

    drop(guard);
    assert!(heap_pending.poll());
    assert!(list_pending.poll());
    assert!(heap_pending.is_disposed());
    assert!(list_pending.is_disposed());
}

#[test]
fn test_queue_collects_completed() {
    let fence = Fence::new();
    let guard = fence.enter();

    let mut queue = DisposeQueue::new();
    queue.push(BitSet::new(256, Allocator::TempJob).dispose_after(fence.clone()));
    queue.push(RawBuffer::<u8>::new(64, Allocator::TempJob).dispose_after(fence.clone()));
    assert_eq!(queue.len(), 2);

    queue.collect();
    assert_eq!(queue.len(), 2);

    drop(guard);
    queue.collect();
    assert!(queue.is_empty());
}

#[test]
fn test_ready_frees_immediately() {
    let mut pending = RawBuffer::<u16>::new(8, Allocator::Temp).dispose_after(Ready);
    assert!(pending.poll());
    assert!(pending.is_disposed());
}

#[test]
fn test_view_disposal_holds_nothing() {
    let mut backing = vec![1u32, 2, 3];
    let ptr = std::ptr::NonNull::new(backing.as_mut_ptr()).unwrap();
    let view = unsafe { RawBuffer::from_raw_parts(ptr, backing.len()) };
    let pending = view.dispose_after(Ready);
    assert_eq!(pending.held(), 0);
    drop(pending);
    assert_eq!(backing, vec![1, 2, 3]);
}
