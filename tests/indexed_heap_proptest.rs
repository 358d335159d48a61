use proptest::prelude::*;
use rawkit::{Allocator, IndexedHeap};
use std::collections::HashMap;

const MAX_NODES: usize = 32;

#[derive(Debug, Clone)]
enum Operation {
    Enqueue(u32, i32),
    Dequeue,
    Update(u32, i32),
    Remove(u32),
}

fn operation() -> impl Strategy<Value = Operation> {
    prop_oneof![
        (0u32..48, -100i32..100).prop_map(|(n, p)| Operation::Enqueue(n, p)),
        Just(Operation::Dequeue),
        (0u32..48, -100i32..100).prop_map(|(n, p)| Operation::Update(n, p)),
        (0u32..48).prop_map(Operation::Remove),
    ]
}

proptest! {
    #[test]
    fn test_heap_matches_model(ops in proptest::collection::vec(operation(), 1..300)) {
        let mut heap = IndexedHeap::<u32, i32>::new(MAX_NODES, Allocator::Persistent);
        let mut model: HashMap<u32, i32> = HashMap::new();

        for op in ops {
            match op {
                Operation::Enqueue(node, priority) => {
                    if model.contains_key(&node) {
                        continue;
                    }
                    let accepted = heap.enqueue(node, priority);
                    prop_assert_eq!(accepted, model.len() < MAX_NODES);
                    if accepted {
                        model.insert(node, priority);
                    }
                }
                Operation::Dequeue => {
                    let min = model.values().copied().min();
                    match heap.dequeue() {
                        Some(node) => {
                            let priority = model.remove(&node);
                            prop_assert_eq!(priority, min);
                        }
                        None => prop_assert!(model.is_empty()),
                    }
                }
                Operation::Update(node, priority) => {
                    if let Some(slot) = model.get_mut(&node) {
                        *slot = priority;
                        heap.update_priority(&node, priority);
                    }
                }
                Operation::Remove(node) => {
                    if model.remove(&node).is_some() {
                        heap.remove(&node);
                    }
                }
            }
            prop_assert!(heap.is_valid());
            prop_assert_eq!(heap.len(), model.len());
        }

        for (node, priority) in &model {
            prop_assert_eq!(heap.priority_of(node), Some(*priority));
        }
    }
}

#[test]
fn test_thousand_nodes_dequeue_in_order() {
    let mut heap = IndexedHeap::<u32, f32>::new(1000, Allocator::Persistent);
    for i in 0..1000u32 {
        let priority = if i % 2 == 0 { i as f32 } else { -(i as f32) };
        assert!(heap.enqueue(i, priority));
    }
    assert!(heap.is_valid());

    let mut previous = f32::NEG_INFINITY;
    let mut seen = 0;
    while let Some(node) = heap.dequeue() {
        let priority = if node % 2 == 0 { node as f32 } else { -(node as f32) };
        assert!(priority >= previous, "{priority} after {previous}");
        previous = priority;
        seen += 1;
    }
    assert_eq!(seen, 1000);
}
