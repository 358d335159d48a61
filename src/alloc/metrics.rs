//! Per-allocator allocation counters.
//!
//! Counters are global and relaxed: they are diagnostics, not synchronization.

use crate::alloc::Allocator;
use core::sync::atomic::{AtomicUsize, Ordering};
use serde::{Deserialize, Serialize};

struct AllocatorMetrics {
    allocated_bytes: AtomicUsize,
    allocated_count: AtomicUsize,
    deallocated_bytes: AtomicUsize,
    deallocated_count: AtomicUsize,
}

impl AllocatorMetrics {
    const fn new() -> Self {
        Self {
            allocated_bytes: AtomicUsize::new(0),
            allocated_count: AtomicUsize::new(0),
            deallocated_bytes: AtomicUsize::new(0),
            deallocated_count: AtomicUsize::new(0),
        }
    }
}

static METRICS: [AllocatorMetrics; 4] = [
    AllocatorMetrics::new(),
    AllocatorMetrics::new(),
    AllocatorMetrics::new(),
    AllocatorMetrics::new(),
];

#[inline(always)]
fn slot(allocator: Allocator) -> &'static AllocatorMetrics {
    &METRICS[(allocator.as_raw() - 1) as usize]
}

#[inline(always)]
pub(crate) fn record_alloc(allocator: Allocator, size: usize) {
    let m = slot(allocator);
    m.allocated_count.fetch_add(1, Ordering::Relaxed);
    m.allocated_bytes.fetch_add(size, Ordering::Relaxed);
}

#[inline(always)]
pub(crate) fn record_dealloc(allocator: Allocator, size: usize) {
    let m = slot(allocator);
    m.deallocated_count.fetch_add(1, Ordering::Relaxed);
    m.deallocated_bytes.fetch_add(size, Ordering::Relaxed);
}

/// A point-in-time copy of one allocator's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Total bytes handed out.
    pub allocated_bytes: usize,
    /// Number of allocations.
    pub allocated_count: usize,
    /// Total bytes returned.
    pub deallocated_bytes: usize,
    /// Number of frees.
    pub deallocated_count: usize,
}

impl MetricsSnapshot {
    /// Bytes currently outstanding.
    pub fn live_bytes(&self) -> usize {
        self.allocated_bytes.saturating_sub(self.deallocated_bytes)
    }

    /// Allocations currently outstanding.
    pub fn live_count(&self) -> usize {
        self.allocated_count.saturating_sub(self.deallocated_count)
    }
}

/// Reads the counters of `allocator`.
pub fn snapshot(allocator: Allocator) -> MetricsSnapshot {
    let m = slot(allocator);
    MetricsSnapshot {
        allocated_bytes: m.allocated_bytes.load(Ordering::Relaxed),
        allocated_count: m.allocated_count.load(Ordering::Relaxed),
        deallocated_bytes: m.deallocated_bytes.load(Ordering::Relaxed),
        deallocated_count: m.deallocated_count.load(Ordering::Relaxed),
    }
}
