//! Allocator tags, raw blocks and allocation accounting.

pub mod allocator;
pub mod metrics;

pub use allocator::{Allocation, Allocator};
pub use metrics::MetricsSnapshot;
