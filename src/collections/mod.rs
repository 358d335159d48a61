//! Manually allocated containers.
//!
//! Every container is built on [`RawBuffer`]:
//! - `raw_buffer`: fixed-length typed block with an allocator tag
//! - `bit_set`: dynamic bit vector over 64-bit buckets
//! - `slot_array`: stable-index slots with an occupancy bitmap
//! - `indexed_heap`: fixed-capacity min-heap with node lookup
//! - `sorted_priority_list`: item/priority arrays kept sorted

pub mod bit_set;
pub mod indexed_heap;
pub mod raw_buffer;
pub mod slot_array;
pub mod sorted_priority_list;
pub mod unmanaged;

pub use bit_set::{BitSet, DumpError, Ones};
pub use indexed_heap::IndexedHeap;
pub use raw_buffer::RawBuffer;
pub use slot_array::{SlotArray, SlotDebugItem};
pub use sorted_priority_list::SortedPriorityList;
pub use unmanaged::Unmanaged;
