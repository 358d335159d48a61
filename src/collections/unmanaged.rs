//! The element bound shared by every container.

use zerocopy::FromZeroes;

/// A fixed-layout, bitwise-copyable type whose all-zero bit pattern is a
/// valid value.
///
/// Containers copy elements with `memcpy`, clear them with `memset(0)` and
/// never run destructors, so nothing with owned resources qualifies.
/// Implemented for every `Copy + FromZeroes + 'static` type; derive
/// `zerocopy::FromZeroes` on your own plain-data structs.
pub trait Unmanaged: Copy + FromZeroes + 'static {}

impl<T: Copy + FromZeroes + 'static> Unmanaged for T {}
