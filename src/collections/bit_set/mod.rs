//! `BitSet`: a dynamic bit vector over 64-bit buckets.
//!
//! Bits live in a [`RawBuffer<u64>`]. The logical bit count need not be a
//! multiple of 64; the bits of the last bucket beyond it are padding and are
//! always zero. The cached tail mask has those padding bits set, which lets
//! [`BitSet::first_zero`] ignore them without a per-bit check.

mod dump;
mod iter;

pub use dump::{DumpError, CONTROL_BYTE};
pub use iter::Ones;

use crate::alloc::{Allocation, Allocator};
use crate::collections::{RawBuffer, Unmanaged};
use crate::concurrency::{Completion, PendingDisposal};
use crate::contract::{contract_assert, contract_index};
use core::fmt;
use core::mem;

const BUCKET_SHIFT: usize = 6;
const INDEX_MASK: usize = 63;

#[inline(always)]
const fn bucket(index: usize) -> usize {
    index >> BUCKET_SHIFT
}

#[inline(always)]
const fn bit_mask(index: usize) -> u64 {
    1u64 << (index & INDEX_MASK)
}

#[inline]
const fn bucket_count(len: usize) -> usize {
    len.div_ceil(64)
}

/// Padding bits of the last bucket for a set of `len` bits.
///
/// An empty set has no real bits at all, so every bit counts as padding.
#[inline]
const fn tail_mask_for(len: usize) -> u64 {
    let used = len & INDEX_MASK;
    if used == 0 {
        if len == 0 {
            u64::MAX
        } else {
            0
        }
    } else {
        !((1u64 << used) - 1)
    }
}

/// A manually allocated bit vector.
pub struct BitSet {
    buckets: RawBuffer<u64>,
    len: usize,
    tail_mask: u64,
}

impl BitSet {
    /// An uncreated bit set with no buckets.
    pub const fn empty() -> Self {
        Self {
            buckets: RawBuffer::empty(),
            len: 0,
            tail_mask: u64::MAX,
        }
    }

    /// Creates a set of `len` bits, all clear.
    pub fn new(len: usize, allocator: Allocator) -> Self {
        Self {
            buckets: RawBuffer::new(bucket_count(len), allocator),
            len,
            tail_mask: tail_mask_for(len),
        }
    }

    /// Copies this set into a new one allocated from `allocator`.
    pub fn clone_in(&self, allocator: Allocator) -> Self {
        Self {
            buckets: self.buckets.clone_in(allocator),
            len: self.len,
            tail_mask: self.tail_mask,
        }
    }

    pub(crate) fn from_buckets(buckets: RawBuffer<u64>, len: usize) -> Self {
        debug_assert_eq!(buckets.len(), bucket_count(len));
        Self {
            buckets,
            len,
            tail_mask: tail_mask_for(len),
        }
    }

    /// Number of addressable bits.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the set has no addressable bits.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of 64-bit buckets.
    #[inline]
    pub fn bucket_len(&self) -> usize {
        self.buckets.len()
    }

    /// The backing buckets.
    #[inline]
    pub fn buckets(&self) -> &[u64] {
        self.buckets.as_slice()
    }

    /// Padding bits of the last bucket.
    #[inline]
    pub fn tail_mask(&self) -> u64 {
        self.tail_mask
    }

    /// The tag the buckets belong to.
    #[inline]
    pub fn allocator(&self) -> Allocator {
        self.buckets.allocator()
    }

    /// Returns `true` unless this is an uncreated [`BitSet::empty`].
    #[inline]
    pub fn is_created(&self) -> bool {
        self.buckets.is_created()
    }

    /// Returns bit `index`.
    #[inline]
    pub fn get(&self, index: usize) -> bool {
        contract_index!(index, self.len);
        // SAFETY: `index < len` implies the bucket exists.
        let word = unsafe { *self.buckets.get_unchecked(bucket(index)) };
        word & bit_mask(index) != 0
    }

    /// Returns bit `index`, or `false` if `index` is out of range.
    #[inline]
    pub fn has(&self, index: usize) -> bool {
        index < self.len && self.get(index)
    }

    /// Sets bit `index` to `value`.
    #[inline]
    pub fn set(&mut self, index: usize, value: bool) {
        contract_index!(index, self.len);
        // SAFETY: `index < len` implies the bucket exists.
        let word = unsafe { self.buckets.get_unchecked_mut(bucket(index)) };
        if value {
            *word |= bit_mask(index);
        } else {
            *word &= !bit_mask(index);
        }
    }

    /// Sets bit `index`.
    #[inline]
    pub fn up(&mut self, index: usize) {
        self.set(index, true);
    }

    /// Clears bit `index`.
    #[inline]
    pub fn down(&mut self, index: usize) {
        self.set(index, false);
    }

    /// Clears `length` bits starting at `start`.
    ///
    /// Boundary buckets are masked; buckets strictly inside the range are
    /// zeroed whole.
    pub fn clear_range(&mut self, start: usize, length: usize) {
        if length == 0 {
            return;
        }
        let end = start + length;
        contract_assert!(
            end <= self.len,
            "range {}..{} is out of range {}",
            start,
            end,
            self.len
        );

        let first = bucket(start);
        let last = bucket(end - 1);
        // Bits below `start` survive in the first bucket.
        let keep_low = bit_mask(start) - 1;
        // Bits at or above `end` survive in the last bucket.
        let keep_high = match end & INDEX_MASK {
            0 => 0,
            used => !((1u64 << used) - 1),
        };

        let words = self.buckets.as_mut_slice();
        if first == last {
            words[first] &= keep_low | keep_high;
        } else {
            words[first] &= keep_low;
            words[last] &= keep_high;
            words[first + 1..last].fill(0);
        }
    }

    /// Clears every bit.
    pub fn clear_all(&mut self) {
        self.buckets.as_mut_slice().fill(0);
    }

    /// Sets every bit. Padding bits stay clear.
    pub fn fill_all(&mut self) {
        let tail_mask = self.tail_mask;
        let words = self.buckets.as_mut_slice();
        words.fill(u64::MAX);
        if let Some(last) = words.last_mut() {
            *last &= !tail_mask;
        }
    }

    /// Number of set bits.
    pub fn count_ones(&self) -> usize {
        self.buckets
            .iter()
            .map(|word| word.count_ones() as usize)
            .sum()
    }

    /// Returns `true` if any bit is set.
    pub fn any_set(&self) -> bool {
        self.buckets.iter().any(|&word| word != 0)
    }

    /// Index of the lowest clear bit, or `None` if every bit is set.
    pub fn first_zero(&self) -> Option<usize> {
        let words = self.buckets.as_slice();
        let (&last_word, full) = words.split_last()?;

        for (i, &word) in full.iter().enumerate() {
            if word != u64::MAX {
                return Some((i << BUCKET_SHIFT) + (!word).trailing_zeros() as usize);
            }
        }

        if last_word | self.tail_mask != u64::MAX {
            return Some((full.len() << BUCKET_SHIFT) + (!last_word).trailing_zeros() as usize);
        }
        None
    }

    /// Index of the lowest set bit, or `None` if no bit is set.
    pub fn first_one(&self) -> Option<usize> {
        self.buckets
            .iter()
            .enumerate()
            .find(|(_, &word)| word != 0)
            .map(|(i, &word)| (i << BUCKET_SHIFT) + word.trailing_zeros() as usize)
    }

    /// Index of the highest set bit, or `None` if no bit is set.
    pub fn last_one(&self) -> Option<usize> {
        self.buckets
            .iter()
            .enumerate()
            .rev()
            .find(|(_, &word)| word != 0)
            .map(|(i, &word)| (i << BUCKET_SHIFT) + 63 - word.leading_zeros() as usize)
    }

    /// `self |= other`. Grows `self` first if `other` is longer.
    pub fn union(&mut self, other: &BitSet) {
        self.ensure_capacity(other.len);
        let words = self.buckets.as_mut_slice();
        for (word, &theirs) in words.iter_mut().zip(other.buckets.iter()) {
            *word |= theirs;
        }
    }

    /// `self &= other`. Buckets beyond `other` are cleared.
    pub fn intersect(&mut self, other: &BitSet) {
        let common = self.bucket_len().min(other.bucket_len());
        let words = self.buckets.as_mut_slice();
        for (word, &theirs) in words[..common].iter_mut().zip(other.buckets.iter()) {
            *word &= theirs;
        }
        words[common..].fill(0);
    }

    /// `self &= !other` over the buckets both sets have.
    pub fn exclude(&mut self, other: &BitSet) {
        let words = self.buckets.as_mut_slice();
        for (word, &theirs) in words.iter_mut().zip(other.buckets.iter()) {
            *word &= !theirs;
        }
    }

    /// Makes sure bit `index` is addressable.
    pub fn ensure_index(&mut self, index: usize) {
        self.ensure_capacity(index + 1);
    }

    /// Makes sure at least `len` bits are addressable.
    ///
    /// Reallocates only when more buckets are needed; existing bits are kept.
    /// The logical length never shrinks.
    pub fn ensure_capacity(&mut self, len: usize) {
        contract_assert!(
            self.allocator().is_owning(),
            "cannot grow a bit set with allocator {:?} and length {}",
            self.allocator(),
            self.len
        );

        let needed = bucket_count(len);
        if needed > self.bucket_len() {
            self.buckets.resize(needed);
            tracing::debug!(from = self.len, to = len, "bit set grown");
        }
        self.len = self.len.max(len);
        self.tail_mask = tail_mask_for(self.len);
    }

    /// Iterates over the indices of set bits in ascending order.
    ///
    /// The set must not change while the iterator is alive; the borrow
    /// checker enforces this.
    #[inline]
    pub fn iter_ones(&self) -> Ones<'_> {
        Ones::new(self.buckets.as_slice())
    }

    /// Collects the indices of set bits into a new buffer.
    ///
    /// Indices are stored as `u32`; the set must stay below `u32::MAX` bits.
    pub fn to_indices(&self, allocator: Allocator) -> RawBuffer<u32> {
        contract_assert!(
            u32::try_from(self.len).is_ok(),
            "bit set of length {} does not fit u32 indices",
            self.len
        );
        #[allow(clippy::cast_possible_truncation)]
        self.map_ones(allocator, |index| index as u32)
    }

    /// Maps the index of every set bit through `convert` into a new buffer.
    pub fn map_ones<U, F>(&self, allocator: Allocator, mut convert: F) -> RawBuffer<U>
    where
        U: Unmanaged,
        F: FnMut(usize) -> U,
    {
        let mut result = RawBuffer::new(self.count_ones(), allocator);
        for (slot, index) in result.iter_mut().zip(self.iter_ones()) {
            *slot = convert(index);
        }
        result
    }

    /// Bytes occupied by the buckets.
    pub fn buckets_size_in_bytes(&self) -> usize {
        self.bucket_len() * mem::size_of::<u64>()
    }

    /// Bytes occupied by the set: header plus buckets.
    pub fn size_in_bytes(&self) -> usize {
        mem::size_of::<Self>() + self.buckets_size_in_bytes()
    }

    /// One `bool` per addressable bit, for inspection.
    pub fn debug_bits(&self) -> Vec<bool> {
        (0..self.len).map(|i| self.get(i)).collect()
    }

    pub(crate) fn into_allocation(self) -> Option<Allocation> {
        self.buckets.into_allocation()
    }

    /// Frees the buckets now.
    pub fn dispose(self) {
        drop(self);
    }

    /// Frees the buckets once `token` completes.
    pub fn dispose_after<C: Completion>(self, token: C) -> PendingDisposal<C> {
        self.buckets.dispose_after(token)
    }
}

impl Default for BitSet {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for BitSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        struct OnesList<'a>(&'a BitSet);

        impl fmt::Debug for OnesList<'_> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_list().entries(self.0.iter_ones()).finish()
            }
        }

        f.debug_struct("BitSet")
            .field("len", &self.len)
            .field("buckets", &self.bucket_len())
            .field("ones", &OnesList(self))
            .finish()
    }
}
