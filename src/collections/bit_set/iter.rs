//! Ascending iteration over set bits.

use core::iter::FusedIterator;

/// Iterator over the indices of set bits, in ascending order.
///
/// Produced by [`BitSet::iter_ones`](super::BitSet::iter_ones). A clone
/// resumes from the same position; call `iter_ones` again for a fresh pass.
#[derive(Debug, Clone)]
pub struct Ones<'a> {
    buckets: &'a [u64],
    bucket_index: usize,
    current: u64,
}

impl<'a> Ones<'a> {
    pub(super) fn new(buckets: &'a [u64]) -> Self {
        Self {
            buckets,
            bucket_index: 0,
            current: buckets.first().copied().unwrap_or(0),
        }
    }
}

impl Iterator for Ones<'_> {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        loop {
            if self.current != 0 {
                let bit = self.current.trailing_zeros() as usize;
                // Clear the lowest set bit.
                self.current &= self.current - 1;
                return Some((self.bucket_index << super::BUCKET_SHIFT) + bit);
            }

            if self.bucket_index + 1 >= self.buckets.len() {
                self.bucket_index = self.buckets.len();
                return None;
            }
            self.bucket_index += 1;
            self.current = self.buckets[self.bucket_index];
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let rest = self.buckets.len().saturating_sub(self.bucket_index + 1);
        let upper = self.current.count_ones() as usize + rest * 64;
        (0, Some(upper))
    }
}

impl FusedIterator for Ones<'_> {}
