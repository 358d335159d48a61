//! `RawBuffer`: a fixed-length block of unmanaged elements.
//!
//! The buffer owns exactly `len * size_of::<T>()` bytes obtained from its
//! [`Allocator`]. It never grows implicitly: [`RawBuffer::resize`] always
//! allocates a new block, copies the surviving prefix and frees the old one.
//!
//! Indexing through `Index`/`IndexMut` is contract-checked in checked builds
//! and raw pointer arithmetic in unchecked builds (see [`crate::contract`]).
//! [`RawBuffer::get`] and [`RawBuffer::get_mut`] are always bounds-checked.

use crate::alloc::{metrics, Allocation, Allocator};
use crate::collections::Unmanaged;
use crate::concurrency::{Completion, PendingDisposal};
use crate::contract::{self, contract_assert, contract_index};
use core::alloc::Layout;
use core::fmt;
use core::marker::PhantomData;
use core::mem::{self, ManuallyDrop};
use core::ops::{Index, IndexMut};
use core::ptr::{self, NonNull};
use core::slice;
use zerocopy::{AsBytes, FromBytes};

/// A manually allocated, fixed-length array of `T`.
pub struct RawBuffer<T: Unmanaged> {
    ptr: Option<NonNull<T>>,
    len: usize,
    allocator: Allocator,
    _marker: PhantomData<T>,
}

// SAFETY: the buffer uniquely owns (or, for views, exclusively borrows) its
// elements, like a `Box<[T]>`.
unsafe impl<T: Unmanaged + Send> Send for RawBuffer<T> {}
unsafe impl<T: Unmanaged + Sync> Sync for RawBuffer<T> {}

#[cold]
#[track_caller]
fn capacity_overflow() -> ! {
    panic!("capacity overflow")
}

impl<T: Unmanaged> RawBuffer<T> {
    #[inline]
    fn layout(len: usize) -> Layout {
        match Layout::array::<T>(len) {
            Ok(layout) => layout,
            Err(_) => capacity_overflow(),
        }
    }

    fn allocate(len: usize, allocator: Allocator, zeroed: bool) -> Self {
        let ptr = allocator.allocate(Self::layout(len), zeroed).cast::<T>();
        Self {
            ptr: Some(ptr),
            len,
            allocator,
            _marker: PhantomData,
        }
    }

    /// An uncreated buffer: no memory, length zero, allocator `None`.
    pub const fn empty() -> Self {
        Self {
            ptr: None,
            len: 0,
            allocator: Allocator::None,
            _marker: PhantomData,
        }
    }

    /// Allocates `len` zeroed elements from `allocator`.
    pub fn new(len: usize, allocator: Allocator) -> Self {
        Self::allocate(len, allocator, true)
    }

    /// Allocates `len` elements from `allocator` without initializing them.
    ///
    /// # Safety
    /// Every element must be written before it is read through any accessor
    /// (`Index`, `get`, `as_slice`, iteration, `to_vec`, ...).
    pub unsafe fn new_uninit(len: usize, allocator: Allocator) -> Self {
        Self::allocate(len, allocator, false)
    }

    /// Allocates a copy of `values` from `allocator`.
    pub fn from_slice(values: &[T], allocator: Allocator) -> Self {
        let buffer = Self::allocate(values.len(), allocator, false);
        // SAFETY: the fresh block holds exactly `values.len()` elements and
        // does not overlap `values`.
        unsafe { ptr::copy_nonoverlapping(values.as_ptr(), buffer.as_ptr_mut_raw(), values.len()) };
        buffer
    }

    /// Wraps externally owned memory as a non-owning view.
    ///
    /// The view has allocator [`Allocator::None`]; dropping or disposing it
    /// frees nothing and it cannot be resized.
    ///
    /// # Safety
    /// `ptr` must be valid for reads and writes of `len` initialized elements
    /// for as long as the view is used, and nothing else may access that
    /// memory in the meantime.
    pub unsafe fn from_raw_parts(ptr: NonNull<T>, len: usize) -> Self {
        Self {
            ptr: Some(ptr),
            len,
            allocator: Allocator::None,
            _marker: PhantomData,
        }
    }

    /// Adopts the backing memory of `list`, leaving it empty.
    ///
    /// The buffer's block is always exactly `len` elements, so a list whose
    /// capacity equals its length is adopted in place. A list with spare
    /// capacity is shrunk first, which may reallocate and move the
    /// elements; call [`Vec::shrink_to_fit`] beforehand to pay that cost
    /// up front. The block is then accounted to `allocator`.
    pub fn move_from(list: &mut Vec<T>, allocator: Allocator) -> Self {
        contract_assert!(
            allocator.is_owning(),
            "cannot move a list into a non-owning buffer"
        );

        let boxed = mem::take(list).into_boxed_slice();
        let len = boxed.len();
        // SAFETY: `Box::into_raw` never returns null.
        let ptr = unsafe { NonNull::new_unchecked(Box::into_raw(boxed).cast::<T>()) };

        let size = Self::layout(len).size();
        if size != 0 {
            metrics::record_alloc(allocator, size);
        }

        Self {
            ptr: Some(ptr),
            len,
            allocator,
            _marker: PhantomData,
        }
    }

    /// Copies this buffer into a new one allocated from `allocator`.
    pub fn clone_in(&self, allocator: Allocator) -> Self {
        Self::from_slice(self.as_slice(), allocator)
    }

    /// Number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the buffer holds no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns `true` unless this is an uncreated [`RawBuffer::empty`].
    #[inline]
    pub fn is_created(&self) -> bool {
        self.ptr.is_some()
    }

    /// The tag this buffer's memory belongs to.
    #[inline]
    pub fn allocator(&self) -> Allocator {
        self.allocator
    }

    /// Raw pointer to the first element.
    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.ptr.unwrap_or(NonNull::dangling()).as_ptr()
    }

    /// Mutable raw pointer to the first element.
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.as_ptr_mut_raw()
    }

    #[inline]
    fn as_ptr_mut_raw(&self) -> *mut T {
        self.ptr.unwrap_or(NonNull::dangling()).as_ptr()
    }

    /// The elements as a slice.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: the pointer is valid (or dangling with `len == 0`) for
        // `len` elements.
        unsafe { slice::from_raw_parts(self.as_ptr(), self.len) }
    }

    /// The elements as a mutable slice.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: as in `as_slice`, and `&mut self` is exclusive.
        unsafe { slice::from_raw_parts_mut(self.as_ptr_mut_raw(), self.len) }
    }

    /// Returns the element at `index`, or `None` if out of range.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.as_slice().get(index)
    }

    /// Returns the element at `index` mutably, or `None` if out of range.
    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.as_mut_slice().get_mut(index)
    }

    /// Returns the element at `index` without any check.
    ///
    /// # Safety
    /// `index < self.len()`.
    #[inline]
    pub unsafe fn get_unchecked(&self, index: usize) -> &T {
        &*self.as_ptr().add(index)
    }

    /// Returns the element at `index` mutably without any check.
    ///
    /// # Safety
    /// `index < self.len()`.
    #[inline]
    pub unsafe fn get_unchecked_mut(&mut self, index: usize) -> &mut T {
        &mut *self.as_ptr_mut_raw().add(index)
    }

    /// Iterates over the elements.
    #[inline]
    pub fn iter(&self) -> slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    /// Iterates mutably over the elements.
    #[inline]
    pub fn iter_mut(&mut self) -> slice::IterMut<'_, T> {
        self.as_mut_slice().iter_mut()
    }

    /// Copies the elements into a `Vec`.
    pub fn to_vec(&self) -> Vec<T> {
        self.as_slice().to_vec()
    }

    /// Reallocates to `new_len` elements, zero-filling any grown tail.
    ///
    /// Always allocates a fresh block: the first `min(old, new)` elements are
    /// copied over and the old block is freed.
    pub fn resize(&mut self, new_len: usize) {
        self.reallocate(new_len, true);
    }

    /// Reallocates to `new_len` elements, leaving any grown tail
    /// uninitialized.
    ///
    /// # Safety
    /// Elements at `old_len..new_len` must be written before they are read.
    pub unsafe fn resize_uninit(&mut self, new_len: usize) {
        self.reallocate(new_len, false);
    }

    fn reallocate(&mut self, new_len: usize, zero_tail: bool) {
        contract_assert!(
            self.allocator.is_owning(),
            "cannot resize a buffer with allocator {:?}",
            self.allocator
        );

        let old_len = self.len;
        let new_ptr = self
            .allocator
            .allocate(Self::layout(new_len), false)
            .cast::<T>();
        let kept = old_len.min(new_len);

        // SAFETY: both blocks hold at least `kept` elements and are distinct;
        // the tail `kept..new_len` lies inside the new block.
        unsafe {
            ptr::copy_nonoverlapping(self.as_ptr(), new_ptr.as_ptr(), kept);
            if zero_tail && new_len > kept {
                ptr::write_bytes(new_ptr.as_ptr().add(kept), 0, new_len - kept);
            }
        }

        self.free_block();
        self.ptr = Some(new_ptr);
        self.len = new_len;

        tracing::debug!(from = old_len, to = new_len, allocator = ?self.allocator, "raw buffer resized");
    }

    fn free_block(&mut self) {
        if let Some(ptr) = self.ptr.take() {
            // SAFETY: an owning buffer's block came from `allocate` with this
            // layout; views are skipped by `deallocate`.
            unsafe {
                self.allocator
                    .deallocate(ptr.cast::<u8>(), Self::layout(self.len));
            }
        }
    }

    /// Hands the block over as an [`Allocation`] without freeing it.
    ///
    /// Returns `None` for uncreated buffers and non-owning views.
    pub fn into_allocation(self) -> Option<Allocation> {
        let this = ManuallyDrop::new(self);
        let ptr = this.ptr?;
        if !this.allocator.is_owning() {
            return None;
        }
        // SAFETY: `this` is never dropped, so the block has exactly one owner.
        Some(unsafe {
            Allocation::from_raw_parts(ptr.cast::<u8>(), Self::layout(this.len), this.allocator)
        })
    }

    /// Frees the buffer now.
    pub fn dispose(self) {
        drop(self);
    }

    /// Frees the buffer once `token` completes.
    pub fn dispose_after<C: Completion>(self, token: C) -> PendingDisposal<C> {
        PendingDisposal::new(self.into_allocation().into_iter().collect(), token)
    }
}

impl<T: Unmanaged + AsBytes> RawBuffer<T> {
    /// The elements as raw bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        self.as_slice().as_bytes()
    }

    /// Reads a `U` stored at the byte offset of element `index`.
    ///
    /// The byte range `index * size_of::<T>() .. + size_of::<U>()` must lie
    /// inside the buffer. This check holds in every build.
    pub fn reinterpret_read<U: FromBytes>(&self, index: usize) -> U {
        let start = index.saturating_mul(mem::size_of::<T>());
        let tail = self.as_bytes().get(start..).unwrap_or(&[]);
        match U::read_from_prefix(tail) {
            Some(value) => value,
            None => contract::violation(format_args!(
                "byte range {}..{} must fall inside {} bytes",
                start,
                start.saturating_add(mem::size_of::<U>()),
                self.len * mem::size_of::<T>()
            )),
        }
    }
}

impl<T: Unmanaged + AsBytes + FromBytes> RawBuffer<T> {
    /// The elements as mutable raw bytes.
    #[inline]
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        self.as_mut_slice().as_bytes_mut()
    }

    /// Writes `value` at the byte offset of element `index`.
    ///
    /// Same range rule as [`RawBuffer::reinterpret_read`].
    pub fn reinterpret_write<U: AsBytes>(&mut self, index: usize, value: &U) {
        let start = index.saturating_mul(mem::size_of::<T>());
        let byte_len = self.len * mem::size_of::<T>();
        let written = match self.as_bytes_mut().get_mut(start..) {
            Some(tail) => value.write_to_prefix(tail),
            None => None,
        };
        if written.is_none() {
            contract::violation(format_args!(
                "byte range {}..{} must fall inside {} bytes",
                start,
                start.saturating_add(mem::size_of_val(value)),
                byte_len
            ));
        }
    }
}

impl<T: Unmanaged> Drop for RawBuffer<T> {
    fn drop(&mut self) {
        self.free_block();
    }
}

impl<T: Unmanaged> Default for RawBuffer<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: Unmanaged> Index<usize> for RawBuffer<T> {
    type Output = T;

    #[inline]
    fn index(&self, index: usize) -> &T {
        contract_index!(index, self.len);
        // SAFETY: in range in checked builds; the caller's contract otherwise.
        unsafe { self.get_unchecked(index) }
    }
}

impl<T: Unmanaged> IndexMut<usize> for RawBuffer<T> {
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut T {
        contract_index!(index, self.len);
        // SAFETY: in range in checked builds; the caller's contract otherwise.
        unsafe { self.get_unchecked_mut(index) }
    }
}

impl<'a, T: Unmanaged> IntoIterator for &'a RawBuffer<T> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T: Unmanaged> IntoIterator for &'a mut RawBuffer<T> {
    type Item = &'a mut T;
    type IntoIter = slice::IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<T: Unmanaged + fmt::Debug> fmt::Debug for RawBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawBuffer")
            .field("len", &self.len)
            .field("allocator", &self.allocator)
            .field("items", &self.as_slice())
            .finish()
    }
}
