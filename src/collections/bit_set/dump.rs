//! Binary dump of a [`BitSet`].
//!
//! Layout, all integers little-endian:
//!
//! ```text
//! b'b' | count: u32 | tail_mask: u64 | allocator: i32 | b'b' | buckets: [u64] | b'b'
//! ```
//!
//! `count` is the logical bit count; the bucket count follows from it.

use super::{bucket_count, tail_mask_for, BitSet};
use crate::alloc::Allocator;
use crate::collections::RawBuffer;
use core::fmt;
use std::io::{self, Read, Write};

/// Separator byte framing the header and the bucket block.
pub const CONTROL_BYTE: u8 = b'b';

/// Buckets reserved up front while reading; the rest grow as data arrives.
const PREFETCH_WORDS: usize = 1024;

/// Why a dump could not be read or written.
#[derive(Debug)]
pub enum DumpError {
    /// The underlying reader or writer failed.
    Io(io::Error),
    /// A framing byte was not [`CONTROL_BYTE`].
    ControlByte {
        /// Byte offset of the bad byte.
        offset: usize,
        /// The byte found.
        found: u8,
    },
    /// The stored allocator tag is not a known [`Allocator`].
    UnknownAllocator(i32),
    /// The stored tail mask does not match the stored count.
    TailMask {
        /// Mask implied by the count.
        expected: u64,
        /// Mask found in the dump.
        found: u64,
    },
    /// The last bucket has bits set beyond the logical length.
    PaddingBits,
    /// The set is too long for the 32-bit count field.
    LengthOverflow(usize),
}

impl fmt::Display for DumpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DumpError::Io(err) => write!(f, "bit set dump I/O failed: {err}"),
            DumpError::ControlByte { offset, found } => write!(
                f,
                "expected control byte {:#04x} at offset {offset}, found {found:#04x}",
                CONTROL_BYTE
            ),
            DumpError::UnknownAllocator(raw) => write!(f, "unknown allocator tag {raw}"),
            DumpError::TailMask { expected, found } => write!(
                f,
                "tail mask {found:#018x} does not match expected {expected:#018x}"
            ),
            DumpError::PaddingBits => write!(f, "padding bits beyond the bit count are set"),
            DumpError::LengthOverflow(len) => {
                write!(f, "bit count {len} does not fit the dump header")
            }
        }
    }
}

impl std::error::Error for DumpError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DumpError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for DumpError {
    fn from(err: io::Error) -> Self {
        DumpError::Io(err)
    }
}

struct Cursor<R> {
    inner: R,
    offset: usize,
}

impl<R: Read> Cursor<R> {
    fn bytes<const N: usize>(&mut self) -> io::Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.inner.read_exact(&mut buf)?;
        self.offset += N;
        Ok(buf)
    }

    fn control(&mut self) -> Result<(), DumpError> {
        let offset = self.offset;
        let [found] = self.bytes::<1>()?;
        if found != CONTROL_BYTE {
            return Err(DumpError::ControlByte { offset, found });
        }
        Ok(())
    }
}

impl BitSet {
    /// Writes the dump of this set to `writer`.
    pub fn write_dump<W: Write>(&self, mut writer: W) -> Result<(), DumpError> {
        let count = u32::try_from(self.len).map_err(|_| DumpError::LengthOverflow(self.len))?;

        writer.write_all(&[CONTROL_BYTE])?;
        writer.write_all(&count.to_le_bytes())?;
        writer.write_all(&self.tail_mask.to_le_bytes())?;
        writer.write_all(&self.allocator().as_raw().to_le_bytes())?;
        writer.write_all(&[CONTROL_BYTE])?;
        for word in self.buckets.iter() {
            writer.write_all(&word.to_le_bytes())?;
        }
        writer.write_all(&[CONTROL_BYTE])?;
        Ok(())
    }

    /// Reads a dump written by [`BitSet::write_dump`] into a new set
    /// allocated from `allocator`.
    ///
    /// The stored allocator tag is validated but not reused.
    pub fn read_dump<R: Read>(reader: R, allocator: Allocator) -> Result<BitSet, DumpError> {
        let mut cursor = Cursor {
            inner: reader,
            offset: 0,
        };

        cursor.control()?;
        let len = u32::from_le_bytes(cursor.bytes()?) as usize;
        let tail_mask = u64::from_le_bytes(cursor.bytes()?);
        let raw_tag = i32::from_le_bytes(cursor.bytes()?);
        cursor.control()?;

        if Allocator::from_raw(raw_tag).is_none() {
            return Err(DumpError::UnknownAllocator(raw_tag));
        }
        let expected = tail_mask_for(len);
        if tail_mask != expected {
            return Err(DumpError::TailMask {
                expected,
                found: tail_mask,
            });
        }

        // The header is untrusted: buckets are only allocated from the
        // allocator once every one of them has actually been read.
        let count = bucket_count(len);
        let mut words = Vec::with_capacity(count.min(PREFETCH_WORDS));
        for _ in 0..count {
            words.push(u64::from_le_bytes(cursor.bytes()?));
        }
        cursor.control()?;

        if words.last().is_some_and(|&w| w & tail_mask != 0) {
            return Err(DumpError::PaddingBits);
        }

        tracing::debug!(len, "bit set dump read");
        Ok(BitSet::from_buckets(RawBuffer::move_from(&mut words, allocator), len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> BitSet {
        let mut set = BitSet::new(70, Allocator::Temp);
        set.up(0);
        set.up(65);
        set
    }

    #[test]
    fn test_layout() {
        let mut bytes = Vec::new();
        sample().write_dump(&mut bytes).unwrap();

        assert_eq!(bytes.len(), 1 + 4 + 8 + 4 + 1 + 2 * 8 + 1);
        assert_eq!(bytes[0], CONTROL_BYTE);
        assert_eq!(&bytes[1..5], &70u32.to_le_bytes());
        assert_eq!(&bytes[5..13], &tail_mask_for(70).to_le_bytes());
        assert_eq!(&bytes[13..17], &Allocator::Temp.as_raw().to_le_bytes());
        assert_eq!(bytes[17], CONTROL_BYTE);
        assert_eq!(&bytes[18..26], &1u64.to_le_bytes());
        assert_eq!(&bytes[26..34], &2u64.to_le_bytes());
        assert_eq!(bytes[34], CONTROL_BYTE);
    }

    #[test]
    fn test_read_back() {
        let mut bytes = Vec::new();
        sample().write_dump(&mut bytes).unwrap();
        let set = BitSet::read_dump(bytes.as_slice(), Allocator::Persistent).unwrap();
        assert_eq!(set.len(), 70);
        assert_eq!(set.allocator(), Allocator::Persistent);
        assert_eq!(set.iter_ones().collect::<Vec<_>>(), vec![0, 65]);
    }

    #[test]
    fn test_bad_control_byte() {
        let mut bytes = Vec::new();
        sample().write_dump(&mut bytes).unwrap();
        bytes[17] = b'x';
        let err = BitSet::read_dump(bytes.as_slice(), Allocator::Temp).unwrap_err();
        assert!(matches!(
            err,
            DumpError::ControlByte {
                offset: 17,
                found: b'x'
            }
        ));
    }

    #[test]
    fn test_unknown_allocator() {
        let mut bytes = Vec::new();
        sample().write_dump(&mut bytes).unwrap();
        bytes[13..17].copy_from_slice(&9i32.to_le_bytes());
        let err = BitSet::read_dump(bytes.as_slice(), Allocator::Temp).unwrap_err();
        assert!(matches!(err, DumpError::UnknownAllocator(9)));
    }

    #[test]
    fn test_tail_mask_mismatch() {
        let mut bytes = Vec::new();
        sample().write_dump(&mut bytes).unwrap();
        bytes[5..13].copy_from_slice(&0u64.to_le_bytes());
        let err = BitSet::read_dump(bytes.as_slice(), Allocator::Temp).unwrap_err();
        assert!(matches!(err, DumpError::TailMask { found: 0, .. }));
    }

    #[test]
    fn test_padding_bits_rejected() {
        let mut bytes = Vec::new();
        sample().write_dump(&mut bytes).unwrap();
        bytes[26..34].copy_from_slice(&u64::MAX.to_le_bytes());
        let err = BitSet::read_dump(bytes.as_slice(), Allocator::Temp).unwrap_err();
        assert!(matches!(err, DumpError::PaddingBits));
    }

    #[test]
    fn test_oversized_header_without_body_is_io() {
        let mut bytes = vec![CONTROL_BYTE];
        bytes.extend_from_slice(&u32::MAX.to_le_bytes());
        bytes.extend_from_slice(&tail_mask_for(u32::MAX as usize).to_le_bytes());
        bytes.extend_from_slice(&Allocator::Temp.as_raw().to_le_bytes());
        bytes.push(CONTROL_BYTE);

        let err = BitSet::read_dump(bytes.as_slice(), Allocator::Temp).unwrap_err();
        assert!(matches!(err, DumpError::Io(_)));
    }

    #[test]
    fn test_truncated_is_io() {
        let mut bytes = Vec::new();
        sample().write_dump(&mut bytes).unwrap();
        bytes.truncate(20);
        let err = BitSet::read_dump(bytes.as_slice(), Allocator::Temp).unwrap_err();
        assert!(matches!(err, DumpError::Io(_)));
        assert!(std::error::Error::source(&err).is_some());
    }
}
