//! Read/write buffer shapes for I/O operations.
//!
//! Each comes in a borrowed-slice flavor (the common case) and an inline
//! fixed flavor (small, fixed-size transfers that would otherwise force a
//! heap allocation or a lifetime the caller doesn't want to carry — e.g. a
//! literal byte string written once). Non-goal per vectored
//! I/O, so there is exactly one slice here, not an iovec array.

/// Fixed inline capacity for the non-borrowed buffer variants. Chosen to
/// comfortably hold small protocol fixed messages (pings, short replies)
/// without an allocation.
pub const INLINE_CAPACITY: usize = 32;

/// A buffer to read into.
pub enum ReadBuffer<'a> {
    /// Read into caller-owned memory.
    Slice(&'a mut [u8]),
    /// Read into an inline fixed buffer the completion owns itself.
    Inline([u8; INLINE_CAPACITY]),
}

impl<'a> ReadBuffer<'a> {
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        match self {
            ReadBuffer::Slice(s) => s,
            ReadBuffer::Inline(arr) => arr.as_mut_slice(),
        }
    }
}

/// A buffer to write from.
pub enum WriteBuffer<'a> {
    /// Write from caller-owned memory.
    Slice(&'a [u8]),
    /// Write from an inline fixed buffer with an explicit length — the
    /// array itself is always `INLINE_CAPACITY` bytes, but only the first
    /// `len` are meaningful ("inline variant carries an
    /// explicit length").
    Inline { bytes: [u8; INLINE_CAPACITY], len: usize },
}

impl<'a> WriteBuffer<'a> {
    pub fn as_slice(&self) -> &[u8] {
        match self {
            WriteBuffer::Slice(s) => s,
            WriteBuffer::Inline { bytes, len } => &bytes[..*len],
        }
    }

    /// Build an inline write buffer from a short byte slice.
    ///
    /// # Panics
    /// Panics if `data.len() > INLINE_CAPACITY` — callers with larger
    /// payloads should use `WriteBuffer::Slice` instead.
    pub fn inline(data: &[u8]) -> Self {
        assert!(data.len() <= INLINE_CAPACITY, "inline write buffer overflow");
        let mut bytes = [0u8; INLINE_CAPACITY];
        bytes[..data.len()].copy_from_slice(data);
        WriteBuffer::Inline {
            bytes,
            len: data.len(),
        }
    }
}
