//! Bounds-checked sequential access to fixed-size byte buffers.
//!
//! The protocol mixes byte orders across fields, so every multi-byte
//! access names its [`Endian`] explicitly. Reads and writes that would
//! cross the end of the buffer fail with [`RdpError::OutOfBounds`] and
//! leave the position where it was.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{RdpError, Result};

// ── Endian ───────────────────────────────────────────────────────

/// Byte order of a single multi-byte field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

// ── ByteReader ───────────────────────────────────────────────────

/// Sequential reader over an owned, immutable byte buffer.
///
/// Blobs are returned as [`Bytes`] slices of the original buffer, so
/// handing a body to the next decoding stage does not copy.
#[derive(Debug, Clone)]
pub struct ByteReader {
    buf: Bytes,
    len: usize,
}

impl ByteReader {
    pub fn new(buf: impl Into<Bytes>) -> Self {
        let buf = buf.into();
        let len = buf.len();
        Self { buf, len }
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.len - self.buf.remaining()
    }

    /// Bytes left before the end of the buffer.
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    pub fn is_empty(&self) -> bool {
        !self.buf.has_remaining()
    }

    fn ensure(&self, needed: usize) -> Result<()> {
        if self.buf.remaining() < needed {
            return Err(RdpError::OutOfBounds {
                needed,
                remaining: self.buf.remaining(),
            });
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        Ok(self.buf.get_u8())
    }

    pub fn read_u16(&mut self, endian: Endian) -> Result<u16> {
        self.ensure(2)?;
        Ok(match endian {
            Endian::Little => self.buf.get_u16_le(),
            Endian::Big => self.buf.get_u16(),
        })
    }

    /// Take the next `n` bytes as a zero-copy slice.
    pub fn read_blob(&mut self, n: usize) -> Result<Bytes> {
        self.ensure(n)?;
        Ok(self.buf.split_to(n))
    }

    /// Advance past `n` bytes without inspecting them.
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.ensure(n)?;
        self.buf.advance(n);
        Ok(())
    }
}

// ── ByteWriter ───────────────────────────────────────────────────

/// Sequential writer into a zero-filled buffer of fixed size.
///
/// The buffer never grows: outbound messages have fixed layouts, so a
/// write past the end is a logic error surfaced as `OutOfBounds`.
#[derive(Debug)]
pub struct ByteWriter {
    buf: BytesMut,
    pos: usize,
}

impl ByteWriter {
    /// A writer over `size` zero bytes.
    pub fn with_size(size: usize) -> Self {
        Self {
            buf: BytesMut::zeroed(size),
            pos: 0,
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn slot(&mut self, needed: usize) -> Result<&mut [u8]> {
        if self.remaining() < needed {
            return Err(RdpError::OutOfBounds {
                needed,
                remaining: self.remaining(),
            });
        }
        let start = self.pos;
        self.pos += needed;
        Ok(&mut self.buf[start..start + needed])
    }

    pub fn write_u8(&mut self, v: u8) -> Result<()> {
        self.slot(1)?.put_u8(v);
        Ok(())
    }

    pub fn write_u16(&mut self, v: u16, endian: Endian) -> Result<()> {
        let mut slot = self.slot(2)?;
        match endian {
            Endian::Little => slot.put_u16_le(v),
            Endian::Big => slot.put_u16(v),
        }
        Ok(())
    }

    /// Freeze the whole buffer, including any unwritten tail.
    pub fn finish(self) -> Bytes {
        self.buf.freeze()
    }
}

// ── Tests ────────────────────────────────────────────────────────
