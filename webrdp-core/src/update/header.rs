//! Fast-path update header.
//!
//! ```text
//! updateHeader      u8   bits 0-3 code, bits 4-5 fragmentation, bits 6-7 compression
//! compressionFlags  u8   only when compression has the "used" bit
//! size              u16  little-endian body length
//! ```

use std::fmt;

use bytes::Bytes;

use crate::cursor::{ByteReader, ByteWriter, Endian};
use crate::error::{RdpError, Result};

/// Compression bit signalling that a `compressionFlags` byte follows.
pub const COMPRESSION_USED: u8 = 0x2;

/// Fragmentation value of a self-contained update.
pub const FRAGMENT_SINGLE: u8 = 0x0;

// ── UpdateCode ───────────────────────────────────────────────────

/// Every update code the fast-path output protocol defines.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateCode {
    Orders = 0x0,
    Bitmap = 0x1,
    Palette = 0x2,
    Synchronize = 0x3,
    SurfaceCommands = 0x4,
    PointerNull = 0x5,
    PointerDefault = 0x6,
    PointerPosition = 0x8,
    ColorPointer = 0x9,
    CachedPointer = 0xA,
    NewPointer = 0xB,
    LargePointer = 0xC,
}

impl TryFrom<u8> for UpdateCode {
    type Error = RdpError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x0 => Ok(UpdateCode::Orders),
            0x1 => Ok(UpdateCode::Bitmap),
            0x2 => Ok(UpdateCode::Palette),
            0x3 => Ok(UpdateCode::Synchronize),
            0x4 => Ok(UpdateCode::SurfaceCommands),
            0x5 => Ok(UpdateCode::PointerNull),
            0x6 => Ok(UpdateCode::PointerDefault),
            0x8 => Ok(UpdateCode::PointerPosition),
            0x9 => Ok(UpdateCode::ColorPointer),
            0xA => Ok(UpdateCode::CachedPointer),
            0xB => Ok(UpdateCode::NewPointer),
            0xC => Ok(UpdateCode::LargePointer),
            _ => Err(RdpError::UnknownUpdate(value)),
        }
    }
}

impl fmt::Display for UpdateCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// ── UpdateKind ───────────────────────────────────────────────────

/// How the session must treat an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateKind {
    /// Decode and paint.
    Bitmap,
    /// Pointer style or pointer cache update; acknowledged, nothing to do.
    PointerAck(UpdateCode),
    /// Defined by the protocol but not handled by this client.
    Unsupported(UpdateCode),
    /// Not a code the protocol defines.
    Unknown(u8),
}

// ── UpdateHeader ─────────────────────────────────────────────────

/// Header prefixing every inbound update message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateHeader {
    code: u8,
    fragmentation: u8,
    compression: u8,
    compression_flags: Option<u8>,
    size: u16,
}

impl UpdateHeader {
    /// An uncompressed, unfragmented header.
    pub fn new(code: u8, size: u16) -> Self {
        Self {
            code: code & 0x0F,
            fragmentation: FRAGMENT_SINGLE,
            compression: 0,
            compression_flags: None,
            size,
        }
    }

    /// Mark the header as carrying a compressed body.
    pub fn with_compression(mut self, flags: u8) -> Self {
        self.compression = COMPRESSION_USED;
        self.compression_flags = Some(flags);
        self
    }

    pub fn with_fragmentation(mut self, fragmentation: u8) -> Self {
        self.fragmentation = fragmentation & 0x03;
        self
    }

    pub fn decode(r: &mut ByteReader) -> Result<Self> {
        let header = r.read_u8()?;
        let code = header & 0x0F;
        let fragmentation = (header >> 4) & 0x03;
        let compression = (header >> 6) & 0x03;

        let compression_flags = if compression & COMPRESSION_USED != 0 {
            Some(r.read_u8()?)
        } else {
            None
        };

        let size = r.read_u16(Endian::Little)?;

        Ok(Self {
            code,
            fragmentation,
            compression,
            compression_flags,
            size,
        })
    }

    /// Bytes the header occupies on the wire.
    pub fn encoded_len(&self) -> usize {
        if self.compression_flags.is_some() { 4 } else { 3 }
    }

    pub fn encode(&self) -> Result<Bytes> {
        let mut w = ByteWriter::with_size(self.encoded_len());
        w.write_u8(self.code | (self.fragmentation << 4) | (self.compression << 6))?;
        if let Some(flags) = self.compression_flags {
            w.write_u8(flags)?;
        }
        w.write_u16(self.size, Endian::Little)?;
        Ok(w.finish())
    }

    /// Raw 4-bit update code.
    pub fn update_code(&self) -> u8 {
        self.code
    }

    pub fn fragmentation(&self) -> u8 {
        self.fragmentation
    }

    pub fn compression_flags(&self) -> Option<u8> {
        self.compression_flags
    }

    /// Body length in bytes.
    pub fn size(&self) -> u16 {
        self.size
    }

    pub fn is_compressed(&self) -> bool {
        self.compression & COMPRESSION_USED != 0
    }

    pub fn is_fragmented(&self) -> bool {
        self.fragmentation != FRAGMENT_SINGLE
    }

    pub fn is_bitmap(&self) -> bool {
        self.code == UpdateCode::Bitmap as u8
    }

    pub fn is_color(&self) -> bool {
        self.code == UpdateCode::ColorPointer as u8
    }

    pub fn is_pointer_default(&self) -> bool {
        self.code == UpdateCode::PointerDefault as u8
    }

    pub fn is_pointer_null(&self) -> bool {
        self.code == UpdateCode::PointerNull as u8
    }

    /// Classify the update code. Compression is reported separately by
    /// [`is_compressed`](Self::is_compressed).
    pub fn kind(&self) -> UpdateKind {
        match UpdateCode::try_from(self.code) {
            Ok(UpdateCode::Bitmap) => UpdateKind::Bitmap,
            Ok(
                code @ (UpdateCode::ColorPointer
                | UpdateCode::PointerDefault
                | UpdateCode::PointerNull),
            ) => UpdateKind::PointerAck(code),
            Ok(
                code @ (UpdateCode::Orders
                | UpdateCode::Palette
                | UpdateCode::Synchronize
                | UpdateCode::SurfaceCommands
                | UpdateCode::PointerPosition
                | UpdateCode::CachedPointer
                | UpdateCode::NewPointer
                | UpdateCode::LargePointer),
            ) => UpdateKind::Unsupported(code),
            Err(_) => UpdateKind::Unknown(self.code),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_all_codes() {
        for code in 0u8..=0x0F {
            for size in [0u16, 1, 0x1234, u16::MAX] {
                let header = UpdateHeader::new(code, size);
                let bytes = header.encode().unwrap();
                assert_eq!(bytes.len(), 3);
                let decoded = UpdateHeader::decode(&mut ByteReader::new(bytes)).unwrap();
                assert_eq!(decoded, header);
                assert_eq!(decoded.update_code(), code);
                assert_eq!(decoded.size(), size);
            }
        }
    }

    #[test]
    fn roundtrip_compressed() {
        let header = UpdateHeader::new(0x1, 42).with_compression(0x21);
        let bytes = header.encode().unwrap();
        assert_eq!(&bytes[..], &[0x81, 0x21, 42, 0]);
        let decoded = UpdateHeader::decode(&mut ByteReader::new(bytes)).unwrap();
        assert!(decoded.is_compressed());
        assert_eq!(decoded.compression_flags(), Some(0x21));
        assert_eq!(decoded.size(), 42);
    }

    #[test]
    fn classification_reference_table() {
        // (code, bitmap, color, pointer default, pointer null)
        let table = [
            (0x1, true, false, false, false),
            (0x9, false, true, false, false),
            (0x6, false, false, true, false),
            (0x5, false, false, false, true),
            (0x0, false, false, false, false),
            (0x2, false, false, false, false),
            (0xD, false, false, false, false),
        ];
        for (code, bitmap, color, default, null) in table {
            let h = UpdateHeader::new(code, 0);
            assert_eq!(h.is_bitmap(), bitmap, "code {code:#x}");
            assert_eq!(h.is_color(), color, "code {code:#x}");
            assert_eq!(h.is_pointer_default(), default, "code {code:#x}");
            assert_eq!(h.is_pointer_null(), null, "code {code:#x}");
            assert!(!h.is_compressed());
        }
    }

    #[test]
    fn kind_is_exhaustive() {
        assert_eq!(UpdateHeader::new(0x1, 0).kind(), UpdateKind::Bitmap);
        assert_eq!(
            UpdateHeader::new(0x9, 0).kind(),
            UpdateKind::PointerAck(UpdateCode::ColorPointer)
        );
        assert_eq!(
            UpdateHeader::new(0x2, 0).kind(),
            UpdateKind::Unsupported(UpdateCode::Palette)
        );
        assert_eq!(UpdateHeader::new(0x7, 0).kind(), UpdateKind::Unknown(0x7));
        assert_eq!(UpdateHeader::new(0xF, 0).kind(), UpdateKind::Unknown(0xF));
    }

    #[test]
    fn decode_reads_bit_fields() {
        // code 0x1, fragmentation 0x2 (first), no compression
        let mut r = ByteReader::new(vec![0x21, 0x10, 0x00]);
        let h = UpdateHeader::decode(&mut r).unwrap();
        assert!(h.is_bitmap());
        assert!(h.is_fragmented());
        assert_eq!(h.size(), 16);
    }

    #[test]
    fn truncated_header_is_out_of_bounds() {
        let mut r = ByteReader::new(vec![0x81, 0x00, 0x05]);
        assert!(matches!(
            UpdateHeader::decode(&mut r),
            Err(RdpError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn unknown_code_conversion() {
        assert!(matches!(
            UpdateCode::try_from(0x7),
            Err(RdpError::UnknownUpdate(0x7))
        ));
        assert_eq!(UpdateCode::try_from(0xC).unwrap(), UpdateCode::LargePointer);
    }
}
