//! Bitmap update body.
//!
//! ```text
//! updateType        u16  must be UPDATETYPE_BITMAP (0x0001)
//! numberRectangles  u16
//! rectangle × n:
//!   destLeft destTop destRight destBottom width height bitsPerPixel flags bitmapLength   (u16 each)
//!   [cbCompFirstRowSize cbCompMainBodySize cbScanWidth cbUncompressedSize]          (compressed, with header)
//!   bitmapDataStream
//! ```
//!
//! All fields are little-endian. Decoding works on the body blob only,
//! so a bad rectangle can never read into the next message.

use bitflags::bitflags;
use bytes::Bytes;

use crate::cursor::{ByteReader, Endian};
use crate::error::{RdpError, Result};
use crate::types::ColorDepth;

pub const UPDATETYPE_BITMAP: u16 = 0x0001;

/// Size of the optional compressed-data header.
pub const COMPRESSION_HEADER_SIZE: usize = 8;

bitflags! {
    /// `flags` field of a bitmap rectangle.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BitmapFlags: u16 {
        const COMPRESSION = 0x0001;
        const NO_COMPRESSION_HEADER = 0x0400;
    }
}

// ── CompressionHeader ────────────────────────────────────────────

/// Optional header in front of a compressed rectangle payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionHeader {
    pub main_body_size: u16,
    /// Width in pixels of the compressed scan lines.
    pub scan_width: u16,
    pub uncompressed_size: u16,
}

// ── RectangleUpdate ──────────────────────────────────────────────

/// One rectangle of a bitmap update, exactly as it appeared on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RectangleUpdate {
    pub dest_left: u16,
    pub dest_top: u16,
    pub dest_right: u16,
    pub dest_bottom: u16,
    pub width: u16,
    pub height: u16,
    pub bits_per_pixel: u16,
    pub flags: BitmapFlags,
    pub compression_header: Option<CompressionHeader>,
    pub bitmap_data_stream: Bytes,
}

impl RectangleUpdate {
    pub fn is_compressed(&self) -> bool {
        self.flags.contains(BitmapFlags::COMPRESSION)
    }

    pub fn color_depth(&self) -> Result<ColorDepth> {
        ColorDepth::try_from(self.bits_per_pixel)
    }

    fn decode(r: &mut ByteReader) -> Result<Self> {
        let dest_left = r.read_u16(Endian::Little)?;
        let dest_top = r.read_u16(Endian::Little)?;
        let dest_right = r.read_u16(Endian::Little)?;
        let dest_bottom = r.read_u16(Endian::Little)?;
        let width = r.read_u16(Endian::Little)?;
        let height = r.read_u16(Endian::Little)?;
        let bits_per_pixel = r.read_u16(Endian::Little)?;
        let flags = BitmapFlags::from_bits_retain(r.read_u16(Endian::Little)?);
        let bitmap_length = r.read_u16(Endian::Little)? as usize;

        let depth = ColorDepth::try_from(bits_per_pixel)?;

        if bitmap_length > r.remaining() {
            return Err(RdpError::MalformedBitmapUpdate(format!(
                "rectangle at ({dest_left},{dest_top}) declares {bitmap_length} bytes, {} remaining",
                r.remaining()
            )));
        }

        let compressed = flags.contains(BitmapFlags::COMPRESSION);
        let (compression_header, stream_len) =
            if compressed && !flags.contains(BitmapFlags::NO_COMPRESSION_HEADER) {
                if bitmap_length < COMPRESSION_HEADER_SIZE {
                    return Err(RdpError::MalformedBitmapUpdate(format!(
                        "compressed rectangle too short for its header: {bitmap_length}"
                    )));
                }
                // cbCompFirstRowSize is always zero.
                r.skip(2)?;
                let main_body_size = r.read_u16(Endian::Little)?;
                let scan_width = r.read_u16(Endian::Little)?;
                let uncompressed_size = r.read_u16(Endian::Little)?;
                let header = CompressionHeader {
                    main_body_size,
                    scan_width,
                    uncompressed_size,
                };
                if main_body_size as usize > bitmap_length - COMPRESSION_HEADER_SIZE {
                    return Err(RdpError::MalformedBitmapUpdate(format!(
                        "compressed body of {main_body_size} bytes exceeds bitmap length {bitmap_length}"
                    )));
                }
                (Some(header), main_body_size as usize)
            } else {
                (None, bitmap_length)
            };

        if !compressed {
            let expected = width as usize * height as usize * depth.bytes_per_pixel();
            if expected != stream_len {
                return Err(RdpError::MalformedBitmapUpdate(format!(
                    "{width}x{height} at {bits_per_pixel} bpp needs {expected} bytes, got {stream_len}"
                )));
            }
        }

        let bitmap_data_stream = r.read_blob(stream_len)?;

        // Skip any padding between a compressed body and the declared length.
        if let Some(header) = compression_header {
            let padding = bitmap_length - COMPRESSION_HEADER_SIZE - header.main_body_size as usize;
            r.skip(padding)?;
        }

        Ok(Self {
            dest_left,
            dest_top,
            dest_right,
            dest_bottom,
            width,
            height,
            bits_per_pixel,
            flags,
            compression_header,
            bitmap_data_stream,
        })
    }
}

// ── BitmapUpdate ─────────────────────────────────────────────────

/// Ordered rectangles of one bitmap update. Later rectangles may
/// overlap and overpaint earlier ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitmapUpdate {
    pub rectangles: Vec<RectangleUpdate>,
}

impl BitmapUpdate {
    /// Decode a bitmap update from its body blob.
    pub fn decode(body: Bytes) -> Result<Self> {
        let mut r = ByteReader::new(body);

        let update_type = r.read_u16(Endian::Little)?;
        if update_type != UPDATETYPE_BITMAP {
            return Err(RdpError::MalformedBitmapUpdate(format!(
                "unexpected update type {update_type:#06x}"
            )));
        }

        let count = r.read_u16(Endian::Little)? as usize;
        let mut rectangles = Vec::with_capacity(count.min(r.remaining() / 18 + 1));

        for index in 0..count {
            let rect = RectangleUpdate::decode(&mut r).map_err(|e| match e {
                RdpError::OutOfBounds { needed, remaining } => {
                    RdpError::MalformedBitmapUpdate(format!(
                        "rectangle {index} of {count} truncated: needed {needed}, {remaining} remaining"
                    ))
                }
                other => other,
            })?;
            rectangles.push(rect);
        }

        Ok(Self { rectangles })
    }
}

// ── Tests ────────────────────────────────────────────────────────
