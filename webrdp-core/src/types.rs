//! Pixel types shared by the bitmap pipeline.
//!
//! Wire bitmaps arrive bottom-up in one of several packed colour depths.
//! The rendering surface only ever sees [`DecodedBitmap`]s: tightly
//! packed RGBA rows, top-to-bottom.

use crate::error::{RdpError, Result};

// ── ColorDepth ───────────────────────────────────────────────────

/// Colour depth of a wire bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorDepth {
    /// 8-bit indexed. Without palette support the index is shown as a grey level.
    Bpp8,
    /// 5-5-5 RGB packed into 16 bits.
    Bpp15,
    /// 5-6-5 RGB.
    Bpp16,
    /// Blue, green, red.
    Bpp24,
    /// Blue, green, red, unused.
    Bpp32,
}

impl TryFrom<u16> for ColorDepth {
    type Error = RdpError;

    fn try_from(bits: u16) -> Result<Self> {
        match bits {
            8 => Ok(ColorDepth::Bpp8),
            15 => Ok(ColorDepth::Bpp15),
            16 => Ok(ColorDepth::Bpp16),
            24 => Ok(ColorDepth::Bpp24),
            32 => Ok(ColorDepth::Bpp32),
            _ => Err(RdpError::MalformedBitmapUpdate(format!(
                "unsupported bits per pixel: {bits}"
            ))),
        }
    }
}

impl ColorDepth {
    /// Bytes consumed by a single pixel on the wire.
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            ColorDepth::Bpp8 => 1,
            ColorDepth::Bpp15 | ColorDepth::Bpp16 => 2,
            ColorDepth::Bpp24 => 3,
            ColorDepth::Bpp32 => 4,
        }
    }

    /// Read one little-endian pixel value from the start of `src`.
    pub fn read_pixel(self, src: &[u8]) -> u32 {
        match self {
            ColorDepth::Bpp8 => src[0] as u32,
            ColorDepth::Bpp15 | ColorDepth::Bpp16 => u16::from_le_bytes([src[0], src[1]]) as u32,
            ColorDepth::Bpp24 => u32::from_le_bytes([src[0], src[1], src[2], 0]),
            ColorDepth::Bpp32 => u32::from_le_bytes([src[0], src[1], src[2], src[3]]),
        }
    }

    /// Write one pixel value little-endian into the start of `dst`.
    pub fn write_pixel(self, dst: &mut [u8], pixel: u32) {
        let bytes = pixel.to_le_bytes();
        let n = self.bytes_per_pixel();
        dst[..n].copy_from_slice(&bytes[..n]);
    }

    /// Expand a packed pixel to 8-bit RGBA.
    pub fn to_rgba(self, pixel: u32) -> [u8; 4] {
        match self {
            ColorDepth::Bpp8 => {
                let v = pixel as u8;
                [v, v, v, 0xFF]
            }
            ColorDepth::Bpp15 => {
                let r = ((pixel >> 10) & 0x1F) as u8;
                let g = ((pixel >> 5) & 0x1F) as u8;
                let b = (pixel & 0x1F) as u8;
                [expand5(r), expand5(g), expand5(b), 0xFF]
            }
            ColorDepth::Bpp16 => {
                let r = ((pixel >> 11) & 0x1F) as u8;
                let g = ((pixel >> 5) & 0x3F) as u8;
                let b = (pixel & 0x1F) as u8;
                [expand5(r), (g << 2) | (g >> 4), expand5(b), 0xFF]
            }
            ColorDepth::Bpp24 | ColorDepth::Bpp32 => [
                (pixel >> 16) as u8,
                (pixel >> 8) as u8,
                pixel as u8,
                0xFF,
            ],
        }
    }
}

fn expand5(v: u8) -> u8 {
    (v << 3) | (v >> 2)
}

// ── DecodedBitmap ────────────────────────────────────────────────

/// Pixel data ready for the rendering surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedBitmap {
    /// RGBA, row-major, top-to-bottom: `width * height * 4` bytes.
    pub data: Vec<u8>,
    pub width: u16,
    pub height: u16,
}

impl DecodedBitmap {
    /// Convert a bottom-up wire bitmap of `width * height` packed pixels.
    pub fn from_bottom_up(raw: &[u8], width: u16, height: u16, depth: ColorDepth) -> Result<Self> {
        let bpp = depth.bytes_per_pixel();
        let row_bytes = width as usize * bpp;
        let expected = row_bytes * height as usize;
        if raw.len() < expected {
            return Err(RdpError::MalformedBitmapUpdate(format!(
                "pixel data too short: {} < {}",
                raw.len(),
                expected
            )));
        }

        let mut data = Vec::with_capacity(width as usize * height as usize * 4);
        for row in raw[..expected].chunks_exact(row_bytes.max(1)).rev() {
            for px in row.chunks_exact(bpp) {
                data.extend_from_slice(&depth.to_rgba(depth.read_pixel(px)));
            }
        }

        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Returns the RGBA bytes at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` is out of bounds.
    pub fn pixel(&self, x: u16, y: u16) -> &[u8] {
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        &self.data[offset..offset + 4]
    }
}

// ── Tests ────────────────────────────────────────────────────────
