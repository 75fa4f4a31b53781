//! In-memory RGBA frame buffer.
//!
//! Decoded rectangles are blitted row by row; anything that falls
//! outside the buffer is clipped rather than wrapped.

use webrdp_core::{DecodedBitmap, Surface};

const BYTES_PER_PIXEL: usize = 4;

#[derive(Debug, Clone)]
pub struct FrameBuffer {
    width: u16,
    height: u16,
    data: Vec<u8>,
    paints: u64,
    clipped: u64,
}

impl FrameBuffer {
    /// Opaque black buffer of the given size.
    pub fn new(width: u16, height: u16) -> Self {
        let mut data = vec![0u8; width as usize * height as usize * BYTES_PER_PIXEL];
        for px in data.chunks_exact_mut(BYTES_PER_PIXEL) {
            px[3] = 0xFF;
        }
        Self {
            width,
            height,
            data,
            paints: 0,
            clipped: 0,
        }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    /// RGBA, row-major, top-to-bottom.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn pixel(&self, x: u16, y: u16) -> Option<&[u8]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL;
        Some(&self.data[offset..offset + BYTES_PER_PIXEL])
    }

    /// Rectangles painted since creation.
    pub fn paint_count(&self) -> u64 {
        self.paints
    }

    /// Rectangles that were partly or wholly outside the buffer.
    pub fn clipped_count(&self) -> u64 {
        self.clipped
    }
}

impl Surface for FrameBuffer {
    fn size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    fn paint(&mut self, bitmap: &DecodedBitmap, dest_left: u16, dest_top: u16) {
        self.paints += 1;

        let left = dest_left as usize;
        let top = dest_top as usize;
        let src_w = bitmap.width as usize;
        let src_h = bitmap.height as usize;
        let visible_w = src_w.min((self.width as usize).saturating_sub(left));
        let visible_h = src_h.min((self.height as usize).saturating_sub(top));

        if visible_w < src_w || visible_h < src_h {
            self.clipped += 1;
        }
        if visible_w == 0 || visible_h == 0 {
            return;
        }

        let row_bytes = visible_w * BYTES_PER_PIXEL;
        for row in 0..visible_h {
            let src = row * src_w * BYTES_PER_PIXEL;
            let dst = ((top + row) * self.width as usize + left) * BYTES_PER_PIXEL;
            let (Some(src), Some(dst)) = (
                bitmap.data.get(src..src + row_bytes),
                self.data.get_mut(dst..dst + row_bytes),
            ) else {
                break;
            };
            dst.copy_from_slice(src);
        }
    }
}
