//! Interleaved run-length bitmap decompression.
//!
//! Compressed rectangles are a sequence of orders, each starting with a
//! header byte that selects the order and (for the short forms) carries
//! the run length:
//!
//! | Form       | Header bits          | Run length                       |
//! |------------|----------------------|----------------------------------|
//! | regular    | `ccc lllll`          | 5 bits, 0 = next byte + bias     |
//! | lite       | `1100..1110 llll`    | 4 bits, 0 = next byte + bias     |
//! | mega-mega  | `1111 0xxx` / `f8`   | next u16                         |
//! | special    | `f9 fa fd fe`        | implicit                         |
//!
//! Scan lines are stored bottom-up. Background runs copy the pixel one
//! row "above" in decode order (black on the first line) and foreground
//! runs XOR it with the current foreground colour.

use crate::error::{RdpError, Result};
use crate::types::{ColorDepth, DecodedBitmap};
use crate::update::bitmap::RectangleUpdate;

const REGULAR_BG_RUN: u8 = 0x0;
const REGULAR_FG_RUN: u8 = 0x1;
const REGULAR_FGBG_IMAGE: u8 = 0x2;
const REGULAR_COLOR_RUN: u8 = 0x3;
const REGULAR_COLOR_IMAGE: u8 = 0x4;

const LITE_SET_FG_FG_RUN: u8 = 0xC;
const LITE_SET_FG_FGBG_IMAGE: u8 = 0xD;
const LITE_DITHERED_RUN: u8 = 0xE;

const MEGA_MEGA_BG_RUN: u8 = 0xF0;
const MEGA_MEGA_FG_RUN: u8 = 0xF1;
const MEGA_MEGA_FGBG_IMAGE: u8 = 0xF2;
const MEGA_MEGA_COLOR_RUN: u8 = 0xF3;
const MEGA_MEGA_COLOR_IMAGE: u8 = 0xF4;
const MEGA_MEGA_SET_FG_RUN: u8 = 0xF6;
const MEGA_MEGA_SET_FGBG_IMAGE: u8 = 0xF7;
const MEGA_MEGA_DITHERED_RUN: u8 = 0xF8;

const SPECIAL_FGBG_1: u8 = 0xF9;
const SPECIAL_FGBG_2: u8 = 0xFA;
const WHITE: u8 = 0xFD;
const BLACK: u8 = 0xFE;

const SPECIAL_FGBG_1_MASK: u8 = 0x03;
const SPECIAL_FGBG_2_MASK: u8 = 0x05;

const BLACK_PIXEL: u32 = 0;

// ── Entry point ──────────────────────────────────────────────────

/// Decompress one rectangle into top-down RGBA.
///
/// The returned dimensions are authoritative: when the rectangle carries
/// a compression header its scan width and uncompressed size decide the
/// buffer shape, which may differ from the declared `width`/`height`.
pub fn decompress(rect: &RectangleUpdate) -> Result<DecodedBitmap> {
    let depth = rect
        .color_depth()
        .map_err(|e| RdpError::Decompression(e.to_string()))?;

    if depth == ColorDepth::Bpp32 {
        return Err(RdpError::Decompression(
            "32 bpp rectangles use planar compression, which is not supported".into(),
        ));
    }

    let (width, height) = decoded_dimensions(rect, depth)?;
    let raw = RleDecoder::new(&rect.bitmap_data_stream, width, height, depth).run()?;

    DecodedBitmap::from_bottom_up(&raw, width, height, depth)
}

/// Output shape of a compressed rectangle.
pub fn decoded_dimensions(rect: &RectangleUpdate, depth: ColorDepth) -> Result<(u16, u16)> {
    let Some(header) = rect.compression_header else {
        return Ok((rect.width, rect.height));
    };

    if header.scan_width == 0 || header.uncompressed_size == 0 {
        return Ok((rect.width, rect.height));
    }

    let row_bytes = header.scan_width as usize * depth.bytes_per_pixel();
    let size = header.uncompressed_size as usize;
    if size % row_bytes != 0 {
        return Err(RdpError::Decompression(format!(
            "uncompressed size {size} is not a whole number of {row_bytes}-byte rows"
        )));
    }

    Ok((header.scan_width, (size / row_bytes) as u16))
}

fn white_pixel(depth: ColorDepth) -> u32 {
    match depth {
        ColorDepth::Bpp8 => 0xFF,
        ColorDepth::Bpp15 => 0x7FFF,
        ColorDepth::Bpp16 => 0xFFFF,
        ColorDepth::Bpp24 | ColorDepth::Bpp32 => 0xFF_FFFF,
    }
}

fn order_code(header: u8) -> u8 {
    if header & 0xC0 != 0xC0 {
        header >> 5
    } else if header & 0xF0 == 0xF0 {
        header
    } else {
        header >> 4
    }
}

// ── RleDecoder ───────────────────────────────────────────────────

struct RleDecoder<'a> {
    src: &'a [u8],
    pos: usize,
    dst: Vec<u8>,
    out: usize,
    row_delta: usize,
    depth: ColorDepth,
}

impl<'a> RleDecoder<'a> {
    fn new(src: &'a [u8], width: u16, height: u16, depth: ColorDepth) -> Self {
        let row_delta = width as usize * depth.bytes_per_pixel();
        Self {
            src,
            pos: 0,
            dst: vec![0; row_delta * height as usize],
            out: 0,
            row_delta,
            depth,
        }
    }

    fn truncated(&self, what: &str) -> RdpError {
        RdpError::Decompression(format!("stream truncated reading {what} at offset {}", self.pos))
    }

    fn next_u8(&mut self) -> Result<u8> {
        let b = *self.src.get(self.pos).ok_or_else(|| self.truncated("byte"))?;
        self.pos += 1;
        Ok(b)
    }

    fn next_u16(&mut self) -> Result<u16> {
        let lo = self.next_u8()?;
        let hi = self.next_u8()?;
        Ok(u16::from_le_bytes([lo, hi]))
    }

    fn next_pixel(&mut self) -> Result<u32> {
        let n = self.depth.bytes_per_pixel();
        let bytes = self
            .src
            .get(self.pos..self.pos + n)
            .ok_or_else(|| self.truncated("pixel"))?;
        let pixel = self.depth.read_pixel(bytes);
        self.pos += n;
        Ok(pixel)
    }

    fn write(&mut self, pixel: u32) -> Result<()> {
        let n = self.depth.bytes_per_pixel();
        let end = self.out + n;
        let capacity = self.dst.len();
        let Some(slot) = self.dst.get_mut(self.out..end) else {
            return Err(RdpError::Decompression(format!(
                "run writes past the {capacity}-byte output buffer"
            )));
        };
        self.depth.write_pixel(slot, pixel);
        self.out = end;
        Ok(())
    }

    /// Pixel one scan line back from the write position.
    fn above(&self) -> Result<u32> {
        let n = self.depth.bytes_per_pixel();
        let start = self
            .out
            .checked_sub(self.row_delta)
            .ok_or_else(|| RdpError::Decompression("no previous scan line".into()))?;
        let bytes = self.dst.get(start..start + n).ok_or_else(|| {
            RdpError::Decompression(format!(
                "run writes past the {}-byte output buffer",
                self.dst.len()
            ))
        })?;
        Ok(self.depth.read_pixel(bytes))
    }

    fn run_length(&mut self, header: u8, code: u8) -> Result<usize> {
        let len = match code {
            REGULAR_FGBG_IMAGE => match header & 0x1F {
                0 => self.next_u8()? as usize + 1,
                n => n as usize * 8,
            },
            LITE_SET_FG_FGBG_IMAGE => match header & 0x0F {
                0 => self.next_u8()? as usize + 1,
                n => n as usize * 8,
            },
            REGULAR_BG_RUN | REGULAR_FG_RUN | REGULAR_COLOR_RUN | REGULAR_COLOR_IMAGE => {
                match header & 0x1F {
                    0 => self.next_u8()? as usize + 32,
                    n => n as usize,
                }
            }
            LITE_SET_FG_FG_RUN | LITE_DITHERED_RUN => match header & 0x0F {
                0 => self.next_u8()? as usize + 16,
                n => n as usize,
            },
            _ => self.next_u16()? as usize,
        };
        Ok(len)
    }

    fn write_fgbg(&mut self, bitmask: u8, count: usize, fg: u32, first_line: bool) -> Result<()> {
        for bit in 0..count {
            let set = bitmask & (1 << bit) != 0;
            let pixel = if first_line {
                if set { fg } else { BLACK_PIXEL }
            } else {
                let above = self.above()?;
                if set { above ^ fg } else { above }
            };
            self.write(pixel)?;
        }
        Ok(())
    }

    fn run(mut self) -> Result<Vec<u8>> {
        let white = white_pixel(self.depth);
        let mut fg = white;
        let mut insert_fg = false;
        let mut first_line = true;

        while self.pos < self.src.len() {
            if first_line && self.out >= self.row_delta {
                first_line = false;
                insert_fg = false;
            }

            let header = self.next_u8()?;
            let code = order_code(header);

            // Background runs. Two in a row are separated by one
            // foreground pixel.
            if code == REGULAR_BG_RUN || code == MEGA_MEGA_BG_RUN {
                let mut run = self.run_length(header, code)?;
                if insert_fg && run > 0 {
                    let pixel = if first_line { fg } else { self.above()? ^ fg };
                    self.write(pixel)?;
                    run -= 1;
                }
                for _ in 0..run {
                    let pixel = if first_line { BLACK_PIXEL } else { self.above()? };
                    self.write(pixel)?;
                }
                insert_fg = true;
                continue;
            }

            insert_fg = false;

            match code {
                REGULAR_FG_RUN | MEGA_MEGA_FG_RUN | LITE_SET_FG_FG_RUN | MEGA_MEGA_SET_FG_RUN => {
                    let run = self.run_length(header, code)?;
                    if code == LITE_SET_FG_FG_RUN || code == MEGA_MEGA_SET_FG_RUN {
                        fg = self.next_pixel()?;
                    }
                    for _ in 0..run {
                        let pixel = if first_line { fg } else { self.above()? ^ fg };
                        self.write(pixel)?;
                    }
                }
                LITE_DITHERED_RUN | MEGA_MEGA_DITHERED_RUN => {
                    let run = self.run_length(header, code)?;
                    let a = self.next_pixel()?;
                    let b = self.next_pixel()?;
                    for _ in 0..run {
                        self.write(a)?;
                        self.write(b)?;
                    }
                }
                REGULAR_COLOR_RUN | MEGA_MEGA_COLOR_RUN => {
                    let run = self.run_length(header, code)?;
                    let pixel = self.next_pixel()?;
                    for _ in 0..run {
                        self.write(pixel)?;
                    }
                }
                REGULAR_FGBG_IMAGE
                | MEGA_MEGA_FGBG_IMAGE
                | LITE_SET_FG_FGBG_IMAGE
                | MEGA_MEGA_SET_FGBG_IMAGE => {
                    let mut run = self.run_length(header, code)?;
                    if code == LITE_SET_FG_FGBG_IMAGE || code == MEGA_MEGA_SET_FGBG_IMAGE {
                        fg = self.next_pixel()?;
                    }
                    while run > 8 {
                        let mask = self.next_u8()?;
                        self.write_fgbg(mask, 8, fg, first_line)?;
                        run -= 8;
                    }
                    if run > 0 {
                        let mask = self.next_u8()?;
                        self.write_fgbg(mask, run, fg, first_line)?;
                    }
                }
                REGULAR_COLOR_IMAGE | MEGA_MEGA_COLOR_IMAGE => {
                    let run = self.run_length(header, code)?;
                    for _ in 0..run {
                        let pixel = self.next_pixel()?;
                        self.write(pixel)?;
                    }
                }
                SPECIAL_FGBG_1 => self.write_fgbg(SPECIAL_FGBG_1_MASK, 8, fg, first_line)?,
                SPECIAL_FGBG_2 => self.write_fgbg(SPECIAL_FGBG_2_MASK, 8, fg, first_line)?,
                WHITE => self.write(white)?,
                BLACK => self.write(BLACK_PIXEL)?,
                _ => {
                    return Err(RdpError::Decompression(format!(
                        "invalid order header {header:#04x} at offset {}",
                        self.pos - 1
                    )));
                }
            }
        }

        if self.out != self.dst.len() {
            return Err(RdpError::Decompression(format!(
                "stream ended after {} of {} output bytes",
                self.out,
                self.dst.len()
            )));
        }

        Ok(self.dst)
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::update::bitmap::{BitmapFlags, CompressionHeader};
    use bytes::Bytes;

    fn rect(width: u16, height: u16, bpp: u16, stream: &[u8]) -> RectangleUpdate {
        RectangleUpdate {
            dest_left: 0,
            dest_top: 0,
            dest_right: width.saturating_sub(1),
            dest_bottom: height.saturating_sub(1),
            width,
            height,
            bits_per_pixel: bpp,
            flags: BitmapFlags::COMPRESSION | BitmapFlags::NO_COMPRESSION_HEADER,
            compression_header: None,
            bitmap_data_stream: Bytes::copy_from_slice(stream),
        }
    }

    #[test]
    fn color_run_fills_row() {
        let bmp = decompress(&rect(2, 1, 24, &[0x62, 0x11, 0x22, 0x33])).unwrap();
        assert_eq!((bmp.width, bmp.height), (2, 1));
        assert_eq!(bmp.pixel(0, 0), &[0x33, 0x22, 0x11, 0xFF]);
        assert_eq!(bmp.pixel(1, 0), &[0x33, 0x22, 0x11, 0xFF]);
    }

    #[test]
    fn background_run_copies_previous_line() {
        // Bottom line: blue, red. Second line: background run of 2.
        let stream = [0x82, 0x1F, 0x00, 0x00, 0xF8, 0x02];
        let bmp = decompress(&rect(2, 2, 16, &stream)).unwrap();
        for y in 0..2 {
            assert_eq!(bmp.pixel(0, y), &[0, 0, 0xFF, 0xFF]);
            assert_eq!(bmp.pixel(1, y), &[0xFF, 0, 0, 0xFF]);
        }
    }

    #[test]
    fn consecutive_background_runs_insert_foreground() {
        let bmp = decompress(&rect(2, 1, 24, &[0x01, 0x01])).unwrap();
        assert_eq!(bmp.pixel(0, 0), &[0, 0, 0, 0xFF]);
        assert_eq!(bmp.pixel(1, 0), &[0xFF, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn white_and_black_orders() {
        let bmp = decompress(&rect(2, 1, 24, &[WHITE, BLACK])).unwrap();
        assert_eq!(bmp.pixel(0, 0), &[0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(bmp.pixel(1, 0), &[0, 0, 0, 0xFF]);
    }

    #[test]
    fn mega_mega_color_run() {
        let bmp = decompress(&rect(300, 1, 8, &[0xF3, 0x2C, 0x01, 0x80])).unwrap();
        assert_eq!(bmp.data.len(), 300 * 4);
        assert!(bmp.data.chunks(4).all(|px| px == [0x80, 0x80, 0x80, 0xFF]));
    }

    #[test]
    fn set_foreground_fgbg_image() {
        // Run of 8, foreground red, mask 0b0000_0101.
        let bmp = decompress(&rect(8, 1, 16, &[0xD1, 0x00, 0xF8, 0x05])).unwrap();
        let red = [0xFF, 0, 0, 0xFF];
        let black = [0, 0, 0, 0xFF];
        assert_eq!(bmp.pixel(0, 0), &red);
        assert_eq!(bmp.pixel(1, 0), &black);
        assert_eq!(bmp.pixel(2, 0), &red);
        for x in 3..8 {
            assert_eq!(bmp.pixel(x, 0), &black);
        }
    }

    #[test]
    fn foreground_run_xors_previous_line() {
        // Bottom line white; top line is a set-foreground run with 0x0F.
        let bmp = decompress(&rect(1, 2, 8, &[WHITE, 0xC1, 0x0F])).unwrap();
        assert_eq!(bmp.pixel(0, 0), &[0xF0, 0xF0, 0xF0, 0xFF]);
        assert_eq!(bmp.pixel(0, 1), &[0xFF, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn dithered_run_alternates() {
        let bmp = decompress(&rect(4, 1, 8, &[0xE2, 0x10, 0x20])).unwrap();
        let greys: Vec<u8> = bmp.data.chunks(4).map(|px| px[0]).collect();
        assert_eq!(greys, vec![0x10, 0x20, 0x10, 0x20]);
    }

    #[test]
    fn special_fgbg_uses_fixed_mask() {
        let bmp = decompress(&rect(8, 1, 8, &[SPECIAL_FGBG_1])).unwrap();
        let greys: Vec<u8> = bmp.data.chunks(4).map(|px| px[0]).collect();
        assert_eq!(greys, vec![0xFF, 0xFF, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn truncated_stream_fails() {
        let err = decompress(&rect(2, 1, 24, &[0x62, 0x11])).unwrap_err();
        assert!(matches!(err, RdpError::Decompression(_)));
    }

    #[test]
    fn run_past_output_fails() {
        let err = decompress(&rect(1, 1, 24, &[0x62, 1, 2, 3])).unwrap_err();
        assert!(matches!(err, RdpError::Decompression(msg) if msg.contains("past")));
    }

    #[test]
    fn short_stream_does_not_fill_buffer() {
        let err = decompress(&rect(2, 1, 24, &[WHITE])).unwrap_err();
        assert!(matches!(err, RdpError::Decompression(msg) if msg.contains("ended")));
    }

    #[test]
    fn invalid_order_fails() {
        assert!(decompress(&rect(1, 1, 8, &[0xA0])).is_err());
        assert!(decompress(&rect(1, 1, 8, &[0xFB])).is_err());
    }

    #[test]
    fn planar_depth_unsupported() {
        assert!(matches!(
            decompress(&rect(1, 1, 32, &[0x10])),
            Err(RdpError::Decompression(_))
        ));
    }

    #[test]
    fn compression_header_decides_dimensions() {
        let mut r = rect(3, 1, 16, &[0x64, 0xFF, 0xFF]);
        r.flags = BitmapFlags::COMPRESSION;
        r.compression_header = Some(CompressionHeader {
            main_body_size: 3,
            scan_width: 4,
            uncompressed_size: 8,
        });
        let bmp = decompress(&r).unwrap();
        assert_eq!((bmp.width, bmp.height), (4, 1));
        assert_eq!(bmp.data.len(), 16);
    }

    #[test]
    fn ragged_uncompressed_size_rejected() {
        let mut r = rect(3, 1, 16, &[0x64, 0xFF, 0xFF]);
        r.compression_header = Some(CompressionHeader {
            main_body_size: 3,
            scan_width: 4,
            uncompressed_size: 9,
        });
        assert!(decoded_dimensions(&r, ColorDepth::Bpp16).is_err());
    }

    #[test]
    fn order_code_forms() {
        assert_eq!(order_code(0x62), REGULAR_COLOR_RUN);
        assert_eq!(order_code(0xD1), LITE_SET_FG_FGBG_IMAGE);
        assert_eq!(order_code(0xF3), MEGA_MEGA_COLOR_RUN);
        assert_eq!(order_code(0xFD), WHITE);
    }
}
