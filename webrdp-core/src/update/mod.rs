//! Inbound display updates.
//!
//! ## Sub-modules
//!
//! | Module   | Purpose                                              |
//! |----------|------------------------------------------------------|
//! | `header` | Update header codec and classification               |
//! | `bitmap` | Bitmap update body → ordered rectangle records       |
//! | `rle`    | Interleaved RLE decompression of one rectangle       |

pub mod bitmap;
pub mod header;
pub mod rle;

pub use bitmap::{BitmapFlags, BitmapUpdate, CompressionHeader, RectangleUpdate};
pub use header::{UpdateCode, UpdateHeader, UpdateKind};

use crate::error::Result;
use crate::types::DecodedBitmap;

/// Turn one rectangle into paintable RGBA.
///
/// Compressed rectangles report the decompressor's dimensions; raw
/// rectangles keep their declared geometry.
pub fn decode_rectangle(rect: &RectangleUpdate) -> Result<DecodedBitmap> {
    if rect.is_compressed() {
        rle::decompress(rect)
    } else {
        DecodedBitmap::from_bottom_up(
            &rect.bitmap_data_stream,
            rect.width,
            rect.height,
            rect.color_depth()?,
        )
    }
}
