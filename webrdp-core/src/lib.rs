//! # webrdp-core
//!
//! Client-side protocol library for a fast-path remote display session.
//!
//! This crate contains:
//! - **Cursor**: `ByteReader` / `ByteWriter` with explicit per-field byte order
//! - **Updates**: `UpdateHeader` codec, `BitmapUpdate` codec, interleaved RLE decompressor
//! - **Types**: `ColorDepth` pixel formats and `DecodedBitmap` RGBA output
//! - **Input**: `InputEvent` encoders and the physical key → scan code map
//! - **Session**: `Session` dispatcher, `Surface` trait and `ConnectionPhase`
//! - **Error**: `RdpError`, a typed, `thiserror`-based error hierarchy
//!
//! Nothing here performs I/O: callers feed inbound frames to
//! [`Session::handle_message`] and send the bytes it hands back.

pub mod cursor;
pub mod error;
pub mod input;
pub mod keymap;
pub mod session;
pub mod state;
pub mod types;
pub mod update;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use cursor::{ByteReader, ByteWriter, Endian};
pub use error::{RdpError, Result};
pub use input::{InputEvent, KeyboardFlags, MouseButton, PointerFlags, ScanCode};
pub use session::{Dispatch, HANDSHAKE_SIZE, Session, Surface};
pub use state::ConnectionPhase;
pub use types::{ColorDepth, DecodedBitmap};
pub use update::{
    BitmapFlags, BitmapUpdate, CompressionHeader, RectangleUpdate, UpdateCode, UpdateHeader,
    UpdateKind,
};
