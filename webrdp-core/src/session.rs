//! Update dispatcher: one inbound message in, paints out.
//!
//! ```text
//!  frame ──► UpdateHeader ──► body (exactly `size` bytes)
//!                 │
//!                 ├─ compressed / fragmented ─► UnsupportedUpdate
//!                 ├─ Bitmap ──► BitmapUpdate ──► decode all ──► paint each
//!                 ├─ Color / PtrDefault / PtrNull ──► Acknowledged
//!                 ├─ other known codes ──► Ignored
//!                 └─ unknown ──► UnknownUpdate
//! ```
//!
//! The session performs no I/O. The driver hands it one frame at a time
//! and sends whatever bytes it returns.

use bytes::Bytes;
use tracing::{debug, error, info, warn};

use crate::cursor::{ByteReader, ByteWriter, Endian};
use crate::error::{RdpError, Result};
use crate::input::InputEvent;
use crate::state::ConnectionPhase;
use crate::types::DecodedBitmap;
use crate::update::{self, BitmapUpdate, UpdateHeader, UpdateKind};

/// Handshake layout: `u16 width, u16 height`, little-endian.
pub const HANDSHAKE_SIZE: usize = 4;

// ── Surface ──────────────────────────────────────────────────────

/// Rendering target for decoded bitmaps.
pub trait Surface {
    /// Current width and height in pixels.
    fn size(&self) -> (u16, u16);

    /// Draw `bitmap` with its top-left corner at `(dest_left, dest_top)`.
    fn paint(&mut self, bitmap: &DecodedBitmap, dest_left: u16, dest_top: u16);
}

// ── Dispatch ─────────────────────────────────────────────────────

/// Outcome of a successfully handled message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Bitmap update; `n` rectangles were painted.
    Painted(usize),
    /// Pointer update that needs no action.
    Acknowledged,
    /// Known update kind this client does not render.
    Ignored,
    /// Arrived while disconnected.
    Dropped,
}

// ── Session ──────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct Session {
    phase: ConnectionPhase,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> &ConnectionPhase {
        &self.phase
    }

    pub fn is_connected(&self) -> bool {
        self.phase.is_connected()
    }

    /// Enter `Connected` and return the handshake announcing the
    /// surface size. Returns `None` if the session is already open.
    pub fn open(&mut self, surface: &impl Surface) -> Option<Bytes> {
        if !self.phase.connect() {
            debug!("open ignored: already connected");
            return None;
        }
        let (width, height) = surface.size();
        info!(width, height, "session opened");
        match encode_handshake(width, height) {
            Ok(handshake) => Some(handshake),
            Err(e) => {
                error!(width, height, "handshake encoding failed: {e}");
                None
            }
        }
    }

    /// Enter `Disconnected`. Safe to call any number of times.
    pub fn close(&mut self) {
        if self.phase.disconnect() {
            info!("session closed");
        }
    }

    /// Dispatch one inbound message.
    ///
    /// Errors are scoped to this message: nothing has been painted when
    /// one is returned, and the session stays usable.
    pub fn handle_message(
        &mut self,
        frame: impl Into<Bytes>,
        surface: &mut impl Surface,
    ) -> Result<Dispatch> {
        if self.phase.is_disconnected() {
            return Ok(Dispatch::Dropped);
        }

        let mut r = ByteReader::new(frame);
        let header = UpdateHeader::decode(&mut r)?;
        let body = r.read_blob(header.size() as usize)?;
        if !r.is_empty() {
            debug!(trailing = r.remaining(), "ignoring bytes after update body");
        }

        if header.is_compressed() {
            warn!(code = header.update_code(), "compressed update dropped");
            return Err(RdpError::UnsupportedUpdate("compressed update"));
        }
        if header.is_fragmented() {
            warn!(code = header.update_code(), "fragmented update dropped");
            return Err(RdpError::UnsupportedUpdate("fragmented update"));
        }

        match header.kind() {
            UpdateKind::Bitmap => paint_bitmap(body, surface),
            UpdateKind::PointerAck(code) => {
                debug!(%code, "pointer update acknowledged");
                Ok(Dispatch::Acknowledged)
            }
            UpdateKind::Unsupported(code) => {
                debug!(%code, size = header.size(), "update ignored");
                Ok(Dispatch::Ignored)
            }
            UpdateKind::Unknown(code) => {
                warn!(code, "unknown update");
                Err(RdpError::UnknownUpdate(code))
            }
        }
    }

    /// Serialize a local input event. `None` while disconnected or when
    /// the event maps to nothing on the wire.
    pub fn encode_input(&self, event: &InputEvent) -> Option<Bytes> {
        if self.phase.is_disconnected() {
            return None;
        }
        event.encode()
    }
}

fn paint_bitmap(body: Bytes, surface: &mut impl Surface) -> Result<Dispatch> {
    let bitmap_update = BitmapUpdate::decode(body)?;
    let decoded = bitmap_update
        .rectangles
        .iter()
        .map(|rect| update::decode_rectangle(rect).map(|bitmap| (rect, bitmap)))
        .collect::<Result<Vec<_>>>()?;

    for (rect, bitmap) in &decoded {
        surface.paint(bitmap, rect.dest_left, rect.dest_top);
    }
    Ok(Dispatch::Painted(decoded.len()))
}

pub fn encode_handshake(width: u16, height: u16) -> Result<Bytes> {
    let mut w = ByteWriter::with_size(HANDSHAKE_SIZE);
    w.write_u16(width, Endian::Little)?;
    w.write_u16(height, Endian::Little)?;
    Ok(w.finish())
}

// ── Tests ────────────────────────────────────────────────────────
