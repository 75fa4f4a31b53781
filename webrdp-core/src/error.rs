//! Error types for the webrdp client.
//!
//! Codec errors are scoped to a single inbound message: the session
//! reports them and the caller drops that message and carries on.
//! Only transport-level failures end a connection.

use std::time::Duration;
use thiserror::Error;

/// The canonical error type for webrdp.
#[derive(Debug, Error)]
pub enum RdpError {
    // ── Codec Errors ─────────────────────────────────────────────
    /// A cursor read or write would cross the end of its buffer.
    #[error("out of bounds: needed {needed} bytes, {remaining} remaining")]
    OutOfBounds { needed: usize, remaining: usize },

    /// A bitmap update declares geometry the body cannot satisfy.
    #[error("malformed bitmap update: {0}")]
    MalformedBitmapUpdate(String),

    /// A compressed bitmap stream is truncated or invalid.
    #[error("decompression failed: {0}")]
    Decompression(String),

    /// The update kind is recognized but not implemented.
    #[error("unsupported update: {0}")]
    UnsupportedUpdate(&'static str),

    /// The update code is not one the protocol defines.
    #[error("unknown update code: {0:#x}")]
    UnknownUpdate(u8),

    // ── Transport Errors ─────────────────────────────────────────
    /// The TCP/IO layer reported an error.
    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),

    /// Frame size exceeded the codec limit.
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// The receiving end of an input channel has gone away.
    #[error("channel closed")]
    ChannelClosed,

    /// An operation exceeded its deadline.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    // ── Application Errors ───────────────────────────────────────
    /// The configuration could not be parsed or is inconsistent.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Result alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, RdpError>;

impl RdpError {
    /// Returns `true` for errors that only invalidate the current
    /// inbound message.
    pub fn is_message_scoped(&self) -> bool {
        matches!(
            self,
            RdpError::OutOfBounds { .. }
                | RdpError::MalformedBitmapUpdate(_)
                | RdpError::Decompression(_)
                | RdpError::UnsupportedUpdate(_)
                | RdpError::UnknownUpdate(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let e = RdpError::OutOfBounds {
            needed: 6,
            remaining: 2,
        };
        assert!(e.to_string().contains('6'));
        assert!(e.to_string().contains('2'));

        let e = RdpError::UnknownUpdate(0xd);
        assert_eq!(e.to_string(), "unknown update code: 0xd");
    }

    #[test]
    fn codec_errors_are_message_scoped() {
        assert!(RdpError::Decompression("eof".into()).is_message_scoped());
        assert!(RdpError::UnsupportedUpdate("compressed header").is_message_scoped());
        assert!(!RdpError::ChannelClosed.is_message_scoped());
    }

    #[test]
    fn from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broke");
        let e: RdpError = io_err.into();
        assert!(matches!(e, RdpError::Connection(_)));
        assert!(!e.is_message_scoped());
    }
}
