//! Length-prefixed framing for the gateway stream.
//!
//! ```text
//! ┌──────────────┬─────────────────────────┐
//! │ len: u32 LE  │ payload (len bytes)     │
//! └──────────────┴─────────────────────────┘
//! ```
//!
//! One frame carries exactly one update message (server → client), one
//! handshake, or one input event (client → server).

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use webrdp_core::RdpError;

/// Size of the length prefix.
pub const LENGTH_PREFIX: usize = 4;

#[derive(Debug, Clone)]
pub struct FrameCodec {
    max_frame_size: usize,
}

impl FrameCodec {
    pub fn new(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }

    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }
}

impl Decoder for FrameCodec {
    type Item = Bytes;
    type Error = RdpError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < LENGTH_PREFIX {
            return Ok(None);
        }

        let mut prefix = [0u8; LENGTH_PREFIX];
        prefix.copy_from_slice(&src[..LENGTH_PREFIX]);
        let len = u32::from_le_bytes(prefix) as usize;

        if len > self.max_frame_size {
            return Err(RdpError::FrameTooLarge {
                size: len,
                max: self.max_frame_size,
            });
        }

        if src.len() < LENGTH_PREFIX + len {
            src.reserve(LENGTH_PREFIX + len - src.len());
            return Ok(None);
        }

        src.advance(LENGTH_PREFIX);
        Ok(Some(src.split_to(len).freeze()))
    }
}

impl Encoder<Bytes> for FrameCodec {
    type Error = RdpError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if item.len() > self.max_frame_size {
            return Err(RdpError::FrameTooLarge {
                size: item.len(),
                max: self.max_frame_size,
            });
        }
        dst.reserve(LENGTH_PREFIX + item.len());
        dst.put_u32_le(item.len() as u32);
        dst.extend_from_slice(&item);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_waits_for_full_frame() {
        let mut codec = FrameCodec::new(64);
        let mut buf = BytesMut::from(&[3, 0, 0, 0, 0xAA][..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(&[0xBB, 0xCC, 0x01]);
        let frame = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(&frame[..], &[0xAA, 0xBB, 0xCC]);
        // The next frame's first byte stays buffered.
        assert_eq!(&buf[..], &[0x01]);
    }

    #[test]
    fn empty_frame() {
        let mut codec = FrameCodec::new(64);
        let mut buf = BytesMut::from(&[0, 0, 0, 0][..]);
        let frame = codec.decode(&mut buf).unwrap().unwrap();
        assert!(frame.is_empty());
    }

    #[test]
    fn oversized_frame_rejected() {
        let mut codec = FrameCodec::new(16);
        let mut buf = BytesMut::from(&[17, 0, 0, 0][..]);
        let err = codec.decode(&mut buf).unwrap_err();
        assert!(matches!(err, RdpError::FrameTooLarge { size: 17, max: 16 }));

        let err = codec
            .encode(Bytes::from(vec![0u8; 17]), &mut BytesMut::new())
            .unwrap_err();
        assert!(matches!(err, RdpError::FrameTooLarge { .. }));
    }

    #[test]
    fn encode_prefixes_length() {
        let mut codec = FrameCodec::new(64);
        let mut dst = BytesMut::new();
        codec
            .encode(Bytes::from_static(&[0x00, 0x1E]), &mut dst)
            .unwrap();
        assert_eq!(&dst[..], &[2, 0, 0, 0, 0x00, 0x1E]);
    }
}
