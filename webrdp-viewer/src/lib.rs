//! # webrdp-viewer
//!
//! Headless viewer for a fast-path remote display gateway. Connects over
//! TCP, feeds inbound update messages through a `webrdp_core::Session`
//! into an in-memory frame buffer, and forwards local input back to the
//! gateway.

pub mod client;
pub mod codec;
pub mod config;
pub mod connection;
pub mod display;
pub mod input;

pub use client::{ClientStats, StopHandle, ViewerClient};
pub use codec::FrameCodec;
pub use config::ViewerConfig;
pub use connection::{FramedTransport, ServerConnection, Transport};
pub use display::FrameBuffer;
pub use input::{HostEvent, InputHandle, InputTranslator, input_channel};
