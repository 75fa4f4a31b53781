//! Local input capture → protocol event conversion.
//!
//! Host events carry coordinates in the host's own space (for example
//! window client coordinates). The translator subtracts the surface
//! origin, clamps to the protocol's 16-bit range and resolves key names
//! through the scan code map.
//!
//! The viewer has no window of its own. A host windowing layer obtains an
//! [`InputHandle`] from [`input_channel`] and pushes [`HostEvent`]s into
//! it; the receiving half goes to [`ViewerClient::run`].
//!
//! [`ViewerClient::run`]: crate::ViewerClient::run

use tokio::sync::mpsc;
use webrdp_core::keymap;
use webrdp_core::{InputEvent, MouseButton, RdpError, Result};

use crate::config::InputConfig;

/// Raw input as reported by the host windowing layer.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    MouseMove {
        x: f64,
        y: f64,
    },
    MouseDown {
        x: f64,
        y: f64,
        /// Host numbering: 0 = primary, 1 = middle, 2 = secondary.
        button: i16,
    },
    MouseUp {
        x: f64,
        y: f64,
        button: i16,
    },
    Wheel {
        x: f64,
        y: f64,
        delta_x: f64,
        delta_y: f64,
    },
    /// Physical key name, e.g. `"KeyA"`.
    KeyDown(String),
    KeyUp(String),
}

impl HostEvent {
    pub fn is_pointer(&self) -> bool {
        !matches!(self, HostEvent::KeyDown(_) | HostEvent::KeyUp(_))
    }
}

// ── InputHandle ──────────────────────────────────────────────────

/// Sending half of the input channel, held by the host windowing layer.
#[derive(Debug, Clone)]
pub struct InputHandle {
    tx: mpsc::Sender<HostEvent>,
}

/// Create the channel that carries host input into the viewer driver.
pub fn input_channel(capacity: usize) -> (InputHandle, mpsc::Receiver<HostEvent>) {
    let (tx, rx) = mpsc::channel(capacity);
    (InputHandle { tx }, rx)
}

impl InputHandle {
    /// Queue one event, waiting for capacity.
    ///
    /// Fails with [`RdpError::ChannelClosed`] once the driver has stopped.
    pub async fn send(&self, event: HostEvent) -> Result<()> {
        self.tx
            .send(event)
            .await
            .map_err(|_| RdpError::ChannelClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

// ── InputTranslator ──────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct InputTranslator {
    origin_x: f64,
    origin_y: f64,
    capture_mouse: bool,
    capture_keyboard: bool,
}

impl InputTranslator {
    pub fn new(config: &InputConfig) -> Self {
        Self {
            origin_x: 0.0,
            origin_y: 0.0,
            capture_mouse: config.capture_mouse,
            capture_keyboard: config.capture_keyboard,
        }
        .with_origin(config.origin_x, config.origin_y)
    }

    /// Top-left corner of the rendering surface in host coordinates.
    pub fn with_origin(mut self, x: f64, y: f64) -> Self {
        self.origin_x = x;
        self.origin_y = y;
        self
    }

    /// Convert a host event. `None` when forwarding for that device is
    /// disabled.
    ///
    /// Keys without a scan code still produce an event; it encodes to
    /// nothing, so the caller consumes it without sending.
    pub fn translate(&self, event: &HostEvent) -> Option<InputEvent> {
        if event.is_pointer() && !self.capture_mouse {
            return None;
        }
        if !event.is_pointer() && !self.capture_keyboard {
            return None;
        }

        let translated = match *event {
            HostEvent::MouseMove { x, y } => {
                let (x, y) = self.surface_point(x, y);
                InputEvent::PointerMove { x, y }
            }
            HostEvent::MouseDown { x, y, button } => {
                let (x, y) = self.surface_point(x, y);
                InputEvent::PointerDown {
                    x,
                    y,
                    button: MouseButton::from_host(button),
                }
            }
            HostEvent::MouseUp { x, y, button } => {
                let (x, y) = self.surface_point(x, y);
                InputEvent::PointerUp {
                    x,
                    y,
                    button: MouseButton::from_host(button),
                }
            }
            HostEvent::Wheel {
                x,
                y,
                delta_x,
                delta_y,
            } => {
                let (x, y) = self.surface_point(x, y);
                let horizontal = delta_x.abs() > delta_y.abs();
                let delta = if horizontal { delta_x } else { delta_y };
                InputEvent::wheel(x, y, delta, horizontal)
            }
            HostEvent::KeyDown(ref code) => InputEvent::KeyDown {
                scan_code: keymap::scan_code(code),
            },
            HostEvent::KeyUp(ref code) => InputEvent::KeyUp {
                scan_code: keymap::scan_code(code),
            },
        };
        Some(translated)
    }

    fn surface_point(&self, x: f64, y: f64) -> (u16, u16) {
        (clamp_coord(x - self.origin_x), clamp_coord(y - self.origin_y))
    }
}

fn clamp_coord(v: f64) -> u16 {
    v.clamp(0.0, u16::MAX as f64) as u16
}
