//! Fast-path input event encoders.
//!
//! Every event has a fixed, versionless layout:
//!
//! ```text
//! keyboard  eventHeader u8 = (SCANCODE << 5) | kbdFlags ; keyCode u8              (2 bytes)
//! pointer   eventHeader u8 = (MOUSE << 5) ; pointerFlags u16 ; x u16 ; y u16      (7 bytes)
//! ```
//!
//! Multi-byte fields are little-endian. Coordinates are relative to the
//! rendering surface's top-left corner.

use bitflags::bitflags;
use bytes::Bytes;
use tracing::error;

use crate::cursor::{ByteWriter, Endian};
use crate::error::Result;

const FASTPATH_INPUT_EVENT_SCANCODE: u8 = 0x0;
const FASTPATH_INPUT_EVENT_MOUSE: u8 = 0x1;

/// Encoded size of a keyboard event.
pub const KEY_EVENT_SIZE: usize = 2;
/// Encoded size of a pointer or wheel event.
pub const POINTER_EVENT_SIZE: usize = 7;

/// Host wheel delta → protocol wheel steps.
const WHEEL_STEP_NUMERATOR: f64 = 15.0;
const WHEEL_STEP_DENOMINATOR: f64 = 8.0;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct KeyboardFlags: u8 {
        const RELEASE = 0x01;
        const EXTENDED = 0x02;
        const EXTENDED1 = 0x04;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PointerFlags: u16 {
        const WHEEL_NEGATIVE = 0x0100;
        const WHEEL = 0x0200;
        const HWHEEL = 0x0400;
        const MOVE = 0x0800;
        const BUTTON1 = 0x1000;
        const BUTTON2 = 0x2000;
        const BUTTON3 = 0x4000;
        const DOWN = 0x8000;
    }
}

// ── ScanCode ─────────────────────────────────────────────────────

/// Protocol-level key identifier (set 1), independent of host key codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScanCode {
    pub code: u8,
    /// Key sits behind the 0xE0 prefix (arrows, right modifiers, ...).
    pub extended: bool,
}

impl ScanCode {
    pub const fn new(code: u8) -> Self {
        Self {
            code,
            extended: false,
        }
    }

    pub const fn extended(code: u8) -> Self {
        Self {
            code,
            extended: true,
        }
    }
}

// ── MouseButton ──────────────────────────────────────────────────

/// Protocol button identifier.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    None = 0,
    Primary = 1,
    Secondary = 2,
}

impl MouseButton {
    /// Map a host button number (0 = primary, 2 = secondary).
    ///
    /// Host numbering differs between input sources, so anything else
    /// is sent without a button.
    pub fn from_host(button: i16) -> Self {
        match button {
            0 => MouseButton::Primary,
            2 => MouseButton::Secondary,
            _ => MouseButton::None,
        }
    }

    fn flags(self) -> PointerFlags {
        match self {
            MouseButton::None => PointerFlags::empty(),
            MouseButton::Primary => PointerFlags::BUTTON1,
            MouseButton::Secondary => PointerFlags::BUTTON2,
        }
    }
}

// ── InputEvent ───────────────────────────────────────────────────

/// One local input occurrence, ready to be serialized once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    KeyDown {
        scan_code: Option<ScanCode>,
    },
    KeyUp {
        scan_code: Option<ScanCode>,
    },
    PointerMove {
        x: u16,
        y: u16,
    },
    PointerDown {
        x: u16,
        y: u16,
        button: MouseButton,
    },
    PointerUp {
        x: u16,
        y: u16,
        button: MouseButton,
    },
    Wheel {
        x: u16,
        y: u16,
        step: u8,
        negative: bool,
        horizontal: bool,
    },
}

impl InputEvent {
    /// Build a wheel event from a raw host delta.
    pub fn wheel(x: u16, y: u16, delta: f64, horizontal: bool) -> Self {
        InputEvent::Wheel {
            x,
            y,
            step: wheel_step(delta),
            negative: delta < 0.0,
            horizontal,
        }
    }

    /// Serialize the event. `None` means "consume, but do not send":
    /// the key has no protocol scan code.
    pub fn encode(&self) -> Option<Bytes> {
        let encoded = match *self {
            InputEvent::KeyDown { scan_code } => encode_key_down(scan_code?),
            InputEvent::KeyUp { scan_code } => encode_key_up(scan_code?),
            InputEvent::PointerMove { x, y } => encode_pointer_move(x, y),
            InputEvent::PointerDown { x, y, button } => encode_pointer_down(x, y, button),
            InputEvent::PointerUp { x, y, button } => encode_pointer_up(x, y, button),
            InputEvent::Wheel {
                x,
                y,
                step,
                negative,
                horizontal,
            } => encode_wheel(x, y, step, negative, horizontal),
        };
        match encoded {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                // Layouts are fixed, so this is a sizing bug in the encoder.
                error!(event = ?self, "input encoding failed: {e}");
                None
            }
        }
    }
}

/// `round(|delta| * 15 / 8)`, saturated to the 8-bit rotation field.
pub fn wheel_step(delta: f64) -> u8 {
    let step = (delta.abs() * WHEEL_STEP_NUMERATOR / WHEEL_STEP_DENOMINATOR).round();
    step.min(u8::MAX as f64) as u8
}

// ── Encoders ─────────────────────────────────────────────────────

fn encode_key(scan_code: ScanCode, mut flags: KeyboardFlags) -> Result<Bytes> {
    if scan_code.extended {
        flags |= KeyboardFlags::EXTENDED;
    }
    let mut w = ByteWriter::with_size(KEY_EVENT_SIZE);
    w.write_u8((FASTPATH_INPUT_EVENT_SCANCODE << 5) | flags.bits())?;
    w.write_u8(scan_code.code)?;
    Ok(w.finish())
}

fn encode_pointer(flags: PointerFlags, x: u16, y: u16) -> Result<Bytes> {
    let mut w = ByteWriter::with_size(POINTER_EVENT_SIZE);
    w.write_u8(FASTPATH_INPUT_EVENT_MOUSE << 5)?;
    w.write_u16(flags.bits(), Endian::Little)?;
    w.write_u16(x, Endian::Little)?;
    w.write_u16(y, Endian::Little)?;
    Ok(w.finish())
}

pub fn encode_key_down(scan_code: ScanCode) -> Result<Bytes> {
    encode_key(scan_code, KeyboardFlags::empty())
}

pub fn encode_key_up(scan_code: ScanCode) -> Result<Bytes> {
    encode_key(scan_code, KeyboardFlags::RELEASE)
}

pub fn encode_pointer_move(x: u16, y: u16) -> Result<Bytes> {
    encode_pointer(PointerFlags::MOVE, x, y)
}

pub fn encode_pointer_down(x: u16, y: u16, button: MouseButton) -> Result<Bytes> {
    encode_pointer(PointerFlags::DOWN | button.flags(), x, y)
}

pub fn encode_pointer_up(x: u16, y: u16, button: MouseButton) -> Result<Bytes> {
    encode_pointer(button.flags(), x, y)
}

pub fn encode_wheel(x: u16, y: u16, step: u8, negative: bool, horizontal: bool) -> Result<Bytes> {
    let mut flags = if horizontal {
        PointerFlags::HWHEEL
    } else {
        PointerFlags::WHEEL
    };
    if negative {
        flags |= PointerFlags::WHEEL_NEGATIVE;
    }
    let flags = PointerFlags::from_bits_retain(flags.bits() | step as u16);
    encode_pointer(flags, x, y)
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_down_and_up_layout() {
        let a = ScanCode::new(0x1E);
        assert_eq!(&encode_key_down(a).unwrap()[..], &[0x00, 0x1E]);
        assert_eq!(&encode_key_up(a).unwrap()[..], &[0x01, 0x1E]);

        let left = ScanCode::extended(0x4B);
        assert_eq!(&encode_key_down(left).unwrap()[..], &[0x02, 0x4B]);
        assert_eq!(&encode_key_up(left).unwrap()[..], &[0x03, 0x4B]);
    }

    #[test]
    fn pointer_layouts() {
        assert_eq!(
            &encode_pointer_move(0x0102, 0x0304).unwrap()[..],
            &[0x20, 0x00, 0x08, 0x02, 0x01, 0x04, 0x03]
        );
        assert_eq!(
            &encode_pointer_down(10, 20, MouseButton::Primary).unwrap()[..],
            &[0x20, 0x00, 0x90, 10, 0, 20, 0]
        );
        assert_eq!(
            &encode_pointer_up(10, 20, MouseButton::Secondary).unwrap()[..],
            &[0x20, 0x00, 0x20, 10, 0, 20, 0]
        );
        assert_eq!(
            &encode_pointer_down(1, 1, MouseButton::None).unwrap()[..],
            &[0x20, 0x00, 0x80, 1, 0, 1, 0]
        );
    }

    #[test]
    fn button_mapping_is_deterministic() {
        for _ in 0..3 {
            for (host, expected) in [(2, 2u8), (0, 1), (1, 0), (3, 0), (4, 0), (-1, 0)] {
                assert_eq!(MouseButton::from_host(host) as u8, expected, "host {host}");
            }
        }
    }

    #[test]
    fn wheel_step_formula() {
        let up = InputEvent::wheel(5, 6, -40.0, false);
        assert_eq!(
            up,
            InputEvent::Wheel {
                x: 5,
                y: 6,
                step: 75,
                negative: true,
                horizontal: false,
            }
        );

        let right = InputEvent::wheel(0, 0, 12.0, true);
        assert_eq!(
            right,
            InputEvent::Wheel {
                x: 0,
                y: 0,
                step: 23,
                negative: false,
                horizontal: true,
            }
        );

        assert_eq!(wheel_step(10_000.0), u8::MAX);
        assert_eq!(wheel_step(0.0), 0);
    }

    #[test]
    fn wheel_layout() {
        let bytes = InputEvent::wheel(3, 4, -40.0, false).encode().unwrap();
        // WHEEL | WHEEL_NEGATIVE | 75
        assert_eq!(&bytes[..], &[0x20, 75, 0x03, 3, 0, 4, 0]);

        let bytes = InputEvent::wheel(0, 0, 12.0, true).encode().unwrap();
        assert_eq!(&bytes[..], &[0x20, 23, 0x04, 0, 0, 0, 0]);
    }

    #[test]
    fn unmapped_key_is_suppressed() {
        assert!(InputEvent::KeyDown { scan_code: None }.encode().is_none());
        assert!(InputEvent::KeyUp { scan_code: None }.encode().is_none());
        assert!(
            InputEvent::KeyDown {
                scan_code: Some(ScanCode::new(0x01))
            }
            .encode()
            .is_some()
        );
    }

    #[test]
    fn encoded_sizes_are_fixed() {
        let events = [
            InputEvent::KeyDown {
                scan_code: Some(ScanCode::new(0x10)),
            },
            InputEvent::PointerMove { x: 1, y: 2 },
            InputEvent::PointerDown {
                x: 1,
                y: 2,
                button: MouseButton::Primary,
            },
            InputEvent::PointerUp {
                x: 1,
                y: 2,
                button: MouseButton::Primary,
            },
            InputEvent::wheel(1, 2, 3.0, false),
        ];
        let sizes: Vec<usize> = events.iter().map(|e| e.encode().unwrap().len()).collect();
        assert_eq!(sizes, vec![2, 7, 7, 7, 7]);
    }
}
