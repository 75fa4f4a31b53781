//! Connection phase owned by the session.
//!
//! ```text
//!  Disconnected ──open──► Connected ──close──► Disconnected
//! ```
//!
//! `Disconnected` is re-entered only through a fresh `open`. Inbound
//! messages and input events seen while disconnected are dropped.

use std::time::{Duration, Instant};

// ── ConnectionPhase ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionPhase {
    /// No active connection. Initial / terminal state.
    #[default]
    Disconnected,

    /// Handshake sent; updates and input flow.
    Connected {
        /// When the connection entered the `Connected` state.
        since: Instant,
    },
}

impl std::fmt::Display for ConnectionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connected { .. } => write!(f, "Connected"),
        }
    }
}

impl ConnectionPhase {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }

    pub fn is_disconnected(&self) -> bool {
        matches!(self, Self::Disconnected)
    }

    /// How long the connection has been in the `Connected` state.
    ///
    /// Returns `None` while disconnected.
    pub fn connected_duration(&self) -> Option<Duration> {
        match self {
            Self::Connected { since } => Some(since.elapsed()),
            Self::Disconnected => None,
        }
    }

    // ── Transitions ──────────────────────────────────────────────

    /// Enter `Connected`. Returns `false` if already connected, in
    /// which case nothing changes.
    pub fn connect(&mut self) -> bool {
        match self {
            Self::Disconnected => {
                *self = Self::Connected {
                    since: Instant::now(),
                };
                true
            }
            Self::Connected { .. } => false,
        }
    }

    /// Enter `Disconnected`. Idempotent; returns whether a live
    /// connection was torn down.
    pub fn disconnect(&mut self) -> bool {
        let was_connected = self.is_connected();
        *self = Self::Disconnected;
        was_connected
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_lifecycle() {
        let mut phase = ConnectionPhase::default();
        assert!(phase.is_disconnected());

        assert!(phase.connect());
        assert!(phase.is_connected());
        assert!(phase.connected_duration().is_some());

        assert!(phase.disconnect());
        assert!(phase.is_disconnected());
        assert!(phase.connected_duration().is_none());
    }

    #[test]
    fn connect_twice_is_noop() {
        let mut phase = ConnectionPhase::default();
        assert!(phase.connect());
        let before = phase.clone();
        assert!(!phase.connect());
        assert_eq!(phase, before);
    }

    #[test]
    fn disconnect_is_idempotent() {
        let mut phase = ConnectionPhase::default();
        assert!(!phase.disconnect());
        phase.connect();
        assert!(phase.disconnect());
        assert!(!phase.disconnect());
        assert!(phase.is_disconnected());
    }

    #[test]
    fn reconnect_after_disconnect() {
        let mut phase = ConnectionPhase::default();
        phase.connect();
        phase.disconnect();
        assert!(phase.connect());
    }

    #[test]
    fn display_format() {
        assert_eq!(ConnectionPhase::Disconnected.to_string(), "Disconnected");
        assert_eq!(
            ConnectionPhase::Connected {
                since: Instant::now()
            }
            .to_string(),
            "Connected"
        );
    }
}
