//! Viewer configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use webrdp_core::{RdpError, Result};

/// Top-level configuration for the viewer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Network settings.
    pub network: NetworkConfig,
    /// Rendering surface settings.
    pub display: DisplayConfig,
    /// Input forwarding settings.
    pub input: InputConfig,
    /// Logging.
    pub logging: LoggingConfig,
}

/// Network settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Gateway address (`host:port`).
    pub server_address: String,
    /// Connection timeout in milliseconds.
    pub timeout_ms: u64,
    /// Largest inbound frame accepted, in bytes.
    pub max_frame_size: usize,
}

/// Rendering surface settings. Sent to the server in the handshake.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub width: u16,
    pub height: u16,
}

/// Input forwarding.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Forward mouse events.
    pub capture_mouse: bool,
    /// Forward keyboard events.
    pub capture_keyboard: bool,
    /// Surface origin in host coordinates, subtracted from pointer
    /// positions before they are sent.
    pub origin_x: f64,
    pub origin_y: f64,
}

/// Logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            server_address: "127.0.0.1:8081".into(),
            timeout_ms: 5000,
            max_frame_size: 1024 * 1024,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 768,
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            capture_mouse: true,
            capture_keyboard: true,
            origin_x: 0.0,
            origin_y: 0.0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

impl NetworkConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl ViewerConfig {
    /// Load from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::parse(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Parse and validate a TOML document.
    pub fn parse(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents).map_err(|e| RdpError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.display.width == 0 || self.display.height == 0 {
            return Err(RdpError::Config(format!(
                "display size must be non-zero, got {}x{}",
                self.display.width, self.display.height
            )));
        }
        if self.network.max_frame_size == 0 {
            return Err(RdpError::Config("max_frame_size must be non-zero".into()));
        }
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| RdpError::Config(e.to_string()))
    }

    /// Write default config to a file.
    pub fn write_default(path: &Path) -> Result<()> {
        let text = Self::default().to_toml()?;
        std::fs::write(path, text)?;
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn default_config_serializes() {
        let text = ViewerConfig::default().to_toml().unwrap();
        assert!(text.contains("server_address"));
        assert!(text.contains("max_frame_size"));
        assert!(text.contains("width"));
    }

    #[test]
    fn roundtrip_config() {
        let text = ViewerConfig::default().to_toml().unwrap();
        let parsed = assert_ok!(ViewerConfig::parse(&text));
        assert_eq!(parsed.display.width, 1024);
        assert_eq!(parsed.network.server_address, "127.0.0.1:8081");
        assert!(parsed.input.capture_keyboard);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let parsed = assert_ok!(ViewerConfig::parse("[display]\nwidth = 640\n"));
        assert_eq!(parsed.display.width, 640);
        assert_eq!(parsed.display.height, 768);
        assert_eq!(parsed.logging.level, "info");
    }

    #[test]
    fn input_origin_parses() {
        let parsed = assert_ok!(ViewerConfig::parse(
            "[input]\norigin_x = 12.0\norigin_y = 30.5\n"
        ));
        assert_eq!(parsed.input.origin_x, 12.0);
        assert_eq!(parsed.input.origin_y, 30.5);
        assert!(parsed.input.capture_mouse);
    }

    #[test]
    fn zero_size_rejected() {
        let err = assert_err!(ViewerConfig::parse("[display]\nwidth = 0\n"));
        assert!(matches!(err, RdpError::Config(_)));
    }

    #[test]
    fn missing_file_uses_defaults() {
        let cfg = ViewerConfig::load(Path::new("/nonexistent/webrdp-viewer.toml"));
        assert_eq!(cfg.network.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn write_default_then_load() {
        let path = std::env::temp_dir().join(format!("webrdp-viewer-{}.toml", std::process::id()));
        ViewerConfig::write_default(&path).unwrap();
        let cfg = ViewerConfig::load(&path);
        std::fs::remove_file(&path).unwrap();
        assert_eq!(cfg.display.height, 768);
    }
}
