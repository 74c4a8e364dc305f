//! Configuration types for cmdchain.
//!
//! Every timing constant in the engine is an empirically tuned default, not a
//! protocol requirement, so all of them live in [`TimingConfig`] where
//! callers can adjust them per deployment.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CommandError, Result};

/// Base timeout applied to every chain step (15 seconds).
pub const DEFAULT_BASE_TIMEOUT: Duration = Duration::from_secs(15);

/// Timeout for a full command round-trip on the session (60 seconds).
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(60);

/// Interval at which the interpreter polls the receive buffer.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Receive-buffer size that forces an early match to bound memory (16 KiB).
pub const DEFAULT_BUFFER_CAP: usize = 16 * 1024;

/// How many times a node may return itself before the chain is terminated.
pub const DEFAULT_NODE_RETRY_LIMIT: u32 = 100;

/// Pause between node self-retries.
pub const DEFAULT_NODE_RETRY_SPACING: Duration = Duration::from_millis(10);

/// Bound on the prompt-discovery poll after connect (120 seconds).
pub const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(120);

/// Default terminal type requested for the shell.
pub const DEFAULT_TERM: &str = "xterm";

/// Default terminal width in characters.
pub const DEFAULT_TERMINAL_COLS: u32 = 255;

/// Default terminal height in rows.
pub const DEFAULT_TERMINAL_ROWS: u32 = 1000;

/// Default terminal width hint in pixels.
pub const DEFAULT_PIXEL_WIDTH: u32 = 800;

/// Default terminal height hint in pixels.
pub const DEFAULT_PIXEL_HEIGHT: u32 = 600;

/// Default shell receive buffer size (64 KiB).
pub const DEFAULT_SHELL_BUFFER_SIZE: usize = 64 * 1024;

/// Default connect timeout in seconds for device profiles.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Timing knobs for the interpreter and the session transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimingConfig {
    /// Base per-step timeout for chain execution.
    pub base_timeout: Duration,
    /// Timeout for a full command round-trip.
    pub command_timeout: Duration,
    /// Interpreter receive-buffer poll interval.
    pub poll_interval: Duration,
    /// Buffer size that forces an early match.
    pub buffer_cap: usize,
    /// Bound on node self-retries.
    pub node_retry_limit: u32,
    /// Pause between node self-retries.
    pub node_retry_spacing: Duration,
    /// Initial pause after writing a command, before checking its echo.
    pub echo_settle: Duration,
    /// Poll interval while waiting for the command echo.
    pub echo_poll_interval: Duration,
    /// Pause between writing a command and polling for its response.
    pub post_send_settle: Duration,
    /// Poll interval while waiting for a response to complete.
    pub response_poll_interval: Duration,
    /// Extra pause when the echo is still missing halfway into the wait.
    pub echo_straggler_pause: Duration,
    /// Pause after answering a confirmation prompt.
    pub confirm_settle: Duration,
    /// Wait bound for the confirmation follow-up phrase.
    pub confirm_timeout: Duration,
    /// Pause right after sending the first interrupt byte.
    pub abort_settle: Duration,
    /// Poll interval while waiting for the prompt to come back after abort.
    pub abort_poll_interval: Duration,
    /// Poll ticks of inactivity before the interrupt byte is re-sent.
    pub abort_escalation_ticks: u32,
    /// Total interrupts sent before the session is flagged for reconnect.
    pub abort_max_interrupts: u32,
    /// Bound on the prompt-discovery poll after connect.
    pub discovery_timeout: Duration,
    /// Echo window for the discovery command itself.
    pub discovery_send_window: Duration,
    /// Pause on either side of a disconnect/reconnect cycle.
    pub reconnect_pause: Duration,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            base_timeout: DEFAULT_BASE_TIMEOUT,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            buffer_cap: DEFAULT_BUFFER_CAP,
            node_retry_limit: DEFAULT_NODE_RETRY_LIMIT,
            node_retry_spacing: DEFAULT_NODE_RETRY_SPACING,
            echo_settle: Duration::from_millis(30),
            echo_poll_interval: Duration::from_millis(20),
            post_send_settle: Duration::from_millis(100),
            response_poll_interval: Duration::from_millis(100),
            echo_straggler_pause: Duration::from_millis(500),
            confirm_settle: Duration::from_millis(200),
            confirm_timeout: Duration::from_secs(10),
            abort_settle: Duration::from_millis(50),
            abort_poll_interval: Duration::from_millis(500),
            abort_escalation_ticks: 10,
            abort_max_interrupts: 3,
            discovery_timeout: DEFAULT_DISCOVERY_TIMEOUT,
            discovery_send_window: Duration::from_secs(10),
            reconnect_pause: Duration::from_secs(1),
        }
    }
}

impl TimingConfig {
    /// Create the default timing configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base per-step timeout.
    #[must_use]
    pub const fn base_timeout(mut self, timeout: Duration) -> Self {
        self.base_timeout = timeout;
        self
    }

    /// Set the full command round-trip timeout.
    #[must_use]
    pub const fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Set the interpreter poll interval.
    #[must_use]
    pub const fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the early-match buffer cap.
    #[must_use]
    pub const fn buffer_cap(mut self, cap: usize) -> Self {
        self.buffer_cap = cap;
        self
    }

    /// Set the node self-retry bound.
    #[must_use]
    pub const fn node_retry_limit(mut self, limit: u32) -> Self {
        self.node_retry_limit = limit;
        self
    }

    /// Set the pause between node self-retries.
    #[must_use]
    pub const fn node_retry_spacing(mut self, spacing: Duration) -> Self {
        self.node_retry_spacing = spacing;
        self
    }

    /// Set the prompt-discovery bound.
    #[must_use]
    pub const fn discovery_timeout(mut self, timeout: Duration) -> Self {
        self.discovery_timeout = timeout;
        self
    }
}

/// Pseudo-terminal geometry requested for the shell session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalProfile {
    /// Terminal type (e.g. `xterm`).
    pub term: String,
    /// Width in characters.
    pub cols: u32,
    /// Height in rows.
    pub rows: u32,
    /// Width hint in pixels.
    pub pixel_width: u32,
    /// Height hint in pixels.
    pub pixel_height: u32,
    /// Shell receive buffer size in bytes.
    pub buffer_size: usize,
}

impl Default for TerminalProfile {
    fn default() -> Self {
        Self {
            term: DEFAULT_TERM.to_string(),
            cols: DEFAULT_TERMINAL_COLS,
            rows: DEFAULT_TERMINAL_ROWS,
            pixel_width: DEFAULT_PIXEL_WIDTH,
            pixel_height: DEFAULT_PIXEL_HEIGHT,
            buffer_size: DEFAULT_SHELL_BUFFER_SIZE,
        }
    }
}

impl TerminalProfile {
    /// Create the default terminal profile.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the terminal type.
    #[must_use]
    pub fn term(mut self, term: impl Into<String>) -> Self {
        self.term = term.into();
        self
    }

    /// Set the character dimensions.
    #[must_use]
    pub const fn dimensions(mut self, cols: u32, rows: u32) -> Self {
        self.cols = cols;
        self.rows = rows;
        self
    }

    /// Set the shell receive buffer size.
    #[must_use]
    pub const fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }
}

/// Connection parameters for one device, loadable from TOML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceProfile {
    /// Host name or address.
    pub host: String,
    /// SSH port.
    pub port: u16,
    /// Login user.
    pub username: String,
    /// Login password.
    pub password: String,
    /// Connect timeout in seconds.
    pub connect_timeout_secs: u64,
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 22,
            username: String::new(),
            password: String::new(),
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
        }
    }
}

impl DeviceProfile {
    /// Create a profile for a host.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Default::default()
        }
    }

    /// Set the port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the login user.
    #[must_use]
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    /// Set the login password.
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    /// The connect timeout as a [`Duration`].
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Parse a profile from a TOML string.
    pub fn from_toml_str(input: &str) -> Result<Self> {
        toml::from_str(input).map_err(|err| CommandError::config(err.to_string()))
    }

    /// Load a profile from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|err| {
            CommandError::config(format!("{}: {err}", path.as_ref().display()))
        })?;
        Self::from_toml_str(&contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timing_defaults() {
        let timing = TimingConfig::default();
        assert_eq!(timing.base_timeout, Duration::from_secs(15));
        assert_eq!(timing.command_timeout, Duration::from_secs(60));
        assert_eq!(timing.buffer_cap, 16 * 1024);
        assert_eq!(timing.node_retry_limit, 100);
        assert_eq!(timing.node_retry_spacing, Duration::from_millis(10));
    }

    #[test]
    fn timing_builders() {
        let timing = TimingConfig::new()
            .base_timeout(Duration::from_secs(5))
            .node_retry_limit(10);
        assert_eq!(timing.base_timeout, Duration::from_secs(5));
        assert_eq!(timing.node_retry_limit, 10);
    }

    #[test]
    fn terminal_defaults_match_session_geometry() {
        let terminal = TerminalProfile::default();
        assert_eq!(terminal.term, "xterm");
        assert_eq!(terminal.cols, 255);
        assert_eq!(terminal.rows, 1000);
        assert_eq!(terminal.pixel_width, 800);
        assert_eq!(terminal.pixel_height, 600);
        assert_eq!(terminal.buffer_size, 64 * 1024);
    }

    #[test]
    fn device_profile_from_toml() {
        let profile = DeviceProfile::from_toml_str(
            r#"
            host = "10.0.0.1"
            username = "admin"
            password = "switch"
            connect_timeout_secs = 10
            "#,
        )
        .unwrap();
        assert_eq!(profile.host, "10.0.0.1");
        assert_eq!(profile.port, 22);
        assert_eq!(profile.connect_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn device_profile_rejects_bad_toml() {
        let err = DeviceProfile::from_toml_str("host = 42").unwrap_err();
        assert!(matches!(err, CommandError::Config { .. }));
    }
}
