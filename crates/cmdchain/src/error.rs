//! Error types for cmdchain.
//!
//! Errors come in three tiers: connection-level ([`ConnectError`], raised
//! only while establishing or re-establishing a session), command-protocol
//! level (timing/framing expectations not met), and application level
//! (errors embedded in the device's own response text). The last two are
//! variants of [`CommandError`].

use std::time::Duration;

use thiserror::Error;

/// Format the optional command suffix used by connection-dropped messages.
fn format_command_suffix(command: Option<&String>) -> String {
    command.map_or_else(String::new, |cmd| format!(" (command: {cmd:?})"))
}

/// Errors raised while connecting or reconnecting to a device.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// The peer explicitly closed the connection during setup.
    #[error("device {host} rejected the connection: {reason}")]
    Rejected {
        /// Host that rejected the connection.
        host: String,
        /// The peer's reported reason.
        reason: String,
    },

    /// The device refused the supplied credentials.
    #[error("authentication failed for user '{user}': {reason}")]
    Authentication {
        /// User that failed to authenticate.
        user: String,
        /// The reason for the failure.
        reason: String,
    },

    /// Generic connection failure (timeout, refused, unreachable).
    #[error("connection to {host} failed: {reason}")]
    Failure {
        /// Host that could not be reached.
        host: String,
        /// The reason for the failure.
        reason: String,
    },
}

impl ConnectError {
    /// Create a rejected-by-peer error.
    pub fn rejected(host: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Rejected {
            host: host.into(),
            reason: reason.into(),
        }
    }

    /// Create an authentication error.
    pub fn authentication(user: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Authentication {
            user: user.into(),
            reason: reason.into(),
        }
    }

    /// Create a generic connection failure.
    pub fn failure(host: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Failure {
            host: host.into(),
            reason: reason.into(),
        }
    }

    /// Check if this is an authentication failure.
    #[must_use]
    pub const fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }
}

/// The main error type for command and chain execution.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The caller handed over an empty command line.
    #[error("command line is empty")]
    EmptyCommand,

    /// The command was written but its echo never came back in time.
    #[error("took too long (> {elapsed:?}) to send command {command:?}")]
    SendTimeout {
        /// The command that was being sent.
        command: String,
        /// Time spent waiting for the echo.
        elapsed: Duration,
    },

    /// The response never satisfied the completion condition in time.
    #[error("waited too long for the response from the command {command:?} (> {elapsed:?})")]
    ResponseTimeout {
        /// The command that was awaiting a response.
        command: String,
        /// Time spent waiting.
        elapsed: Duration,
    },

    /// The underlying session is gone.
    #[error("connection dropped{}", format_command_suffix(command.as_ref()))]
    ConnectionDropped {
        /// Command in flight when the drop was noticed, if any.
        command: Option<String>,
    },

    /// The device answered with its literal error marker.
    #[error("device reported an error for command {command:?}: {text}")]
    Device {
        /// The command that triggered the error.
        command: String,
        /// The device's error text, with prompt and caret noise stripped.
        text: String,
    },

    /// Connection-level failure surfaced during a command attempt.
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// An I/O error on the shell stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },
}

impl CommandError {
    /// Create a send-timeout error.
    pub fn send_timeout(command: impl Into<String>, elapsed: Duration) -> Self {
        Self::SendTimeout {
            command: command.into(),
            elapsed,
        }
    }

    /// Create a response-timeout error.
    pub fn response_timeout(command: impl Into<String>, elapsed: Duration) -> Self {
        Self::ResponseTimeout {
            command: command.into(),
            elapsed,
        }
    }

    /// Create a connection-dropped error.
    pub fn dropped(command: Option<&str>) -> Self {
        Self::ConnectionDropped {
            command: command.map(str::to_string),
        }
    }

    /// Create a device-reported error.
    pub fn device(command: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Device {
            command: command.into(),
            text: text.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Check if this is a timeout error (send or response side).
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::SendTimeout { .. } | Self::ResponseTimeout { .. })
    }

    /// Get the command this error refers to, if it carries one.
    #[must_use]
    pub fn command(&self) -> Option<&str> {
        match self {
            Self::SendTimeout { command, .. }
            | Self::ResponseTimeout { command, .. }
            | Self::Device { command, .. } => Some(command),
            Self::ConnectionDropped { command } => command.as_deref(),
            _ => None,
        }
    }
}

/// Result type alias for cmdchain operations.
pub type Result<T> = std::result::Result<T, CommandError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_command_display() {
        assert_eq!(CommandError::EmptyCommand.to_string(), "command line is empty");
    }

    #[test]
    fn response_timeout_display() {
        let err = CommandError::response_timeout("show vlan", Duration::from_secs(60));
        let msg = err.to_string();
        assert!(msg.contains("waited too long"));
        assert!(msg.contains("show vlan"));
        assert!(err.is_timeout());
        assert_eq!(err.command(), Some("show vlan"));
    }

    #[test]
    fn device_error_carries_command_and_text() {
        let err = CommandError::device("vlan 99", "ERROR: Invalid VLAN");
        let msg = err.to_string();
        assert!(msg.contains("vlan 99"));
        assert!(msg.contains("Invalid VLAN"));
        assert!(!err.is_timeout());
    }

    #[test]
    fn dropped_with_and_without_command() {
        let bare = CommandError::dropped(None);
        assert_eq!(bare.to_string(), "connection dropped");
        let with = CommandError::dropped(Some("show chassis"));
        assert!(with.to_string().contains("show chassis"));
    }

    #[test]
    fn connect_error_classification() {
        let auth = ConnectError::authentication("admin", "password rejected");
        assert!(auth.is_authentication());
        assert!(auth.to_string().contains("admin"));

        let rejected = ConnectError::rejected("10.0.0.1", "closed before handshake");
        assert!(!rejected.is_authentication());
        assert!(rejected.to_string().contains("10.0.0.1"));
    }

    #[test]
    fn connect_error_converts_to_command_error() {
        let err: CommandError = ConnectError::failure("10.0.0.1", "timed out").into();
        assert!(matches!(err, CommandError::Connect(_)));
    }
}
