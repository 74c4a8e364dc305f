//! SSH shell connector built on russh.

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use russh::ChannelStream;
use russh::client::{self, Handle, Msg};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use super::connector::ShellConnector;
use crate::config::{DeviceProfile, TerminalProfile};
use crate::error::ConnectError;

/// Host key acceptance policy.
///
/// Network devices in managed labs rarely have distributable host keys, so
/// the default accepts any key and says so at warn level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HostKeyPolicy {
    /// Accept any server key (logged at warn level).
    #[default]
    AcceptAll,
    /// Reject every key that cannot be verified.
    RejectUnknown,
}

/// Opens an interactive shell on a device over SSH.
pub struct SshConnector {
    profile: DeviceProfile,
    terminal: TerminalProfile,
    policy: HostKeyPolicy,
}

impl SshConnector {
    /// Create a connector for the given device.
    #[must_use]
    pub fn new(profile: DeviceProfile) -> Self {
        Self {
            profile,
            terminal: TerminalProfile::default(),
            policy: HostKeyPolicy::default(),
        }
    }

    /// Set the requested terminal geometry.
    #[must_use]
    pub fn terminal(mut self, terminal: TerminalProfile) -> Self {
        self.terminal = terminal;
        self
    }

    /// Set the host key policy.
    #[must_use]
    pub const fn host_key_policy(mut self, policy: HostKeyPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn failure(&self, reason: impl Into<String>) -> ConnectError {
        ConnectError::failure(&self.profile.host, reason)
    }
}

impl ShellConnector for SshConnector {
    type Stream = SshShellStream;

    async fn connect(&mut self) -> Result<SshShellStream, ConnectError> {
        let config = Arc::new(client::Config::default());
        let handler = DeviceHandler {
            policy: self.policy,
            host: self.profile.host.clone(),
        };
        let addr = (self.profile.host.as_str(), self.profile.port);
        tracing::info!(host = %self.profile.host, port = self.profile.port, "connecting");

        let mut handle = tokio::time::timeout(
            self.profile.connect_timeout(),
            client::connect(config, addr, handler),
        )
        .await
        .map_err(|_| self.failure("connection timed out"))?
        .map_err(|err| classify_connect_error(&self.profile.host, &err))?;

        let auth = handle
            .authenticate_password(&self.profile.username, &self.profile.password)
            .await
            .map_err(|err| self.failure(err.to_string()))?;
        if !auth.success() {
            return Err(ConnectError::authentication(
                &self.profile.username,
                "password rejected by device",
            ));
        }

        let channel = handle
            .channel_open_session()
            .await
            .map_err(|err| self.failure(err.to_string()))?;
        channel
            .request_pty(
                true,
                &self.terminal.term,
                self.terminal.cols,
                self.terminal.rows,
                self.terminal.pixel_width,
                self.terminal.pixel_height,
                &[],
            )
            .await
            .map_err(|err| self.failure(err.to_string()))?;
        channel
            .request_shell(true)
            .await
            .map_err(|err| self.failure(err.to_string()))?;

        tracing::info!(
            host = %self.profile.host,
            user = %self.profile.username,
            "shell session established"
        );
        Ok(SshShellStream {
            stream: channel.into_stream(),
            _handle: handle,
        })
    }
}

/// Sort a russh connect error into the rejected/failed buckets.
fn classify_connect_error(host: &str, err: &russh::Error) -> ConnectError {
    classify_connect_message(host, err.to_string())
}

/// The peer signalling "closed before" during setup is an explicit
/// rejection; everything else is a generic failure.
fn classify_connect_message(host: &str, message: String) -> ConnectError {
    if message.to_lowercase().contains("closed before") {
        ConnectError::rejected(host, message)
    } else {
        ConnectError::failure(host, message)
    }
}

struct DeviceHandler {
    policy: HostKeyPolicy,
    host: String,
}

impl client::Handler for DeviceHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &russh::keys::PublicKey,
    ) -> Result<bool, Self::Error> {
        match self.policy {
            HostKeyPolicy::AcceptAll => {
                tracing::warn!(host = %self.host, "accepting server key without verification");
                Ok(true)
            }
            HostKeyPolicy::RejectUnknown => {
                tracing::debug!(host = %self.host, "rejecting unknown host key");
                Ok(false)
            }
        }
    }
}

/// The open shell stream; keeps the SSH client handle alive for as long as
/// the stream is in use.
pub struct SshShellStream {
    stream: ChannelStream<Msg>,
    _handle: Handle<DeviceHandler>,
}

impl AsyncRead for SshShellStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_read(cx, buf)
    }
}

impl AsyncWrite for SshShellStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.stream).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_shutdown(cx)
    }
}
