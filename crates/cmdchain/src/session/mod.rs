//! Session transport: owns one exclusive shell session on a device.
//!
//! A [`CliSession`] wraps one connected shell. Right after connect it runs
//! prompt discovery (`show session config`) to learn the CLI prompt and the
//! session timers; the discovered prompt is then the universal
//! "command finished" marker for the rest of the connection. Commands that
//! fail in a way the abort sequence cannot recover poison the session: the
//! next send tears the connection down and rebuilds it before resubmitting.

pub mod buffer;
pub mod connector;
#[cfg(feature = "ssh")]
pub mod ssh;

use std::time::Duration;

use tokio::time::{Instant, sleep};

pub use buffer::SharedBuffer;
pub use connector::ShellConnector;

use crate::chain::CTRL_C;
use crate::config::{TerminalProfile, TimingConfig};
use crate::error::{CommandError, Result};
use crate::record;
use connector::ShellLink;

/// Prompt assumed until discovery finds the real one.
pub const DEFAULT_PROMPT: &str = "->";

/// Command sent right after connect to learn the session parameters.
pub const CMD_FIND_PROMPT: &str = "show session config";

/// Marker the device prefixes to error lines in responses.
pub const ERROR_MARKER: &str = "ERROR: ";

const LABEL_CLI_PROMPT: &str = "CLI DEFAULT PROMPT";
const LABEL_LOGIN_TIMER: &str = "LOGIN TIMER";
const LABEL_LOGIN_ATTEMPTS: &str = "LOGIN ATTEMPTS";

const KEY_CLI_PROMPT: &str = "CLI_DEFAULT_PROMPT";
const KEY_CLI_TIMER: &str = "CLI_INACTIVITY_TIMER";
const KEY_FTP_TIMER: &str = "FTP_INACTIVITY_TIMER";
const KEY_HTTP_TIMER: &str = "HTTP_INACTIVITY_TIMER";
const KEY_LOGIN_TIMER: &str = "LOGIN_TIMER";
const KEY_LOGIN_ATTEMPTS: &str = "LOGIN_ATTEMPTS";

const CONFIRM_MARKER: &str = "Confirm";
const CONFIRM_CHOICE: &str = "(Y/N)";
// Phrase the reload confirmation flow settles on once "Y" is answered.
const CONFIRM_FOLLOW_UP: &str = "copy images before reloading";

/// Session parameters learned from `show session config`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSettings {
    /// CLI inactivity timer, minutes.
    pub cli_inactivity_timer: u32,
    /// FTP inactivity timer, minutes.
    pub ftp_inactivity_timer: u32,
    /// HTTP inactivity timer, minutes.
    pub http_inactivity_timer: u32,
    /// Login timer, seconds.
    pub login_timer: u32,
    /// Maximum login attempts.
    pub login_attempts: u32,
}

/// Captured response of one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResponse {
    /// The command that was sent.
    pub command: String,
    /// The raw captured output, echo and prompt included.
    pub output: String,
    /// The prompt in effect when the command ran.
    pub prompt: String,
    /// Round-trip duration.
    pub elapsed: Duration,
}

/// One exclusive shell session on a device.
///
/// All methods take `&mut self`: exactly one command pipeline may be in
/// flight per session, and the exclusive borrow is what enforces it.
pub struct CliSession<C: ShellConnector> {
    connector: C,
    timing: TimingConfig,
    terminal: TerminalProfile,
    link: Option<ShellLink<C::Stream>>,
    buffer: SharedBuffer,
    prompt: String,
    settings: SessionSettings,
    last_failed_command: Option<String>,
}

impl<C: ShellConnector> CliSession<C> {
    /// Create a session around a connector with default configuration.
    pub fn new(connector: C) -> Self {
        Self::with_config(connector, TimingConfig::default(), TerminalProfile::default())
    }

    /// Create a session with explicit timing and terminal configuration.
    pub fn with_config(connector: C, timing: TimingConfig, terminal: TerminalProfile) -> Self {
        Self {
            connector,
            timing,
            terminal,
            link: None,
            buffer: SharedBuffer::new(),
            prompt: DEFAULT_PROMPT.to_string(),
            settings: SessionSettings::default(),
            last_failed_command: None,
        }
    }

    /// The prompt currently in effect.
    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Session parameters learned at connect time.
    #[must_use]
    pub const fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// The timing configuration in effect.
    #[must_use]
    pub const fn timing(&self) -> &TimingConfig {
        &self.timing
    }

    /// The command flagged after an unrecovered failure, if any.
    #[must_use]
    pub fn last_failed_command(&self) -> Option<&str> {
        self.last_failed_command.as_deref()
    }

    /// The receive buffer shared with the reader task.
    #[must_use]
    pub fn shared_buffer(&self) -> SharedBuffer {
        self.buffer.clone()
    }

    /// The underlying connector.
    #[must_use]
    pub const fn connector(&self) -> &C {
        &self.connector
    }

    /// Check whether the shell stream is connected and being pumped.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.link.as_ref().is_some_and(ShellLink::is_open)
    }

    /// Connect, discover the prompt and session parameters, and return the
    /// discovered prompt.
    pub async fn connect(&mut self) -> Result<String> {
        self.prompt = DEFAULT_PROMPT.to_string();
        let connect_started = Instant::now();
        self.open_link().await?;
        let connect_elapsed = connect_started.elapsed();

        let discovery_started = Instant::now();
        self.discover_prompt().await?;
        tracing::debug!(
            prompt = %self.prompt,
            connect = ?connect_elapsed,
            discovery = ?discovery_started.elapsed(),
            login_timer = self.settings.login_timer,
            login_attempts = self.settings.login_attempts,
            cli_inactivity = self.settings.cli_inactivity_timer,
            ftp_inactivity = self.settings.ftp_inactivity_timer,
            http_inactivity = self.settings.http_inactivity_timer,
            "session established"
        );
        Ok(self.prompt.clone())
    }

    /// Close the shell stream.
    pub async fn disconnect(&mut self) {
        if let Some(link) = self.link.take() {
            link.close().await;
            tracing::debug!("session disconnected");
        }
    }

    /// Send one command and wait for the discovered prompt to close it.
    pub async fn send_command(&mut self, command: &str) -> Result<CommandResponse> {
        self.send_command_with(command, self.timing.command_timeout, None)
            .await
    }

    /// Send one command and wait for an explicit substring instead of the
    /// prompt.
    pub async fn send_command_expecting(
        &mut self,
        command: &str,
        expected: &str,
    ) -> Result<CommandResponse> {
        self.send_command_with(command, self.timing.command_timeout, Some(expected))
            .await
    }

    /// Send one command with an explicit wait bound and optional expected
    /// substring.
    pub async fn send_command_with(
        &mut self,
        command: &str,
        max_wait: Duration,
        expected: Option<&str>,
    ) -> Result<CommandResponse> {
        if command.is_empty() {
            return Err(CommandError::EmptyCommand);
        }
        if !self.is_connected() {
            return Err(CommandError::dropped(Some(command)));
        }
        if let Some(failed) = self.last_failed_command.take() {
            self.reset_connection(command, &failed).await?;
            tracing::info!(command, "re-sending after connection reset");
        }

        let started = Instant::now();
        self.buffer.clear();
        self.write_command(command, max_wait, expected).await?;
        sleep(self.timing.post_send_settle).await;
        let mut output = self.wait_response(command, max_wait, expected).await?;

        if output.contains(CONFIRM_MARKER) && output.contains(CONFIRM_CHOICE) {
            tracing::debug!(command, "answering confirmation prompt");
            self.write_command("Y", self.timing.confirm_timeout, Some("Y"))
                .await?;
            sleep(self.timing.confirm_settle).await;
            output = self
                .wait_response(command, self.timing.confirm_timeout, Some(CONFIRM_FOLLOW_UP))
                .await?;
        }

        self.check_response(&output, command)?;
        Ok(CommandResponse {
            command: command.to_string(),
            output,
            prompt: self.prompt.clone(),
            elapsed: started.elapsed(),
        })
    }

    /// Write raw bytes to the shell stream.
    pub async fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        let link = self.link.as_mut().ok_or_else(|| CommandError::dropped(None))?;
        link.write(bytes).await.map_err(CommandError::from)
    }

    async fn open_link(&mut self) -> Result<()> {
        let stream = self.connector.connect().await?;
        self.link = Some(ShellLink::open(
            stream,
            self.buffer.clone(),
            self.terminal.buffer_size,
        ));
        Ok(())
    }

    /// Learn the prompt and session timers, falling back to the default
    /// prompt when discovery comes up empty.
    async fn discover_prompt(&mut self) -> Result<()> {
        self.buffer.clear();
        if let Some(response) = self.capture_session_config().await? {
            self.apply_session_config(&response);
        }
        if self.prompt.is_empty() {
            self.prompt = DEFAULT_PROMPT.to_string();
        }
        Ok(())
    }

    /// Send the discovery command and poll until the response carries the
    /// echoed command and all expected parameter labels, bounded by the
    /// discovery timeout.
    async fn capture_session_config(&mut self) -> Result<Option<String>> {
        self.buffer.clear();
        self.write_command(CMD_FIND_PROMPT, self.timing.discovery_send_window, None)
            .await?;
        sleep(self.timing.post_send_settle).await;

        let started = Instant::now();
        while started.elapsed() < self.timing.discovery_timeout {
            sleep(self.timing.response_poll_interval).await;
            let text = self.buffer.snapshot();
            if text.is_empty() || !text.contains(CMD_FIND_PROMPT) {
                continue;
            }
            let upper = text.to_uppercase();
            if upper.contains(LABEL_CLI_PROMPT)
                && upper.contains(LABEL_LOGIN_TIMER)
                && upper.contains(LABEL_LOGIN_ATTEMPTS)
            {
                return Ok(Some(text));
            }
        }
        tracing::warn!("session configuration never arrived; keeping the default prompt");
        Ok(None)
    }

    fn apply_session_config(&mut self, response: &str) {
        let marker = CMD_FIND_PROMPT.to_uppercase();
        for record in record::parse_key_value_records(response, None, None, &marker, '=') {
            for (key, value) in &record {
                if key.contains(KEY_CLI_PROMPT) {
                    self.prompt = value.clone();
                } else if key.contains(KEY_CLI_TIMER) {
                    self.settings.cli_inactivity_timer = parse_number(value);
                } else if key.contains(KEY_FTP_TIMER) {
                    self.settings.ftp_inactivity_timer = parse_number(value);
                } else if key.contains(KEY_HTTP_TIMER) {
                    self.settings.http_inactivity_timer = parse_number(value);
                } else if key.contains(KEY_LOGIN_ATTEMPTS) {
                    self.settings.login_attempts = parse_number(value);
                } else if key.contains(KEY_LOGIN_TIMER) {
                    self.settings.login_timer = parse_number(value);
                }
            }
        }
    }

    /// Write the command line and wait for its echo to round-trip.
    ///
    /// Commands waiting on an explicit substring are sent with a bare
    /// carriage return; everything else gets a full line terminator.
    async fn write_command(
        &mut self,
        command: &str,
        max_wait: Duration,
        expected: Option<&str>,
    ) -> Result<()> {
        let payload = if expected.is_none() {
            format!("{command}\r\n")
        } else {
            format!("{command}\r")
        };
        let sent_at = Instant::now();
        self.write_raw(payload.as_bytes()).await?;
        sleep(self.timing.echo_settle).await;
        loop {
            if self.buffer.len() >= command.len() {
                tracing::trace!(command, elapsed = ?sent_at.elapsed(), "command echoed");
                return Ok(());
            }
            if sent_at.elapsed() >= max_wait {
                return Err(CommandError::send_timeout(command, sent_at.elapsed()));
            }
            sleep(self.timing.echo_poll_interval).await;
        }
    }

    /// Poll until the response is complete, classifying the failure when the
    /// wait bound is exhausted.
    ///
    /// Completion means: the trimmed buffer ends with the discovered prompt
    /// (or contains the expected substring) *and* still contains the echoed
    /// command. A prompt without the echo is treated as a leftover from the
    /// previous command: a soft warning, never an abort.
    async fn wait_response(
        &mut self,
        command: &str,
        max_wait: Duration,
        expected: Option<&str>,
    ) -> Result<String> {
        let started = Instant::now();
        let mut straggler_warnings = 0u32;
        self.last_failed_command = None;

        loop {
            let text = self.buffer.snapshot();
            let complete = match expected {
                None => text.trim().ends_with(&self.prompt) && text.contains(command),
                Some(marker) => text.trim().contains(marker) && text.contains(command),
            };
            if complete {
                tracing::trace!(command, elapsed = ?started.elapsed(), "response complete");
                return Ok(text);
            }
            if started.elapsed() >= max_wait {
                break;
            }
            sleep(self.timing.response_poll_interval).await;
            if started.elapsed() >= max_wait / 2 && !self.buffer.snapshot().contains(command) {
                straggler_warnings += 1;
                tracing::warn!(
                    command,
                    retries = straggler_warnings,
                    "still waiting for the command echo"
                );
                sleep(self.timing.echo_straggler_pause).await;
            }
        }

        let text = self.buffer.snapshot();
        let echoed = text.contains(command);
        let prompt_seen = text.trim().ends_with(&self.prompt);
        let abort = if echoed && !prompt_seen {
            tracing::error!(command, "prompt never appeared after the command echo");
            true
        } else if prompt_seen && !echoed {
            tracing::warn!(command, "received a prompt left over from the previous command");
            false
        } else {
            tracing::error!(command, "waited too long for the response");
            true
        };
        if abort {
            tracing::error!(command, "sending interrupt to abort the command");
            self.abort_command(command, max_wait).await;
        }
        Err(CommandError::response_timeout(command, started.elapsed()))
    }

    /// Interrupt a stuck command and wait for the prompt to come back,
    /// re-sending the interrupt after each inactivity window.
    ///
    /// When the prompt never reappears the command is recorded as the
    /// session's last failed command; the next send will rebuild the
    /// connection instead of writing into a wedged shell.
    async fn abort_command(&mut self, command: &str, max_wait: Duration) -> bool {
        self.buffer.clear();
        if self.write_raw(&[CTRL_C]).await.is_err() {
            self.last_failed_command = Some(command.to_string());
            return false;
        }
        sleep(self.timing.abort_settle).await;

        let started = Instant::now();
        let mut interrupts = 1u32;
        let mut ticks = 0u32;
        while started.elapsed() < max_wait && interrupts < self.timing.abort_max_interrupts {
            if self.buffer.snapshot().trim().contains(&self.prompt) {
                tracing::debug!(command, "prompt recovered after interrupt");
                return true;
            }
            ticks += 1;
            if ticks >= self.timing.abort_escalation_ticks {
                let _ = self.write_raw(&[CTRL_C]).await;
                interrupts += 1;
                ticks = 0;
                tracing::warn!(
                    command,
                    attempt = interrupts,
                    "re-sending interrupt to recover the prompt"
                );
            }
            sleep(self.timing.abort_poll_interval).await;
        }

        self.last_failed_command = Some(command.to_string());
        tracing::error!(command, "prompt did not come back; session flagged for reconnect");
        false
    }

    /// Tear the connection down and rebuild it before resubmitting
    /// `command`, after `failed` could not be aborted cleanly.
    async fn reset_connection(&mut self, command: &str, failed: &str) -> Result<()> {
        tracing::error!(
            command,
            failed,
            "resetting the connection after an unrecovered command"
        );
        let started = Instant::now();
        self.disconnect().await;
        tracing::info!(elapsed = ?started.elapsed(), "disconnected for reset");
        sleep(self.timing.reconnect_pause).await;

        let started = Instant::now();
        self.open_link().await?;
        tracing::info!(elapsed = ?started.elapsed(), "reconnected");
        sleep(self.timing.reconnect_pause).await;
        Ok(())
    }

    /// Surface a device-reported error after the full response was captured.
    fn check_response(&self, output: &str, command: &str) -> Result<()> {
        if !output.contains(ERROR_MARKER) {
            return Ok(());
        }
        let cleaned = output.replace('^', "").replace(&self.prompt, "");
        Err(CommandError::device(command, cleaned.trim()))
    }
}

/// Parse the leading integer of a config value, tolerating unit suffixes.
fn parse_number(value: &str) -> u32 {
    let digits: String = value
        .trim()
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().unwrap_or_else(|_| {
        tracing::warn!(value, "session parameter is not a number");
        0
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_number_takes_leading_digits() {
        assert_eq!(parse_number(" 60 "), 60);
        assert_eq!(parse_number("5 seconds"), 5);
        assert_eq!(parse_number("none"), 0);
    }

    #[test]
    fn session_settings_default_to_zero() {
        let settings = SessionSettings::default();
        assert_eq!(settings.login_attempts, 0);
        assert_eq!(settings.cli_inactivity_timer, 0);
    }
}
