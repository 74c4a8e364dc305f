//! Scripted shell standing in for a real device.
//!
//! [`ScriptedConnector`] hands the session one end of an in-memory duplex
//! stream and runs a fake device on the other end: it echoes keystrokes the
//! way a terminal does, fires scripted replies when the accumulated input
//! contains a trigger, and records everything it received so tests can
//! assert on interrupts and payloads.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

use crate::error::ConnectError;
use crate::session::ShellConnector;

/// Script describing how the fake device reacts to input.
#[derive(Debug, Clone)]
pub struct ShellScript {
    greeting: Option<String>,
    rules: Vec<(String, String)>,
    echo: bool,
}

impl Default for ShellScript {
    fn default() -> Self {
        Self {
            greeting: None,
            rules: Vec::new(),
            echo: true,
        }
    }
}

impl ShellScript {
    /// Create an empty script with keystroke echo on.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Text written as soon as the shell opens (banner, login prompt, ...).
    #[must_use]
    pub fn greeting(mut self, text: impl Into<String>) -> Self {
        self.greeting = Some(text.into());
        self
    }

    /// Write `reply` once the accumulated input contains `on`.
    ///
    /// Each rule fires at most once per connection, in declaration order.
    #[must_use]
    pub fn reply(mut self, on: impl Into<String>, reply: impl Into<String>) -> Self {
        self.rules.push((on.into(), reply.into()));
        self
    }

    /// Disable keystroke echo.
    #[must_use]
    pub const fn no_echo(mut self) -> Self {
        self.echo = false;
        self
    }

    /// Add the standard `show session config` answer used by prompt
    /// discovery, reporting the given prompt.
    #[must_use]
    pub fn with_session_config(self, prompt: &str) -> Self {
        self.reply("show session config", session_config_block(prompt))
    }
}

/// Render a plausible `show session config` response ending in the prompt.
#[must_use]
pub fn session_config_block(prompt: &str) -> String {
    format!(
        "\r\n\r\n\
         Cli Default Prompt                 = {prompt}\r\n\
         Cli Inactivity Timer in minutes    = 4\r\n\
         Ftp Inactivity Timer in minutes    = 4\r\n\
         Http Inactivity Timer in minutes   = 4\r\n\
         Login Timer in seconds             = 5\r\n\
         Maximum number of Login Attempts   = 3\r\n\
         \r\n{prompt} "
    )
}

/// Connector producing a fresh scripted stream per connect.
#[derive(Debug)]
pub struct ScriptedConnector {
    script: ShellScript,
    connects: Arc<AtomicUsize>,
    transcript: Arc<Mutex<String>>,
}

impl ScriptedConnector {
    /// Create a connector around a script.
    #[must_use]
    pub fn new(script: ShellScript) -> Self {
        Self {
            script,
            connects: Arc::new(AtomicUsize::new(0)),
            transcript: Arc::new(Mutex::new(String::new())),
        }
    }

    /// Number of times `connect` was called.
    #[must_use]
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Everything the fake device received so far, across all connections.
    #[must_use]
    pub fn transcript(&self) -> String {
        self.transcript
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Count occurrences of the interrupt byte in the transcript.
    #[must_use]
    pub fn interrupts_received(&self) -> usize {
        self.transcript().matches('\u{3}').count()
    }
}

impl ShellConnector for ScriptedConnector {
    type Stream = DuplexStream;

    async fn connect(&mut self) -> Result<DuplexStream, ConnectError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let (local, remote) = tokio::io::duplex(64 * 1024);
        tokio::spawn(run_device(
            remote,
            self.script.clone(),
            Arc::clone(&self.transcript),
        ));
        Ok(local)
    }
}

async fn run_device(
    mut stream: DuplexStream,
    script: ShellScript,
    transcript: Arc<Mutex<String>>,
) {
    if let Some(greeting) = &script.greeting {
        if stream.write_all(greeting.as_bytes()).await.is_err() {
            return;
        }
    }

    let mut seen = String::new();
    let mut fired = vec![false; script.rules.len()];
    let mut chunk = [0u8; 4096];
    loop {
        let n = match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        let input = String::from_utf8_lossy(&chunk[..n]).into_owned();
        transcript
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_str(&input);
        seen.push_str(&input);

        if script.echo && stream.write_all(input.as_bytes()).await.is_err() {
            break;
        }
        for (idx, (on, reply)) in script.rules.iter().enumerate() {
            if !fired[idx] && seen.contains(on) {
                fired[idx] = true;
                if stream.write_all(reply.as_bytes()).await.is_err() {
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_device_echoes_and_replies() {
        let script = ShellScript::new()
            .greeting("login: ")
            .reply("admin", "\r\nPassword: ");
        let mut connector = ScriptedConnector::new(script);
        let mut stream = connector.connect().await.unwrap();

        let mut banner = [0u8; 7];
        stream.read_exact(&mut banner).await.unwrap();
        assert_eq!(&banner, b"login: ");

        stream.write_all(b"admin\n").await.unwrap();
        let mut rest = [0u8; 6 + 12];
        stream.read_exact(&mut rest).await.unwrap();
        let text = String::from_utf8_lossy(&rest).into_owned();
        assert!(text.starts_with("admin\n"));
        assert!(text.contains("Password: "));

        assert_eq!(connector.connect_count(), 1);
        assert!(connector.transcript().contains("admin"));
    }

    #[tokio::test]
    async fn rules_fire_once() {
        let script = ShellScript::new().no_echo().reply("ping", "pong");
        let mut connector = ScriptedConnector::new(script);
        let mut stream = connector.connect().await.unwrap();

        stream.write_all(b"ping\n").await.unwrap();
        stream.write_all(b"ping\n").await.unwrap();
        let mut reply = [0u8; 4];
        stream.read_exact(&mut reply).await.unwrap();
        assert_eq!(&reply, b"pong");

        // A second read would hang: the rule is spent. Close instead.
        drop(stream);
    }
}
