//! cmdchain: command-chain automation for line-mode network-device CLIs.
//!
//! This crate drives interactive CLI sessions on remote network devices over
//! a remote-shell transport and turns their semi-structured text output into
//! key/value records. It is built from small composable pieces:
//!
//! - **Chains** ([`chain`]) describe an entire interactive exchange
//!   declaratively: send this, expect that, branch on the response.
//! - **The executor** ([`interpreter`]) walks a chain against a live session
//!   with prompt polling, timeouts, bounded retries and abort-on-stall.
//! - **The session** ([`session`]) owns one exclusive shell connection:
//!   prompt discovery, per-command send/receive, self-healing reconnect.
//! - **The record parser** ([`record`]) splits header-delimited key/value
//!   output into ordered field maps.
//!
//! The engine does not understand the meaning of any command; it sends
//! bytes, waits for a configurable textual condition, and returns the
//! accumulated text. Semantic interpretation belongs to the caller.
//!
//! # Example
//!
//! ```ignore
//! use cmdchain::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> cmdchain::Result<()> {
//!     let profile = DeviceProfile::new("10.0.0.1").username("admin").password("switch");
//!     let mut session = CliSession::new(SshConnector::new(profile));
//!     let prompt = session.connect().await?;
//!
//!     let response = session.send_command("show chassis").await?;
//!     println!("{}", response.output);
//!
//!     let records = parse_key_value_records(&response.output, None, Some(&prompt), "CHASSIS", '=');
//!     println!("{} chassis records", records.len());
//!     Ok(())
//! }
//! ```

pub mod chain;
pub mod config;
pub mod error;
pub mod interpreter;
pub mod prelude;
pub mod record;
pub mod session;

/// Scripted mock shell for tests.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use chain::{
    CTRL_C, Chain, ChainBuilder, CommandStep, Decision, MatchCriterion, MatchOp, Node, NodeHandle,
    Successor,
};
pub use config::{DeviceProfile, TerminalProfile, TimingConfig};
pub use error::{CommandError, ConnectError, Result};
pub use interpreter::{ChainExecutor, ChainOutcome, ResultCallback};
pub use record::{PREFIX_KEY, Record, TEXT_KEY, parse_key_value_records};
pub use session::{
    CliSession, CommandResponse, DEFAULT_PROMPT, SessionSettings, SharedBuffer, ShellConnector,
};
#[cfg(feature = "ssh")]
pub use session::ssh::{HostKeyPolicy, SshConnector};
#[cfg(any(test, feature = "test-utils"))]
pub use test_utils::{ScriptedConnector, ShellScript};
