//! Convenience re-exports for typical usage.
//!
//! ```
//! use cmdchain::prelude::*;
//! ```

pub use crate::chain::{Chain, ChainBuilder, Decision, MatchCriterion, MatchOp, NodeHandle};
pub use crate::config::{DeviceProfile, TerminalProfile, TimingConfig};
pub use crate::error::{CommandError, ConnectError, Result};
pub use crate::interpreter::{ChainExecutor, ChainOutcome, ResultCallback};
pub use crate::record::{Record, parse_key_value_records};
pub use crate::session::{CliSession, CommandResponse, SessionSettings, ShellConnector};

#[cfg(feature = "ssh")]
pub use crate::session::ssh::{HostKeyPolicy, SshConnector};
