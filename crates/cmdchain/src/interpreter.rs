//! Chain execution engine.
//!
//! [`ChainExecutor`] walks a [`Chain`] against a live [`CliSession`]: it
//! writes each step's payload, polls the shared receive buffer until the
//! active criterion is satisfied (or a cap/timeout fires), and then asks the
//! node's successor where to go next, handing it the full text accumulated
//! so far. Exactly one chain may run per session at a time; the `&mut`
//! session borrow enforces it.

use std::fmt;

use tokio::time::{Instant, sleep};

use crate::chain::{CTRL_C, Chain, Decision, MatchCriterion, NodeHandle, Successor};
use crate::config::TimingConfig;
use crate::error::CommandError;
use crate::session::{CliSession, ShellConnector};

/// Completion callback for one chain execution.
///
/// Exactly one of the two callbacks fires, exactly once, when the chain
/// finishes; the `FnOnce` consumption makes re-delivery impossible.
pub struct ResultCallback {
    on_data: Box<dyn FnOnce(&str) + Send>,
    on_error: Box<dyn FnOnce(&str) + Send>,
}

impl ResultCallback {
    /// Create a callback from a data handler and an error handler.
    pub fn new(
        on_data: impl FnOnce(&str) + Send + 'static,
        on_error: impl FnOnce(&str) + Send + 'static,
    ) -> Self {
        Self {
            on_data: Box::new(on_data),
            on_error: Box::new(on_error),
        }
    }

    /// A callback that discards both outcomes.
    #[must_use]
    pub fn sink() -> Self {
        Self::new(|_| {}, |_| {})
    }

    fn resolve(self, outcome: &ChainOutcome) {
        match &outcome.error {
            Some(error) => (self.on_error)(error),
            None => (self.on_data)(&outcome.output),
        }
    }
}

impl fmt::Debug for ResultCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultCallback").finish_non_exhaustive()
    }
}

/// Final result of a chain execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainOutcome {
    /// All captured response text, in step order.
    pub output: String,
    /// Joined error lines, or `None` on success.
    pub error: Option<String>,
}

impl ChainOutcome {
    /// Check whether the chain completed without recorded errors.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Walks chains against a live session.
#[derive(Debug, Clone, Default)]
pub struct ChainExecutor {
    timing: TimingConfig,
}

impl ChainExecutor {
    /// Create an executor with default timing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an executor with explicit timing.
    #[must_use]
    pub const fn with_timing(timing: TimingConfig) -> Self {
        Self { timing }
    }

    /// Execute a chain, invoking the callback exactly once at the end.
    ///
    /// The execution context (result and error accumulators, per-node retry
    /// budgets) is created fresh here and never shared across executions.
    pub async fn execute<C: ShellConnector>(
        &self,
        session: &mut CliSession<C>,
        chain: &Chain,
        callback: ResultCallback,
    ) -> ChainOutcome {
        let buffer = session.shared_buffer();
        buffer.clear();
        let mut results = String::new();
        let mut errors: Vec<String> = Vec::new();
        let mut budgets = vec![0u32; chain.len()];

        let mut active = chain.root();
        while let Some(handle) = active {
            match self.write_step(session, chain, handle).await {
                Ok(true) => {
                    if !self
                        .collect_response(session, chain, handle, &mut results, &mut errors)
                        .await
                    {
                        break;
                    }
                }
                Ok(false) => {}
                Err(err) => {
                    if errors.is_empty() {
                        errors.push(err.to_string());
                    }
                    break;
                }
            }
            active = self
                .advance(chain, handle, &results, &mut budgets, &mut errors)
                .await;
        }

        let outcome = if errors.is_empty() {
            ChainOutcome {
                output: results,
                error: None,
            }
        } else {
            ChainOutcome {
                output: results,
                error: Some(errors.join("\n")),
            }
        };
        callback.resolve(&outcome);
        outcome
    }

    /// Write the step's payload, if any.
    ///
    /// Single-character confirmations and text already ending in a newline
    /// go out verbatim; everything else gets a trailing newline. A wait-only
    /// node following a send models "type, pause before the next keystroke"
    /// and is slept here, distinct from the response wait.
    async fn write_step<C: ShellConnector>(
        &self,
        session: &mut CliSession<C>,
        chain: &Chain,
        handle: NodeHandle,
    ) -> Result<bool, CommandError> {
        let node = chain.node(handle);
        let payload = if let Some(text) = &node.step().text {
            let mut line = text.clone();
            let confirmation =
                line.eq_ignore_ascii_case("y") || line.eq_ignore_ascii_case("n") || line == " ";
            if !confirmation && !line.ends_with('\n') {
                line.push('\n');
            }
            Some(line.into_bytes())
        } else {
            node.step().bytes.clone()
        };
        let Some(bytes) = payload else {
            return Ok(false);
        };

        session.write_raw(&bytes).await?;
        if let Successor::Fixed(next) = *node.next() {
            let following = chain.node(next).step();
            if following.is_wait_only() {
                if let Some(pause) = following.wait {
                    sleep(pause).await;
                }
            }
        }
        Ok(true)
    }

    /// Poll the shared buffer until the step's criterion is satisfied, the
    /// buffer cap forces an early match, or the step timeout elapses.
    ///
    /// Returns `false` when the chain must terminate. On timeout the
    /// interrupt byte goes out and `"Timeout"` is recorded only if no error
    /// was recorded yet: the first failure wins, later noise from the forced
    /// abort must not overwrite the true cause.
    async fn collect_response<C: ShellConnector>(
        &self,
        session: &mut CliSession<C>,
        chain: &Chain,
        handle: NodeHandle,
        results: &mut String,
        errors: &mut Vec<String>,
    ) -> bool {
        let step = chain.node(handle).step();
        let timeout = step
            .wait
            .map_or(self.timing.base_timeout, |extra| self.timing.base_timeout + extra);
        let criterion = chain.criterion_from(handle);
        let buffer = session.shared_buffer();

        let started = Instant::now();
        loop {
            let snapshot = buffer.snapshot();
            if is_expected(snapshot.trim(), criterion) || snapshot.len() > self.timing.buffer_cap {
                tracing::debug!(bytes = snapshot.len(), "response captured");
                results.push_str(&snapshot);
                buffer.clear();
                return true;
            }
            if started.elapsed() >= timeout {
                break;
            }
            sleep(self.timing.poll_interval).await;
        }

        tracing::debug!(
            buffer = %buffer.snapshot().trim(),
            criterion = ?criterion,
            "failed to match response before timeout"
        );
        if errors.is_empty() {
            errors.push("Timeout".to_string());
        }
        if let Err(err) = session.write_raw(&[CTRL_C]).await {
            tracing::warn!(%err, "failed to send interrupt after timeout");
        }
        false
    }

    /// Ask the node's successor where to go, applying the per-node retry
    /// budget to every `Stay`.
    async fn advance(
        &self,
        chain: &Chain,
        handle: NodeHandle,
        accumulated: &str,
        budgets: &mut [u32],
        errors: &mut Vec<String>,
    ) -> Option<NodeHandle> {
        let node = chain.node(handle);
        let decision = match node.next() {
            Successor::Computed(next) => next(handle, accumulated),
            Successor::Fixed(next) => {
                if node.step().matches(accumulated) {
                    Decision::Goto(*next)
                } else {
                    Decision::Stay
                }
            }
            Successor::Terminal => {
                if node.step().matches(accumulated) {
                    Decision::Finish
                } else {
                    Decision::Stay
                }
            }
        };

        match decision {
            Decision::Goto(next) => {
                budgets[handle.index()] = 0;
                Some(next)
            }
            Decision::Finish => {
                budgets[handle.index()] = 0;
                None
            }
            Decision::Stay => {
                let spins = budgets[handle.index()];
                if spins < self.timing.node_retry_limit {
                    budgets[handle.index()] = spins + 1;
                    sleep(self.timing.node_retry_spacing).await;
                    Some(handle)
                } else {
                    budgets[handle.index()] = 0;
                    errors.push(format!(
                        "no progress at step {} after {} retries",
                        handle.index(),
                        self.timing.node_retry_limit
                    ));
                    None
                }
            }
        }
    }
}

/// Check a buffer snapshot against the active criterion.
///
/// An empty buffer never completes a step, even without a criterion: a send
/// step always waits for some data to come back.
fn is_expected(text: &str, criterion: Option<&MatchCriterion>) -> bool {
    if text.is_empty() {
        return false;
    }
    criterion.is_none_or(|c| c.is_match(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::MatchCriterion;

    #[test]
    fn empty_text_never_matches() {
        assert!(!is_expected("", None));
        assert!(!is_expected("", Some(&MatchCriterion::contains(""))));
    }

    #[test]
    fn no_criterion_matches_any_data() {
        assert!(is_expected("-> ", None));
    }

    #[test]
    fn criterion_is_consulted() {
        let criterion = MatchCriterion::ends_with("->");
        assert!(is_expected("output\n->", Some(&criterion)));
        assert!(!is_expected("output", Some(&criterion)));
    }

    #[test]
    fn outcome_success_flag() {
        assert!(ChainOutcome { output: String::new(), error: None }.is_success());
        assert!(!ChainOutcome { output: String::new(), error: Some("Timeout".into()) }.is_success());
    }
}
