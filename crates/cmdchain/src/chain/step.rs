//! Command steps: one unit of work inside a chain.

use std::time::Duration;

use super::criterion::MatchCriterion;

/// One unit of work: payload to send, an optional pause, and an optional
/// completion criterion.
///
/// `wait` is dual-purpose, matching how chains treat it: on a step with a
/// payload it extends the receive timeout for that step; on a wait-only step
/// it is the pause length itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandStep {
    /// Text payload. Sent with a trailing newline unless it is a bare
    /// confirmation (`y`/`n`/space) or already ends in a newline.
    pub text: Option<String>,
    /// Raw byte payload, sent verbatim.
    pub bytes: Option<Vec<u8>>,
    /// Explicit wait (see type docs for the two meanings).
    pub wait: Option<Duration>,
    /// Criterion that must be satisfied before the step is considered done.
    pub criterion: Option<MatchCriterion>,
}

impl CommandStep {
    /// Create a text-payload step.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    /// Create a raw-byte-payload step.
    #[must_use]
    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: Some(bytes.into()),
            ..Default::default()
        }
    }

    /// Create a wait-only step.
    #[must_use]
    pub fn pause(wait: Duration) -> Self {
        Self {
            wait: Some(wait),
            ..Default::default()
        }
    }

    /// Attach an explicit wait.
    #[must_use]
    pub const fn with_wait(mut self, wait: Duration) -> Self {
        self.wait = Some(wait);
        self
    }

    /// Attach a completion criterion.
    #[must_use]
    pub fn with_criterion(mut self, criterion: MatchCriterion) -> Self {
        self.criterion = Some(criterion);
        self
    }

    /// Check whether this step carries something to send.
    #[must_use]
    pub const fn has_payload(&self) -> bool {
        self.text.is_some() || self.bytes.is_some()
    }

    /// Check whether this is a pure pause (no payload, no criterion).
    #[must_use]
    pub fn is_wait_only(&self) -> bool {
        !self.has_payload()
            && self.criterion.is_none()
            && self.wait.is_some_and(|wait| wait > Duration::ZERO)
    }

    /// Check the step's criterion against the given text.
    ///
    /// A step with no criterion always matches.
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        self.criterion.as_ref().is_none_or(|c| c.is_match(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_without_criterion_always_matches() {
        let step = CommandStep::text("show vlan");
        assert!(step.matches(""));
        assert!(step.matches("anything"));
    }

    #[test]
    fn step_with_criterion_delegates() {
        let step = CommandStep::default().with_criterion(MatchCriterion::contains("done"));
        assert!(step.matches("all done\n"));
        assert!(!step.matches("still running"));
    }

    #[test]
    fn wait_only_detection() {
        assert!(CommandStep::pause(Duration::from_millis(100)).is_wait_only());
        assert!(!CommandStep::pause(Duration::ZERO).is_wait_only());
        assert!(!CommandStep::text("x").with_wait(Duration::from_secs(1)).is_wait_only());
        assert!(
            !CommandStep::default()
                .with_wait(Duration::from_secs(1))
                .with_criterion(MatchCriterion::contains("x"))
                .is_wait_only()
        );
    }
}
