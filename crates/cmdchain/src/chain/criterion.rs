//! Match criteria for recognizing complete responses.

use regex::Regex;

/// How a criterion pattern is compared against response text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchOp {
    /// The trimmed text equals the pattern.
    Equals,
    /// The trimmed text starts with the pattern.
    StartsWith,
    /// The trimmed text ends with the pattern.
    EndsWith,
    /// The trimmed text contains the pattern.
    Contains,
    /// The pattern is a regular expression matched against the trimmed text.
    Regex,
}

/// Describes how to recognize that a response is complete.
///
/// Both the pattern and the candidate text are trimmed before comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchCriterion {
    op: MatchOp,
    pattern: String,
}

impl MatchCriterion {
    /// Create a criterion with an explicit operation.
    #[must_use]
    pub fn new(op: MatchOp, pattern: impl Into<String>) -> Self {
        Self {
            op,
            pattern: pattern.into(),
        }
    }

    /// Match when the trimmed text equals the pattern.
    #[must_use]
    pub fn equals(pattern: impl Into<String>) -> Self {
        Self::new(MatchOp::Equals, pattern)
    }

    /// Match when the trimmed text starts with the pattern.
    #[must_use]
    pub fn starts_with(pattern: impl Into<String>) -> Self {
        Self::new(MatchOp::StartsWith, pattern)
    }

    /// Match when the trimmed text ends with the pattern.
    #[must_use]
    pub fn ends_with(pattern: impl Into<String>) -> Self {
        Self::new(MatchOp::EndsWith, pattern)
    }

    /// Match when the trimmed text contains the pattern.
    #[must_use]
    pub fn contains(pattern: impl Into<String>) -> Self {
        Self::new(MatchOp::Contains, pattern)
    }

    /// Match when the regex pattern matches the trimmed text.
    #[must_use]
    pub fn regex(pattern: impl Into<String>) -> Self {
        Self::new(MatchOp::Regex, pattern)
    }

    /// The comparison operation.
    #[must_use]
    pub const fn op(&self) -> MatchOp {
        self.op
    }

    /// The raw pattern text.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Check whether the candidate text satisfies this criterion.
    ///
    /// The regex variant compiles on every check; an invalid pattern never
    /// matches and is reported at warn level.
    #[must_use]
    pub fn is_match(&self, candidate: &str) -> bool {
        let candidate = candidate.trim();
        let pattern = self.pattern.trim();
        match self.op {
            MatchOp::Equals => candidate == pattern,
            MatchOp::StartsWith => candidate.starts_with(pattern),
            MatchOp::EndsWith => candidate.ends_with(pattern),
            MatchOp::Contains => candidate.contains(pattern),
            MatchOp::Regex => match Regex::new(&self.pattern) {
                Ok(re) => re.is_match(candidate),
                Err(err) => {
                    tracing::warn!(pattern = %self.pattern, %err, "invalid regex criterion");
                    false
                }
            },
        }
    }
}
