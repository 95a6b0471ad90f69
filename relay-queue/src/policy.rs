use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Which messages of a batch reach the handler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProcessingPolicy {
    /// Only the newest message is handled. Every older message in the batch
    /// is treated as superseded and deleted without being handled, so an
    /// intermediate command (say a PAUSE followed by a RESUME in the same
    /// batch) is never executed.
    #[default]
    LatestOnly,
    /// Every message is handled independently.
    All,
}

#[derive(Debug, Error)]
#[error("unknown processing policy '{0}', expected 'latest-only' or 'all'")]
pub struct ParsePolicyError(String);

impl FromStr for ProcessingPolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "latest-only" | "latest_only" | "latest" => Ok(ProcessingPolicy::LatestOnly),
            "all" => Ok(ProcessingPolicy::All),
            _ => Err(ParsePolicyError(s.to_string())),
        }
    }
}

impl fmt::Display for ProcessingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessingPolicy::LatestOnly => write!(f, "latest-only"),
            ProcessingPolicy::All => write!(f, "all"),
        }
    }
}
