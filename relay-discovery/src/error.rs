//! Error types for renderer discovery.

use thiserror::Error;

/// Failures that can occur while searching for renderers.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Socket setup, M-SEARCH transmission or description fetch failed
    #[error("Network error: {0}")]
    Network(String),

    /// A device description or SSDP reply could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Convenience alias for discovery results.
pub type Result<T> = std::result::Result<T, DiscoveryError>;
