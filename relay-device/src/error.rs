use std::time::Duration;

use relay_discovery::DiscoveryError;
use thiserror::Error;

use crate::soap::SoapError;

/// Errors raised by device backends and handles.
///
/// [`DeviceController`](crate::DeviceController) never lets these escape from
/// connection management; they only surface from a command sent over a
/// handle that was already connected.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// Renderer discovery could not run
    #[error("Discovery failed: {0}")]
    Discovery(#[from] DiscoveryError),

    /// The renderer rejected or never answered a control request
    #[error(transparent)]
    Soap(#[from] SoapError),

    /// The renderer was found but never answered a readiness probe
    #[error("Device '{name}' not ready after {waited:?}: {last_error}")]
    NotReady {
        name: String,
        waited: Duration,
        last_error: String,
    },

    /// A blocking device call panicked or was cancelled
    #[error("Device task failed: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, DeviceError>;
