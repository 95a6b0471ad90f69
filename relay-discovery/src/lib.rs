//! Discovery of controllable UPnP media renderers
//!
//! Finds renderers on the local network with an SSDP search, fetches each
//! responder's device description and keeps the devices that expose an
//! AVTransport service, i.e. the ones that can be told to play and pause.
//!
//! Everything here is blocking; async callers should run it on a blocking pool.
//!
//! ```no_run
//! use relay_discovery::{discover, DiscoveryOptions};
//!
//! for device in discover(&DiscoveryOptions::default())? {
//!     println!("{} at {}:{}", device.name, device.host, device.port);
//! }
//! # Ok::<(), relay_discovery::DiscoveryError>(())
//! ```

pub mod device;
mod discovery;
mod error;
mod ssdp;

use std::time::Duration;

use serde::Serialize;

pub use discovery::discover;
pub use error::{DiscoveryError, Result};

/// Default SSDP search target: any UPnP media renderer.
pub const MEDIA_RENDERER: &str = "urn:schemas-upnp-org:device:MediaRenderer:1";

/// A renderer that answered the search and exposes AVTransport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Device {
    /// Unique device name (UDN), e.g. "uuid:RINCON_000E58A0123456"
    pub id: String,
    /// Friendly name, the value the relay matches against
    pub name: String,
    pub room_name: Option<String>,
    pub model_name: String,
    pub manufacturer: String,
    pub host: String,
    pub port: u16,
    /// Description URL the device advertised
    pub location: String,
    /// Absolute path of the AVTransport control endpoint
    pub control_path: String,
}

/// Parameters for one discovery run.
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    pub search_target: String,
    /// Upper bound on waiting for SSDP replies and for each description fetch
    pub timeout: Duration,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            search_target: MEDIA_RENDERER.to_string(),
            timeout: Duration::from_secs(3),
        }
    }
}
