//! Resilient playback control over a single named renderer
//!
//! [`DeviceController`] hides connection management from callers: it finds
//! the renderer by name on first use, re-checks the cached handle before every
//! command, reconnects when the handle has gone stale and reports an
//! unreachable renderer as [`CommandOutcome::NotConnected`] instead of failing.
//!
//! ```no_run
//! use relay_device::{CommandOutcome, DeviceController, UpnpBackend, UpnpConfig};
//!
//! # async fn demo() -> relay_device::Result<()> {
//! let mut controller = DeviceController::new("Living Room TV", UpnpBackend::new(UpnpConfig::default()));
//! if controller.pause().await? == CommandOutcome::NotConnected {
//!     eprintln!("renderer is not reachable right now");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! The renderer side is abstracted by [`DeviceBackend`] and [`DeviceHandle`];
//! [`UpnpBackend`] drives any UPnP AVTransport renderer (Sonos speakers,
//! DLNA TVs and receivers).

mod backend;
mod controller;
mod error;
pub mod soap;
mod upnp;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use backend::{DeviceBackend, DeviceDescriptor, DeviceHandle};
pub use controller::{CommandOutcome, Connection, DeviceController, DisconnectReason};
pub use error::{DeviceError, Result};
pub use upnp::{UpnpBackend, UpnpConfig, UpnpRenderer, AV_TRANSPORT_URI};
