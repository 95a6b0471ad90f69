//! The device boundary: how renderers are found and driven.

use async_trait::async_trait;

use crate::error::Result;

/// A renderer that discovery reported as controllable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub id: String,
    /// Friendly name, matched exactly against the configured target
    pub name: String,
    pub model_name: String,
    pub host: String,
    pub port: u16,
    pub control_path: String,
}

impl From<relay_discovery::Device> for DeviceDescriptor {
    fn from(device: relay_discovery::Device) -> Self {
        Self {
            id: device.id,
            name: device.name,
            model_name: device.model_name,
            host: device.host,
            port: device.port,
            control_path: device.control_path,
        }
    }
}

/// Enumerates renderers and opens control handles to them.
#[async_trait]
pub trait DeviceBackend: Send + Sync {
    async fn list_devices(&self) -> Result<Vec<DeviceDescriptor>>;

    /// Open a handle, blocking until the renderer answers or the backend gives up.
    async fn connect(&self, descriptor: &DeviceDescriptor) -> Result<Box<dyn DeviceHandle>>;
}

/// A control surface on one renderer.
///
/// `play` and `pause` must tolerate being sent when the renderer is already
/// in the requested state.
#[async_trait]
pub trait DeviceHandle: Send + Sync {
    fn name(&self) -> &str;

    /// Whether the control session still answers. Never errors.
    async fn is_active(&self) -> bool;

    async fn play(&self) -> Result<()>;

    async fn pause(&self) -> Result<()>;
}
