//! Lazily connected, self-healing control over one named renderer.
//!
//! The controller is a two-state machine. It starts `Disconnected`; every
//! operation first re-checks a cached handle and drops it if it stopped
//! answering, then rediscovers the device if nothing is cached. Connection
//! problems never escape as errors: they are logged and reported as a
//! [`Connection::Disconnected`] with the reason attached.

use std::fmt;

use tracing::{debug, info, warn};

use crate::backend::{DeviceBackend, DeviceDescriptor, DeviceHandle};
use crate::error::{DeviceError, Result};

enum ConnectionState {
    Disconnected,
    Connected {
        device: DeviceDescriptor,
        handle: Box<dyn DeviceHandle>,
    },
}

/// Result of [`DeviceController::ensure_handle`].
pub enum Connection<'a> {
    Connected(&'a dyn DeviceHandle),
    Disconnected(DisconnectReason),
}

impl<'a> Connection<'a> {
    pub fn handle(&self) -> Option<&'a dyn DeviceHandle> {
        match self {
            Connection::Connected(handle) => Some(*handle),
            Connection::Disconnected(_) => None,
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, Connection::Connected(_))
    }
}

/// Why no handle could be produced.
#[derive(Debug)]
pub enum DisconnectReason {
    /// Discovery ran but no renderer carries the configured name
    NotFound { available: Vec<String> },
    /// The renderer connected but its control session is not active
    Inactive,
    /// Discovery or connection failed
    Failed(DeviceError),
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisconnectReason::NotFound { available } if available.is_empty() => {
                write!(f, "no renderers found")
            }
            DisconnectReason::NotFound { available } => {
                write!(f, "not among discovered renderers [{}]", available.join(", "))
            }
            DisconnectReason::Inactive => write!(f, "control session is not active"),
            DisconnectReason::Failed(e) => write!(f, "{}", e),
        }
    }
}

/// What a playback command amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The command reached the renderer
    Applied,
    /// No renderer could be reached; nothing was sent
    NotConnected,
}

#[derive(Debug, Clone, Copy)]
enum PlaybackAction {
    Play,
    Pause,
}

impl fmt::Display for PlaybackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackAction::Play => write!(f, "play"),
            PlaybackAction::Pause => write!(f, "pause"),
        }
    }
}

/// Owns the connection to the renderer named `device_name`.
///
/// Not meant to be shared between tasks: checking the handle and then using
/// it is not atomic, so concurrent callers would need to wrap the controller
/// in a mutex.
pub struct DeviceController {
    device_name: String,
    backend: Box<dyn DeviceBackend>,
    state: ConnectionState,
}

impl DeviceController {
    pub fn new(device_name: impl Into<String>, backend: impl DeviceBackend + 'static) -> Self {
        Self {
            device_name: device_name.into(),
            backend: Box::new(backend),
            state: ConnectionState::Disconnected,
        }
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Whether a handle is currently cached. Does not probe the device.
    pub fn is_connected(&self) -> bool {
        matches!(self.state, ConnectionState::Connected { .. })
    }

    /// The renderer behind the cached handle, if any.
    pub fn connected_device(&self) -> Option<&DeviceDescriptor> {
        match &self.state {
            ConnectionState::Connected { device, .. } => Some(device),
            ConnectionState::Disconnected => None,
        }
    }

    /// Return a live handle, discarding a stale one and reconnecting as needed.
    pub async fn ensure_handle(&mut self) -> Connection<'_> {
        let stale = match &self.state {
            ConnectionState::Connected { handle, .. } => !handle.is_active().await,
            ConnectionState::Disconnected => false,
        };
        if stale {
            warn!(device = %self.device_name, "device handle is no longer active, disconnecting");
            self.state = ConnectionState::Disconnected;
        }

        if let ConnectionState::Disconnected = self.state {
            match self.acquire().await {
                Ok((device, handle)) => {
                    self.state = ConnectionState::Connected { device, handle };
                }
                Err(reason) => {
                    warn!(device = %self.device_name, %reason, "device not connected");
                    return Connection::Disconnected(reason);
                }
            }
        }

        match &self.state {
            ConnectionState::Connected { handle, .. } => Connection::Connected(handle.as_ref()),
            ConnectionState::Disconnected => Connection::Disconnected(DisconnectReason::Inactive),
        }
    }

    async fn acquire(&self) -> std::result::Result<(DeviceDescriptor, Box<dyn DeviceHandle>), DisconnectReason> {
        let devices = self.backend.list_devices().await.map_err(DisconnectReason::Failed)?;

        let Some(descriptor) = devices.iter().find(|device| device.name == self.device_name).cloned() else {
            return Err(DisconnectReason::NotFound {
                available: devices.into_iter().map(|device| device.name).collect(),
            });
        };

        debug!(device = %descriptor.name, host = %descriptor.host, port = descriptor.port, "found device, connecting");
        let handle = self.backend.connect(&descriptor).await.map_err(DisconnectReason::Failed)?;

        if handle.is_active().await {
            info!(
                device = %descriptor.name,
                id = %descriptor.id,
                model = %descriptor.model_name,
                host = %descriptor.host,
                port = descriptor.port,
                "connected to device"
            );
            Ok((descriptor, handle))
        } else {
            Err(DisconnectReason::Inactive)
        }
    }

    /// Resume playback. Sending it to a renderer that is already playing is harmless.
    pub async fn play(&mut self) -> Result<CommandOutcome> {
        self.apply(PlaybackAction::Play).await
    }

    /// Pause playback. Sending it to a renderer that is already paused is harmless.
    pub async fn pause(&mut self) -> Result<CommandOutcome> {
        self.apply(PlaybackAction::Pause).await
    }

    async fn apply(&mut self, action: PlaybackAction) -> Result<CommandOutcome> {
        let handle = match self.ensure_handle().await {
            Connection::Connected(handle) => handle,
            Connection::Disconnected(reason) => {
                debug!(%action, %reason, "skipping command, device not connected");
                return Ok(CommandOutcome::NotConnected);
            }
        };

        match action {
            PlaybackAction::Play => handle.play().await?,
            PlaybackAction::Pause => handle.pause().await?,
        }

        info!(device = handle.name(), %action, "command sent to device");
        Ok(CommandOutcome::Applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeBackend, FakeDevice};

    fn controller(backend: &FakeBackend) -> DeviceController {
        DeviceController::new("Living Room TV", backend.clone())
    }

    #[tokio::test]
    async fn starts_disconnected() {
        let backend = FakeBackend::new(vec![FakeDevice::new("Living Room TV")]);
        let controller = controller(&backend);

        assert!(!controller.is_connected());
        assert_eq!(backend.list_calls(), 0);
        assert!(controller.connected_device().is_none());
    }

    #[tokio::test]
    async fn connects_lazily_to_exact_name() {
        let target = FakeDevice::new("Living Room TV");
        let backend = FakeBackend::new(vec![FakeDevice::new("living room tv"), target.clone()]);
        let mut controller = controller(&backend);

        let connection = controller.ensure_handle().await;
        assert_eq!(connection.handle().map(|h| h.name().to_string()).as_deref(), Some("Living Room TV"));
        assert!(controller.is_connected());
        assert_eq!(backend.connect_calls(), 1);

        let device = controller.connected_device().unwrap();
        assert_eq!(device.id, "uuid:fake-1");
        assert_eq!(device.model_name, "Fake Renderer");
        assert_eq!(device.host, "10.0.0.11");
    }

    #[tokio::test]
    async fn missing_device_yields_not_found_without_error() {
        let backend = FakeBackend::new(vec![FakeDevice::new("Kitchen"), FakeDevice::new("Bedroom")]);
        let mut controller = controller(&backend);

        match controller.ensure_handle().await {
            Connection::Disconnected(DisconnectReason::NotFound { available }) => {
                assert_eq!(available, vec!["Kitchen".to_string(), "Bedroom".to_string()]);
            }
            Connection::Disconnected(other) => panic!("unexpected reason: {}", other),
            Connection::Connected(_) => panic!("should not connect"),
        }
        assert!(!controller.is_connected());
        assert_eq!(backend.connect_calls(), 0);
    }

    #[tokio::test]
    async fn discovery_failure_is_swallowed() {
        let backend = FakeBackend::new(vec![FakeDevice::new("Living Room TV")]);
        backend.fail_discovery(true);
        let mut controller = controller(&backend);

        let connection = controller.ensure_handle().await;
        assert!(matches!(connection, Connection::Disconnected(DisconnectReason::Failed(_))));

        assert_eq!(controller.pause().await.unwrap(), CommandOutcome::NotConnected);
    }

    #[tokio::test]
    async fn connect_failure_is_swallowed() {
        let backend = FakeBackend::new(vec![FakeDevice::new("Living Room TV")]);
        backend.fail_connect(true);
        let mut controller = controller(&backend);

        assert!(matches!(
            controller.ensure_handle().await,
            Connection::Disconnected(DisconnectReason::Failed(_))
        ));
        assert!(!controller.is_connected());
    }

    #[tokio::test]
    async fn inactive_device_is_not_cached() {
        let device = FakeDevice::new("Living Room TV");
        device.set_active(false);
        let backend = FakeBackend::new(vec![device.clone()]);
        let mut controller = controller(&backend);

        assert!(matches!(
            controller.ensure_handle().await,
            Connection::Disconnected(DisconnectReason::Inactive)
        ));
        assert!(!controller.is_connected());
        assert_eq!(controller.play().await.unwrap(), CommandOutcome::NotConnected);
        assert_eq!(device.play_count(), 0);
    }

    #[tokio::test]
    async fn cached_handle_is_reused_while_active() {
        let backend = FakeBackend::new(vec![FakeDevice::new("Living Room TV")]);
        let mut controller = controller(&backend);

        controller.play().await.unwrap();
        controller.pause().await.unwrap();
        controller.play().await.unwrap();

        assert_eq!(backend.list_calls(), 1);
        assert_eq!(backend.connect_calls(), 1);
    }

    #[tokio::test]
    async fn stale_handle_is_dropped_and_reacquired() {
        let device = FakeDevice::new("Living Room TV");
        let backend = FakeBackend::new(vec![device.clone()]);
        let mut controller = controller(&backend);

        assert_eq!(controller.pause().await.unwrap(), CommandOutcome::Applied);

        // Session drops; the next operation notices, reconnects and the
        // device comes back with a fresh session.
        device.set_active(false);
        backend.on_connect_reactivate(true);

        assert_eq!(controller.play().await.unwrap(), CommandOutcome::Applied);
        assert_eq!(backend.connect_calls(), 2);
        assert!(device.is_playing());
    }

    #[tokio::test]
    async fn stale_handle_with_device_gone_reports_not_connected() {
        let device = FakeDevice::new("Living Room TV");
        let backend = FakeBackend::new(vec![device.clone()]);
        let mut controller = controller(&backend);

        controller.play().await.unwrap();
        device.set_active(false);
        backend.remove_all();

        assert_eq!(controller.pause().await.unwrap(), CommandOutcome::NotConnected);
        assert!(!controller.is_connected());
        assert_eq!(device.pause_count(), 0);
    }

    #[tokio::test]
    async fn repeated_commands_are_idempotent() {
        let device = FakeDevice::new("Living Room TV");
        let backend = FakeBackend::new(vec![device.clone()]);
        let mut controller = controller(&backend);

        assert_eq!(controller.play().await.unwrap(), CommandOutcome::Applied);
        let after_once = device.is_playing();
        assert_eq!(controller.play().await.unwrap(), CommandOutcome::Applied);
        assert_eq!(device.is_playing(), after_once);

        assert_eq!(controller.pause().await.unwrap(), CommandOutcome::Applied);
        assert_eq!(controller.pause().await.unwrap(), CommandOutcome::Applied);
        assert!(!device.is_playing());
        assert_eq!(device.pause_count(), 2);
    }

    #[tokio::test]
    async fn command_failure_surfaces_as_error() {
        let device = FakeDevice::new("Living Room TV");
        let backend = FakeBackend::new(vec![device.clone()]);
        let mut controller = controller(&backend);

        device.fail_commands(true);
        assert!(controller.pause().await.is_err());
        // The connection itself is still considered healthy.
        assert!(controller.is_connected());
    }

    #[test]
    fn disconnect_reasons_read_well_in_logs() {
        let none = DisconnectReason::NotFound { available: vec![] };
        assert_eq!(none.to_string(), "no renderers found");

        let some = DisconnectReason::NotFound {
            available: vec!["Kitchen".to_string(), "Den".to_string()],
        };
        assert_eq!(some.to_string(), "not among discovered renderers [Kitchen, Den]");
    }
}
