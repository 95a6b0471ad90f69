use async_trait::async_trait;
use relay_device::{CommandOutcome, DeviceController};
use relay_queue::{Disposition, Message, MessageHandler};
use tracing::{debug, info, warn};

use crate::command::Command;

/// Turns queued messages into renderer commands.
///
/// A message stays on the queue (is reported unhandled) when the renderer
/// could not be reached or rejected the command, so it is retried on
/// redelivery. Unknown bodies are consumed.
pub struct CommandHandler {
    controller: DeviceController,
}

impl CommandHandler {
    pub fn new(controller: DeviceController) -> Self {
        Self { controller }
    }

    pub fn controller(&self) -> &DeviceController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut DeviceController {
        &mut self.controller
    }

    pub async fn execute(&mut self, command: &Command) -> Disposition {
        let result = match command {
            Command::Pause => self.controller.pause().await,
            Command::Resume => self.controller.play().await,
            Command::Unknown(raw) => {
                warn!(body = %raw, "ignoring unknown command");
                return Disposition::Handled;
            }
        };

        match result {
            Ok(CommandOutcome::Applied) => {
                info!(%command, device = %self.controller.device_name(), "command executed");
                Disposition::Handled
            }
            Ok(CommandOutcome::NotConnected) => {
                warn!(%command, device = %self.controller.device_name(), "device not connected, leaving command queued");
                Disposition::Unhandled
            }
            Err(e) => {
                warn!(%command, device = %self.controller.device_name(), error = %e, "device rejected command");
                Disposition::Unhandled
            }
        }
    }
}

#[async_trait]
impl MessageHandler for CommandHandler {
    async fn handle(&mut self, message: &Message) -> Disposition {
        debug!(id = %message.id, received_at = %message.received_at, "handling message");
        let command = Command::parse(&message.body);
        self.execute(&command).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_device::testing::{FakeBackend, FakeDevice};

    fn handler(device: &FakeDevice) -> (CommandHandler, FakeBackend) {
        let backend = FakeBackend::new(vec![device.clone()]);
        let controller = DeviceController::new("Living Room TV", backend.clone());
        (CommandHandler::new(controller), backend)
    }

    #[tokio::test]
    async fn resume_plays_and_is_handled() {
        let device = FakeDevice::new("Living Room TV");
        let (mut handler, _) = handler(&device);

        let disposition = handler.handle(&Message::new("1", "r1", "RESUME")).await;

        assert_eq!(disposition, Disposition::Handled);
        assert_eq!(device.play_count(), 1);
        assert!(device.is_playing());
    }

    #[tokio::test]
    async fn pause_pauses_and_is_handled() {
        let device = FakeDevice::new("Living Room TV");
        let (mut handler, _) = handler(&device);

        assert_eq!(handler.execute(&Command::Pause).await, Disposition::Handled);
        assert_eq!(device.pause_count(), 1);
    }

    #[tokio::test]
    async fn unknown_command_is_consumed_without_touching_the_device() {
        let device = FakeDevice::new("Living Room TV");
        let (mut handler, backend) = handler(&device);

        let disposition = handler.handle(&Message::new("1", "r1", "STOP")).await;

        assert_eq!(disposition, Disposition::Handled);
        assert_eq!(backend.list_calls(), 0);
        assert_eq!(device.play_count() + device.pause_count(), 0);
    }

    #[tokio::test]
    async fn unreachable_device_leaves_command_queued() {
        let device = FakeDevice::new("Bedroom");
        let (mut handler, _) = handler(&device);

        assert_eq!(handler.execute(&Command::Resume).await, Disposition::Unhandled);
        assert!(!handler.controller().is_connected());
    }

    #[tokio::test]
    async fn device_failure_leaves_command_queued() {
        let device = FakeDevice::new("Living Room TV");
        device.fail_commands(true);
        let (mut handler, _) = handler(&device);

        assert_eq!(handler.execute(&Command::Pause).await, Disposition::Unhandled);
        assert_eq!(device.pause_count(), 0);
    }
}
