use relay_device::DeviceController;
use relay_queue::{PollerConfig, QueuePoller, QueueService};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::handler::CommandHandler;

/// A queue poller wired to a renderer controller.
pub struct Relay<Q> {
    queue: Q,
    poller: QueuePoller,
    handler: CommandHandler,
}

impl<Q: QueueService> Relay<Q> {
    pub fn new(queue: Q, controller: DeviceController, config: PollerConfig) -> Self {
        Self {
            queue,
            poller: QueuePoller::new(config),
            handler: CommandHandler::new(controller),
        }
    }

    /// Try to reach the renderer once before polling starts. Returns whether
    /// it is connected; a failure here only means commands wait on the queue.
    pub async fn probe(&mut self) -> bool {
        let controller = self.handler.controller_mut();
        let connected = controller.ensure_handle().await.is_connected();
        if let Some(device) = controller.connected_device().filter(|_| connected) {
            info!(device = %device.name, id = %device.id, model = %device.model_name, "renderer active");
        } else {
            warn!(device = %controller.device_name(), "renderer not reachable yet, commands stay queued until it is");
        }
        connected
    }

    /// Poll until `cancel` fires or the queue fails.
    pub async fn run(&mut self, cancel: &CancellationToken) -> relay_queue::Result<()> {
        self.poller.run(&self.queue, &mut self.handler, cancel).await
    }

    pub fn queue(&self) -> &Q {
        &self.queue
    }

    pub fn controller(&self) -> &DeviceController {
        self.handler.controller()
    }
}
