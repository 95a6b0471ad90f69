//! In-memory renderer doubles for exercising code that drives a
//! [`DeviceController`](crate::DeviceController) without a network.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::backend::{DeviceBackend, DeviceDescriptor, DeviceHandle};
use crate::error::{DeviceError, Result};
use crate::soap::SoapError;

#[derive(Debug)]
struct DeviceState {
    name: String,
    active: AtomicBool,
    playing: AtomicBool,
    fail_commands: AtomicBool,
    plays: AtomicUsize,
    pauses: AtomicUsize,
}

/// A renderer whose state is shared between every clone, so a test can keep
/// one clone while the controller owns another.
#[derive(Debug, Clone)]
pub struct FakeDevice {
    state: Arc<DeviceState>,
}

impl FakeDevice {
    pub fn new(name: &str) -> Self {
        Self {
            state: Arc::new(DeviceState {
                name: name.to_string(),
                active: AtomicBool::new(true),
                playing: AtomicBool::new(false),
                fail_commands: AtomicBool::new(false),
                plays: AtomicUsize::new(0),
                pauses: AtomicUsize::new(0),
            }),
        }
    }

    pub fn set_active(&self, active: bool) {
        self.state.active.store(active, Ordering::SeqCst);
    }

    pub fn fail_commands(&self, fail: bool) {
        self.state.fail_commands.store(fail, Ordering::SeqCst);
    }

    pub fn is_playing(&self) -> bool {
        self.state.playing.load(Ordering::SeqCst)
    }

    pub fn play_count(&self) -> usize {
        self.state.plays.load(Ordering::SeqCst)
    }

    pub fn pause_count(&self) -> usize {
        self.state.pauses.load(Ordering::SeqCst)
    }

    fn descriptor(&self, index: usize) -> DeviceDescriptor {
        DeviceDescriptor {
            id: format!("uuid:fake-{}", index),
            name: self.state.name.clone(),
            model_name: "Fake Renderer".to_string(),
            host: format!("10.0.0.{}", index + 10),
            port: 1400,
            control_path: "/AVTransport/Control".to_string(),
        }
    }

    fn check_commands(&self) -> Result<()> {
        if self.state.fail_commands.load(Ordering::SeqCst) {
            Err(DeviceError::Soap(SoapError::Network("injected command failure".to_string())))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DeviceHandle for FakeDevice {
    fn name(&self) -> &str {
        &self.state.name
    }

    async fn is_active(&self) -> bool {
        self.state.active.load(Ordering::SeqCst)
    }

    async fn play(&self) -> Result<()> {
        self.check_commands()?;
        self.state.plays.fetch_add(1, Ordering::SeqCst);
        self.state.playing.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        self.check_commands()?;
        self.state.pauses.fetch_add(1, Ordering::SeqCst);
        self.state.playing.store(false, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Debug, Default)]
struct BackendState {
    devices: Mutex<Vec<FakeDevice>>,
    list_calls: AtomicUsize,
    connect_calls: AtomicUsize,
    fail_discovery: AtomicBool,
    fail_connect: AtomicBool,
    reactivate_on_connect: AtomicBool,
}

/// A backend that "discovers" a fixed set of [`FakeDevice`]s.
#[derive(Debug, Clone, Default)]
pub struct FakeBackend {
    state: Arc<BackendState>,
}

impl FakeBackend {
    pub fn new(devices: Vec<FakeDevice>) -> Self {
        let backend = Self::default();
        if let Ok(mut known) = backend.state.devices.lock() {
            *known = devices;
        }
        backend
    }

    pub fn list_calls(&self) -> usize {
        self.state.list_calls.load(Ordering::SeqCst)
    }

    pub fn connect_calls(&self) -> usize {
        self.state.connect_calls.load(Ordering::SeqCst)
    }

    pub fn fail_discovery(&self, fail: bool) {
        self.state.fail_discovery.store(fail, Ordering::SeqCst);
    }

    pub fn fail_connect(&self, fail: bool) {
        self.state.fail_connect.store(fail, Ordering::SeqCst);
    }

    /// Mark a device active again whenever it is (re)connected.
    pub fn on_connect_reactivate(&self, reactivate: bool) {
        self.state.reactivate_on_connect.store(reactivate, Ordering::SeqCst);
    }

    pub fn remove_all(&self) {
        if let Ok(mut known) = self.state.devices.lock() {
            known.clear();
        }
    }

    fn devices(&self) -> Vec<FakeDevice> {
        self.state.devices.lock().map(|known| known.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl DeviceBackend for FakeBackend {
    async fn list_devices(&self) -> Result<Vec<DeviceDescriptor>> {
        self.state.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_discovery.load(Ordering::SeqCst) {
            return Err(DeviceError::Discovery(relay_discovery::DiscoveryError::Network(
                "injected discovery failure".to_string(),
            )));
        }

        Ok(self
            .devices()
            .iter()
            .enumerate()
            .map(|(index, device)| device.descriptor(index))
            .collect())
    }

    async fn connect(&self, descriptor: &DeviceDescriptor) -> Result<Box<dyn DeviceHandle>> {
        self.state.connect_calls.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_connect.load(Ordering::SeqCst) {
            return Err(DeviceError::Soap(SoapError::Network("injected connect failure".to_string())));
        }

        let device = self
            .devices()
            .into_iter()
            .find(|device| device.state.name == descriptor.name)
            .ok_or_else(|| DeviceError::Soap(SoapError::Network(format!("{} went away", descriptor.name))))?;

        if self.state.reactivate_on_connect.load(Ordering::SeqCst) {
            device.set_active(true);
        }

        Ok(Box::new(device))
    }
}
