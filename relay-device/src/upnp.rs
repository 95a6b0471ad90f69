//! UPnP AVTransport backend.
//!
//! Discovery and SOAP calls are blocking, so every network round-trip is
//! moved onto tokio's blocking pool.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use relay_discovery::DiscoveryOptions;
use tracing::debug;
use xmltree::Element;

use crate::backend::{DeviceBackend, DeviceDescriptor, DeviceHandle};
use crate::error::{DeviceError, Result};
use crate::soap::{SoapClient, SoapEndpoint, SoapError};

pub const AV_TRANSPORT_URI: &str = "urn:schemas-upnp-org:service:AVTransport:1";

/// UPnP error returned when the renderer is already in the requested state.
const TRANSITION_NOT_AVAILABLE: u16 = 701;

#[derive(Debug, Clone)]
pub struct UpnpConfig {
    pub discovery: DiscoveryOptions,
    /// How long `connect` waits for the renderer to answer
    pub ready_timeout: Duration,
    pub ready_poll_interval: Duration,
}

impl Default for UpnpConfig {
    fn default() -> Self {
        Self {
            discovery: DiscoveryOptions::default(),
            ready_timeout: Duration::from_secs(10),
            ready_poll_interval: Duration::from_millis(500),
        }
    }
}

pub struct UpnpBackend {
    config: UpnpConfig,
    soap: SoapClient,
}

impl UpnpBackend {
    pub fn new(config: UpnpConfig) -> Self {
        Self {
            config,
            soap: SoapClient::new(),
        }
    }
}

#[async_trait]
impl DeviceBackend for UpnpBackend {
    async fn list_devices(&self) -> Result<Vec<DeviceDescriptor>> {
        let options = self.config.discovery.clone();
        let devices = blocking(move || relay_discovery::discover(&options).map_err(DeviceError::from)).await?;
        Ok(devices.into_iter().map(DeviceDescriptor::from).collect())
    }

    async fn connect(&self, descriptor: &DeviceDescriptor) -> Result<Box<dyn DeviceHandle>> {
        let renderer = UpnpRenderer::new(descriptor.clone(), self.soap.clone());
        renderer
            .wait_until_ready(self.config.ready_timeout, self.config.ready_poll_interval)
            .await?;
        Ok(Box::new(renderer))
    }
}

/// Control handle on one renderer's AVTransport service.
pub struct UpnpRenderer {
    name: String,
    endpoint: SoapEndpoint,
    soap: SoapClient,
}

impl UpnpRenderer {
    pub fn new(descriptor: DeviceDescriptor, soap: SoapClient) -> Self {
        Self {
            endpoint: SoapEndpoint {
                host: descriptor.host,
                port: descriptor.port,
                control_path: descriptor.control_path,
            },
            name: descriptor.name,
            soap,
        }
    }

    async fn invoke(&self, action: &'static str, payload: String) -> Result<Element> {
        let soap = self.soap.clone();
        let endpoint = self.endpoint.clone();
        blocking(move || {
            soap.call(&endpoint, AV_TRANSPORT_URI, action, &payload)
                .map_err(DeviceError::from)
        })
        .await
    }

    /// Current `CurrentTransportState`, e.g. `PLAYING` or `PAUSED_PLAYBACK`.
    pub async fn transport_state(&self) -> Result<String> {
        let response = self.invoke("GetTransportInfo", instance_payload()).await?;
        response
            .get_child("CurrentTransportState")
            .and_then(|state| state.get_text())
            .map(|state| state.into_owned())
            .ok_or_else(|| SoapError::Parse("Missing CurrentTransportState".to_string()).into())
    }

    async fn wait_until_ready(&self, timeout: Duration, interval: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.transport_state().await {
                Ok(state) => {
                    debug!(device = %self.name, %state, "renderer ready");
                    return Ok(());
                }
                Err(e) if Instant::now() + interval < deadline => {
                    debug!(device = %self.name, error = %e, "renderer not ready yet");
                    tokio::time::sleep(interval).await;
                }
                Err(e) => {
                    return Err(DeviceError::NotReady {
                        name: self.name.clone(),
                        waited: timeout,
                        last_error: e.to_string(),
                    });
                }
            }
        }
    }

    async fn transition(&self, action: &'static str, payload: String) -> Result<()> {
        match self.invoke(action, payload).await {
            Ok(_) => Ok(()),
            Err(e) if already_in_state(&e) => {
                debug!(device = %self.name, action, "renderer already in requested state");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl DeviceHandle for UpnpRenderer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn is_active(&self) -> bool {
        match self.transport_state().await {
            Ok(_) => true,
            Err(e) => {
                debug!(device = %self.name, error = %e, "active check failed");
                false
            }
        }
    }

    async fn play(&self) -> Result<()> {
        self.transition("Play", play_payload()).await
    }

    async fn pause(&self) -> Result<()> {
        self.transition("Pause", instance_payload()).await
    }
}

fn instance_payload() -> String {
    "<InstanceID>0</InstanceID>".to_string()
}

fn play_payload() -> String {
    "<InstanceID>0</InstanceID><Speed>1</Speed>".to_string()
}

fn already_in_state(error: &DeviceError) -> bool {
    matches!(error, DeviceError::Soap(SoapError::Fault(TRANSITION_NOT_AVAILABLE)))
}

async fn blocking<T, F>(call: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(call)
        .await
        .map_err(|e| DeviceError::Task(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server, ServerGuard};
    use rstest::rstest;

    const CONTROL_PATH: &str = "/MediaRenderer/AVTransport/Control";

    fn renderer(server: &ServerGuard) -> UpnpRenderer {
        let address = server.host_with_port();
        let (host, port) = address.rsplit_once(':').unwrap();
        UpnpRenderer::new(
            DeviceDescriptor {
                id: "uuid:RINCON_TEST".to_string(),
                name: "Living Room TV".to_string(),
                model_name: "Sonos One".to_string(),
                host: host.to_string(),
                port: port.parse().unwrap(),
                control_path: CONTROL_PATH.to_string(),
            },
            SoapClient::new(),
        )
    }

    fn action_response(action: &str, inner: &str) -> String {
        format!(
            r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"><s:Body><u:{action}Response xmlns:u="{AV_TRANSPORT_URI}">{inner}</u:{action}Response></s:Body></s:Envelope>"#
        )
    }

    fn fault(code: u16) -> String {
        format!(
            r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"><s:Body><s:Fault><faultcode>s:Client</faultcode><faultstring>UPnPError</faultstring><detail><UPnPError xmlns="urn:schemas-upnp-org:control-1-0"><errorCode>{code}</errorCode></UPnPError></detail></s:Fault></s:Body></s:Envelope>"#
        )
    }

    fn soap_action(action: &str) -> String {
        format!("\"{}#{}\"", AV_TRANSPORT_URI, action)
    }

    #[test]
    fn payloads_target_instance_zero() {
        assert_eq!(instance_payload(), "<InstanceID>0</InstanceID>");
        assert_eq!(play_payload(), "<InstanceID>0</InstanceID><Speed>1</Speed>");
    }

    #[rstest]
    #[case(DeviceError::Soap(SoapError::Fault(701)), true)]
    #[case(DeviceError::Soap(SoapError::Fault(501)), false)]
    #[case(DeviceError::Soap(SoapError::Fault(714)), false)]
    #[case(DeviceError::Soap(SoapError::Network("down".to_string())), false)]
    #[case(DeviceError::Task("cancelled".to_string()), false)]
    fn only_fault_701_counts_as_already_in_state(#[case] error: DeviceError, #[case] expected: bool) {
        assert_eq!(already_in_state(&error), expected);
    }

    #[tokio::test]
    async fn play_sends_play_action() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", CONTROL_PATH)
            .match_header("soapaction", soap_action("Play").as_str())
            .match_body(Matcher::Regex("<Speed>1</Speed>".to_string()))
            .with_status(200)
            .with_body(action_response("Play", ""))
            .create_async()
            .await;

        renderer(&server).play().await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn pause_when_already_paused_is_not_an_error() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", CONTROL_PATH)
            .match_header("soapaction", soap_action("Pause").as_str())
            .with_status(500)
            .with_body(fault(701))
            .expect(2)
            .create_async()
            .await;

        let renderer = renderer(&server);
        renderer.pause().await.unwrap();
        renderer.pause().await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn other_faults_are_errors() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", CONTROL_PATH)
            .with_status(500)
            .with_body(fault(714))
            .create_async()
            .await;

        let err = renderer(&server).pause().await.unwrap_err();
        assert!(matches!(err, DeviceError::Soap(SoapError::Fault(714))));
    }

    #[tokio::test]
    async fn active_check_reads_transport_state() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", CONTROL_PATH)
            .match_header("soapaction", soap_action("GetTransportInfo").as_str())
            .with_status(200)
            .with_body(action_response(
                "GetTransportInfo",
                "<CurrentTransportState>PAUSED_PLAYBACK</CurrentTransportState><CurrentTransportStatus>OK</CurrentTransportStatus><CurrentSpeed>1</CurrentSpeed>",
            ))
            .create_async()
            .await;

        let renderer = renderer(&server);
        assert_eq!(renderer.transport_state().await.unwrap(), "PAUSED_PLAYBACK");
        assert!(renderer.is_active().await);
    }

    #[tokio::test]
    async fn unreachable_renderer_is_inactive_and_never_ready() {
        let unreachable = UpnpRenderer::new(
            DeviceDescriptor {
                id: "uuid:gone".to_string(),
                name: "Gone".to_string(),
                model_name: String::new(),
                host: "127.0.0.1".to_string(),
                port: 9,
                control_path: CONTROL_PATH.to_string(),
            },
            SoapClient::new(),
        );

        assert!(!unreachable.is_active().await);

        let err = unreachable
            .wait_until_ready(Duration::from_millis(50), Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, DeviceError::NotReady { .. }));
    }
}
