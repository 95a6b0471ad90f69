//! UPnP device description parsing.
//!
//! A renderer is only useful to the relay if it (or one of its embedded
//! devices) exposes an AVTransport service, so the description is searched
//! depth-first for that service and its control URL.

use serde::Deserialize;

use crate::error::{DiscoveryError, Result};
use crate::Device;

/// Service type prefix of the UPnP AVTransport service.
pub const AV_TRANSPORT_SERVICE: &str = "urn:schemas-upnp-org:service:AVTransport";

#[derive(Debug, Deserialize)]
struct Root {
    #[serde(rename = "URLBase")]
    url_base: Option<String>,
    device: DeviceDescription,
}

/// One `<device>` element of a description document.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDescription {
    pub device_type: String,
    pub friendly_name: String,
    #[serde(default)]
    pub manufacturer: String,
    #[serde(default)]
    pub model_name: String,
    #[serde(rename = "UDN")]
    pub udn: String,
    pub room_name: Option<String>,
    pub service_list: Option<ServiceList>,
    pub device_list: Option<DeviceList>,
    /// `<URLBase>` of the enclosing document, set on the root device only
    #[serde(skip)]
    pub url_base: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ServiceList {
    #[serde(rename = "service", default)]
    pub services: Vec<ServiceDescription>,
}

#[derive(Debug, Deserialize)]
pub struct DeviceList {
    #[serde(rename = "device", default)]
    pub devices: Vec<DeviceDescription>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDescription {
    pub service_type: String,
    #[serde(rename = "controlURL")]
    pub control_url: String,
}

impl DeviceDescription {
    pub fn from_xml(xml: &str) -> Result<Self> {
        let root: Root = quick_xml::de::from_str(xml)
            .map_err(|e| DiscoveryError::Parse(format!("Failed to parse device XML: {}", e)))?;
        let mut device = root.device;
        device.url_base = root.url_base.filter(|base| !base.trim().is_empty());
        Ok(device)
    }

    /// Find the AVTransport service on this device or any embedded device.
    pub fn av_transport(&self) -> Option<&ServiceDescription> {
        let own = self
            .service_list
            .iter()
            .flat_map(|list| list.services.iter())
            .find(|service| service.service_type.starts_with(AV_TRANSPORT_SERVICE));

        own.or_else(|| {
            self.device_list
                .iter()
                .flat_map(|list| list.devices.iter())
                .find_map(DeviceDescription::av_transport)
        })
    }

    /// Build the public [`Device`] for a description fetched from `location`.
    ///
    /// Returns `None` when the location has no usable host or the device
    /// cannot be controlled.
    ///
    /// A relative control URL is resolved against `<URLBase>` when the
    /// document has one, else against `location`.
    pub fn into_device(self, location: &str) -> Option<Device> {
        let base = self.url_base.as_deref().unwrap_or(location);
        let control_url = resolve_url(base, &self.av_transport()?.control_url)?;
        let (host, port) = host_and_port(&control_url)?;
        let path = url_path(&control_url).to_string();

        Some(Device {
            id: self.udn,
            name: self.friendly_name,
            room_name: self.room_name,
            model_name: self.model_name,
            manufacturer: self.manufacturer,
            host,
            port,
            location: location.to_string(),
            control_path: path,
        })
    }
}

/// Split `http://host:port/path` into host and port (port defaults to 80).
pub fn host_and_port(url: &str) -> Option<(String, u16)> {
    let rest = url.split_once("://")?.1;
    let authority = rest.split('/').next()?;
    if authority.is_empty() {
        return None;
    }

    match authority.rsplit_once(':') {
        Some((host, port)) => Some((host.to_string(), port.parse().ok()?)),
        None => Some((authority.to_string(), 80)),
    }
}

/// Resolve `reference` against the absolute URL `base`.
fn resolve_url(base: &str, reference: &str) -> Option<String> {
    if reference.contains("://") {
        return Some(reference.to_string());
    }

    let (scheme, rest) = base.split_once("://")?;
    let authority = rest.split('/').next()?;
    let path = if reference.starts_with('/') {
        reference.to_string()
    } else {
        let base_path = url_path(base);
        let directory = &base_path[..base_path.rfind('/').map_or(0, |idx| idx + 1)];
        format!("{}{}", directory, reference)
    };

    Some(format!("{}://{}{}", scheme, authority, path))
}

/// Path of an absolute URL, `/` when it has none.
fn url_path(url: &str) -> &str {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    rest.find('/').map_or("/", |idx| &rest[idx..])
}
