//! Search, deduplicate, fetch and filter.

use std::collections::HashSet;

use tracing::{debug, info};

use crate::device::DeviceDescription;
use crate::error::{DiscoveryError, Result};
use crate::ssdp::{SsdpReply, SsdpSearch};
use crate::{Device, DiscoveryOptions};

/// Run one SSDP search and return every controllable renderer that replied.
///
/// Individual responders whose description cannot be fetched or parsed are
/// skipped; only a failure to run the search itself is an error.
pub fn discover(options: &DiscoveryOptions) -> Result<Vec<Device>> {
    let replies = SsdpSearch::bind(options.timeout)?.run(&options.search_target)?;
    debug!(replies = replies.len(), target = %options.search_target, "SSDP search finished");

    let http = reqwest::blocking::Client::builder()
        .timeout(options.timeout)
        .build()
        .map_err(|e| DiscoveryError::Network(format!("Failed to create HTTP client: {}", e)))?;

    let devices = resolve(replies, |location| fetch_description(&http, location));
    info!(count = devices.len(), "discovered controllable renderers");
    Ok(devices)
}

fn fetch_description(http: &reqwest::blocking::Client, location: &str) -> Result<String> {
    http.get(location)
        .send()
        .and_then(|response| response.error_for_status())
        .and_then(|response| response.text())
        .map_err(|e| DiscoveryError::Network(format!("Failed to fetch {}: {}", location, e)))
}

/// Turn SSDP replies into devices, fetching each distinct location once.
pub(crate) fn resolve<F>(replies: Vec<SsdpReply>, mut fetch: F) -> Vec<Device>
where
    F: FnMut(&str) -> Result<String>,
{
    let mut seen = HashSet::new();
    let mut devices = Vec::new();

    for reply in replies {
        if !seen.insert(reply.location.clone()) {
            continue;
        }

        let description = match fetch(&reply.location).and_then(|xml| DeviceDescription::from_xml(&xml)) {
            Ok(description) => description,
            Err(e) => {
                debug!(location = %reply.location, error = %e, "skipping responder");
                continue;
            }
        };

        match description.into_device(&reply.location) {
            Some(device) if devices.iter().all(|known: &Device| known.id != device.id) => {
                devices.push(device)
            }
            Some(_) => {}
            None => debug!(location = %reply.location, usn = %reply.usn, "responder has no AVTransport service"),
        }
    }

    devices
}
