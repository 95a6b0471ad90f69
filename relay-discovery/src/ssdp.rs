//! Minimal SSDP M-SEARCH client.
//!
//! Sends one multicast search and collects every unicast reply that arrives
//! before the socket read timeout. Not part of the public API.

use std::io::ErrorKind;
use std::net::UdpSocket;
use std::time::Duration;

use tracing::debug;

use crate::error::{DiscoveryError, Result};

const MULTICAST_ADDR: &str = "239.255.255.250:1900";

/// The headers of one SSDP search reply that discovery cares about.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SsdpReply {
    pub location: String,
    pub search_target: String,
    pub usn: String,
    pub server: Option<String>,
}

pub(crate) struct SsdpSearch {
    socket: UdpSocket,
}

impl SsdpSearch {
    /// Bind an ephemeral UDP socket whose reads give up after `timeout`.
    pub fn bind(timeout: Duration) -> Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")
            .map_err(|e| DiscoveryError::Network(format!("Failed to bind UDP socket: {}", e)))?;
        socket
            .set_read_timeout(Some(timeout))
            .map_err(|e| DiscoveryError::Network(format!("Failed to set read timeout: {}", e)))?;
        socket
            .set_multicast_loop_v4(true)
            .map_err(|e| DiscoveryError::Network(format!("Failed to set multicast loop: {}", e)))?;

        Ok(Self { socket })
    }

    /// Send an M-SEARCH for `search_target` and gather replies until the socket times out.
    pub fn run(self, search_target: &str) -> Result<Vec<SsdpReply>> {
        let request = m_search_request(search_target);
        self.socket
            .send_to(request.as_bytes(), MULTICAST_ADDR)
            .map_err(|e| DiscoveryError::Network(format!("Failed to send M-SEARCH: {}", e)))?;

        let mut replies = Vec::new();
        let mut buffer = [0u8; 2048];

        loop {
            match self.socket.recv_from(&mut buffer) {
                Ok((size, from)) => {
                    let Ok(text) = std::str::from_utf8(&buffer[..size]) else {
                        debug!(%from, "ignoring non-UTF-8 SSDP datagram");
                        continue;
                    };
                    match parse_reply(text) {
                        Some(reply) => replies.push(reply),
                        None => debug!(%from, "ignoring incomplete SSDP reply"),
                    }
                }
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => break,
                Err(e) => {
                    return Err(DiscoveryError::Network(format!("Socket error: {}", e)));
                }
            }
        }

        Ok(replies)
    }
}

fn m_search_request(search_target: &str) -> String {
    format!(
        "M-SEARCH * HTTP/1.1\r\n\
         HOST: {MULTICAST_ADDR}\r\n\
         MAN: \"ssdp:discover\"\r\n\
         MX: 2\r\n\
         ST: {search_target}\r\n\
         USER-AGENT: playback-relay/0.1 UPnP/1.0\r\n\
         \r\n"
    )
}

/// Parse the response headers; LOCATION, ST and USN are mandatory.
pub(crate) fn parse_reply(text: &str) -> Option<SsdpReply> {
    let mut location = None;
    let mut search_target = None;
    let mut usn = None;
    let mut server = None;

    for line in text.lines() {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim().to_string();
        match name.trim().to_ascii_uppercase().as_str() {
            "LOCATION" => location = Some(value),
            "ST" => search_target = Some(value),
            "USN" => usn = Some(value),
            "SERVER" => server = Some(value),
            _ => {}
        }
    }

    Some(SsdpReply {
        location: location.filter(|l| !l.is_empty())?,
        search_target: search_target?,
        usn: usn?,
        server,
    })
}
