//! Minimal SOAP client for UPnP control requests.

use std::time::Duration;

use thiserror::Error;
use xmltree::Element;

/// Errors that can occur during SOAP communication
#[derive(Debug, Error)]
pub enum SoapError {
    /// Connection, timeout or non-fault HTTP failure
    #[error("Network/HTTP error: {0}")]
    Network(String),

    /// The response was not a well-formed SOAP envelope
    #[error("XML parsing error: {0}")]
    Parse(String),

    /// The device answered with a SOAP fault carrying this UPnP error code
    #[error("SOAP fault: error code {0}")]
    Fault(u16),
}

/// Where a control request is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoapEndpoint {
    pub host: String,
    pub port: u16,
    pub control_path: String,
}

impl SoapEndpoint {
    fn url(&self) -> String {
        format!("http://{}:{}{}", self.host, self.port, self.control_path)
    }
}

#[derive(Debug, Clone)]
pub struct SoapClient {
    agent: ureq::Agent,
}

impl SoapClient {
    pub fn new() -> Self {
        Self {
            agent: ureq::AgentBuilder::new()
                .timeout_connect(Duration::from_secs(5))
                .timeout_read(Duration::from_secs(10))
                .build(),
        }
    }

    /// Invoke `action` on `service_uri` and return the `<{action}Response>` element.
    pub fn call(
        &self,
        endpoint: &SoapEndpoint,
        service_uri: &str,
        action: &str,
        payload: &str,
    ) -> Result<Element, SoapError> {
        let body = envelope(service_uri, action, payload);
        let soap_action = format!("\"{}#{}\"", service_uri, action);

        let response = self
            .agent
            .post(&endpoint.url())
            .set("Content-Type", "text/xml; charset=\"utf-8\"")
            .set("SOAPACTION", &soap_action)
            .send_string(&body);

        // UPnP faults arrive as HTTP 500 with an envelope in the body.
        let xml_text = match response {
            Ok(response) => response.into_string(),
            Err(ureq::Error::Status(_, response)) => response.into_string(),
            Err(e) => return Err(SoapError::Network(e.to_string())),
        }
        .map_err(|e| SoapError::Network(e.to_string()))?;

        let xml = Element::parse(xml_text.as_bytes()).map_err(|e| SoapError::Parse(e.to_string()))?;

        extract_response(&xml, action)
    }
}

impl Default for SoapClient {
    fn default() -> Self {
        Self::new()
    }
}

fn envelope(service_uri: &str, action: &str, payload: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?><s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/" s:encodingStyle="http://schemas.xmlsoap.org/soap/encoding/"><s:Body><u:{action} xmlns:u="{service_uri}">{payload}</u:{action}></s:Body></s:Envelope>"#
    )
}

fn extract_response(xml: &Element, action: &str) -> Result<Element, SoapError> {
    let body = xml
        .get_child("Body")
        .ok_or_else(|| SoapError::Parse("Missing SOAP Body".to_string()))?;

    if let Some(fault) = body.get_child("Fault") {
        let error_code = fault
            .get_child("detail")
            .and_then(|d| d.get_child("UPnPError"))
            .and_then(|e| e.get_child("errorCode"))
            .and_then(|c| c.get_text())
            .and_then(|t| t.trim().parse::<u16>().ok())
            .unwrap_or(500);
        return Err(SoapError::Fault(error_code));
    }

    let response_name = format!("{}Response", action);
    body.get_child(response_name.as_str())
        .cloned()
        .ok_or_else(|| SoapError::Parse(format!("Missing {} element", response_name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn parse(xml: &str) -> Element {
        Element::parse(xml.as_bytes()).unwrap()
    }

    #[test]
    fn envelope_wraps_payload_in_action() {
        let body = envelope(
            "urn:schemas-upnp-org:service:AVTransport:1",
            "Pause",
            "<InstanceID>0</InstanceID>",
        );

        let xml = parse(&body);
        let action = xml.get_child("Body").and_then(|b| b.get_child("Pause")).unwrap();
        assert_eq!(
            action.get_child("InstanceID").and_then(|e| e.get_text()).as_deref(),
            Some("0")
        );
    }

    #[test]
    fn extracts_action_response() {
        let xml = parse(
            r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
                <s:Body>
                    <u:GetTransportInfoResponse xmlns:u="urn:schemas-upnp-org:service:AVTransport:1">
                        <CurrentTransportState>PLAYING</CurrentTransportState>
                    </u:GetTransportInfoResponse>
                </s:Body>
            </s:Envelope>"#,
        );

        let response = extract_response(&xml, "GetTransportInfo").unwrap();
        assert_eq!(response.name, "GetTransportInfoResponse");
    }

    #[rstest]
    #[case("<detail><UPnPError xmlns=\"urn:schemas-upnp-org:control-1-0\"><errorCode>701</errorCode></UPnPError></detail>", 701)]
    #[case("<detail><UPnPError xmlns=\"urn:schemas-upnp-org:control-1-0\"><errorCode> 714 </errorCode></UPnPError></detail>", 714)]
    #[case("<detail><UPnPError xmlns=\"urn:schemas-upnp-org:control-1-0\"><errorCode>n/a</errorCode></UPnPError></detail>", 500)]
    #[case("", 500)]
    fn fault_carries_upnp_error_code(#[case] detail: &str, #[case] expected: u16) {
        let xml = parse(&format!(
            r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"><s:Body><s:Fault><faultcode>s:Client</faultcode><faultstring>UPnPError</faultstring>{}</s:Fault></s:Body></s:Envelope>"#,
            detail
        ));

        match extract_response(&xml, "Pause") {
            Err(SoapError::Fault(code)) => assert_eq!(code, expected),
            other => panic!("expected fault, got {:?}", other),
        }
    }

    #[test]
    fn missing_body_or_response_is_a_parse_error() {
        let no_body = parse(r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"></s:Envelope>"#);
        match extract_response(&no_body, "Play") {
            Err(SoapError::Parse(msg)) => assert!(msg.contains("Missing SOAP Body")),
            other => panic!("expected parse error, got {:?}", other),
        }

        let empty = parse(r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"><s:Body/></s:Envelope>"#);
        match extract_response(&empty, "Play") {
            Err(SoapError::Parse(msg)) => assert!(msg.contains("Missing PlayResponse element")),
            other => panic!("expected parse error, got {:?}", other),
        }
    }
}
