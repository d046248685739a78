//! Host radio and transport configuration

use std::time::Duration;

use brainclaw_embedded::Endpoint;

/// WebSocket transport configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WsConfig {
    /// Relay server host
    pub host: String,
    /// Relay server port
    pub port: u16,
    /// Request path; the relay identifies producers by `role=producer`
    pub path: String,
    /// Delay between reconnect attempts
    pub reconnect_interval: Duration,
    /// Messages buffered between the scheduler and the socket task
    pub send_buffer: usize,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8765,
            path: "/?role=producer".to_string(),
            reconnect_interval: Duration::from_secs(3),
            send_buffer: brainclaw_core::RELAY_CAPACITY,
        }
    }
}

impl WsConfig {
    /// Borrow as a transport endpoint
    pub fn endpoint(&self) -> Endpoint<'_> {
        Endpoint { host: &self.host, port: self.port, path: &self.path }
    }
}

/// Build a `ws://` URL for an endpoint.
pub fn ws_url(endpoint: &Endpoint<'_>) -> String {
    let path = if endpoint.path.starts_with('/') {
        endpoint.path.to_string()
    } else {
        format!("/{}", endpoint.path)
    };
    format!("ws://{}:{}{}", endpoint.host, endpoint.port, path)
}

/// Host BLE configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BleConfig {
    /// Which Bluetooth adapter to use
    pub adapter_index: usize,
    /// Upper bound on connect plus service discovery
    pub connect_timeout: Duration,
}

impl Default for BleConfig {
    fn default() -> Self {
        Self {
            adapter_index: 0,
            connect_timeout: Duration::from_secs(10),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_url() {
        let config = WsConfig::default();
        assert_eq!(ws_url(&config.endpoint()), "ws://127.0.0.1:8765/?role=producer");
    }

    #[test]
    fn test_url_adds_leading_slash() {
        let endpoint = Endpoint { host: "relay.local", port: 9000, path: "ingest" };
        assert_eq!(ws_url(&endpoint), "ws://relay.local:9000/ingest");
    }
}
