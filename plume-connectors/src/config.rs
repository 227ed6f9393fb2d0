//! Connector configuration
//!
//! Typed configuration for the receiver subscription and the location
//! fetch, loadable from a JSON document or assembled with the builder
//! setters.

use serde::Deserialize;

fn default_broker_port() -> u16 {
    1883
}

fn default_client_id() -> String {
    format!("plume-monitor-{}", std::process::id())
}

fn default_keep_alive() -> u64 {
    30
}

fn default_timeout() -> u64 {
    30
}

/// Event receiver subscription parameters
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReceiverConfig {
    /// Broker host name or address
    pub broker_host: String,
    /// Broker port
    #[serde(default = "default_broker_port")]
    pub broker_port: u16,
    /// Topic carrying the sensor readings
    pub topic: String,
    /// Client id presented to the broker
    #[serde(default = "default_client_id")]
    pub client_id: String,
    /// Keep-alive interval in seconds
    #[serde(default = "default_keep_alive")]
    pub keep_alive_secs: u64,
}

impl ReceiverConfig {
    /// Configuration for `topic` on `broker_host` with defaults elsewhere
    pub fn new(broker_host: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            broker_host: broker_host.into(),
            broker_port: default_broker_port(),
            topic: topic.into(),
            client_id: default_client_id(),
            keep_alive_secs: default_keep_alive(),
        }
    }

    /// Set the broker port
    pub fn broker_port(mut self, port: u16) -> Self {
        self.broker_port = port;
        self
    }

    /// Set the client id
    pub fn client_id(mut self, id: impl Into<String>) -> Self {
        self.client_id = id.into();
        self
    }

    /// Set the keep-alive interval in seconds
    pub fn keep_alive_secs(mut self, secs: u64) -> Self {
        self.keep_alive_secs = secs;
        self
    }
}

/// Location list fetch parameters
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LocationsConfig {
    /// URL of the locations document
    pub url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl LocationsConfig {
    /// Configuration for the document at `url` with a default timeout
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout_secs: default_timeout(),
        }
    }

    /// Set the request timeout in seconds
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}
