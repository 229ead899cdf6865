//! BLE link configuration

use std::time::Duration;

use rexlink_core::config::duration_ms;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::protocol::{
    DiscoveryFilter, DEFAULT_NAME_PREFIXES, REX_RX_CHARACTERISTIC_UUID, REX_SERVICE_UUID,
    REX_TX_CHARACTERISTIC_UUID,
};

// ----------------------------------------------------------------------------
// Configuration
// ----------------------------------------------------------------------------

/// Configuration for the BLE link manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BleLinkConfig {
    /// Advertised name prefixes accepted during discovery
    pub name_prefixes: Vec<String>,
    /// Match on the advertised service instead of the name
    pub match_service: bool,
    pub service_uuid: Uuid,
    /// Characteristic commands are written to
    pub tx_uuid: Uuid,
    /// Characteristic replies are notified on
    pub rx_uuid: Uuid,
    /// Give up discovery after this long
    #[serde(with = "duration_ms", rename = "scan_timeout_ms")]
    pub scan_timeout: Duration,
    /// Maximum time to wait for the GATT connection
    #[serde(with = "duration_ms", rename = "connection_timeout_ms")]
    pub connection_timeout: Duration,
    /// Use acknowledged writes on the TX characteristic
    pub write_with_response: bool,
}

impl Default for BleLinkConfig {
    fn default() -> Self {
        Self {
            name_prefixes: DEFAULT_NAME_PREFIXES.iter().map(|p| p.to_string()).collect(),
            match_service: false,
            service_uuid: REX_SERVICE_UUID,
            tx_uuid: REX_TX_CHARACTERISTIC_UUID,
            rx_uuid: REX_RX_CHARACTERISTIC_UUID,
            scan_timeout: Duration::from_secs(10),
            connection_timeout: Duration::from_secs(5),
            write_with_response: true,
        }
    }
}

impl BleLinkConfig {
    /// Create a new configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set accepted name prefixes
    pub fn with_name_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.name_prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    /// Discover by advertised service rather than by name
    pub fn with_match_service(mut self, enabled: bool) -> Self {
        self.match_service = enabled;
        self
    }

    /// Set scan timeout
    pub fn with_scan_timeout(mut self, timeout: Duration) -> Self {
        self.scan_timeout = timeout;
        self
    }

    /// Set connection timeout
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    pub fn with_write_with_response(mut self, enabled: bool) -> Self {
        self.write_with_response = enabled;
        self
    }

    /// Discovery filter described by this configuration
    pub fn discovery_filter(&self) -> DiscoveryFilter {
        if self.match_service || self.name_prefixes.is_empty() {
            DiscoveryFilter::Service(self.service_uuid)
        } else {
            DiscoveryFilter::NamePrefixes(self.name_prefixes.clone())
        }
    }
}
