//! BLE protocol constants and peer matching for the rex controller

use uuid::Uuid;

// ----------------------------------------------------------------------------
// BLE Service and Characteristic UUIDs
// ----------------------------------------------------------------------------

/// UART-style service exposed by the controller
pub const REX_SERVICE_UUID: Uuid = Uuid::from_u128(0x6E400001_B5A3_F393_E0A9_E50E24DCCA9E);

/// Characteristic the client writes command lines to
pub const REX_TX_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0x6E400002_B5A3_F393_E0A9_E50E24DCCA9E);

/// Characteristic the controller notifies replies on
pub const REX_RX_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0x6E400003_B5A3_F393_E0A9_E50E24DCCA9E);

/// Advertised name prefixes of known controller firmware
pub const DEFAULT_NAME_PREFIXES: [&str; 2] = ["REX", "T-Rex"];

// ----------------------------------------------------------------------------
// Discovery Filter
// ----------------------------------------------------------------------------

/// How candidate peripherals are recognised during a scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryFilter {
    /// Advertised local name starts with one of these prefixes
    NamePrefixes(Vec<String>),
    /// Advertisement lists this service
    Service(Uuid),
}

impl DiscoveryFilter {
    /// Filter on the default controller name prefixes
    pub fn rex() -> Self {
        Self::NamePrefixes(
            DEFAULT_NAME_PREFIXES
                .iter()
                .map(|p| p.to_string())
                .collect(),
        )
    }

    /// Services to hand to the adapter's scan filter
    ///
    /// Name matching scans unfiltered: controller firmware does not always
    /// put the service UUID in its advertisement.
    pub fn scan_services(&self) -> Vec<Uuid> {
        match self {
            DiscoveryFilter::NamePrefixes(_) => Vec::new(),
            DiscoveryFilter::Service(uuid) => vec![*uuid],
        }
    }

    /// Whether an advertisement with this name and service list is a match
    pub fn matches(&self, local_name: Option<&str>, services: &[Uuid]) -> bool {
        match self {
            DiscoveryFilter::NamePrefixes(prefixes) => {
                local_name.is_some_and(|name| matches_prefix(name, prefixes))
            }
            DiscoveryFilter::Service(uuid) => services.contains(uuid),
        }
    }
}

impl Default for DiscoveryFilter {
    fn default() -> Self {
        Self::rex()
    }
}

/// Case-sensitive prefix match against any of `prefixes`
pub fn matches_prefix(name: &str, prefixes: &[String]) -> bool {
    prefixes
        .iter()
        .any(|prefix| !prefix.is_empty() && name.starts_with(prefix.as_str()))
}
