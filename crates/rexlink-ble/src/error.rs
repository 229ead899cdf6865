//! Error types for the BLE link

use rexlink_core::LinkError;
use thiserror::Error;

// ----------------------------------------------------------------------------
// Error Types
// ----------------------------------------------------------------------------

/// Errors specific to the BLE link
#[derive(Error, Debug)]
pub enum BleLinkError {
    #[error("BLE adapter not available")]
    AdapterNotAvailable,

    #[error("Failed to create BLE manager: {0}")]
    ManagerUnavailable(String),

    #[error("Failed to scan: {0}")]
    ScanFailed(String),

    #[error("Scan stopped before a matching peer was found")]
    ScanCancelled,

    #[error("Scan timed out without a matching peer")]
    ScanTimeout,

    #[error("Failed to connect to peer: {0}")]
    ConnectionFailed(String),

    #[error("Connection timeout")]
    ConnectionTimeout,

    #[error("Failed to discover services: {0}")]
    ServiceDiscoveryFailed(String),

    #[error("Characteristic not found: {characteristic}")]
    CharacteristicNotFound { characteristic: String },

    #[error("Failed to subscribe to notifications: {0}")]
    SubscriptionFailed(String),

    #[error("Failed to get BLE events: {0}")]
    EventStreamFailed(String),
}

impl From<BleLinkError> for LinkError {
    fn from(err: BleLinkError) -> Self {
        match err {
            BleLinkError::AdapterNotAvailable | BleLinkError::ManagerUnavailable(_) => {
                LinkError::UnsupportedTransport(err.to_string())
            }
            BleLinkError::ScanCancelled | BleLinkError::ScanTimeout => {
                LinkError::DiscoveryCancelled
            }
            BleLinkError::ConnectionFailed(_)
            | BleLinkError::ConnectionTimeout
            | BleLinkError::ServiceDiscoveryFailed(_)
            | BleLinkError::CharacteristicNotFound { .. }
            | BleLinkError::SubscriptionFailed(_)
            | BleLinkError::EventStreamFailed(_)
            // the adapter exists but refused to scan, e.g. powered off
            | BleLinkError::ScanFailed(_) => LinkError::BindingFailed(err.to_string()),
        }
    }
}

// ----------------------------------------------------------------------------
// Write Error Classification
// ----------------------------------------------------------------------------

/// Map a failed characteristic write onto the link taxonomy
///
/// Platform stacks report "operation in progress" in different words; those
/// become [`LinkError::TransientBusy`] so the write queue retries once.
pub fn classify_write_error(err: btleplug::Error) -> LinkError {
    match err {
        btleplug::Error::NotConnected => LinkError::NotConnected,
        other => {
            let message = other.to_string();
            if is_busy_message(&message) {
                LinkError::TransientBusy
            } else {
                LinkError::WriteFailed(message)
            }
        }
    }
}

fn is_busy_message(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("in progress") || lower.contains("busy")
}
