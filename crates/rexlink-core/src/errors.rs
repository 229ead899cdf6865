//! Error types for the rex command link
//!
//! A single taxonomy shared by the link manager, the write queue and the
//! hold dispatcher. Transport crates convert their own failures into
//! [`LinkError`] so callers only ever match on one enum.

use thiserror::Error;

use crate::types::{Region, SubPart};

// ----------------------------------------------------------------------------
// Error Types
// ----------------------------------------------------------------------------

/// Errors surfaced by the command transport and dispatch layer
#[derive(Error, Debug)]
pub enum LinkError {
    /// The platform cannot provide a usable wireless adapter at all
    #[error("Wireless transport unsupported: {0}")]
    UnsupportedTransport(String),

    /// Discovery ended before a peer was selected
    #[error("Discovery cancelled before a peer was selected")]
    DiscoveryCancelled,

    /// The selected peer lacks the expected service or characteristics
    #[error("Failed to bind peer: {0}")]
    BindingFailed(String),

    #[error("Not connected")]
    NotConnected,

    #[error("A connection is already live")]
    AlreadyConnected,

    /// The adapter reported an operation already in progress
    #[error("Link busy: operation already in progress")]
    TransientBusy,

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Write queue closed")]
    QueueClosed,

    #[error("Codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("Part {part} does not belong to region {region}")]
    InvalidSelection { region: Region, part: SubPart },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl LinkError {
    /// Whether the write queue may retry the failed operation once
    pub fn is_transient(&self) -> bool {
        matches!(self, LinkError::TransientBusy)
    }
}

/// Result type for link operations
pub type Result<T> = core::result::Result<T, LinkError>;
