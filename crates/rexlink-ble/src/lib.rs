//! Bluetooth Low Energy link for the rex animatronic controller
//!
//! This crate drives a `rexlink_core::LinkState` from btleplug and provides a
//! [`BleChannel`] implementing `rexlink_core::Channel`, so the core write
//! queue and hold dispatcher run unchanged over a real radio.
//!
//! ## Architecture
//!
//! - [`config`] - Link configuration and settings
//! - [`error`] - Error types specific to the BLE link
//! - [`protocol`] - Service UUIDs and discovery filters
//! - `discovery` - Adapter setup and scanning
//! - `connection` - GATT binding, notification pump, peer-drop watcher
//! - `channel` - Characteristic writes for the write queue
//! - `manager` - The [`LinkManager`] tying it together
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use rexlink_ble::{BleLinkConfig, LinkManager};
//! use rexlink_core::{QueueConfig, WriteQueue};
//!
//! # async fn example() -> rexlink_core::Result<()> {
//! let manager = LinkManager::new(BleLinkConfig::default());
//! manager.on_message(|line| println!("rex: {}", line));
//! manager.connect().await?;
//!
//! let queue = WriteQueue::new(Arc::new(manager.channel()), QueueConfig::default())?;
//! queue.enqueue(r#"{"target":"tailSpine","part":"full","cmd":"rex_tail_wag"}"#).await?;
//!
//! manager.disconnect().await;
//! # Ok(())
//! # }
//! ```

mod channel;
pub mod config;
mod connection;
mod discovery;
pub mod error;
mod manager;
pub mod protocol;

pub use channel::BleChannel;
pub use config::BleLinkConfig;
pub use error::{classify_write_error, BleLinkError};
pub use manager::LinkManager;
pub use protocol::{
    DiscoveryFilter, REX_RX_CHARACTERISTIC_UUID, REX_SERVICE_UUID, REX_TX_CHARACTERISTIC_UUID,
};
