//! rexlink core: command transport and dispatch for the rex animatronic
//!
//! This crate is transport-agnostic. Radio backends implement [`Channel`]
//! and drive a [`LinkState`]; everything above that is plain data and tokio
//! tasks, testable with in-memory fakes.
//!
//! ## Data flow
//!
//! ```text
//! gesture ─▶ HoldDispatcher ─▶ CommandResolver ─▶ codec ─▶ WriteQueue ─▶ Channel
//!                                                                       │
//! subscribers ◀── codec ◀── LinkState ◀── notifications ◀──────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use rexlink_core::{
//!     CapabilityTable, Channel, DispatchConfig, Direction, HoldDispatcher, QueueConfig,
//!     Region, RexResolver, Selection, SubPart, WriteQueue,
//! };
//!
//! # async fn example(channel: Arc<dyn Channel>) -> rexlink_core::Result<()> {
//! let capabilities = Arc::new(CapabilityTable::rex());
//! let queue = Arc::new(WriteQueue::new(channel, QueueConfig::default())?);
//! let resolver = Arc::new(RexResolver::new(CapabilityTable::rex()));
//! let dispatcher = HoldDispatcher::new(queue, resolver, capabilities, DispatchConfig::default())?;
//!
//! dispatcher.select(Selection::new(Region::TailSpine, SubPart::Tail)?).await;
//! dispatcher.press(Direction::Left).await;
//! tokio::time::sleep(std::time::Duration::from_millis(500)).await;
//! dispatcher.release().await;
//! # Ok(())
//! # }
//! ```

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod capability;
pub mod codec;
pub mod config;
pub mod dispatcher;
pub mod errors;
pub mod link;
pub mod observers;
pub mod packet;
pub mod queue;
pub mod resolver;
pub mod types;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use capability::CapabilityTable;
pub use config::{DispatchConfig, QueueConfig};
pub use dispatcher::{
    CancelReason, Delivery, GestureState, HoldDispatcher, OutboundRecord, PressOutcome,
};
pub use errors::{LinkError, Result};
pub use link::{Connection, DisconnectEvent, DisconnectReason, LinkState};
pub use observers::{Subscribers, Subscription};
pub use packet::{CommandPacket, ControlRequest};
pub use queue::{Channel, CommandSink, PendingWrite, WriteQueue, WriteReport};
pub use resolver::{CommandFamily, CommandResolver, RexResolver};
pub use types::{Direction, Phase, Region, Selection, SubPart};
