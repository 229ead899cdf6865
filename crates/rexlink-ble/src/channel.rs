//! Write channel over the live BLE connection

use std::sync::Arc;

use async_trait::async_trait;
use btleplug::api::Peripheral as _;
use rexlink_core::{Channel, LinkError, LinkState, Result};

use crate::connection::ActiveSlot;
use crate::error::classify_write_error;

// ----------------------------------------------------------------------------
// BLE Channel
// ----------------------------------------------------------------------------

/// [`Channel`] writing to the TX characteristic of whatever connection is live
///
/// Obtained from [`LinkManager::channel`](crate::LinkManager::channel). It
/// stays valid across reconnects; while no connection is live every write
/// fails with [`LinkError::NotConnected`].
#[derive(Clone)]
pub struct BleChannel {
    link: Arc<LinkState>,
    slot: ActiveSlot,
}

impl BleChannel {
    pub(crate) fn new(link: Arc<LinkState>, slot: ActiveSlot) -> Self {
        Self { link, slot }
    }
}

#[async_trait]
impl Channel for BleChannel {
    async fn write(&self, chunk: &[u8]) -> Result<()> {
        let (bound, write_type) = {
            let slot = self.slot.read().await;
            let active = slot
                .as_ref()
                .filter(|a| self.link.is_current(a.generation))
                .ok_or(LinkError::NotConnected)?;
            (active.bound.clone(), active.write_type)
        };

        bound
            .peripheral
            .write(&bound.tx, chunk, write_type)
            .await
            .map_err(classify_write_error)
    }

    fn is_connected(&self) -> bool {
        self.link.is_connected()
    }
}
