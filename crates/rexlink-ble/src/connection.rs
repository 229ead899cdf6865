//! GATT binding, notification pump and peer-drop watcher

use std::future;
use std::sync::Arc;

use btleplug::api::{CentralEvent, Characteristic, Peripheral as _, WriteType};
use btleplug::platform::{Peripheral, PeripheralId};
use futures::stream::{Stream, StreamExt};
use rexlink_core::{DisconnectReason, LinkState};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::BleLinkConfig;
use crate::error::BleLinkError;

// ----------------------------------------------------------------------------
// Bound Peripheral
// ----------------------------------------------------------------------------

/// A connected peripheral with its TX and RX characteristics resolved
#[derive(Clone)]
pub struct BoundPeripheral {
    pub peripheral: Peripheral,
    pub tx: Characteristic,
    pub rx: Characteristic,
}

/// Connect, discover services and subscribe to the RX characteristic
///
/// On any failure after the GATT connection is up the peripheral is
/// disconnected again before the error is returned.
pub async fn bind(
    peripheral: Peripheral,
    config: &BleLinkConfig,
) -> Result<BoundPeripheral, BleLinkError> {
    match timeout(config.connection_timeout, peripheral.connect()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            error!("Failed to connect to controller: {}", e);
            return Err(BleLinkError::ConnectionFailed(e.to_string()));
        }
        Err(_) => {
            error!("Connection to controller timed out");
            return Err(BleLinkError::ConnectionTimeout);
        }
    }

    match resolve_characteristics(&peripheral, config).await {
        Ok((tx, rx)) => Ok(BoundPeripheral { peripheral, tx, rx }),
        Err(e) => {
            if let Err(disconnect_err) = peripheral.disconnect().await {
                debug!("Disconnect after failed binding: {}", disconnect_err);
            }
            Err(e)
        }
    }
}

async fn resolve_characteristics(
    peripheral: &Peripheral,
    config: &BleLinkConfig,
) -> Result<(Characteristic, Characteristic), BleLinkError> {
    peripheral
        .discover_services()
        .await
        .map_err(|e| BleLinkError::ServiceDiscoveryFailed(e.to_string()))?;

    let characteristics = peripheral.characteristics();
    let find = |uuid: Uuid| {
        characteristics
            .iter()
            .find(|c| c.uuid == uuid)
            .cloned()
            .ok_or_else(|| BleLinkError::CharacteristicNotFound {
                characteristic: uuid.to_string(),
            })
    };
    let tx = find(config.tx_uuid)?;
    let rx = find(config.rx_uuid)?;

    peripheral
        .subscribe(&rx)
        .await
        .map_err(|e| BleLinkError::SubscriptionFailed(e.to_string()))?;

    debug!("Bound TX {} and RX {}", tx.uuid, rx.uuid);
    Ok((tx, rx))
}

// ----------------------------------------------------------------------------
// Active Link
// ----------------------------------------------------------------------------

/// Everything owned by the live connection
pub(crate) struct ActiveLink {
    pub generation: u64,
    pub bound: BoundPeripheral,
    pub write_type: WriteType,
    pub tasks: Vec<JoinHandle<()>>,
}

impl ActiveLink {
    pub fn abort_tasks(&self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Slot shared by the manager, its channel and the watcher task
pub(crate) type ActiveSlot = Arc<RwLock<Option<ActiveLink>>>;

// ----------------------------------------------------------------------------
// Background Tasks
// ----------------------------------------------------------------------------

/// Forward RX notifications of one connection into the link state
pub async fn spawn_notification_pump(
    bound: &BoundPeripheral,
    link: Arc<LinkState>,
    generation: u64,
) -> Result<JoinHandle<()>, BleLinkError> {
    let mut notifications = bound
        .peripheral
        .notifications()
        .await
        .map_err(|e| BleLinkError::SubscriptionFailed(e.to_string()))?;
    let rx_uuid = bound.rx.uuid;

    Ok(tokio::spawn(async move {
        while let Some(data) = notifications.next().await {
            if data.uuid != rx_uuid {
                continue;
            }
            if !link.deliver_notification(generation, &data.value) {
                break;
            }
        }
        debug!("Notification handler for generation {} ended", generation);
    }))
}

/// Narrow the adapter event stream to drops of one peripheral
pub(crate) fn peer_drops<S>(
    events: S,
    peripheral_id: PeripheralId,
) -> impl Stream<Item = ()> + Send + Unpin + 'static
where
    S: Stream<Item = CentralEvent> + Send + Unpin + 'static,
{
    events.filter_map(move |event| {
        future::ready(match event {
            CentralEvent::DeviceDisconnected(id) if id == peripheral_id => Some(()),
            _ => None,
        })
    })
}

/// Detach the link when the peripheral drops
pub(crate) fn spawn_disconnect_watcher<S>(
    mut drops: S,
    link: Arc<LinkState>,
    slot: ActiveSlot,
    generation: u64,
) -> JoinHandle<()>
where
    S: Stream<Item = ()> + Send + Unpin + 'static,
{
    tokio::spawn(async move {
        if drops.next().await.is_none() {
            warn!("BLE event stream ended while watching generation {}", generation);
            return;
        }
        if link.detach(generation, DisconnectReason::Peer) {
            info!("Controller dropped the connection");
        }
        let mut slot = slot.write().await;
        if slot.as_ref().is_some_and(|a| a.generation == generation) {
            if let Some(active) = slot.take() {
                // includes this task; nothing below awaits
                active.abort_tasks();
            }
        }
    })
}
