//! BLE adapter setup and peer discovery

use std::future::Future;

use btleplug::api::{Central, CentralEvent, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral, PeripheralId};
use futures::stream::StreamExt;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::config::BleLinkConfig;
use crate::error::BleLinkError;
use crate::protocol::DiscoveryFilter;

// ----------------------------------------------------------------------------
// Discovered Peer
// ----------------------------------------------------------------------------

/// A peripheral that passed the discovery filter
pub struct DiscoveredPeer {
    pub peripheral: Peripheral,
    /// Advertised name, or the address when no name was seen
    pub identity: String,
}

// ----------------------------------------------------------------------------
// Discovery Implementation
// ----------------------------------------------------------------------------

/// Owns the adapter and scans it for a controller
pub struct BleDiscovery {
    config: BleLinkConfig,
    adapter: Option<Adapter>,
}

impl BleDiscovery {
    pub fn new(config: BleLinkConfig) -> Self {
        Self {
            config,
            adapter: None,
        }
    }

    /// Initialize BLE adapter on first use and return it
    pub async fn adapter(&mut self) -> Result<Adapter, BleLinkError> {
        if let Some(adapter) = &self.adapter {
            return Ok(adapter.clone());
        }

        let manager = Manager::new()
            .await
            .map_err(|e| BleLinkError::ManagerUnavailable(e.to_string()))?;
        let adapter = manager
            .adapters()
            .await
            .map_err(|e| BleLinkError::ManagerUnavailable(e.to_string()))?
            .into_iter()
            .next()
            .ok_or(BleLinkError::AdapterNotAvailable)?;

        info!("BLE adapter initialized");
        self.adapter = Some(adapter.clone());
        Ok(adapter)
    }

    /// Scan until a peripheral matches `filter`
    ///
    /// Ends with [`BleLinkError::ScanTimeout`] after the configured scan
    /// timeout, or [`BleLinkError::ScanCancelled`] as soon as `cancel`
    /// resolves. The scan is stopped on every exit path.
    pub async fn find_peer<C>(
        &mut self,
        filter: &DiscoveryFilter,
        cancel: C,
    ) -> Result<DiscoveredPeer, BleLinkError>
    where
        C: Future<Output = ()>,
    {
        let adapter = self.adapter().await?;
        let mut events = adapter
            .events()
            .await
            .map_err(|e| BleLinkError::EventStreamFailed(e.to_string()))?;

        adapter
            .start_scan(ScanFilter {
                services: filter.scan_services(),
            })
            .await
            .map_err(|e| BleLinkError::ScanFailed(e.to_string()))?;
        info!("Started BLE scanning for controller ({:?})", filter);

        let result = self.scan_loop(&adapter, filter, &mut events, cancel).await;

        if let Err(e) = adapter.stop_scan().await {
            warn!("Failed to stop BLE scan: {}", e);
        }
        result
    }

    async fn scan_loop<C, S>(
        &self,
        adapter: &Adapter,
        filter: &DiscoveryFilter,
        events: &mut S,
        cancel: C,
    ) -> Result<DiscoveredPeer, BleLinkError>
    where
        C: Future<Output = ()>,
        S: futures::Stream<Item = CentralEvent> + Unpin,
    {
        // peripherals the platform already knows about count too
        let known = adapter
            .peripherals()
            .await
            .map_err(|e| BleLinkError::ScanFailed(e.to_string()))?;
        for peripheral in known {
            if let Some(peer) = check_peripheral(peripheral, filter).await {
                return Ok(peer);
            }
        }

        let deadline = Instant::now() + self.config.scan_timeout;
        tokio::pin!(cancel);

        loop {
            tokio::select! {
                _ = &mut cancel => {
                    info!("BLE scan cancelled");
                    return Err(BleLinkError::ScanCancelled);
                }
                _ = sleep_until(deadline) => {
                    info!("BLE scan timed out after {:?}", self.config.scan_timeout);
                    return Err(BleLinkError::ScanTimeout);
                }
                event = events.next() => {
                    let id = match event {
                        Some(CentralEvent::DeviceDiscovered(id))
                        | Some(CentralEvent::DeviceUpdated(id)) => id,
                        Some(_) => continue,
                        None => {
                            return Err(BleLinkError::EventStreamFailed(
                                "event stream ended".into(),
                            ))
                        }
                    };
                    if let Some(peer) = lookup(adapter, &id, filter).await {
                        return Ok(peer);
                    }
                }
            }
        }
    }
}

async fn lookup(
    adapter: &Adapter,
    id: &PeripheralId,
    filter: &DiscoveryFilter,
) -> Option<DiscoveredPeer> {
    let peripheral = adapter.peripheral(id).await.ok()?;
    check_peripheral(peripheral, filter).await
}

async fn check_peripheral(
    peripheral: Peripheral,
    filter: &DiscoveryFilter,
) -> Option<DiscoveredPeer> {
    let properties = peripheral.properties().await.ok()??;
    let name = properties.local_name.as_deref();
    if !filter.matches(name, &properties.services) {
        return None;
    }

    let identity = name
        .map(str::to_string)
        .unwrap_or_else(|| properties.address.to_string());
    debug!("Discovered controller: {}", identity);
    Some(DiscoveredPeer {
        peripheral,
        identity,
    })
}
