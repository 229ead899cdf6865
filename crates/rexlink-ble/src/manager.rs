//! Link manager: discovery, binding and teardown of the controller link

use std::future::{self, Future};
use std::sync::Arc;

use btleplug::api::{Central, Peripheral as _, WriteType};
use rexlink_core::{
    Connection, DisconnectEvent, DisconnectReason, LinkError, LinkState, Result, Subscription,
};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::channel::BleChannel;
use crate::config::BleLinkConfig;
use crate::connection::{
    bind, peer_drops, spawn_disconnect_watcher, spawn_notification_pump, ActiveLink, ActiveSlot,
};
use crate::discovery::BleDiscovery;
use crate::protocol::DiscoveryFilter;

// ----------------------------------------------------------------------------
// Link Manager
// ----------------------------------------------------------------------------

/// Owns the single connection to a rex controller
///
/// At most one connection is live at a time. Connect attempts are
/// serialized; a second `connect` while one is live fails with
/// [`LinkError::AlreadyConnected`].
pub struct LinkManager {
    config: BleLinkConfig,
    discovery: Mutex<BleDiscovery>,
    link: Arc<LinkState>,
    slot: ActiveSlot,
}

impl LinkManager {
    pub fn new(config: BleLinkConfig) -> Self {
        Self {
            discovery: Mutex::new(BleDiscovery::new(config.clone())),
            config,
            link: Arc::new(LinkState::new()),
            slot: Arc::new(RwLock::new(None)),
        }
    }

    pub fn config(&self) -> &BleLinkConfig {
        &self.config
    }

    /// Shared connection state, for wiring subscribers or a custom channel
    pub fn link(&self) -> Arc<LinkState> {
        self.link.clone()
    }

    /// Channel for a [`WriteQueue`](rexlink_core::WriteQueue)
    pub fn channel(&self) -> BleChannel {
        BleChannel::new(self.link.clone(), self.slot.clone())
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_connected()
    }

    pub fn connection(&self) -> Option<Connection> {
        self.link.current()
    }

    /// Discover, connect and bind using the configured filter
    pub async fn connect(&self) -> Result<Connection> {
        let filter = self.config.discovery_filter();
        self.connect_until(&filter, future::pending()).await
    }

    /// Discover, connect and bind, giving up when `cancel` resolves
    ///
    /// Cancellation only interrupts discovery; once a peer is selected the
    /// connection attempt runs to completion or its own timeout.
    pub async fn connect_until<C>(&self, filter: &DiscoveryFilter, cancel: C) -> Result<Connection>
    where
        C: Future<Output = ()>,
    {
        let mut discovery = self.discovery.lock().await;
        if self.link.is_connected() {
            return Err(LinkError::AlreadyConnected);
        }

        let adapter = discovery.adapter().await?;
        let peer = discovery.find_peer(filter, cancel).await?;
        info!("Connecting to {}", peer.identity);

        // subscribe before connecting so an immediate drop is not missed
        let events = adapter
            .events()
            .await
            .map_err(|e| LinkError::BindingFailed(e.to_string()))?;
        let bound = bind(peer.peripheral, &self.config).await?;

        let connection = match self.link.attach(peer.identity) {
            Ok(connection) => connection,
            Err(e) => {
                if let Err(e) = bound.peripheral.disconnect().await {
                    debug!("Disconnect after failed setup: {}", e);
                }
                return Err(e);
            }
        };
        let generation = connection.generation();

        let pump = match spawn_notification_pump(&bound, self.link.clone(), generation).await {
            Ok(pump) => pump,
            Err(e) => {
                self.link.detach(generation, DisconnectReason::Local);
                if let Err(e) = bound.peripheral.disconnect().await {
                    debug!("Disconnect after failed setup: {}", e);
                }
                return Err(e.into());
            }
        };
        let watcher = spawn_disconnect_watcher(
            peer_drops(events, bound.peripheral.id()),
            self.link.clone(),
            self.slot.clone(),
            generation,
        );

        let write_type = if self.config.write_with_response {
            WriteType::WithResponse
        } else {
            WriteType::WithoutResponse
        };
        let active = ActiveLink {
            generation,
            bound,
            write_type,
            tasks: vec![pump, watcher],
        };
        if let Some(stale) = self.slot.write().await.replace(active) {
            stale.abort_tasks();
        }

        info!("Connected to {}", connection.peer());
        Ok(connection)
    }

    /// Tear down the live connection, if any
    ///
    /// Idempotent. Disconnect subscribers hear about it once, with
    /// [`DisconnectReason::Local`], unless the peer already dropped it.
    pub async fn disconnect(&self) {
        let Some(active) = self.slot.write().await.take() else {
            debug!("Disconnect requested with no live connection");
            return;
        };

        self.link.detach(active.generation, DisconnectReason::Local);
        active.abort_tasks();

        let peripheral = &active.bound.peripheral;
        if let Err(e) = peripheral.unsubscribe(&active.bound.rx).await {
            debug!("Failed to unsubscribe from RX: {}", e);
        }
        if let Err(e) = peripheral.disconnect().await {
            warn!("Failed to disconnect from controller: {}", e);
        }
        info!("Disconnected from controller");
    }

    /// Subscribe to inbound text lines
    pub fn on_message<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&String) + Send + Sync + 'static,
    {
        self.link.on_message(callback)
    }

    /// Subscribe to the end of each connection
    pub fn on_disconnect<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&DisconnectEvent) + Send + Sync + 'static,
    {
        self.link.on_disconnect(callback)
    }
}

impl Drop for LinkManager {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.slot.try_write() {
            if let Some(active) = slot.take() {
                self.link.detach(active.generation, DisconnectReason::Local);
                active.abort_tasks();
            }
        }
    }
}
