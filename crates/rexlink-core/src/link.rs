//! Transport-agnostic connection state
//!
//! [`LinkState`] owns the single live [`Connection`], the connected flag and
//! the inbound/disconnect subscriber lists. Radio backends drive it: they
//! `attach` after binding, feed notifications in, and `detach` on explicit
//! or peer-initiated disconnect. Every connection carries a generation so
//! late events from a replaced connection are ignored.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use tracing::{debug, info};

use crate::codec;
use crate::errors::LinkError;
use crate::observers::{Subscribers, Subscription};
use crate::Result;

// ----------------------------------------------------------------------------
// Connection
// ----------------------------------------------------------------------------

/// One logical session with a peripheral
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    peer: String,
    generation: u64,
}

impl Connection {
    /// Identity of the peer (advertised name or address)
    pub fn peer(&self) -> &str {
        &self.peer
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Why a connection ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The application called disconnect
    Local,
    /// The peer or the radio dropped the link
    Peer,
}

/// Published to disconnect subscribers, once per connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisconnectEvent {
    pub peer: String,
    pub reason: DisconnectReason,
}

// ----------------------------------------------------------------------------
// Link State
// ----------------------------------------------------------------------------

/// Connection bookkeeping shared by a link manager and its channel
pub struct LinkState {
    connected: AtomicBool,
    current: Mutex<Option<Connection>>,
    next_generation: AtomicU64,
    messages: Subscribers<String>,
    disconnects: Subscribers<DisconnectEvent>,
}

impl Default for LinkState {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkState {
    pub fn new() -> Self {
        Self {
            connected: AtomicBool::new(false),
            current: Mutex::new(None),
            next_generation: AtomicU64::new(1),
            messages: Subscribers::new("message"),
            disconnects: Subscribers::new("disconnect"),
        }
    }

    /// Make `peer` the live connection
    ///
    /// Fails with [`LinkError::AlreadyConnected`] while another connection is
    /// live. The returned handle's generation supersedes all earlier ones.
    pub fn attach(&self, peer: impl Into<String>) -> Result<Connection> {
        let mut current = self.lock();
        if current.is_some() {
            return Err(LinkError::AlreadyConnected);
        }

        let connection = Connection {
            peer: peer.into(),
            generation: self.next_generation.fetch_add(1, Ordering::SeqCst),
        };
        *current = Some(connection.clone());
        self.connected.store(true, Ordering::SeqCst);

        info!(
            "Link attached to {} (generation {})",
            connection.peer, connection.generation
        );
        Ok(connection)
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn current(&self) -> Option<Connection> {
        self.lock().clone()
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.lock()
            .as_ref()
            .is_some_and(|c| c.generation == generation)
    }

    /// End the connection with the given generation
    ///
    /// Returns `true` if this call ended it. Subscribers are notified only
    /// then, so each connection produces exactly one disconnect event.
    pub fn detach(&self, generation: u64, reason: DisconnectReason) -> bool {
        let ended = {
            let mut current = self.lock();
            match current.as_ref() {
                Some(c) if c.generation == generation => {
                    self.connected.store(false, Ordering::SeqCst);
                    current.take()
                }
                _ => None,
            }
        };

        match ended {
            Some(connection) => {
                info!("Link to {} closed ({:?})", connection.peer, reason);
                self.disconnects.notify(&DisconnectEvent {
                    peer: connection.peer,
                    reason,
                });
                true
            }
            None => {
                debug!("Ignoring stale detach for generation {}", generation);
                false
            }
        }
    }

    /// Decode an inbound notification and fan it out to message subscribers
    ///
    /// Returns `true` when the payload was handled, including empty payloads
    /// that are suppressed rather than forwarded.
    pub fn deliver_notification(&self, generation: u64, bytes: &[u8]) -> bool {
        if !self.is_current(generation) {
            debug!("Dropping notification from stale generation {}", generation);
            return false;
        }
        if let Some(line) = codec::decode_notification(bytes) {
            debug!("Inbound: {}", line);
            self.messages.notify(&line);
        }
        true
    }

    pub fn on_message<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&String) + Send + Sync + 'static,
    {
        self.messages.subscribe(callback)
    }

    pub fn on_disconnect<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&DisconnectEvent) + Send + Sync + 'static,
    {
        self.disconnects.subscribe(callback)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Connection>> {
        self.current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_single_live_connection() {
        let link = LinkState::new();
        let first = link.attach("REX-01").unwrap();
        assert!(link.is_connected());
        assert!(matches!(link.attach("REX-02"), Err(LinkError::AlreadyConnected)));

        assert!(link.detach(first.generation(), DisconnectReason::Local));
        let second = link.attach("REX-02").unwrap();
        assert!(second.generation() > first.generation());
        assert_eq!(link.current().unwrap().peer(), "REX-02");
    }

    #[test]
    fn test_stale_generation_is_ignored() {
        let link = LinkState::new();
        let first = link.attach("REX-01").unwrap();
        link.detach(first.generation(), DisconnectReason::Local);
        let second = link.attach("REX-01").unwrap();

        let inbound = Arc::new(Mutex::new(Vec::new()));
        let sink = inbound.clone();
        link.on_message(move |line| sink.lock().unwrap().push(line.clone()));

        assert!(!link.deliver_notification(first.generation(), b"late"));
        assert!(!link.detach(first.generation(), DisconnectReason::Peer));
        assert!(link.is_connected());

        assert!(link.deliver_notification(second.generation(), b" ready \n"));
        assert!(link.deliver_notification(second.generation(), b"   "));
        assert_eq!(*inbound.lock().unwrap(), vec!["ready".to_string()]);
    }
}
