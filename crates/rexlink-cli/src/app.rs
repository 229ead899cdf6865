//! Wiring of link manager, write queue and hold dispatcher

use std::sync::Arc;
use std::time::Duration;

use rexlink_ble::LinkManager;
use rexlink_core::{
    CapabilityTable, Connection, Direction, GestureState, HoldDispatcher, PressOutcome,
    RexResolver, Selection, Subscription, WriteQueue,
};
use tracing::info;

use crate::config::AppConfig;
use crate::error::{CliError, Result};

// ----------------------------------------------------------------------------
// Application
// ----------------------------------------------------------------------------

/// One remote-control session
pub struct RexApp {
    manager: Arc<LinkManager>,
    dispatcher: HoldDispatcher,
    capabilities: Arc<CapabilityTable>,
}

impl RexApp {
    /// Build the stack; nothing touches the radio until [`connect`](Self::connect)
    pub fn new(config: AppConfig) -> Result<Self> {
        let manager = Arc::new(LinkManager::new(config.ble.clone()));
        let queue = Arc::new(WriteQueue::new(Arc::new(manager.channel()), config.queue)?);
        let capabilities = Arc::new(CapabilityTable::rex());
        let resolver = Arc::new(RexResolver::new((*capabilities).clone()));
        let dispatcher =
            HoldDispatcher::new(queue, resolver, capabilities.clone(), config.dispatch)?;

        Ok(Self {
            manager,
            dispatcher,
            capabilities,
        })
    }

    pub fn manager(&self) -> &LinkManager {
        &self.manager
    }

    pub fn dispatcher(&self) -> &HoldDispatcher {
        &self.dispatcher
    }

    pub fn capabilities(&self) -> &CapabilityTable {
        &self.capabilities
    }

    /// Scan and connect; Ctrl-C abandons the scan
    pub async fn connect(&self) -> Result<Connection> {
        let filter = self.manager.config().discovery_filter();
        let cancel = async {
            let _ = tokio::signal::ctrl_c().await;
        };
        Ok(self.manager.connect_until(&filter, cancel).await?)
    }

    /// Print inbound lines and peer drops to stdout
    pub fn echo_link_events(&self) -> Vec<Subscription> {
        vec![
            self.manager.on_message(|line| println!("< {}", line)),
            self.manager.on_disconnect(|event| {
                println!("* {} disconnected ({:?})", event.peer, event.reason)
            }),
        ]
    }

    /// Start a gesture, failing if the selection does not accept `direction`
    pub async fn press(&self, direction: Direction) -> Result<()> {
        match self.dispatcher.press(direction).await {
            PressOutcome::Started => Ok(()),
            PressOutcome::Rejected => Err(CliError::GestureRejected {
                selection: self.dispatcher.selection().to_string(),
                direction: direction.to_string(),
            }),
        }
    }

    /// Press, hold for `hold`, release
    pub async fn gesture(
        &self,
        selection: Selection,
        direction: Direction,
        hold: Duration,
    ) -> Result<()> {
        self.dispatcher.select(selection).await;
        self.press(direction).await?;
        tokio::time::sleep(hold).await;
        self.dispatcher.release().await;
        Ok(())
    }

    /// One-line summary for the console `status` command
    pub fn status(&self) -> String {
        let link = match self.manager.connection() {
            Some(connection) => format!("connected to {}", connection.peer()),
            None => "not connected (preview)".to_string(),
        };
        let selection = self.dispatcher.selection();
        let gesture = match self.dispatcher.state() {
            GestureState::Idle => "idle".to_string(),
            GestureState::Active(direction) => format!("holding {}", direction),
        };
        let directions: Vec<&str> = self
            .capabilities
            .directions(selection)
            .iter()
            .map(|d| d.as_str())
            .collect();
        format!(
            "{}; selected {} [{}]; {}",
            link,
            selection,
            directions.join(" "),
            gesture
        )
    }

    /// Stop any gesture, then drop the link
    pub async fn shutdown(&self) {
        self.dispatcher.shutdown().await;
        self.manager.disconnect().await;
        info!("Session closed");
    }
}
