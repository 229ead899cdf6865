//! Hold-to-repeat gesture dispatch
//!
//! A press starts a gesture session: one `start` packet, then a `hold`
//! packet on every tick of the session's own timer task. Release, or any
//! cancellation, stops the timer and sends exactly one `stop`. At most one
//! session exists at a time; a press during an active session ends that
//! session first.
//!
//! All state transitions happen under one lock, and packets are submitted
//! to the sink while it is held. The timer is aborted under that same lock
//! and checks its session id under it before every `hold`, so no `hold` is
//! ever queued behind the `stop` of its session.
//!
//! Transport failures are logged and never undo a transition: the
//! operator's gesture is authoritative.

use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::capability::CapabilityTable;
use crate::codec;
use crate::config::DispatchConfig;
use crate::observers::{Subscribers, Subscription};
use crate::packet::{CommandPacket, ControlRequest};
use crate::queue::{CommandSink, PendingWrite};
use crate::resolver::CommandResolver;
use crate::types::{Direction, Phase, Selection};
use crate::Result;

// ----------------------------------------------------------------------------
// Public Types
// ----------------------------------------------------------------------------

/// Dispatcher state as seen by the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureState {
    Idle,
    Active(Direction),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressOutcome {
    Started,
    /// The direction is not valid for the current selection; nothing sent
    Rejected,
}

/// Why a gesture ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    Released,
    PointerLeft,
    FocusLost,
    SelectionChanged,
    /// A new press replaced the session
    Superseded,
    Teardown,
}

/// Whether an outbound packet reached the sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Transmitted,
    /// Link down: logged only
    Preview,
}

/// One outbound command attempt
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRecord {
    pub delivery: Delivery,
    pub phase: Phase,
    pub packet: CommandPacket,
    /// Exact encoded line, terminator included
    pub line: String,
}

// ----------------------------------------------------------------------------
// Internal State
// ----------------------------------------------------------------------------

struct GestureSession {
    id: u64,
    selection: Selection,
    direction: Direction,
    timer: JoinHandle<()>,
}

struct DispatchState {
    selection: Selection,
    session: Option<GestureSession>,
    next_session: u64,
}

struct Shared {
    sink: Arc<dyn CommandSink>,
    resolver: Arc<dyn CommandResolver>,
    capabilities: Arc<CapabilityTable>,
    outbound: Subscribers<OutboundRecord>,
}

impl Shared {
    /// Resolve a phase and hand it to the sink, or log a preview if the
    /// link is down
    fn emit(
        &self,
        selection: Selection,
        direction: Direction,
        phase: Phase,
    ) -> Option<PendingWrite> {
        let Some(packet) = self.resolver.resolve(selection, direction, phase) else {
            debug!("No {} packet for {} {}", phase, selection, direction);
            return None;
        };
        self.emit_packet(packet, phase)
    }

    fn emit_packet(&self, packet: CommandPacket, phase: Phase) -> Option<PendingWrite> {
        let line = match codec::encode(&packet) {
            Ok(line) => line,
            Err(e) => {
                warn!("Failed to encode {} packet {}: {}", phase, packet.cmd, e);
                return None;
            }
        };

        let (delivery, pending) = if self.sink.is_connected() {
            info!("TX {}: {}", phase, line.trim_end());
            (
                Delivery::Transmitted,
                Some(self.sink.submit(line.clone().into_bytes())),
            )
        } else {
            info!("PREVIEW {} (not connected): {}", phase, line.trim_end());
            (Delivery::Preview, None)
        };

        self.outbound.notify(&OutboundRecord {
            delivery,
            phase,
            packet,
            line,
        });
        pending
    }
}

async fn report(pending: Option<PendingWrite>, phase: Phase) {
    if let Some(pending) = pending {
        match pending.await {
            Ok(report) => debug!(
                "{} delivered in {} chunk(s), {} retry(ies)",
                phase, report.chunks, report.retries
            ),
            Err(e) => warn!("{} send failed: {}", phase, e),
        }
    }
}

fn lock(state: &Mutex<DispatchState>) -> MutexGuard<'_, DispatchState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ----------------------------------------------------------------------------
// Hold Dispatcher
// ----------------------------------------------------------------------------

/// Converts press / hold / release gestures into start / hold / stop packets
pub struct HoldDispatcher {
    shared: Arc<Shared>,
    state: Arc<Mutex<DispatchState>>,
    config: DispatchConfig,
}

impl HoldDispatcher {
    pub fn new(
        sink: Arc<dyn CommandSink>,
        resolver: Arc<dyn CommandResolver>,
        capabilities: Arc<CapabilityTable>,
        config: DispatchConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            shared: Arc::new(Shared {
                sink,
                resolver,
                capabilities,
                outbound: Subscribers::new("outbound"),
            }),
            state: Arc::new(Mutex::new(DispatchState {
                selection: Selection::default(),
                session: None,
                next_session: 0,
            })),
            config,
        })
    }

    pub fn state(&self) -> GestureState {
        match &lock(&self.state).session {
            Some(session) => GestureState::Active(session.direction),
            None => GestureState::Idle,
        }
    }

    pub fn selection(&self) -> Selection {
        lock(&self.state).selection
    }

    /// Observe every outbound attempt, transmitted or preview
    ///
    /// Callbacks run while the dispatcher state is locked and must not call
    /// back into the dispatcher.
    pub fn on_outbound<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&OutboundRecord) + Send + Sync + 'static,
    {
        self.shared.outbound.subscribe(callback)
    }

    /// Change the selection, ending any active gesture first
    pub async fn select(&self, selection: Selection) {
        let pending = {
            let mut state = lock(&self.state);
            let pending = state
                .session
                .take()
                .and_then(|session| self.end_session(session, CancelReason::SelectionChanged));
            state.selection = selection;
            pending
        };
        info!("Selected {}", selection);
        report(pending, Phase::Stop).await;
    }

    /// Begin a gesture in `direction` for the current selection
    pub async fn press(&self, direction: Direction) -> PressOutcome {
        let (outcome, stop, start) = {
            let mut state = lock(&self.state);
            let stop = state
                .session
                .take()
                .and_then(|session| self.end_session(session, CancelReason::Superseded));

            let selection = state.selection;
            if !self.shared.capabilities.permits(selection, direction) {
                info!("Ignoring {} on {}: not a valid direction", direction, selection);
                (PressOutcome::Rejected, stop, None)
            } else if let Some(packet) =
                self.shared
                    .resolver
                    .resolve(selection, direction, Phase::Start)
            {
                let id = state.next_session;
                state.next_session += 1;

                let start = self.shared.emit_packet(packet, Phase::Start);
                let timer = self.spawn_hold_timer(id, selection, direction);
                state.session = Some(GestureSession {
                    id,
                    selection,
                    direction,
                    timer,
                });
                (PressOutcome::Started, stop, start)
            } else {
                info!("Ignoring {} on {}: no command", direction, selection);
                (PressOutcome::Rejected, stop, None)
            }
        };

        report(stop, Phase::Stop).await;
        report(start, Phase::Start).await;
        outcome
    }

    /// End the active gesture; returns `false` if none was active
    pub async fn release(&self) -> bool {
        self.cancel(CancelReason::Released).await
    }

    /// End the active gesture for an external reason
    pub async fn cancel(&self, reason: CancelReason) -> bool {
        let ended = {
            let mut state = lock(&self.state);
            state
                .session
                .take()
                .map(|session| self.end_session(session, reason))
        };
        match ended {
            Some(pending) => {
                report(pending, Phase::Stop).await;
                true
            }
            None => false,
        }
    }

    /// Tear down: end any gesture and wait for its `stop` to be written
    pub async fn shutdown(&self) {
        self.cancel(CancelReason::Teardown).await;
    }

    /// Send a single packet for an explicit request, outside any session
    pub async fn send_request(&self, request: &ControlRequest) -> Result<bool> {
        let Some(packet) = self.shared.resolver.resolve_request(request)? else {
            info!(
                "Ignoring request {} {}: not a valid direction",
                request.target, request.direction
            );
            return Ok(false);
        };
        let pending = self.shared.emit_packet(packet, request.phase);
        report(pending, request.phase).await;
        Ok(true)
    }

    /// Disarm the timer, then emit the session's `stop`; caller holds the lock
    fn end_session(&self, session: GestureSession, reason: CancelReason) -> Option<PendingWrite> {
        session.timer.abort();
        debug!(
            "Ending {} {} ({:?})",
            session.selection, session.direction, reason
        );
        self.shared
            .emit(session.selection, session.direction, Phase::Stop)
    }

    fn spawn_hold_timer(
        &self,
        id: u64,
        selection: Selection,
        direction: Direction,
    ) -> JoinHandle<()> {
        let shared = self.shared.clone();
        let state: Weak<Mutex<DispatchState>> = Arc::downgrade(&self.state);
        let period = self.config.hold_interval;

        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let pending = {
                    let Some(state) = state.upgrade() else { break };
                    let guard = lock(&state);
                    if guard.session.as_ref().map(|s| s.id) != Some(id) {
                        break;
                    }
                    shared.emit(selection, direction, Phase::Hold)
                };
                report(pending, Phase::Hold).await;
            }
        })
    }
}

impl Drop for HoldDispatcher {
    fn drop(&mut self) {
        let mut state = lock(&self.state);
        if let Some(session) = state.session.take() {
            // the stop is queued even though nobody waits for it
            drop(self.end_session(session, CancelReason::Teardown));
        }
    }
}
