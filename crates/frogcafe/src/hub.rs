//! Connection hub: an isolated Tokio task that owns every live connection's
//! outbound queue.
//!
//! The hub is an actor. Connection tasks and the match orchestrator talk
//! to it only through a bounded event queue; the registry itself is a
//! plain `HashMap` that nothing else can reach, so it needs no lock.
//!
//! ```text
//! connection pumps ──┐
//! orchestrator ──────┼──► HubEvent queue ──► hub task ──► per-connection
//! request layer ─────┘                         │          outbound queues
//!                                              └── registry (owned)
//! ```
//!
//! Delivery never blocks the hub. Each message is encoded once and
//! offered to every recipient with `try_send`; a recipient whose queue is
//! full (or already gone) is dropped from the registry. Dropping closes
//! its queue and fires its eviction signal, so a pump stuck writing to a
//! stalled socket still gets told to stop.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use frogcafe_match::GameNotifier;
use frogcafe_protocol::{Codec, Game, GameId, GameUpdateData, JsonCodec, WireMessage};
use frogcafe_transport::ConnectionId;
use serde::Serialize;
use tokio::sync::mpsc::error::{TryRecvError, TrySendError};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::HubError;

/// Receiving end of a connection's outbound queue. Items are encoded
/// frames ready to write to the socket.
///
/// Besides the frames it carries a one-shot eviction signal, fired when
/// the hub drops the connection for falling behind.
pub struct OutboundReceiver {
    frames: mpsc::Receiver<Arc<str>>,
    evicted: oneshot::Receiver<()>,
}

impl OutboundReceiver {
    /// Waits for the next frame. `None` once the hub has let go of the
    /// connection and the queued frames are drained.
    pub async fn recv(&mut self) -> Option<Arc<str>> {
        self.frames.recv().await
    }

    /// Takes a frame if one is queued.
    pub fn try_recv(&mut self) -> Result<Arc<str>, TryRecvError> {
        self.frames.try_recv()
    }

    /// Splits into the frame queue and the eviction signal. The signal
    /// resolves `Ok` on eviction and `Err` on any other removal.
    pub(crate) fn into_parts(self) -> (mpsc::Receiver<Arc<str>>, oneshot::Receiver<()>) {
        (self.frames, self.evicted)
    }
}

// ---------------------------------------------------------------------------
// HubConfig
// ---------------------------------------------------------------------------

/// Queue sizes for the hub.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Capacity of the hub's own event queue. When full, callers wait.
    ///
    /// Default: 1024.
    pub event_capacity: usize,

    /// Capacity of each connection's outbound queue. When full, the
    /// connection is considered too slow and is dropped.
    ///
    /// Default: 256.
    pub outbound_capacity: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            event_capacity: 1024,
            outbound_capacity: 256,
        }
    }
}

/// A snapshot of the registry, answered by the hub task itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct HubStats {
    /// Registered connections.
    pub connections: usize,
    /// Connections not watching any game.
    pub lobby: usize,
    /// Distinct games with at least one watcher.
    pub games: usize,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

pub(crate) enum HubEvent {
    Register {
        conn_id: ConnectionId,
        watched: Option<GameId>,
        outbound: mpsc::Sender<Arc<str>>,
        evict: oneshot::Sender<()>,
    },
    Unregister {
        conn_id: ConnectionId,
    },
    Broadcast {
        msg: WireMessage,
    },
    Direct {
        conn_id: ConnectionId,
        msg: WireMessage,
    },
    Stats {
        reply: oneshot::Sender<HubStats>,
    },
    Shutdown,
}

// ---------------------------------------------------------------------------
// HubHandle
// ---------------------------------------------------------------------------

/// Handle to the running hub. Cheap to clone.
#[derive(Clone)]
pub struct HubHandle {
    sender: mpsc::Sender<HubEvent>,
    outbound_capacity: usize,
}

impl HubHandle {
    /// Adds a connection watching `watched` (or nothing) and returns the
    /// receiving end of its outbound queue. Registering an id twice
    /// replaces the earlier queue.
    pub async fn register(
        &self,
        conn_id: ConnectionId,
        watched: Option<GameId>,
    ) -> Result<OutboundReceiver, HubError> {
        let (outbound, frames) = mpsc::channel(self.outbound_capacity);
        let (evict, evicted) = oneshot::channel();
        self.send(HubEvent::Register {
            conn_id,
            watched,
            outbound,
            evict,
        })
        .await?;
        Ok(OutboundReceiver { frames, evicted })
    }

    /// Removes a connection and closes its outbound queue. Unknown ids
    /// are ignored.
    pub async fn unregister(&self, conn_id: ConnectionId) -> Result<(), HubError> {
        self.send(HubEvent::Unregister { conn_id }).await
    }

    /// Delivers `msg` to every watcher of its target game, or to every
    /// connection when it has none.
    pub async fn broadcast(&self, msg: WireMessage) -> Result<(), HubError> {
        self.send(HubEvent::Broadcast { msg }).await
    }

    /// Delivers `msg` to one connection only.
    pub async fn send_to(&self, conn_id: ConnectionId, msg: WireMessage) -> Result<(), HubError> {
        self.send(HubEvent::Direct { conn_id, msg }).await
    }

    pub async fn stats(&self) -> Result<HubStats, HubError> {
        let (reply, rx) = oneshot::channel();
        self.send(HubEvent::Stats { reply }).await?;
        rx.await.map_err(|_| HubError::Closed)
    }

    /// Stops the hub. Every outbound queue closes, which ends every
    /// connection's outbound pump.
    pub async fn shutdown(&self) -> Result<(), HubError> {
        self.send(HubEvent::Shutdown).await
    }

    /// Queues an unregister without waiting. Used from `Drop`, where
    /// awaiting is impossible.
    pub(crate) fn unregister_detached(&self, conn_id: ConnectionId) {
        match self.sender.try_send(HubEvent::Unregister { conn_id }) {
            Ok(()) | Err(TrySendError::Closed(_)) => {}
            Err(TrySendError::Full(_)) => {
                if let Ok(runtime) = tokio::runtime::Handle::try_current() {
                    let hub = self.clone();
                    runtime.spawn(async move {
                        let _ = hub.unregister(conn_id).await;
                    });
                }
            }
        }
    }

    async fn send(&self, event: HubEvent) -> Result<(), HubError> {
        self.sender.send(event).await.map_err(|_| HubError::Closed)
    }
}

#[async_trait]
impl GameNotifier for HubHandle {
    async fn game_updated(&self, game: &Game) {
        let msg = WireMessage::from(GameUpdateData::from(game));
        if let Err(e) = self.broadcast(msg).await {
            tracing::warn!(game_id = %game.id, error = %e, "game update not broadcast");
        }
    }
}

// ---------------------------------------------------------------------------
// Hub
// ---------------------------------------------------------------------------

/// Entry point for starting the hub task.
pub struct Hub;

impl Hub {
    /// Starts the hub task.
    pub fn spawn(config: HubConfig) -> (HubHandle, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(config.event_capacity.max(1));
        let actor = HubActor {
            registry: HashMap::new(),
            receiver,
            codec: JsonCodec,
        };
        let task = tokio::spawn(actor.run());
        let handle = HubHandle {
            sender,
            outbound_capacity: config.outbound_capacity.max(1),
        };
        (handle, task)
    }
}

struct Registered {
    watched: Option<GameId>,
    outbound: mpsc::Sender<Arc<str>>,
    evict: oneshot::Sender<()>,
}

/// The internal hub state. Runs inside a Tokio task.
struct HubActor {
    registry: HashMap<ConnectionId, Registered>,
    receiver: mpsc::Receiver<HubEvent>,
    codec: JsonCodec,
}

impl HubActor {
    /// Processes events one at a time until shutdown or until every
    /// handle is gone.
    async fn run(mut self) {
        tracing::info!("connection hub started");

        while let Some(event) = self.receiver.recv().await {
            match event {
                HubEvent::Register {
                    conn_id,
                    watched,
                    outbound,
                    evict,
                } => {
                    self.registry.insert(
                        conn_id,
                        Registered {
                            watched,
                            outbound,
                            evict,
                        },
                    );
                    tracing::debug!(
                        %conn_id,
                        game_id = ?watched,
                        connections = self.registry.len(),
                        "connection registered"
                    );
                }
                HubEvent::Unregister { conn_id } => {
                    if self.registry.remove(&conn_id).is_some() {
                        tracing::debug!(
                            %conn_id,
                            connections = self.registry.len(),
                            "connection unregistered"
                        );
                    }
                }
                HubEvent::Broadcast { msg } => self.handle_broadcast(msg),
                HubEvent::Direct { conn_id, msg } => self.handle_direct(conn_id, msg),
                HubEvent::Stats { reply } => {
                    let _ = reply.send(self.stats());
                }
                HubEvent::Shutdown => {
                    tracing::info!("connection hub shutting down");
                    break;
                }
            }
        }

        self.registry.clear();
        tracing::info!("connection hub stopped");
    }

    fn handle_broadcast(&mut self, msg: WireMessage) {
        let kind = msg.kind().to_string();
        let target = msg.target_game();
        let Some(text) = self.encode(msg) else {
            return;
        };

        let mut delivered = 0usize;
        let mut dead = Vec::new();
        for (conn_id, entry) in &self.registry {
            if target.is_some() && entry.watched != target {
                continue;
            }
            match entry.outbound.try_send(Arc::clone(&text)) {
                Ok(()) => delivered += 1,
                Err(e) => dead.push((*conn_id, is_full(&e))),
            }
        }
        self.prune(dead);

        tracing::debug!(%kind, game_id = ?target, delivered, "broadcast");
    }

    fn handle_direct(&mut self, conn_id: ConnectionId, msg: WireMessage) {
        let Some(entry) = self.registry.get(&conn_id) else {
            tracing::debug!(%conn_id, "direct message to unknown connection dropped");
            return;
        };
        let outbound = entry.outbound.clone();
        let Some(text) = self.encode(msg) else {
            return;
        };
        if let Err(e) = outbound.try_send(text) {
            self.prune(vec![(conn_id, is_full(&e))]);
        }
    }

    /// Drops connections whose queues rejected a message. Removing the
    /// entry drops the only sender, which closes the queue; the eviction
    /// signal reaches a pump that is blocked mid-write.
    fn prune(&mut self, dead: Vec<(ConnectionId, bool)>) {
        for (conn_id, full) in dead {
            let Some(entry) = self.registry.remove(&conn_id) else {
                continue;
            };
            // Fails only if the connection task is already gone.
            let _ = entry.evict.send(());
            if full {
                tracing::warn!(%conn_id, "outbound queue full, dropping slow connection");
            } else {
                tracing::debug!(%conn_id, "outbound queue closed, removing connection");
            }
        }
    }

    fn encode(&self, msg: WireMessage) -> Option<Arc<str>> {
        let kind = msg.kind().to_string();
        match msg.into_frame().and_then(|frame| self.codec.encode(&frame)) {
            Ok(text) => Some(Arc::from(text)),
            Err(e) => {
                tracing::warn!(%kind, error = %e, "failed to encode outbound message");
                None
            }
        }
    }

    fn stats(&self) -> HubStats {
        let lobby = self.registry.values().filter(|e| e.watched.is_none()).count();
        let games: HashSet<GameId> = self.registry.values().filter_map(|e| e.watched).collect();
        HubStats {
            connections: self.registry.len(),
            lobby,
            games: games.len(),
        }
    }
}

fn is_full<T>(e: &TrySendError<T>) -> bool {
    matches!(e, TrySendError::Full(_))
}

// =========================================================================
// Tests
// =========================================================================
