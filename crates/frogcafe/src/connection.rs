//! Per-connection pumps: identity, inbound dispatch, outbound delivery.
//!
//! Each accepted connection gets its own Tokio task running
//! [`serve_connection`]. The flow is:
//!   1. Resolve the connect-time token (if any) into an identity
//!   2. Register with the hub under the watched game (if any)
//!   3. Run the inbound loop and the outbound pump side by side
//!   4. Whichever ends first: unregister, close the transport
//!
//! The outbound pump also ends when the hub evicts the connection for
//! falling behind, even while it is blocked writing to the socket.
//!
//! The identity lives in the inbound loop and nowhere else, so an
//! `authenticate` message upgrades it without any shared state.

use std::sync::Arc;
use std::time::Duration;

use frogcafe_match::{parse_game_id, MoveLedger};
use frogcafe_protocol::{
    AuthErrorData, AuthSuccessData, GameId, JsonCodec, MoveData, WireMessage,
};
use frogcafe_session::{AuthenticatedPlayer, Authenticator};
use frogcafe_transport::{Connection, ConnectionId};

use crate::hub::{HubHandle, OutboundReceiver};
use crate::HubError;

/// Upper bound on closing the transport. A peer that stopped reading can
/// otherwise hold the close handshake open forever.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Who is on the other end of a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Identity {
    Anonymous,
    Player(AuthenticatedPlayer),
}

/// Everything a connection task needs. Shared by all connection tasks.
pub(crate) struct ConnectionContext {
    pub(crate) hub: HubHandle,
    pub(crate) auth: Arc<dyn Authenticator>,
    pub(crate) ledger: MoveLedger,
    pub(crate) idle_timeout: Option<Duration>,
}

/// Drop guard that unregisters the connection if the task exits without
/// doing so itself, including by panic.
///
/// `Drop` is synchronous, so the unregister is queued without waiting.
struct RegistrationGuard {
    hub: HubHandle,
    conn_id: ConnectionId,
    armed: bool,
}

impl RegistrationGuard {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for RegistrationGuard {
    fn drop(&mut self) {
        if self.armed {
            self.hub.unregister_detached(self.conn_id);
        }
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn serve_connection<C: Connection>(
    conn: C,
    ctx: Arc<ConnectionContext>,
) -> Result<(), HubError> {
    let conn_id = conn.id();

    let identity = match conn.params().token.as_deref() {
        Some(token) => match ctx.auth.authenticate(token).await {
            Ok(player) => {
                tracing::info!(%conn_id, player_id = %player.player_id, "connection authenticated");
                Identity::Player(player)
            }
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "connect token rejected, continuing anonymous");
                Identity::Anonymous
            }
        },
        None => Identity::Anonymous,
    };

    let watched = conn
        .params()
        .game_id
        .as_deref()
        .and_then(|raw| match parse_game_id(raw) {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "ignoring invalid game_id");
                None
            }
        });

    let outbound = match ctx.hub.register(conn_id, watched).await {
        Ok(outbound) => outbound,
        Err(e) => {
            tracing::warn!(%conn_id, error = %e, "hub unavailable, closing connection");
            close(&conn).await;
            return Err(e);
        }
    };
    let mut guard = RegistrationGuard {
        hub: ctx.hub.clone(),
        conn_id,
        armed: true,
    };

    let result = tokio::select! {
        r = inbound_loop(&conn, &ctx, watched, identity) => r,
        () = outbound_pump(&conn, outbound) => Ok(()),
    };

    // A closed hub has already dropped the registry; nothing to undo.
    let _ = ctx.hub.unregister(conn_id).await;
    guard.disarm();

    close(&conn).await;
    tracing::debug!(%conn_id, "connection finished");
    result
}

async fn close<C: Connection>(conn: &C) {
    let conn_id = conn.id();
    match tokio::time::timeout(CLOSE_TIMEOUT, conn.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::debug!(%conn_id, error = %e, "close failed"),
        Err(_) => tracing::debug!(%conn_id, "close timed out"),
    }
}

/// Reads frames until the peer leaves, the read fails, or the idle
/// timeout fires.
async fn inbound_loop<C: Connection>(
    conn: &C,
    ctx: &ConnectionContext,
    watched: Option<GameId>,
    mut identity: Identity,
) -> Result<(), HubError> {
    let conn_id = conn.id();
    loop {
        let next = match ctx.idle_timeout {
            Some(limit) => match tokio::time::timeout(limit, conn.recv()).await {
                Ok(next) => next,
                Err(_) => {
                    tracing::info!(%conn_id, "connection idle, closing");
                    return Ok(());
                }
            },
            None => conn.recv().await,
        };

        let bytes = match next {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                tracing::debug!(%conn_id, "connection closed by peer");
                return Ok(());
            }
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                return Ok(());
            }
        };

        let msg = match WireMessage::decode_inbound(&JsonCodec, &bytes) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "skipping malformed message");
                continue;
            }
        };

        handle_inbound(ctx, conn_id, watched, &mut identity, msg).await?;
    }
}

/// Writes queued frames to the socket until the hub closes the queue,
/// the write fails, or the hub evicts the connection.
async fn outbound_pump<C: Connection>(conn: &C, outbound: OutboundReceiver) {
    let conn_id = conn.id();
    let (mut frames, evicted) = outbound.into_parts();

    let drain = async {
        while let Some(text) = frames.recv().await {
            if let Err(e) = conn.send(&text).await {
                tracing::debug!(%conn_id, error = %e, "send failed");
                return;
            }
        }
        tracing::debug!(%conn_id, "outbound queue closed");
    };

    tokio::select! {
        () = drain => {}
        // `Err` means removed without eviction; the queue closes as well.
        Ok(()) = evicted => {
            tracing::debug!(%conn_id, "evicted by hub, abandoning pending writes");
        }
    }
}

/// Dispatches one decoded inbound message.
///
/// Only a hub failure is an error; everything a client can get wrong is
/// logged and dropped.
pub(crate) async fn handle_inbound(
    ctx: &ConnectionContext,
    conn_id: ConnectionId,
    watched: Option<GameId>,
    identity: &mut Identity,
    msg: WireMessage,
) -> Result<(), HubError> {
    match msg {
        WireMessage::Authenticate(data) => match ctx.auth.authenticate(&data.token).await {
            Ok(player) => {
                tracing::info!(%conn_id, player_id = %player.player_id, "connection authenticated");
                let reply = WireMessage::AuthSuccess(AuthSuccessData {
                    player_id: player.player_id,
                    username: player.username.clone(),
                });
                *identity = Identity::Player(player);
                ctx.hub.send_to(conn_id, reply).await
            }
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "authenticate rejected");
                let reply = WireMessage::AuthError(AuthErrorData {
                    error: e.to_string(),
                });
                ctx.hub.send_to(conn_id, reply).await
            }
        },
        WireMessage::Move(data) => handle_move(ctx, conn_id, watched, identity, data).await,
        other => ctx.hub.broadcast(other).await,
    }
}

async fn handle_move(
    ctx: &ConnectionContext,
    conn_id: ConnectionId,
    watched: Option<GameId>,
    identity: &Identity,
    data: MoveData,
) -> Result<(), HubError> {
    let Identity::Player(player) = identity else {
        tracing::debug!(%conn_id, "move from anonymous connection ignored");
        return Ok(());
    };
    let Some(game_id) = watched else {
        tracing::debug!(%conn_id, player_id = %player.player_id, "move without a watched game ignored");
        return Ok(());
    };

    let player_id = player.player_id;
    match ctx.ledger.record_move(game_id, player_id, data.x, data.y).await {
        Ok(move_number) => {
            let enriched = data.enrich(game_id, player_id, move_number);
            ctx.hub.broadcast(WireMessage::Move(enriched)).await
        }
        Err(e) => {
            tracing::warn!(%conn_id, %game_id, %player_id, error = %e, "move not recorded");
            Ok(())
        }
    }
}
