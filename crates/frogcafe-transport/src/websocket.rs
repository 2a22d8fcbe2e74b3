//! WebSocket transport implementation using `tokio-tungstenite`.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::tungstenite::handshake::server::{
    ErrorResponse, Request, Response,
};
use tokio_tungstenite::tungstenite::Message;

use crate::{
    ConnectParams, Connection, ConnectionId, Transport, TransportError,
};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// How long a client gets to finish the upgrade request by default.
const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Upgraded connections waiting for `accept` to pick them up.
const READY_CAPACITY: usize = 64;

type WsStream = tokio_tungstenite::WebSocketStream<TcpStream>;

/// A WebSocket-based [`Transport`] that listens for incoming connections.
///
/// The upgrade handshake runs in its own task per TCP connection, so a
/// client that connects and then goes quiet never holds up `accept` for
/// anyone else. A handshake that takes longer than the handshake timeout
/// is abandoned and the socket dropped.
pub struct WebSocketTransport {
    listener: TcpListener,
    handshake_timeout: Duration,
    ready_tx: mpsc::Sender<WebSocketConnection>,
    ready_rx: mpsc::Receiver<WebSocketConnection>,
}

impl WebSocketTransport {
    /// Binds a new WebSocket transport to the given address.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener =
            TcpListener::bind(addr)
                .await
                .map_err(|source| TransportError::Bind {
                    addr: addr.to_string(),
                    source,
                })?;
        tracing::info!(addr, "WebSocket transport listening");
        let (ready_tx, ready_rx) = mpsc::channel(READY_CAPACITY);
        Ok(Self {
            listener,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            ready_tx,
            ready_rx,
        })
    }

    /// Sets how long a client may take to complete the upgrade.
    ///
    /// Default: 10 seconds.
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Returns the address the listener is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// Starts the upgrade of one TCP connection in the background.
    fn spawn_handshake(&self, stream: TcpStream, addr: SocketAddr) {
        let ready = self.ready_tx.clone();
        let limit = self.handshake_timeout;
        tokio::spawn(async move {
            match tokio::time::timeout(limit, upgrade(stream)).await {
                Ok(Ok(conn)) => {
                    tracing::debug!(
                        id = %conn.id,
                        %addr,
                        game_id = ?conn.params.game_id,
                        has_token = conn.params.token.is_some(),
                        "accepted WebSocket connection"
                    );
                    // Fails only once the transport is gone.
                    let _ = ready.send(conn).await;
                }
                Ok(Err(e)) => {
                    tracing::debug!(%addr, error = %e, "handshake failed");
                }
                Err(_) => {
                    tracing::debug!(%addr, "handshake timed out, dropping socket");
                }
            }
        });
    }
}

/// Performs the WebSocket upgrade, capturing the query string and the
/// `Authorization` header on the way.
async fn upgrade(stream: TcpStream) -> Result<WebSocketConnection, TransportError> {
    let mut params = ConnectParams::default();
    let ws = tokio_tungstenite::accept_hdr_async(
        stream,
        |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
            let authorization = req
                .headers()
                .get("authorization")
                .and_then(|v| v.to_str().ok());
            params = ConnectParams::from_parts(req.uri().query(), authorization);
            Ok(resp)
        },
    )
    .await
    .map_err(|e| TransportError::Handshake(e.to_string()))?;

    let id = ConnectionId::new(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed));
    let (sink, stream) = ws.split();
    Ok(WebSocketConnection {
        id,
        params,
        sink: Mutex::new(sink),
        stream: Mutex::new(stream),
    })
}

impl Transport for WebSocketTransport {
    type Connection = WebSocketConnection;
    type Error = TransportError;

    /// Waits for the next connection that has finished its upgrade.
    ///
    /// New TCP connections are handed to background handshake tasks while
    /// waiting; only a failing listener is reported as an error.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error> {
        loop {
            tokio::select! {
                // `self` keeps a sender, so the queue never reports closed.
                Some(conn) = self.ready_rx.recv() => return Ok(conn),
                accepted = self.listener.accept() => {
                    let (stream, addr) = accepted.map_err(TransportError::Accept)?;
                    self.spawn_handshake(stream, addr);
                }
            }
        }
    }

    async fn shutdown(&self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// A single WebSocket connection.
///
/// The socket is split so the write half and the read half sit behind
/// separate locks: an outbound pump never waits for the inbound pump's
/// pending read.
pub struct WebSocketConnection {
    id: ConnectionId,
    params: ConnectParams,
    sink: Mutex<SplitSink<WsStream, Message>>,
    stream: Mutex<SplitStream<WsStream>>,
}

impl Connection for WebSocketConnection {
    type Error = TransportError;

    async fn send(&self, text: &str) -> Result<(), Self::Error> {
        self.sink
            .lock()
            .await
            .send(Message::text(text.to_string()))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        let mut stream = self.stream.lock().await;
        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(text.as_bytes().to_vec()));
                }
                Some(Ok(Message::Binary(data))) => {
                    return Ok(Some(data.to_vec()));
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue, // ping/pong/raw frame
                Some(Err(e)) => {
                    return Err(TransportError::Receive(e.to_string()));
                }
            }
        }
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.sink
            .lock()
            .await
            .close()
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    fn id(&self) -> ConnectionId {
        self.id
    }

    fn params(&self) -> &ConnectParams {
        &self.params
    }
}
