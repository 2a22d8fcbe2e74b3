//! Integration tests for the WebSocket transport.
//!
//! These spin up a real listener on an OS-assigned port and drive it with
//! a `tokio-tungstenite` client.

#[cfg(feature = "websocket")]
mod websocket {
    use futures_util::{SinkExt, StreamExt};
    use frogcafe_transport::{
        Connection, Transport, TransportError, WebSocketTransport,
    };
    use tokio_tungstenite::tungstenite::client::IntoClientRequest;
    use tokio_tungstenite::tungstenite::Message;

    type ClientWs = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    async fn bind() -> (WebSocketTransport, String) {
        let transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("local addr").to_string();
        (transport, addr)
    }

    async fn connect_client(url: &str) -> ClientWs {
        let (ws, _) = tokio_tungstenite::connect_async(url)
            .await
            .expect("client should connect");
        ws
    }

    #[tokio::test]
    async fn test_websocket_accept_and_send_receive() {
        let (mut transport, addr) = bind().await;

        let server_handle = tokio::spawn(async move {
            transport.accept().await.expect("should accept")
        });
        let mut client_ws = connect_client(&format!("ws://{addr}/ws")).await;
        let server_conn = server_handle.await.expect("task should complete");

        assert!(server_conn.id().into_inner() > 0);

        server_conn
            .send("{\"type\":\"hello\"}")
            .await
            .expect("send should succeed");
        let msg = client_ws.next().await.unwrap().unwrap();
        assert_eq!(msg.into_text().unwrap().as_str(), "{\"type\":\"hello\"}");

        client_ws
            .send(Message::text("from client".to_string()))
            .await
            .unwrap();
        let received = server_conn
            .recv()
            .await
            .expect("recv should succeed")
            .expect("should have data");
        assert_eq!(received, b"from client");

        server_conn.close().await.expect("close should succeed");
    }

    #[tokio::test]
    async fn test_websocket_captures_query_parameters() {
        let (mut transport, addr) = bind().await;

        let server_handle =
            tokio::spawn(async move { transport.accept().await.unwrap() });
        let _client =
            connect_client(&format!("ws://{addr}/ws?game_id=7&token=abc")).await;
        let server_conn = server_handle.await.unwrap();

        assert_eq!(server_conn.params().game_id.as_deref(), Some("7"));
        assert_eq!(server_conn.params().token.as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn test_websocket_captures_bearer_header() {
        let (mut transport, addr) = bind().await;

        let server_handle =
            tokio::spawn(async move { transport.accept().await.unwrap() });

        let mut request = format!("ws://{addr}/ws").into_client_request().unwrap();
        request
            .headers_mut()
            .insert("Authorization", "Bearer secret".parse().unwrap());
        let (_client, _) = tokio_tungstenite::connect_async(request).await.unwrap();
        let server_conn = server_handle.await.unwrap();

        assert_eq!(server_conn.params().token.as_deref(), Some("secret"));
        assert!(server_conn.params().game_id.is_none());
    }

    #[tokio::test]
    async fn test_websocket_send_does_not_wait_for_pending_recv() {
        let (mut transport, addr) = bind().await;

        let server_handle =
            tokio::spawn(async move { transport.accept().await.unwrap() });
        let mut client_ws = connect_client(&format!("ws://{addr}")).await;
        let server_conn = std::sync::Arc::new(server_handle.await.unwrap());

        // Park a reader on the connection, then write through it.
        let reader = std::sync::Arc::clone(&server_conn);
        let pending = tokio::spawn(async move { reader.recv().await });
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        tokio::time::timeout(
            std::time::Duration::from_secs(2),
            server_conn.send("ping"),
        )
        .await
        .expect("send must not block behind recv")
        .unwrap();
        let msg = client_ws.next().await.unwrap().unwrap();
        assert_eq!(msg.into_text().unwrap().as_str(), "ping");

        client_ws.send(Message::Close(None)).await.unwrap();
        let result = pending.await.unwrap().expect("recv should not error");
        assert!(result.is_none(), "should return None on client close");
    }

    #[tokio::test]
    async fn test_websocket_silent_socket_does_not_block_accept() {
        let (mut transport, addr) = bind().await;

        // Connects at the TCP level and never sends an upgrade request.
        let _silent = tokio::net::TcpStream::connect(&addr).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        let server_handle =
            tokio::spawn(async move { transport.accept().await.unwrap() });
        let _client = connect_client(&format!("ws://{addr}/?game_id=2")).await;

        let server_conn = tokio::time::timeout(
            std::time::Duration::from_secs(2),
            server_handle,
        )
        .await
        .expect("accept must not wait on the silent socket")
        .unwrap();
        assert_eq!(server_conn.params().game_id.as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_websocket_handshake_timeout_drops_socket() {
        use tokio::io::AsyncReadExt;

        let (transport, addr) = bind().await;
        let mut transport = transport
            .with_handshake_timeout(std::time::Duration::from_millis(50));
        let _accepting = tokio::spawn(async move { transport.accept().await });

        let mut silent = tokio::net::TcpStream::connect(&addr).await.unwrap();
        let mut buf = [0u8; 16];
        let read = tokio::time::timeout(
            std::time::Duration::from_secs(2),
            silent.read(&mut buf),
        )
        .await
        .expect("server should drop the socket after the timeout");
        // EOF or a reset both mean the server let go.
        assert!(matches!(read, Ok(0) | Err(_)));
    }

    #[tokio::test]
    async fn test_websocket_bind_taken_address_fails() {
        let (_transport, addr) = bind().await;

        let err = WebSocketTransport::bind(&addr)
            .await
            .err()
            .expect("address is already in use");
        assert!(matches!(err, TransportError::Bind { .. }));
        assert!(err.to_string().contains(&addr));
    }
}
