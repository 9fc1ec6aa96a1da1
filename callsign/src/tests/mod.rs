
use std::sync::Arc;
use std::time::Duration;

use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::io::DuplexStream;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{protocol::Role, Message};
use tokio_tungstenite::WebSocketStream;

use crate::registry::{ConnectionId, Registry};
use crate::session;

/// TestCase runs real relay sessions over in-memory WebSocket connections, sharing one
/// registry.
struct TestCase {
    registry: Arc<Registry>,
}

/// The client end of a session under test.
struct TestClient {
    name: String,
    sink: SplitSink<WebSocketStream<DuplexStream>, Message>,
    stream: recv::ClientStream,
    session: JoinHandle<crate::Result<()>>,
}

impl TestCase {
    fn new() -> Self {
        Self {
            registry: Arc::new(Registry::new()),
        }
    }

    /// Start a session for `name` and wait until the name is registered to it.
    async fn connect(&self, name: &str) -> TestClient {
        let previous = self.registry.get_connection(name).map(|c| c.id());
        let client = self.start_session(name).await;

        self.wait_until(|| {
            let current = self.registry.get_connection(name).map(|c| c.id());

            current.is_some() && current != previous
        })
        .await;

        client
    }

    async fn start_session(&self, name: &str) -> TestClient {
        let (server_io, client_io) = tokio::io::duplex(16 * 1024);
        let registry = self.registry.clone();
        let session_name = name.to_string();

        let session = tokio::spawn(async move {
            let ws = WebSocketStream::from_raw_socket(server_io, Role::Server, None).await;

            session::handle_client(ws, session_name, "127.0.0.1:40000".to_string(), registry).await
        });

        let ws = WebSocketStream::from_raw_socket(client_io, Role::Client, None).await;
        let (sink, stream) = ws.split();

        TestClient {
            name: name.to_string(),
            sink,
            stream,
            session,
        }
    }

    fn connection_id(&self, name: &str) -> Option<ConnectionId> {
        self.registry.get_connection(name).map(|c| c.id())
    }

    /// Poll the condition until it holds, panics after a second.
    async fn wait_until<F: Fn() -> bool>(&self, condition: F) {
        for _ in 0..100 {
            if condition() {
                return;
            }

            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        panic!("Condition is not met in time");
    }
}

impl TestClient {
    async fn send(&mut self, text: &str) {
        self.sink.send(Message::Text(text.to_string())).await.unwrap();
    }

    /// Receive the next text frame, `None` on timeout or if the connection is closed.
    async fn recv_text(&mut self) -> Option<String> {
        loop {
            match recv::recv_with_timeout(&mut self.stream).await? {
                Ok(Message::Text(text)) => return Some(text),
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
                _ => return None,
            }
        }
    }

    async fn recv_nothing(&mut self) -> bool {
        recv::recv_nothing(&mut self.stream).await
    }

    /// Close the client side and wait for the session task to finish.
    async fn close(mut self) {
        let _ = self.sink.send(Message::Close(None)).await;

        // Drain until the server finishes the close handshake.
        while let Some(Ok(_)) = self.stream.next().await {}

        drop(self.sink);

        self.session.await.unwrap().unwrap();
    }
}
