//! Relay session of an accepted WebSocket connection.
//!
//! The session registers the connection under the client's name, reads the
//! incoming frames one by one and relays each directive to the connection
//! registered under its recipient name. Writing to the socket is done by a
//! dedicated writer task, every writer (this session and the sessions
//! relaying to it) goes through its queue, so frames are never interleaved.
use std::sync::Arc;

use callsign_codec::frame;
use futures::stream::{SplitSink, StreamExt};
use futures::SinkExt;
use log::{debug, error, info, trace, warn};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::WebSocketStream;

use crate::registry::{ConnectionHandle, Registry};
use crate::{logerr, Result};

/// Frames which can wait in the outgoing queue of a connection.
pub const OUTGOING_BUFFER: usize = 64;

/// Lifecycle of a session. It only moves forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum SessionState {
    /// The upgrade is accepted, the connection is not routable yet.
    Connecting,
    /// The name points to this connection.
    Registered,
    /// Reading and dispatching frames.
    Relaying,
    /// Read loop exited, the registry entry is removed.
    Closed,
}

/// What happened to an inbound frame.
#[derive(Debug, PartialEq, Eq)]
pub enum Dispatch {
    /// Not a directive, dropped silently.
    Discarded,
    /// Queued to the recipient.
    Relayed,
    /// Recipient is not connected, the sender got a notice.
    Notified,
    /// Writing the relayed frame or the notice failed.
    Failed,
}

pub struct Session {
    pub name: String,
    pub address: String,
    pub connection: ConnectionHandle,
    pub state: SessionState,
}

impl Session {
    pub fn new(name: &str, address: &str, connection: ConnectionHandle) -> Self {
        Self {
            name: name.to_string(),
            address: address.to_string(),
            connection,
            state: SessionState::Connecting,
        }
    }

    fn transition(&mut self, next: SessionState) {
        debug_assert!(next > self.state, "{:?} -> {:?}", self.state, next);

        debug!("Session {} {:?} -> {:?}", self.name, self.state, next);

        self.state = next;
    }

    /// Parse and route an inbound text frame.
    pub async fn dispatch(&self, registry: &Registry, text: &str) -> Dispatch {
        let Some(directive) = frame::parse_directive(text) else {
            trace!("Discard frame from {} without recipient", self.name);

            return Dispatch::Discarded;
        };

        // The registry lock is released here, before any write.
        let target = registry.get_connection(directive.recipient);

        match target {
            Some(target) => {
                let forwarded = frame::forward(&self.name, directive.message);

                match target.send_text(forwarded).await {
                    Ok(()) => Dispatch::Relayed,
                    Err(e) => {
                        warn!("Failed to forward message from {} to {}: {e}", self.name, directive.recipient);

                        Dispatch::Failed
                    }
                }
            }
            None => match self.connection.send_text(frame::notice(directive.recipient)).await {
                Ok(()) => Dispatch::Notified,
                Err(e) => {
                    warn!("Failed to send notice to {}: {e}", self.name);

                    Dispatch::Failed
                }
            },
        }
    }
}

/// Run the session of an upgraded connection until the client goes away.
pub async fn handle_client<S>(
    ws: WebSocketStream<S>,
    name: String,
    address: String,
    registry: Arc<Registry>,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (sink, mut stream) = ws.split();
    let (outgoing_tx, mut outgoing_rx) = mpsc::channel::<Message>(OUTGOING_BUFFER);
    let mut session = Session::new(&name, &address, ConnectionHandle::new(outgoing_tx));
    let id = session.connection.id();

    let writer = tokio::spawn(async move {
        logerr!(outgoing_loop(sink, &mut outgoing_rx).await);
    });

    registry.add(&session.name, session.connection.clone(), &session.address);
    session.transition(SessionState::Registered);

    info!("Client {} connected from {} id = {id}", session.name, session.address);

    session.transition(SessionState::Relaying);

    while let Some(data) = stream.next().await {
        trace!("Incoming {:?}", data);

        if !handle_in_stream_data(&session, &registry, data).await {
            break;
        }
    }

    registry.remove_by_connection(id);
    session.transition(SessionState::Closed);

    // The writer stops after the close frame. If the queue is already closed the
    // writer is gone, the peer must have dropped.
    if session.connection.send_message(Message::Close(None)).await.is_err() {
        writer.abort();
    }

    drop(session);

    if let Err(e) = writer.await {
        if !e.is_cancelled() {
            error!("Writer task of {name} failed {:?}", e);
        }
    }

    info!("Client {name} disconnected id = {id}, connected clients = {}", registry.connected());

    Ok(())
}

/// Handle one item of the incoming stream. Returns false if the read loop needs to stop.
async fn handle_in_stream_data(
    session: &Session,
    registry: &Registry,
    data: std::result::Result<Message, tungstenite::Error>,
) -> bool {
    match data {
        Ok(Message::Text(text)) => {
            session.dispatch(registry, &text).await;

            true
        }
        Ok(Message::Binary(bytes)) => {
            match String::from_utf8(bytes) {
                Ok(text) => {
                    session.dispatch(registry, &text).await;
                }
                Err(_) => {
                    trace!("Discard non-UTF-8 binary frame from {}", session.name);
                }
            }

            true
        }
        Ok(Message::Close(close)) => {
            debug!("Client {} closed the connection {:?}", session.name, close);

            false
        }
        // Ping is answered by tungstenite itself.
        Ok(Message::Ping(_)) | Ok(Message::Pong(_)) | Ok(Message::Frame(_)) => true,
        Err(e) => {
            debug!("Read error on {}: {e}", session.name);

            false
        }
    }
}

async fn outgoing_loop<S>(
    mut socket_sink: SplitSink<WebSocketStream<S>, Message>,
    frame_stream: &mut mpsc::Receiver<Message>,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    while let Some(message) = frame_stream.recv().await {
        trace!("Outgoing {:?}", message);

        let closing = message.is_close();

        match socket_sink.send(message).await {
            Ok(()) if closing => break,
            Ok(()) => {}
            // The peer started the close handshake, it has been answered already.
            Err(e) if closing && is_closed_error(&e) => return Ok(()),
            Err(e) => return Err(e.into()),
        }
    }

    match socket_sink.close().await {
        Err(e) if !is_closed_error(&e) => Err(e.into()),
        _ => Ok(()),
    }
}

fn is_closed_error(err: &tungstenite::Error) -> bool {
    matches!(err, tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed)
}
