use anyhow::{anyhow, Result};
use callsign_codec::frame::Delivery;
use futures::stream::{SplitSink, SplitStream, StreamExt};
use futures::SinkExt;
use log::{debug, error, trace};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::WebSocketStream;

use crate::client_api::{ClientRequest, ClientRequestSink, DeliverySink, Param};

/// Hand over the request to the socket loop and wait until it is done.
pub(crate) async fn call(sink: &ClientRequestSink, param: Param) -> Result<()> {
    let (tx, rx) = oneshot::channel();

    sink.send(ClientRequest { param, response: tx })
        .await
        .map_err(|_| anyhow!("Connection is closed"))?;

    rx.await?
}

/// Ask the socket loop to close the connection. If the loop is already gone the connection is
/// closed, there is nothing to do.
pub(crate) async fn close(sink: &ClientRequestSink) -> Result<()> {
    let (tx, rx) = oneshot::channel();

    let request = ClientRequest {
        param: Param::Close,
        response: tx,
    };

    if sink.send(request).await.is_err() {
        return Ok(());
    }

    // The loop may stop with the request still queued.
    rx.await.unwrap_or(Ok(()))
}

/// Reads the incoming frames and writes the requested ones until the connection is closed by
/// either side.
pub(crate) async fn socket_loop<S>(
    ws: WebSocketStream<S>,
    mut requests: mpsc::Receiver<ClientRequest>,
    deliveries: DeliverySink,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (mut sink, mut stream) = ws.split();

    loop {
        tokio::select! {
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(message)) => {
                        if !handle_in_message(message, &deliveries) {
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        error!("Error {:?}", e);

                        break;
                    }
                    None => {
                        break;
                    }
                }
            }
            req = requests.recv() => {
                match req {
                    Some(ClientRequest { param: Param::Frame(text), response }) => {
                        trace!("Outgoing {:?}", text);

                        let result = sink.send(Message::Text(text)).await.map_err(anyhow::Error::from);

                        // The caller may have given up waiting.
                        let _ = response.send(result);
                    }
                    Some(ClientRequest { param: Param::Close, response }) => {
                        let result = send_close(&mut sink).await;

                        drain(&mut stream, &deliveries).await;

                        let _ = response.send(result);

                        break;
                    }
                    None => {
                        // Client is dropped without closing.
                        let _ = send_close(&mut sink).await;

                        break;
                    }
                }
            }
        }
    }

    Ok(())
}

/// Returns false if the server closed the connection.
fn handle_in_message(message: Message, deliveries: &DeliverySink) -> bool {
    match message {
        Message::Text(text) => {
            match Delivery::decode(&text) {
                Ok(delivery) => {
                    // Nobody listens if the client is being dropped.
                    let _ = deliveries.send(delivery);
                }
                Err(e) => error!("Error {:?}", e),
            }

            true
        }
        Message::Close(close) => {
            debug!("Server closed the connection {:?}", close);

            false
        }
        _ => true,
    }
}

async fn send_close<S>(sink: &mut SplitSink<WebSocketStream<S>, Message>) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    match sink.send(Message::Close(None)).await {
        Ok(()) | Err(tungstenite::Error::ConnectionClosed) | Err(tungstenite::Error::AlreadyClosed) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Read until the server answers the close frame. Frames arriving meanwhile are still delivered.
async fn drain<S>(stream: &mut SplitStream<WebSocketStream<S>>, deliveries: &DeliverySink)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    while let Some(Ok(message)) = stream.next().await {
        if !handle_in_message(message, deliveries) {
            break;
        }
    }
}
