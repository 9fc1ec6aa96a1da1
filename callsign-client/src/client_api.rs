use std::fmt;

use anyhow::{anyhow, Result};
use callsign_codec::frame::{self, Delivery};
use log::{error, info};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::{tungstenite, WebSocketStream};
use url::Url;

use crate::client_error;
use crate::processor;

pub(crate) type ClientRequestSink = mpsc::Sender<ClientRequest>;
pub(crate) type DeliverySink = mpsc::UnboundedSender<Delivery>;

/// What the socket loop needs to do on behalf of the client.
pub(crate) enum Param {
    /// Send a text frame.
    Frame(String),
    /// Close the connection and wait for the close handshake.
    Close,
}

/// Represents a client request, the socket loop answers it once the frame is written out.
pub(crate) struct ClientRequest {
    pub(crate) param: Param,
    pub(crate) response: oneshot::Sender<Result<()>>,
}

impl fmt::Debug for ClientRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.param {
            Param::Frame(text) => write!(f, "Request{{Frame={:?}}}", text),
            Param::Close => write!(f, "Request{{Close}}"),
        }
    }
}

/// A connection registered under `name`.
#[derive(Debug)]
pub struct Client {
    pub name: String,
    request_sink: ClientRequestSink,
    deliveries: mpsc::UnboundedReceiver<Delivery>,
    socket_task: Option<JoinHandle<()>>,
}

/// Connect to the server listening on `addr` (host:port) and register the connection under
/// `name`. If the server refuses the upgrade, the error is a [`crate::ClientError`] with the
/// HTTP status.
pub async fn connect(addr: &str, name: &str) -> Result<Client> {
    let url = ws_url(addr, name)?;

    let ws = match tokio_tungstenite::connect_async(url.as_str()).await {
        Ok((ws, _)) => ws,
        Err(tungstenite::Error::Http(response)) => {
            let body = response
                .body()
                .as_deref()
                .map(String::from_utf8_lossy)
                .unwrap_or_default();

            return client_error!(response.status().as_u16(), body.trim_end());
        }
        Err(e) => return Err(anyhow!("Connection error {:?}", e)),
    };

    info!("Connected to {addr} as {name}");

    Ok(start(ws, name))
}

/// Spawn the socket loop of an established connection.
fn start<S>(ws: WebSocketStream<S>, name: &str) -> Client
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (request_sink, requests) = mpsc::channel(1);
    let (delivery_sink, deliveries) = mpsc::unbounded_channel();

    let socket_task = tokio::spawn(async move {
        if let Err(e) = processor::socket_loop(ws, requests, delivery_sink).await {
            error!("Error {:?}", e);
        }
    });

    Client {
        name: name.to_string(),
        request_sink,
        deliveries,
        socket_task: Some(socket_task),
    }
}

fn ws_url(addr: &str, name: &str) -> Result<Url> {
    let mut url = Url::parse(&format!("ws://{addr}/ws"))?;

    url.query_pairs_mut().append_pair("name", name);

    Ok(url)
}

impl Client {
    /// Send `message` to the client registered as `recipient`. Getting `Ok` doesn't mean the
    /// recipient is connected, the server answers with a notice if it isn't.
    pub async fn send(&self, recipient: &str, message: &str) -> Result<()> {
        processor::call(&self.request_sink, Param::Frame(frame::directive(recipient, message))).await
    }

    /// The next frame sent by the server, `None` if the connection is closed.
    pub async fn receive(&mut self) -> Option<Delivery> {
        self.deliveries.recv().await
    }

    /// Close the connection. Closing a connection which the server has already closed is not an
    /// error.
    pub async fn close(mut self) -> Result<()> {
        processor::close(&self.request_sink).await?;

        if let Some(task) = self.socket_task.take() {
            task.await?;
        }

        Ok(())
    }
}
