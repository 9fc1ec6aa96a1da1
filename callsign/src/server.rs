use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::TokioIo;
use log::{error, info};
use tokio::net::TcpListener;

use crate::{http, Context, Result};

/// Bind the listening address. Failing to bind is fatal for the server.
pub async fn bind(url: &str) -> Result<TcpListener> {
    let listener = TcpListener::bind(url).await?;

    info!("Start listening on {}", listener.local_addr()?);

    Ok(listener)
}

/// Accept connections forever. Each connection is served by its own task, an upgraded
/// connection continues as a relay session.
pub async fn serve(listener: TcpListener, context: Context) {
    loop {
        let (socket, remote_addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                error!("Error accepting connection {:?}", e);

                continue;
            }
        };
        let ctx = context.clone();

        tokio::spawn(async move {
            let service = service_fn(move |req: Request<Incoming>| http::route(req, ctx.clone(), remote_addr));

            if let Err(e) = http1::Builder::new()
                .serve_connection(TokioIo::new(socket), service)
                .with_upgrades()
                .await
            {
                error!("Error serving {remote_addr} {:?}", e);
            }
        });
    }
}
