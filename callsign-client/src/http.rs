//! Plain HTTP calls of the server.
use std::collections::BTreeMap;

use anyhow::Result;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{header, Method, Request, StatusCode};
use hyper_util::rt::TokioIo;
use log::error;
use tokio::net::TcpStream;

use crate::client_error;

/// Record the address of `name` on the server.
pub async fn register(addr: &str, name: &str) -> Result<()> {
    let (status, body) = request(addr, Method::POST, "/register", name.to_string()).await?;

    check_status(status, &body)
}

/// Names registered on the server with the address they were seen from.
pub async fn users(addr: &str) -> Result<BTreeMap<String, String>> {
    let (status, body) = request(addr, Method::GET, "/users", String::new()).await?;

    check_status(status, &body)?;

    Ok(serde_json::from_slice(&body)?)
}

async fn request(addr: &str, method: Method, path: &str, body: String) -> Result<(StatusCode, Bytes)> {
    let stream = TcpStream::connect(addr).await?;
    let (mut sender, connection) = hyper::client::conn::http1::handshake(TokioIo::new(stream)).await?;

    tokio::spawn(async move {
        if let Err(e) = connection.await {
            error!("Error {:?}", e);
        }
    });

    let req = Request::builder()
        .method(method)
        .uri(path)
        .header(header::HOST, addr)
        .body(Full::new(Bytes::from(body)))?;

    let response = sender.send_request(req).await?;
    let status = response.status();
    let body = response.into_body().collect().await?.to_bytes();

    Ok((status, body))
}

fn check_status(status: StatusCode, body: &[u8]) -> Result<()> {
    if status == StatusCode::OK {
        Ok(())
    } else {
        client_error!(status.as_u16(), String::from_utf8_lossy(body).trim_end())
    }
}
