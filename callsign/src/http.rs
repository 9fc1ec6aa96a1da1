//! HTTP side of the server: client registration, user listing, static files and the WebSocket
//! upgrade of the relay endpoint.
use std::convert::Infallible;
use std::net::SocketAddr;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{
    body::Body,
    header::{self, HeaderName, HeaderValue},
    HeaderMap, Method, Request, Response, StatusCode,
};
use hyper_util::rt::TokioIo;
use log::{debug, error, info};
use tokio_tungstenite::{
    tungstenite::{handshake::derive_accept_key, protocol::Role},
    WebSocketStream,
};

use crate::error::{to_runtime_error, HttpError, Result};
use crate::{assets, logerr, session, Context};

/// Route a request. Errors are answered with their status code, so this never fails.
pub async fn route<B>(
    req: Request<B>,
    context: Context,
    remote_addr: SocketAddr,
) -> std::result::Result<Response<Full<Bytes>>, Infallible>
where
    B: Body,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    debug!("{} {} from {}", req.method(), req.uri(), remote_addr);

    let path = req.uri().path().to_string();

    let result = match path.as_str() {
        "/" => assets::serve(&context.static_dir, "/index.html").await,
        "/register" => register(req, &context, remote_addr).await,
        "/users" => users(&context),
        "/ws" => upgrade(req, context, remote_addr),
        "/style.css" | "/app.js" => assets::serve(&context.static_dir, &path).await,
        p if p.starts_with("/css/") || p.starts_with("/assets/") => assets::serve(&context.static_dir, p).await,
        // Any other path is a page of the web client.
        _ => assets::serve(&context.static_dir, "/index.html").await,
    };

    Ok(result.unwrap_or_else(|e| to_runtime_error(e).into()))
}

/// Record the address of the name sent in the body. It doesn't create a routable entry, only
/// the WebSocket connection does.
async fn register<B>(req: Request<B>, context: &Context, remote_addr: SocketAddr) -> Result<Response<Full<Bytes>>>
where
    B: Body,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    if req.method() != Method::POST {
        return HttpError::MethodNotAllowed.into_result("method not allowed");
    }

    let body = req.into_body().collect().await?.to_bytes();
    let name = String::from_utf8_lossy(&body);

    if name.is_empty() {
        return HttpError::BadRequest.into_result("empty name");
    }

    context.registry.register_address(&name, &remote_addr.to_string());

    Ok(Response::new(Full::new(Bytes::new())))
}

fn users(context: &Context) -> Result<Response<Full<Bytes>>> {
    let users = context.registry.list();
    let body = serde_json::to_vec(&users)?;
    let mut response = Response::new(Full::new(Bytes::from(body)));

    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));

    Ok(response)
}

/// Value of the `name` query parameter, `None` if it is missing or empty.
pub fn name_param(query: Option<&str>) -> Option<String> {
    url::form_urlencoded::parse(query.unwrap_or_default().as_bytes())
        .find(|(key, _)| key == "name")
        .map(|(_, value)| value.into_owned())
        .filter(|name| !name.is_empty())
}

/// Check if the comma separated header value contains `token`, ignoring case.
fn header_has_token(headers: &HeaderMap, name: HeaderName, token: &str) -> bool {
    headers
        .get_all(name)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|t| t.trim().eq_ignore_ascii_case(token))
}

/// Accept the WebSocket handshake and start the relay session once hyper hands over the
/// connection.
fn upgrade<B>(mut req: Request<B>, context: Context, remote_addr: SocketAddr) -> Result<Response<Full<Bytes>>> {
    let Some(name) = name_param(req.uri().query()) else {
        return HttpError::BadRequest.into_result("missing name");
    };

    if req.method() != Method::GET {
        return HttpError::MethodNotAllowed.into_result("method not allowed");
    }

    let headers = req.headers();
    let is_websocket = header_has_token(headers, header::UPGRADE, "websocket")
        && header_has_token(headers, header::CONNECTION, "upgrade")
        && headers
            .get(header::SEC_WEBSOCKET_VERSION)
            .is_some_and(|v| v.as_bytes() == b"13");

    let Some(key) = headers.get(header::SEC_WEBSOCKET_KEY).filter(|_| is_websocket) else {
        return HttpError::BadRequest.into_result("websocket upgrade expected");
    };

    let accept = HeaderValue::from_str(&derive_accept_key(key.as_bytes()))?;
    let on_upgrade = hyper::upgrade::on(&mut req);
    let registry = context.registry.clone();

    tokio::spawn(async move {
        match on_upgrade.await {
            Ok(upgraded) => {
                let ws = WebSocketStream::from_raw_socket(TokioIo::new(upgraded), Role::Server, None).await;

                logerr!(session::handle_client(ws, name, remote_addr.to_string(), registry).await);
            }
            Err(e) => {
                error!("WebSocket upgrade of {name} from {remote_addr} failed {:?}", e);
            }
        }
    });

    info!("Upgrading connection of {remote_addr}");

    let mut response = Response::new(Full::new(Bytes::new()));

    *response.status_mut() = StatusCode::SWITCHING_PROTOCOLS;

    let headers = response.headers_mut();

    headers.insert(header::CONNECTION, HeaderValue::from_static("upgrade"));
    headers.insert(header::UPGRADE, HeaderValue::from_static("websocket"));
    headers.insert(header::SEC_WEBSOCKET_ACCEPT, accept);

    Ok(response)
}
