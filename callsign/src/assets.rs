//! Static files of the web client.
use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use http_body_util::Full;
use hyper::{
    header::{HeaderValue, CONTENT_TYPE},
    Response,
};
use log::debug;

use crate::error::{HttpError, Result};

/// Map a request path to a file under `root`. Paths escaping the root, or having anything but
/// plain file name components, don't map to any file.
pub fn resolve(root: &Path, request_path: &str) -> Option<PathBuf> {
    let relative = Path::new(request_path.trim_start_matches('/'));
    let mut path = root.to_path_buf();

    for component in relative.components() {
        match component {
            Component::Normal(part) => path.push(part),
            _ => return None,
        }
    }

    if path == root {
        None
    } else {
        Some(path)
    }
}

pub fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js") => "text/javascript; charset=utf-8",
        Some("json") => "application/json",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        Some("woff2") => "font/woff2",
        Some("txt") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

/// Read the file the request path points to.
pub async fn serve(root: &Path, request_path: &str) -> Result<Response<Full<Bytes>>> {
    let Some(path) = resolve(root, request_path) else {
        return HttpError::NotFound.into_result("not found");
    };

    match tokio::fs::read(&path).await {
        Ok(content) => {
            let mut response = Response::new(Full::new(Bytes::from(content)));

            response
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static(content_type(&path)));

            Ok(response)
        }
        Err(e) => {
            debug!("Cannot serve {:?}: {e}", path);

            HttpError::NotFound.into_result("not found")
        }
    }
}
