//! Callsign server: clients connect over WebSocket under a name and send messages
//! to each other by name.
pub mod assets;
pub mod config;
pub mod error;
pub mod http;
pub mod logger;
pub mod registry;
pub mod server;
pub mod session;

#[cfg(test)]
mod tests;

use std::path::PathBuf;
use std::sync::Arc;

pub use error::{Error, Result};
use registry::Registry;

/// State shared by the HTTP handlers and the sessions.
#[derive(Clone)]
pub struct Context {
    pub registry: Arc<Registry>,
    /// Root of the static files of the web client.
    pub static_dir: PathBuf,
}

impl Context {
    pub fn new(static_dir: impl Into<PathBuf>) -> Self {
        Self {
            registry: Arc::new(Registry::new()),
            static_dir: static_dir.into(),
        }
    }
}

#[macro_export]
macro_rules! logerr {
    ($val:expr) => {
        if let Err(e) = $val {
            log::error!("Error {:?}", e);
        }
    };
}

/// Send to a bounded channel and give up after a second.
#[macro_export]
macro_rules! send {
    ($channel:expr, $message:expr) => {
        $channel
            .send_timeout($message, tokio::time::Duration::from_secs(1))
            .await
    };
}
