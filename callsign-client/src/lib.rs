//! Client of the callsign relay server.
//!
//! ```no_run
//! use callsign_client::Delivery;
//!
//! # async fn chat() -> anyhow::Result<()> {
//! let mut client = callsign_client::connect("localhost:8080", "bob").await?;
//!
//! client.send("carol", "hi").await?;
//!
//! if let Some(Delivery::Message { from, body }) = client.receive().await {
//!     println!("{from} says {body}");
//! }
//!
//! client.close().await?;
//! # Ok(())
//! # }
//! ```
mod client_api;
pub use client_api::{connect, Client};

mod error;
pub use error::ClientError;

mod http;
pub use http::{register, users};

mod processor;

pub use callsign_codec::frame::Delivery;
