mod helper;
mod relay;
mod users;

use std::time::Duration;

use callsign_client::*;

/// Receive the next delivery, panics if nothing arrives in a second.
pub async fn recv_delivery(client: &mut Client) -> Delivery {
    tokio::time::timeout(Duration::from_secs(1), client.receive())
        .await
        .expect("No delivery in time")
        .expect("Connection is closed")
}

pub fn message(from: &str, body: &str) -> Delivery {
    Delivery::Message {
        from: from.to_string(),
        body: body.to_string(),
    }
}
