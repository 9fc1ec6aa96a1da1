use std::time::Duration;

use anyhow::Result;
use callsign_client::{Client, ClientError};

/// Start a server on a random local port, returns its address.
pub async fn start_server() -> String {
    let listener = callsign::server::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    tokio::spawn(callsign::server::serve(listener, callsign::Context::new("static")));

    addr
}

/// Connect and wait until the server lists the name.
pub async fn connect(addr: &str, name: &str) -> Client {
    let client = callsign_client::connect(addr, name).await.unwrap();

    wait_for_users(addr, |users| users.contains_key(name)).await;

    client
}

/// Poll the user list until the condition holds, panics after a second.
pub async fn wait_for_users<F>(addr: &str, condition: F)
where
    F: Fn(&std::collections::BTreeMap<String, String>) -> bool,
{
    for _ in 0..100 {
        if condition(&callsign_client::users(addr).await.unwrap()) {
            return;
        }

        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    panic!("Users are not in the expected state");
}

pub fn to_client_error<T: std::fmt::Debug>(result: Result<T>) -> ClientError {
    result.unwrap_err().downcast::<ClientError>().unwrap()
}
