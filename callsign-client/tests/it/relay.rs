use std::time::Duration;

use crate::{helper, message, recv_delivery};
use callsign_client::*;

#[tokio::test]
async fn relay_between_two_clients() {
    let addr = helper::start_server().await;
    let mut bob = helper::connect(&addr, "bob").await;
    let mut carol = helper::connect(&addr, "carol").await;

    bob.send("carol", "hi").await.unwrap();

    assert_eq!(recv_delivery(&mut carol).await, message("bob", "hi"));

    carol.send("bob", "time is 10:30").await.unwrap();

    assert_eq!(recv_delivery(&mut bob).await, message("carol", "time is 10:30"));

    bob.close().await.unwrap();
    carol.close().await.unwrap();
}

#[tokio::test]
async fn unreachable_recipient_is_notified() {
    let addr = helper::start_server().await;
    let mut bob = helper::connect(&addr, "bob").await;

    bob.send("dave", "hi").await.unwrap();

    assert_eq!(
        recv_delivery(&mut bob).await,
        Delivery::Notice {
            text: "Pengguna dave tidak tersambung".to_string()
        }
    );

    bob.close().await.unwrap();
}

#[tokio::test]
async fn connect_without_name_is_refused() {
    let addr = helper::start_server().await;

    let err = helper::to_client_error(connect(&addr, "").await);

    assert_eq!(err.code, 400);
    assert_eq!(err.message, "missing name");
}

#[tokio::test]
async fn closed_client_is_unregistered() {
    let addr = helper::start_server().await;
    let bob = helper::connect(&addr, "bob").await;
    let mut carol = helper::connect(&addr, "carol").await;

    bob.close().await.unwrap();

    helper::wait_for_users(&addr, |users| !users.contains_key("bob")).await;

    carol.send("bob", "still there?").await.unwrap();

    assert_eq!(
        recv_delivery(&mut carol).await,
        Delivery::Notice {
            text: "Pengguna bob tidak tersambung".to_string()
        }
    );

    carol.close().await.unwrap();
}

#[tokio::test]
async fn many_clients_connect_and_leave() {
    let addr = helper::start_server().await;
    let mut clients = vec![];

    for i in 0..16 {
        clients.push(connect(&addr, &format!("user-{i}")).await.unwrap());
    }

    helper::wait_for_users(&addr, |users| users.len() == 16).await;

    let closing = clients
        .into_iter()
        .map(|client| tokio::spawn(client.close()))
        .collect::<Vec<_>>();

    for task in closing {
        task.await.unwrap().unwrap();
    }

    helper::wait_for_users(&addr, |users| users.is_empty()).await;
}

#[tokio::test]
async fn server_does_not_echo_to_the_sender() {
    let addr = helper::start_server().await;
    let mut bob = helper::connect(&addr, "bob").await;
    let mut carol = helper::connect(&addr, "carol").await;

    bob.send("carol", "hi").await.unwrap();

    assert_eq!(recv_delivery(&mut carol).await, message("bob", "hi"));
    assert!(tokio::time::timeout(Duration::from_millis(100), bob.receive())
        .await
        .is_err());

    bob.close().await.unwrap();
    carol.close().await.unwrap();
}
