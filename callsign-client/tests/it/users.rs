use crate::helper;
use callsign_client::*;

#[tokio::test]
async fn register_records_the_address() {
    let addr = helper::start_server().await;

    register(&addr, "alice").await.unwrap();

    let users = users(&addr).await.unwrap();

    assert!(users["alice"].starts_with("127.0.0.1:"));
}

#[tokio::test]
async fn register_empty_name_is_bad_request() {
    let addr = helper::start_server().await;

    let err = helper::to_client_error(register(&addr, "").await);

    assert_eq!(err.code, 400);
    assert_eq!(err.message, "empty name");
    assert!(users(&addr).await.unwrap().is_empty());
}

#[tokio::test]
async fn connected_clients_are_listed() {
    let addr = helper::start_server().await;

    assert!(users(&addr).await.unwrap().is_empty());

    let bob = helper::connect(&addr, "bob").await;
    let users = users(&addr).await.unwrap();

    assert_eq!(users.len(), 1);
    assert!(users["bob"].starts_with("127.0.0.1:"));

    bob.close().await.unwrap();
}
