//! Integration tests for the launch registry API endpoints
//!
//! The router is exercised in-process through axum-test; the last tests run
//! a real server and drive it with the blocking client and the join flow.

use axum_test::TestServer;
use launchnet::account::Account;
use launchnet::api::{build_api_router, run_api_server, ApiState};
use launchnet::builder::{Builder, JoinRequest};
use launchnet::client::RegistryClient;
use launchnet::coin::{Coin, Coins};
use launchnet::crypto::KeyPair;
use launchnet::error::NetworkError;
use launchnet::events::Recorder;
use launchnet::launch::{
    GenesisAccount, GenesisValidator, LaunchQuery, Msg, MsgRequestAddAccount,
    MsgRequestAddValidator, Request, SignedTx, TxBody, TxResponse,
};
use launchnet::registry::{InMemoryStore, Ledger, CODE_CONFLICT, CODE_UNAUTHORIZED};
use serde_json::Value;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn new_ledger() -> Arc<Ledger> {
    Arc::new(Ledger::new(Box::new(InMemoryStore::new())))
}

fn join_tx(keypair: &KeyPair, launch_id: u64) -> SignedTx {
    let address = keypair.address("spn");
    let messages = vec![
        Msg::RequestAddAccount(MsgRequestAddAccount::new(
            address.clone(),
            launch_id,
            "1000stake".parse::<Coins>().unwrap(),
        )),
        Msg::RequestAddValidator(MsgRequestAddValidator::new(
            address,
            launch_id,
            b"gentx".to_vec(),
            vec![7; 32],
            Coin::new(95_000_000, "stake").unwrap(),
            "9b1f@10.0.0.1:26656",
        )),
    ];
    SignedTx::sign(TxBody::new(messages).unwrap(), keypair).unwrap()
}

#[tokio::test]
async fn test_registry_endpoints() {
    let ledger = new_ledger();
    let server = TestServer::new(build_api_router(ApiState::new(ledger.clone())))
        .expect("Failed to create test server");
    let alice = KeyPair::generate().unwrap();
    let address = alice.address("spn");

    // Test /health
    let response = server.get("/health").await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["height"], 0);
    assert!(json["timestamp"].is_string());

    // Test lookups before anything is recorded
    let response = server
        .get(&format!("/launch/1/genesis_account/{}", address))
        .await;
    assert_eq!(response.status_code(), 404);
    let json: Value = response.json();
    assert!(json["error"].as_str().unwrap().contains("genesis account"));

    let response = server.get("/launch/1/requests").await;
    assert_eq!(response.status_code(), 200);
    let requests: Vec<Request> = response.json();
    assert!(requests.is_empty());

    // Test POST /txs
    let response = server.post("/txs").json(&join_tx(&alice, 1)).await;
    assert_eq!(response.status_code(), 200);
    let committed: TxResponse = response.json();
    assert_eq!(committed.height, 1);
    assert_eq!(committed.request_ids, vec![1, 2]);

    let response = server.get("/launch/1/requests").await;
    let requests: Vec<Request> = response.json();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].creator, address);

    // Test finalized lookups after approval
    ledger.approve(1, 1).unwrap();
    ledger.approve(1, 2).unwrap();

    let response = server
        .get(&format!("/launch/1/genesis_account/{}", address))
        .await;
    assert_eq!(response.status_code(), 200);
    let account: GenesisAccount = response.json();
    assert_eq!(account.coins.amount_of("stake"), 1000);

    let response = server
        .get(&format!("/launch/1/genesis_validator/{}", address))
        .await;
    assert_eq!(response.status_code(), 200);
    let validator: GenesisValidator = response.json();
    assert_eq!(validator.cons_pub_key, vec![7; 32]);

    let response = server
        .get(&format!("/launch/1/vesting_account/{}", address))
        .await;
    assert_eq!(response.status_code(), 404);

    // Test /stats
    let response = server.get("/stats").await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert!(json["total_requests"].as_u64().unwrap() >= 8);
    assert!(json["failed_requests"].as_u64().unwrap() >= 2);
    assert_eq!(json["transactions_committed"], 1);
}

#[tokio::test]
async fn test_rejected_transactions_carry_codes() {
    let server = TestServer::new(build_api_router(ApiState::new(new_ledger())))
        .expect("Failed to create test server");
    let alice = KeyPair::generate().unwrap();

    let response = server.post("/txs").json(&join_tx(&alice, 1)).await;
    assert_eq!(response.status_code(), 200);

    let response = server.post("/txs").json(&join_tx(&alice, 1)).await;
    assert_eq!(response.status_code(), 400);
    let json: Value = response.json();
    assert_eq!(json["code"], CODE_CONFLICT);

    let mut forged = join_tx(&alice, 2);
    forged.public_key = KeyPair::generate().unwrap().public_key_bytes().to_vec();
    let response = server.post("/txs").json(&forged).await;
    assert_eq!(response.status_code(), 400);
    let json: Value = response.json();
    assert_eq!(json["code"], CODE_UNAUTHORIZED);
}

#[tokio::test]
async fn test_malformed_body_is_a_client_error() {
    let server = TestServer::new(build_api_router(ApiState::new(new_ledger())))
        .expect("Failed to create test server");
    let response = server.post("/txs").json(&serde_json::json!({ "body": 1 })).await;
    assert!(response.status_code().is_client_error());
}

/// Starts a registry on a free local port and waits until it accepts connections.
fn spawn_registry(ledger: Arc<Ledger>) -> String {
    let addr: SocketAddr = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    std::thread::spawn(move || {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(run_api_server(ledger, addr)).unwrap();
    });

    let deadline = Instant::now() + Duration::from_secs(5);
    while TcpStream::connect(addr).is_err() {
        assert!(Instant::now() < deadline, "registry did not start");
        std::thread::sleep(Duration::from_millis(20));
    }
    format!("http://{}", addr)
}

#[test]
fn test_client_maps_registry_errors() {
    let url = spawn_registry(new_ledger());
    let client = RegistryClient::new(&url, Duration::from_secs(5)).unwrap();

    assert!(matches!(
        client.genesis_account(1, "spn1nobody"),
        Err(NetworkError::NotFound(_))
    ));
    assert!(client.request_all(1).unwrap().is_empty());

    let alice = KeyPair::generate().unwrap();
    let tx = join_tx(&alice, 1);
    launchnet::launch::Broadcaster::broadcast_tx(&client, &tx).unwrap();
    match launchnet::launch::Broadcaster::broadcast_tx(&client, &tx) {
        Err(NetworkError::TxRejected { code, .. }) => assert_eq!(code, CODE_CONFLICT),
        other => panic!("expected a conflict, got {:?}", other),
    }
}

#[test]
fn test_join_through_served_registry() {
    let ledger = new_ledger();
    let url = spawn_registry(ledger.clone());
    let client = Arc::new(RegistryClient::new(&url, Duration::from_secs(5)).unwrap());
    let events = Recorder::new();
    let builder = Builder::new(
        Account::generate("alice").unwrap(),
        client.clone(),
        client,
        Arc::new(events.clone()),
    );

    let home = tempfile::tempdir().unwrap();
    let req = JoinRequest {
        launch_id: 3,
        chain_home: home.path().to_path_buf(),
        peer: "9b1f@10.0.0.1:26656".to_string(),
        val_address: builder.address(),
        custom_gentx: true,
        gentx: b"gentx".to_vec(),
        cons_pub_key: vec![1, 2, 3],
        self_delegation: "95000000stake".parse().unwrap(),
        amount: "1000stake".parse().unwrap(),
    };

    let out = builder.join(&req).unwrap();
    let response: TxResponse = serde_json::from_str(&out).unwrap();
    assert_eq!(response.request_ids, vec![1, 2]);
    assert_eq!(events.events().len(), 4);

    let pending = ledger.request_all(3).unwrap();
    assert_eq!(pending.len(), 2);
    assert_eq!(pending[1].content.address(), builder.address());

    let err = builder.join(&req).unwrap_err();
    assert_eq!(err, NetworkError::ValidatorExists(builder.address()));
}
