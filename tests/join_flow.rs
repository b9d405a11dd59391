//! Integration tests for the join flow
//!
//! The builder runs against a registry ledger backed by the in-memory store,
//! with thin wrappers that count remote calls and captured broadcasts.

use launchnet::account::Account;
use launchnet::builder::{Builder, JoinRequest};
use launchnet::coin::{Coin, Coins};
use launchnet::error::NetworkError;
use launchnet::events::{Event, Recorder};
use launchnet::launch::{
    Broadcaster, DelayedVesting, GenesisAccount, GenesisValidator, LaunchId, LaunchQuery, Msg,
    Request, RequestContent, SignedTx, TxResponse, VestingAccount,
};
use launchnet::registry::{InMemoryStore, Ledger};
use parking_lot::Mutex;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

const LAUNCH_ID: LaunchId = 1;

/// Delegates to the ledger and counts pending-request scans.
struct CountingQuery {
    ledger: Arc<Ledger>,
    request_all_calls: AtomicUsize,
}

impl LaunchQuery for CountingQuery {
    fn genesis_account(&self, launch_id: LaunchId, address: &str) -> Result<GenesisAccount, NetworkError> {
        self.ledger.genesis_account(launch_id, address)
    }

    fn vesting_account(&self, launch_id: LaunchId, address: &str) -> Result<VestingAccount, NetworkError> {
        self.ledger.vesting_account(launch_id, address)
    }

    fn genesis_validator(&self, launch_id: LaunchId, address: &str) -> Result<GenesisValidator, NetworkError> {
        self.ledger.genesis_validator(launch_id, address)
    }

    fn request_all(&self, launch_id: LaunchId) -> Result<Vec<Request>, NetworkError> {
        self.request_all_calls.fetch_add(1, Ordering::SeqCst);
        self.ledger.request_all(launch_id)
    }
}

/// Keeps every transaction before handing it to the ledger.
struct CapturingBroadcaster {
    ledger: Arc<Ledger>,
    sent: Mutex<Vec<SignedTx>>,
}

impl Broadcaster for CapturingBroadcaster {
    fn broadcast_tx(&self, tx: &SignedTx) -> Result<TxResponse, NetworkError> {
        self.sent.lock().push(tx.clone());
        self.ledger.broadcast_tx(tx)
    }
}

/// Every query fails at the transport level.
struct UnreachableQuery;

impl LaunchQuery for UnreachableQuery {
    fn genesis_account(&self, _: LaunchId, _: &str) -> Result<GenesisAccount, NetworkError> {
        Err(NetworkError::Transport("connection refused".to_string()))
    }

    fn vesting_account(&self, _: LaunchId, _: &str) -> Result<VestingAccount, NetworkError> {
        Err(NetworkError::Transport("connection refused".to_string()))
    }

    fn genesis_validator(&self, _: LaunchId, _: &str) -> Result<GenesisValidator, NetworkError> {
        Err(NetworkError::Transport("connection refused".to_string()))
    }

    fn request_all(&self, _: LaunchId) -> Result<Vec<Request>, NetworkError> {
        Err(NetworkError::Transport("connection refused".to_string()))
    }
}

struct Harness {
    ledger: Arc<Ledger>,
    query: Arc<CountingQuery>,
    broadcaster: Arc<CapturingBroadcaster>,
    events: Recorder,
    builder: Builder,
    home: TempDir,
}

impl Harness {
    fn new() -> Self {
        let ledger = Arc::new(Ledger::new(Box::new(InMemoryStore::new())));
        let query = Arc::new(CountingQuery {
            ledger: ledger.clone(),
            request_all_calls: AtomicUsize::new(0),
        });
        let broadcaster = Arc::new(CapturingBroadcaster {
            ledger: ledger.clone(),
            sent: Mutex::new(Vec::new()),
        });
        let events = Recorder::new();
        let account = Account::generate("alice").unwrap();
        let builder = Builder::new(
            account,
            query.clone(),
            broadcaster.clone(),
            Arc::new(events.clone()),
        );
        let home = TempDir::new().unwrap();
        write_genesis(home.path(), &[]);

        Harness {
            ledger,
            query,
            broadcaster,
            events,
            builder,
            home,
        }
    }

    fn address(&self) -> String {
        self.builder.address()
    }

    fn join_request(&self) -> JoinRequest {
        JoinRequest {
            launch_id: LAUNCH_ID,
            chain_home: self.home.path().to_path_buf(),
            peer: "9b1f@10.0.0.1:26656".to_string(),
            val_address: self.address(),
            custom_gentx: false,
            gentx: br#"{"body":{"messages":[]}}"#.to_vec(),
            cons_pub_key: vec![1, 2, 3, 4],
            self_delegation: "95000000stake".parse().unwrap(),
            amount: "1000stake".parse().unwrap(),
        }
    }

    fn request_all_calls(&self) -> usize {
        self.query.request_all_calls.load(Ordering::SeqCst)
    }

    fn broadcasts(&self) -> usize {
        self.broadcaster.sent.lock().len()
    }

    fn seed_account(&self, address: &str) -> u64 {
        self.ledger
            .submit_request(
                "spn1coordinator",
                LAUNCH_ID,
                RequestContent::GenesisAccount(GenesisAccount {
                    launch_id: LAUNCH_ID,
                    address: address.to_string(),
                    coins: "500stake".parse::<Coins>().unwrap(),
                }),
            )
            .unwrap()
    }

    fn seed_vesting_account(&self, address: &str) -> u64 {
        let coins = "500stake".parse::<Coins>().unwrap();
        self.ledger
            .submit_request(
                "spn1coordinator",
                LAUNCH_ID,
                RequestContent::VestingAccount(VestingAccount {
                    launch_id: LAUNCH_ID,
                    address: address.to_string(),
                    vesting: DelayedVesting {
                        total_balance: coins.clone(),
                        vesting: coins,
                        end_time: 1_700_000_000,
                    },
                }),
            )
            .unwrap()
    }

    fn seed_validator(&self, address: &str) -> u64 {
        self.ledger
            .submit_request(
                address,
                LAUNCH_ID,
                RequestContent::GenesisValidator(GenesisValidator {
                    launch_id: LAUNCH_ID,
                    address: address.to_string(),
                    gen_tx: b"gentx".to_vec(),
                    cons_pub_key: vec![9, 9, 9],
                    self_delegation: Coin::new(10, "stake").unwrap(),
                    peer: "peer@127.0.0.1:26656".to_string(),
                }),
            )
            .unwrap()
    }
}

fn write_genesis(home: &Path, addresses: &[&str]) {
    let accounts: Vec<serde_json::Value> = addresses
        .iter()
        .map(|a| serde_json::json!({ "@type": "/cosmos.auth.v1beta1.BaseAccount", "address": a }))
        .collect();
    let genesis = serde_json::json!({
        "chain_id": "orbit-1",
        "app_state": { "auth": { "accounts": accounts } }
    });
    fs::create_dir_all(home.join("config")).unwrap();
    fs::write(
        home.join("config").join("genesis.json"),
        serde_json::to_vec_pretty(&genesis).unwrap(),
    )
    .unwrap();
}

#[test]
fn test_fresh_address_broadcasts_account_and_validator_in_one_tx() {
    let h = Harness::new();
    let out = h.builder.join(&h.join_request()).unwrap();
    assert!(!out.is_empty());

    let response: TxResponse = serde_json::from_str(&out).unwrap();
    assert_eq!(response.code, 0);
    assert_eq!(response.request_ids, vec![1, 2]);

    let sent = h.broadcaster.sent.lock();
    assert_eq!(sent.len(), 1);
    let messages = &sent[0].body.messages;
    assert_eq!(messages.len(), 2);
    match (&messages[0], &messages[1]) {
        (Msg::RequestAddAccount(acc), Msg::RequestAddValidator(val)) => {
            assert_eq!(acc.address, h.address());
            assert_eq!(acc.coins.amount_of("stake"), 1000);
            assert_eq!(val.val_address, h.address());
            assert_eq!(val.peer, "9b1f@10.0.0.1:26656");
        }
        other => panic!("unexpected message order: {:?}", other),
    }

    let pending = h.ledger.request_all(LAUNCH_ID).unwrap();
    assert_eq!(pending.len(), 2);
    assert_eq!(pending[0].content.kind(), "genesis-account");
    assert_eq!(pending[1].content.kind(), "genesis-validator");
}

#[test]
fn test_join_emits_events_in_order() {
    let h = Harness::new();
    h.builder.join(&h.join_request()).unwrap();

    assert_eq!(
        h.events.events(),
        vec![
            Event::ongoing(format!("Verifying account already exists {}", h.address())),
            Event::done("Account message created"),
            Event::ongoing("Broadcasting transactions"),
            Event::done("Transactions broadcasted"),
        ]
    );
}

#[test]
fn test_address_in_local_genesis_skips_account_message() {
    let h = Harness::new();
    write_genesis(h.home.path(), &[&h.address()]);

    h.builder.join(&h.join_request()).unwrap();

    let sent = h.broadcaster.sent.lock();
    assert_eq!(sent[0].body.messages.len(), 1);
    assert!(matches!(sent[0].body.messages[0], Msg::RequestAddValidator(_)));
    // local genesis answers before any registry scan for the account
    assert_eq!(h.events.events()[1], Event::done("Account message not created"));
}

#[test]
fn test_pending_account_skips_account_message() {
    let h = Harness::new();
    h.seed_account(&h.address());

    let msg = h
        .builder
        .create_account_request_msg(h.home.path(), false, LAUNCH_ID, "1000stake".parse().unwrap())
        .unwrap();
    assert!(msg.is_none());
    assert_eq!(h.request_all_calls(), 1);
}

#[test]
fn test_finalized_account_skips_account_message() {
    let h = Harness::new();
    let id = h.seed_account(&h.address());
    h.ledger.approve(LAUNCH_ID, id).unwrap();

    let msg = h
        .builder
        .create_account_request_msg(h.home.path(), false, LAUNCH_ID, "1000stake".parse().unwrap())
        .unwrap();
    assert!(msg.is_none());
}

#[test]
fn test_vesting_account_counts_as_existing() {
    let h = Harness::new();
    let id = h.seed_vesting_account(&h.address());
    assert!(h.builder.check_account_exist(LAUNCH_ID, &h.address()).unwrap());

    h.ledger.approve(LAUNCH_ID, id).unwrap();
    assert!(h.builder.check_account_exist(LAUNCH_ID, &h.address()).unwrap());
}

#[test]
fn test_finalized_account_short_circuits_pending_scan() {
    let h = Harness::new();
    let id = h.seed_account(&h.address());
    h.ledger.approve(LAUNCH_ID, id).unwrap();

    assert!(h.builder.check_account_exist(LAUNCH_ID, &h.address()).unwrap());
    assert_eq!(h.request_all_calls(), 0);
}

#[test]
fn test_finalized_validator_short_circuits_pending_scan() {
    let h = Harness::new();
    let id = h.seed_validator(&h.address());
    h.ledger.approve(LAUNCH_ID, id).unwrap();

    assert!(h.builder.check_validator_exist(LAUNCH_ID, &h.address()).unwrap());
    assert_eq!(h.request_all_calls(), 0);
}

#[test]
fn test_unknown_address_scans_requests_once() {
    let h = Harness::new();
    h.seed_account("spn1someoneelse");

    assert!(!h.builder.check_account_exist(LAUNCH_ID, &h.address()).unwrap());
    assert_eq!(h.request_all_calls(), 1);
    assert!(!h.builder.check_validator_exist(LAUNCH_ID, &h.address()).unwrap());
    assert_eq!(h.request_all_calls(), 2);
}

#[test]
fn test_custom_gentx_always_builds_account_message() {
    let h = Harness::new();
    h.seed_account(&h.address());
    // no genesis file is read on this path
    let missing_home = h.home.path().join("not-a-chain");

    let msg = h
        .builder
        .create_account_request_msg(&missing_home, true, LAUNCH_ID, "1000stake".parse().unwrap())
        .unwrap();

    match msg {
        Some(Msg::RequestAddAccount(acc)) => {
            assert_eq!(acc.address, h.address());
            assert_eq!(acc.launch_id, LAUNCH_ID);
        }
        other => panic!("expected an account message, got {:?}", other),
    }
    assert_eq!(h.request_all_calls(), 0);
}

#[test]
fn test_account_check_emits_exactly_two_events() {
    let h = Harness::new();
    h.builder
        .create_account_request_msg(h.home.path(), false, LAUNCH_ID, "1000stake".parse().unwrap())
        .unwrap();
    let events = h.events.events();
    assert_eq!(events.len(), 2);
    assert!(events[0].is_ongoing());
    assert_eq!(events[1], Event::done("Account message created"));

    h.events.clear();
    h.seed_account(&h.address());
    h.builder
        .create_account_request_msg(h.home.path(), false, LAUNCH_ID, "1000stake".parse().unwrap())
        .unwrap();
    let events = h.events.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[1], Event::done("Account message not created"));
}

#[test]
fn test_pending_validator_fails_join_without_broadcast() {
    let h = Harness::new();
    h.seed_validator(&h.address());

    let err = h.builder.join(&h.join_request()).unwrap_err();
    assert_eq!(err, NetworkError::ValidatorExists(h.address()));
    assert_eq!(err.to_string(), format!("validator already exist: {}", h.address()));
    assert_eq!(h.broadcasts(), 0);
}

#[test]
fn test_second_join_is_refused_by_validator_check() {
    let h = Harness::new();
    h.builder.join(&h.join_request()).unwrap();
    assert_eq!(h.broadcasts(), 1);

    let err = h.builder.join(&h.join_request()).unwrap_err();
    assert!(matches!(err, NetworkError::ValidatorExists(_)));
    assert_eq!(h.broadcasts(), 1);
}

#[test]
fn test_finalized_validator_fails_join() {
    let h = Harness::new();
    let id = h.seed_validator(&h.address());
    h.ledger.approve(LAUNCH_ID, id).unwrap();

    let err = h.builder.join(&h.join_request()).unwrap_err();
    assert!(matches!(err, NetworkError::ValidatorExists(_)));
    assert_eq!(h.broadcasts(), 0);
}

#[test]
fn test_missing_local_genesis_is_an_error() {
    let h = Harness::new();
    let mut req = h.join_request();
    req.chain_home = h.home.path().join("elsewhere");

    assert!(matches!(h.builder.join(&req), Err(NetworkError::Genesis(_))));
    assert_eq!(h.broadcasts(), 0);
}

#[test]
fn test_query_failures_propagate() {
    let h = Harness::new();
    let broadcaster = Arc::new(CapturingBroadcaster {
        ledger: h.ledger.clone(),
        sent: Mutex::new(Vec::new()),
    });
    let builder = Builder::new(
        Account::generate("bob").unwrap(),
        Arc::new(UnreachableQuery),
        broadcaster.clone(),
        Arc::new(Recorder::new()),
    );

    assert!(matches!(
        builder.check_account_exist(LAUNCH_ID, "spn1x"),
        Err(NetworkError::Transport(_))
    ));
    assert!(matches!(
        builder.check_validator_exist(LAUNCH_ID, "spn1x"),
        Err(NetworkError::Transport(_))
    ));

    let mut req = h.join_request();
    req.val_address = builder.address();
    assert!(matches!(builder.join(&req), Err(NetworkError::Transport(_))));
    assert!(broadcaster.sent.lock().is_empty());
}

#[test]
fn test_rejected_broadcast_emits_no_done_event() {
    let h = Harness::new();
    let mut req = h.join_request();
    // a validator address the signer does not own is refused by the ledger
    req.val_address = Account::generate("mallory").unwrap().address("spn");

    let err = h.builder.join(&req).unwrap_err();
    assert!(matches!(err, NetworkError::TxRejected { code: 4, .. }));

    let events = h.events.events();
    assert_eq!(events.last(), Some(&Event::ongoing("Broadcasting transactions")));
    assert!(h.ledger.request_all(LAUNCH_ID).unwrap().is_empty());
}
