//! Shared fixtures for the action watcher integration tests.

#![allow(dead_code)]

use action_watcher::{
    AbiRegistry, DeliveryError, HttpTransport, Message, TimeSource, WatcherConfig, WatcherOptions,
};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use reqwest::Url;
use shared_types::{
    AcceptedBlock, Action, ActionTrace, Checksum256, CompressionType, Name, PackedTransaction,
    PermissionLevel, TransactionReceipt, TransactionStatus, TransactionTrace, TransactionVariant,
};
use std::collections::VecDeque;
use std::time::Duration;

pub const RECEIVER_URL: &str = "http://receiver.test/actions";

pub fn n(s: &str) -> Name {
    s.parse().unwrap()
}

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

// =============================================================================
// PORTS
// =============================================================================

/// Clock frozen at a settable instant.
pub struct FixedClock(pub Mutex<DateTime<Utc>>);

impl FixedClock {
    pub fn at(time: DateTime<Utc>) -> Self {
        Self(Mutex::new(time))
    }

    pub fn advance(&self, by: chrono::Duration) {
        *self.0.lock() += by;
    }
}

impl TimeSource for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock()
    }
}

/// Transport that replays scripted outcomes (then succeeds) and records
/// every POST it sees.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<(), DeliveryError>>>,
    pub posts: Mutex<Vec<(Url, Vec<u8>)>>,
}

impl ScriptedTransport {
    pub fn failing(outcomes: Vec<DeliveryError>) -> Self {
        Self {
            script: Mutex::new(outcomes.into_iter().map(Err).collect()),
            posts: Mutex::new(Vec::new()),
        }
    }

    pub fn attempts(&self) -> usize {
        self.posts.lock().len()
    }

    /// Decoded bodies of every POST, in order.
    pub fn messages(&self) -> Vec<Message> {
        self.posts
            .lock()
            .iter()
            .map(|(_, body)| serde_json::from_slice(body).unwrap())
            .collect()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn post_json(
        &self,
        url: &Url,
        body: Vec<u8>,
        _timeout: Duration,
    ) -> Result<(), DeliveryError> {
        self.posts.lock().push((url.clone(), body));
        self.script.lock().pop_front().unwrap_or(Ok(()))
    }
}

// =============================================================================
// CONFIG AND ABIS
// =============================================================================

pub fn config(watch: &[&str], age_limit_secs: i64) -> WatcherConfig {
    WatcherConfig::from_options(WatcherOptions {
        watch: watch.iter().map(|s| s.to_string()).collect(),
        receiver_url: Some(RECEIVER_URL.into()),
        age_limit_secs,
        ..WatcherOptions::default()
    })
    .unwrap()
}

const TRANSFER_ABI: &str = r#"{
    "version": "eosio::abi/1.1",
    "types": [{ "new_type_name": "account_name", "type": "name" }],
    "structs": [{
        "name": "transfer",
        "base": "",
        "fields": [
            { "name": "from", "type": "account_name" },
            { "name": "to", "type": "account_name" },
            { "name": "quantity", "type": "asset" },
            { "name": "memo", "type": "string" }
        ]
    }],
    "actions": [{ "name": "transfer", "type": "transfer", "ricardian_contract": "" }]
}"#;

const VOTE_ABI: &str = r#"{
    "version": "eosio::abi/1.1",
    "structs": [{
        "name": "vote",
        "base": "",
        "fields": [{ "name": "voter", "type": "name" }, { "name": "producers", "type": "name[]" }]
    }],
    "actions": [{ "name": "vote", "type": "vote" }]
}"#;

/// Registry knowing `eosio.token::transfer` and `eosio::vote`.
pub fn registry() -> AbiRegistry {
    let registry = AbiRegistry::new();
    registry
        .set_abi(n("eosio.token"), serde_json::from_str(TRANSFER_ABI).unwrap())
        .unwrap();
    registry
        .set_abi(n("eosio"), serde_json::from_str(VOTE_ABI).unwrap())
        .unwrap();
    registry
}

// =============================================================================
// CHAIN DATA
// =============================================================================

pub fn transfer_data(from: &str, to: &str, amount: i64, memo: &str) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(&n(from).as_u64().to_le_bytes());
    data.extend_from_slice(&n(to).as_u64().to_le_bytes());
    data.extend_from_slice(&amount.to_le_bytes());
    // 4,EOS
    data.extend_from_slice(&[4, b'E', b'O', b'S', 0, 0, 0, 0]);
    data.push(memo.len() as u8);
    data.extend_from_slice(memo.as_bytes());
    data
}

pub fn vote_data(voter: &str) -> Vec<u8> {
    let mut data = n(voter).as_u64().to_le_bytes().to_vec();
    data.push(0);
    data
}

pub fn action_trace(receiver: &str, account: &str, name: &str, data: Vec<u8>) -> ActionTrace {
    ActionTrace {
        receiver: n(receiver),
        act: Action {
            account: n(account),
            name: n(name),
            authorization: vec![PermissionLevel {
                actor: n(receiver),
                permission: n("active"),
            }],
            data,
        },
        inline_traces: vec![],
    }
}

pub fn transaction(seed: &[u8], traces: Vec<ActionTrace>) -> TransactionTrace {
    TransactionTrace {
        id: Checksum256::hash(seed),
        block_num: 0,
        action_traces: traces,
    }
}

/// Packed transaction whose id is `sha256(seed)`.
pub fn packed(seed: &[u8]) -> TransactionReceipt {
    TransactionReceipt {
        status: TransactionStatus::Executed,
        cpu_usage_us: 100,
        net_usage_words: 16,
        trx: TransactionVariant::PackedTransaction(PackedTransaction {
            signatures: vec![],
            compression: CompressionType::None,
            packed_context_free_data: vec![],
            packed_trx: seed.to_vec(),
        }),
    }
}

/// Deferred transaction referenced by id only.
pub fn deferred(seed: &[u8]) -> TransactionReceipt {
    TransactionReceipt {
        status: TransactionStatus::Executed,
        cpu_usage_us: 0,
        net_usage_words: 0,
        trx: TransactionVariant::TransactionId(Checksum256::hash(seed)),
    }
}

pub fn block(num: u32, time: DateTime<Utc>, receipts: Vec<TransactionReceipt>) -> AcceptedBlock {
    AcceptedBlock {
        block_num: num,
        id: Checksum256::hash(&num.to_le_bytes()),
        timestamp: time,
        producer: n("eosio"),
        transactions: receipts,
    }
}
