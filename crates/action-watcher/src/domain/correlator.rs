//! # Action Correlator
//!
//! Per-transaction state machine linking execution traces to the blocks that
//! finally include them.
//!
//! ```text
//! [Unseen] ──applied trace with matches──→ [Staged] ──id seen in accepted block──→ [Resolved]
//!     ↑                                        │                                       │
//!     └──────────── expiry window ─────────────┘                                       │
//!     └────────────────────────────── entry removed ──────────────────────────────────┘
//! ```
//!
//! Applied traces are walked depth-first with an explicit stack. Every visited
//! action consumes a sequence number whether or not it matches.

use chrono::{DateTime, Utc};
use reqwest::Url;
use shared_types::{AcceptedBlock, ActionTrace, TransactionTrace};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use watcher_telemetry::metrics::{
    ACTIONS_STAGED, BLOCKS_SKIPPED_BY_AGE, NOTIFICATIONS_ENQUEUED, PENDING_EVICTED,
    PENDING_TRANSACTIONS, TRANSACTIONS_RESOLVED,
};

use super::config::WatcherConfig;
use super::entities::{Message, SequencedAction};
use super::errors::WatcherError;
use super::filter::FilterTable;
use super::payload::PayloadBuilder;
use super::pending::PendingActionIndex;
use super::value_objects::BlockReport;
use crate::ports::{AbiDecoder, NotificationSink, TimeSource};

pub struct ActionCorrelator {
    filters: FilterTable,
    pending: PendingActionIndex,
    payload: PayloadBuilder,
    clock: Arc<dyn TimeSource>,
    sink: Arc<dyn NotificationSink>,
    receiver_url: Url,
    age_limit: Option<Duration>,
    pending_expiry: Option<Duration>,
    send_timeout: Duration,
}

impl ActionCorrelator {
    pub fn new(
        config: &WatcherConfig,
        decoder: Arc<dyn AbiDecoder>,
        clock: Arc<dyn TimeSource>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            filters: config.filters.clone(),
            pending: PendingActionIndex::new(),
            payload: PayloadBuilder::new(decoder, config.decode_timeout),
            clock,
            sink,
            receiver_url: config.receiver_url.clone(),
            age_limit: config.age_limit,
            pending_expiry: config.pending_expiry,
            send_timeout: config.send_timeout,
        }
    }

    /// Stage the matching actions of `trace`. Returns the number staged.
    pub fn on_applied_transaction(&mut self, trace: &TransactionTrace) -> usize {
        if self.pending.contains(&trace.id) {
            debug!(tx_id = %trace.id, "Transaction already staged, ignoring trace");
            return 0;
        }

        let mut matched = Vec::new();
        let mut seq_num: u32 = 0;
        let mut stack: Vec<&ActionTrace> = trace.action_traces.iter().rev().collect();

        while let Some(at) = stack.pop() {
            if self.filters.matches(at.receiver, at.act.name) {
                matched.push(SequencedAction {
                    action: at.act.clone(),
                    seq_num,
                    receiver: at.receiver,
                });
            }
            seq_num = seq_num.wrapping_add(1);
            stack.extend(at.inline_traces.iter().rev());
        }

        let count = matched.len();
        if self.pending.stage(trace.id, self.clock.now(), matched) {
            ACTIONS_STAGED.inc_by(count as u64);
            PENDING_TRANSACTIONS.set(self.pending.len() as i64);
            debug!(tx_id = %trace.id, actions = count, visited = seq_num, "Staged matching actions");
            count
        } else {
            0
        }
    }

    /// Resolve staged transactions included in `block` and enqueue one message
    /// for all of them.
    ///
    /// Every id is derived before anything changes, so a failing receipt leaves
    /// the index as it was.
    pub fn on_accepted_block(&mut self, block: &AcceptedBlock) -> Result<BlockReport, WatcherError> {
        let ids = block.transaction_ids()?;
        let now = self.clock.now();
        let skip = self.is_too_old(block.timestamp, now);

        let mut report = BlockReport {
            block_num: block.block_num,
            skipped_by_age: skip,
            ..BlockReport::default()
        };
        let mut message = Message::default();

        for tx_id in &ids {
            let Some(entry) = self.pending.take(tx_id) else {
                continue;
            };
            report.resolved_transactions += 1;
            if !skip {
                message
                    .actions
                    .extend(self.payload.build(tx_id, &entry.actions, block));
            }
        }
        TRANSACTIONS_RESOLVED.inc_by(report.resolved_transactions as u64);

        if skip {
            BLOCKS_SKIPPED_BY_AGE.inc();
            debug!(
                block_num = block.block_num,
                block_time = %block.timestamp,
                resolved = report.resolved_transactions,
                "Block older than age limit, not notifying"
            );
        }

        report.notified_actions = message.len();
        if !message.is_empty() {
            info!(
                block_num = block.block_num,
                actions = message.len(),
                destination = %self.receiver_url,
                "Enqueueing notification"
            );
            NOTIFICATIONS_ENQUEUED.inc();
            self.sink
                .enqueue(&self.receiver_url, message, Instant::now() + self.send_timeout);
        }

        report.evicted = self.evict_expired(now);
        PENDING_TRANSACTIONS.set(self.pending.len() as i64);
        Ok(report)
    }

    /// Transactions currently staged.
    pub fn pending_transactions(&self) -> usize {
        self.pending.len()
    }

    pub fn pending(&self) -> &PendingActionIndex {
        &self.pending
    }

    /// A block in the future counts as fresh.
    fn is_too_old(&self, block_time: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        let Some(limit) = self.age_limit else {
            return false;
        };
        match (now - block_time).to_std() {
            Ok(age) => age >= limit,
            Err(_) => false,
        }
    }

    fn evict_expired(&mut self, now: DateTime<Utc>) -> usize {
        let Some(expiry) = self.pending_expiry else {
            return 0;
        };
        let Some(cutoff) = chrono::Duration::from_std(expiry)
            .ok()
            .and_then(|window| now.checked_sub_signed(window))
        else {
            return 0;
        };

        let evicted = self.pending.evict_older_than(cutoff);
        if evicted > 0 {
            PENDING_EVICTED.inc_by(evicted as u64);
            debug!(evicted, cutoff = %cutoff, "Evicted expired staged transactions");
        }
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::WatcherOptions;
    use crate::ports::{MapDecoder, MockTimeSource, RecordingSink};
    use chrono::TimeZone;
    use shared_types::{
        Action, Checksum256, ChainError, CompressionType, Name, PackedTransaction,
        TransactionReceipt, TransactionStatus, TransactionVariant,
    };

    fn n(s: &str) -> Name {
        s.parse().unwrap()
    }

    fn trace_of(receiver: &str, name: &str, inline: Vec<ActionTrace>) -> ActionTrace {
        ActionTrace {
            receiver: n(receiver),
            act: Action {
                account: n(receiver),
                name: n(name),
                authorization: vec![],
                data: vec![],
            },
            inline_traces: inline,
        }
    }

    fn tx(id: &[u8], traces: Vec<ActionTrace>) -> TransactionTrace {
        TransactionTrace {
            id: Checksum256::hash(id),
            block_num: 0,
            action_traces: traces,
        }
    }

    fn block_with(num: u32, time: DateTime<Utc>, ids: &[&[u8]]) -> AcceptedBlock {
        AcceptedBlock {
            block_num: num,
            id: Checksum256::default(),
            timestamp: time,
            producer: n("eosio"),
            transactions: ids
                .iter()
                .map(|id| TransactionReceipt {
                    status: TransactionStatus::Executed,
                    cpu_usage_us: 0,
                    net_usage_words: 0,
                    trx: TransactionVariant::TransactionId(Checksum256::hash(id)),
                })
                .collect(),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    struct Harness {
        correlator: ActionCorrelator,
        sink: Arc<RecordingSink>,
        clock: Arc<MockTimeSource>,
    }

    fn harness(watch: &[&str], age_limit_secs: i64, pending_expiry_secs: i64) -> Harness {
        let config = WatcherConfig::from_options(WatcherOptions {
            watch: watch.iter().map(|s| s.to_string()).collect(),
            receiver_url: Some("http://receiver.test/notify".into()),
            age_limit_secs,
            pending_expiry_secs,
        })
        .unwrap();

        let decoder = MapDecoder::default()
            .with("alice", "transfer", serde_json::json!({ "to": "bob" }))
            .with("alice", "open", serde_json::json!({}))
            .with("alice", "close", serde_json::json!({}))
            .with("bob", "vote", serde_json::json!({}));
        let sink = Arc::new(RecordingSink::default());
        let clock = Arc::new(MockTimeSource::new(now()));
        let correlator =
            ActionCorrelator::new(&config, Arc::new(decoder), clock.clone(), sink.clone());
        Harness {
            correlator,
            sink,
            clock,
        }
    }

    #[test]
    fn test_sequence_numbers_count_every_visited_action() {
        let mut h = harness(&["alice", "bob"], 60, 3600);
        let trace = tx(
            b"t1",
            vec![
                trace_of(
                    "alice",
                    "open",
                    vec![trace_of("carol", "noop", vec![]), trace_of("bob", "vote", vec![])],
                ),
                trace_of("alice", "close", vec![]),
            ],
        );

        assert_eq!(h.correlator.on_applied_transaction(&trace), 3);
        let staged = &h.correlator.pending().get(&trace.id).unwrap().actions;
        let seqs: Vec<(String, u32)> = staged
            .iter()
            .map(|s| (s.action.name.to_string(), s.seq_num))
            .collect();
        assert_eq!(
            seqs,
            vec![("open".into(), 0), ("vote".into(), 2), ("close".into(), 3)]
        );
    }

    #[test]
    fn test_staging_is_idempotent() {
        let mut h = harness(&["alice"], 60, 3600);
        let trace = tx(b"t1", vec![trace_of("alice", "transfer", vec![])]);

        assert_eq!(h.correlator.on_applied_transaction(&trace), 1);
        assert_eq!(h.correlator.on_applied_transaction(&trace), 0);
        assert_eq!(h.correlator.pending().action_count(), 1);
    }

    #[test]
    fn test_no_match_stages_nothing() {
        let mut h = harness(&["alice:transfer"], 60, 3600);
        let trace = tx(b"t1", vec![trace_of("bob", "vote", vec![])]);
        assert_eq!(h.correlator.on_applied_transaction(&trace), 0);
        assert_eq!(h.correlator.pending_transactions(), 0);
    }

    #[test]
    fn test_block_resolves_and_enqueues() {
        let mut h = harness(&["alice:transfer"], 60, 3600);
        let trace = tx(
            b"t1",
            vec![trace_of("alice", "transfer", vec![]), trace_of("bob", "vote", vec![])],
        );
        h.correlator.on_applied_transaction(&trace);

        let report = h
            .correlator
            .on_accepted_block(&block_with(5, now(), &[b"other", b"t1"]))
            .unwrap();

        assert_eq!(report.resolved_transactions, 1);
        assert_eq!(report.notified_actions, 1);
        assert!(report.enqueued());
        assert_eq!(h.correlator.pending_transactions(), 0);

        let messages = h.sink.messages.lock();
        assert_eq!(messages.len(), 1);
        let (url, message, _) = &messages[0];
        assert_eq!(url.as_str(), "http://receiver.test/notify");
        assert_eq!(message.actions[0].account, n("alice"));
        assert_eq!(message.actions[0].name, n("transfer"));
        assert_eq!(message.actions[0].block_num, 5);
    }

    #[test]
    fn test_block_without_staged_transactions_sends_nothing() {
        let mut h = harness(&["alice"], 60, 3600);
        let report = h
            .correlator
            .on_accepted_block(&block_with(5, now(), &[b"t9"]))
            .unwrap();
        assert_eq!(report, BlockReport { block_num: 5, ..BlockReport::default() });
        assert!(h.sink.messages.lock().is_empty());
    }

    #[test]
    fn test_old_block_clears_but_does_not_send() {
        let mut h = harness(&["alice"], 60, 3600);
        h.correlator
            .on_applied_transaction(&tx(b"t1", vec![trace_of("alice", "transfer", vec![])]));

        let old = now() - chrono::Duration::seconds(60);
        let report = h
            .correlator
            .on_accepted_block(&block_with(5, old, &[b"t1"]))
            .unwrap();

        assert!(report.skipped_by_age);
        assert_eq!(report.resolved_transactions, 1);
        assert!(!report.enqueued());
        assert_eq!(h.correlator.pending_transactions(), 0);
        assert!(h.sink.messages.lock().is_empty());
    }

    #[test]
    fn test_negative_age_limit_disables_check() {
        let mut h = harness(&["alice"], -1, 3600);
        h.correlator
            .on_applied_transaction(&tx(b"t1", vec![trace_of("alice", "transfer", vec![])]));

        let ancient = now() - chrono::Duration::days(365);
        let report = h
            .correlator
            .on_accepted_block(&block_with(5, ancient, &[b"t1"]))
            .unwrap();
        assert!(report.enqueued());
    }

    #[test]
    fn test_future_block_is_fresh() {
        let mut h = harness(&["alice"], 0, 3600);
        h.correlator
            .on_applied_transaction(&tx(b"t1", vec![trace_of("alice", "transfer", vec![])]));

        let ahead = now() + chrono::Duration::seconds(1);
        let report = h
            .correlator
            .on_accepted_block(&block_with(5, ahead, &[b"t1"]))
            .unwrap();
        assert!(!report.skipped_by_age);
        assert!(report.enqueued());
    }

    #[test]
    fn test_one_message_per_block() {
        let mut h = harness(&["alice"], 60, 3600);
        h.correlator
            .on_applied_transaction(&tx(b"t1", vec![trace_of("alice", "transfer", vec![])]));
        h.correlator
            .on_applied_transaction(&tx(b"t2", vec![trace_of("alice", "open", vec![])]));

        h.correlator
            .on_accepted_block(&block_with(5, now(), &[b"t2", b"t1"]))
            .unwrap();

        let messages = h.sink.messages.lock();
        assert_eq!(messages.len(), 1);
        let names: Vec<String> = messages[0]
            .1
            .actions
            .iter()
            .map(|a| a.name.to_string())
            .collect();
        assert_eq!(names, vec!["open", "transfer"]);
    }

    #[test]
    fn test_unresolved_entries_survive_until_expiry() {
        let mut h = harness(&["alice"], -1, 3600);
        h.correlator
            .on_applied_transaction(&tx(b"deferred", vec![trace_of("alice", "transfer", vec![])]));

        h.clock.advance(chrono::Duration::minutes(30));
        let report = h
            .correlator
            .on_accepted_block(&block_with(5, h.clock.now(), &[]))
            .unwrap();
        assert_eq!(report.evicted, 0);
        assert_eq!(h.correlator.pending_transactions(), 1);

        h.clock.advance(chrono::Duration::minutes(31));
        let report = h
            .correlator
            .on_accepted_block(&block_with(6, h.clock.now(), &[]))
            .unwrap();
        assert_eq!(report.evicted, 1);
        assert_eq!(h.correlator.pending_transactions(), 0);
    }

    #[test]
    fn test_negative_expiry_keeps_entries() {
        let mut h = harness(&["alice"], -1, -1);
        h.correlator
            .on_applied_transaction(&tx(b"deferred", vec![trace_of("alice", "transfer", vec![])]));
        h.clock.advance(chrono::Duration::days(30));
        h.correlator
            .on_accepted_block(&block_with(5, h.clock.now(), &[]))
            .unwrap();
        assert_eq!(h.correlator.pending_transactions(), 1);
    }

    #[test]
    fn test_underivable_id_leaves_index_untouched() {
        let mut h = harness(&["alice"], 60, 3600);
        h.correlator
            .on_applied_transaction(&tx(b"t1", vec![trace_of("alice", "transfer", vec![])]));

        let mut block = block_with(5, now(), &[b"t1"]);
        block.transactions.push(TransactionReceipt {
            status: TransactionStatus::Executed,
            cpu_usage_us: 0,
            net_usage_words: 0,
            trx: TransactionVariant::PackedTransaction(PackedTransaction {
                signatures: vec![],
                compression: CompressionType::Zlib,
                packed_context_free_data: vec![],
                // zlib header followed by a reserved block type
                packed_trx: vec![0x78, 0x9c, 0xff, 0xff],
            }),
        });

        let err = h.correlator.on_accepted_block(&block).unwrap_err();
        assert!(matches!(
            err,
            WatcherError::Chain(ChainError::InvalidCompressedTransaction { .. })
        ));
        assert_eq!(h.correlator.pending_transactions(), 1);
        assert!(h.sink.messages.lock().is_empty());
    }

    #[test]
    fn test_compressed_receipt_resolves() {
        use flate2::write::ZlibEncoder;
        use flate2::Compression;
        use std::io::Write;

        let mut h = harness(&["alice:transfer"], 60, 3600);
        h.correlator.on_applied_transaction(&tx(
            b"packed-trx-bytes",
            vec![trace_of("alice", "transfer", vec![])],
        ));

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
        encoder.write_all(b"packed-trx-bytes").unwrap();
        let mut block = block_with(6, now(), &[]);
        block.transactions.push(TransactionReceipt {
            status: TransactionStatus::Executed,
            cpu_usage_us: 0,
            net_usage_words: 0,
            trx: TransactionVariant::PackedTransaction(PackedTransaction {
                signatures: vec![],
                compression: CompressionType::Zlib,
                packed_context_free_data: vec![],
                packed_trx: encoder.finish().unwrap(),
            }),
        });

        let report = h.correlator.on_accepted_block(&block).unwrap();
        assert_eq!(report.resolved_transactions, 1);
        assert_eq!(h.correlator.pending_transactions(), 0);

        let messages = h.sink.messages.lock();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].1.actions[0].tx_id, Checksum256::hash(b"packed-trx-bytes"));
    }

    #[test]
    fn test_deep_inline_chain_does_not_overflow() {
        let mut h = harness(&["alice:transfer"], 60, 3600);
        let mut trace = trace_of("alice", "transfer", vec![]);
        for _ in 0..50_000 {
            trace = trace_of("bob", "vote", vec![trace]);
        }
        let tx = tx(b"deep", vec![trace]);

        assert_eq!(h.correlator.on_applied_transaction(&tx), 1);
        let staged = &h.correlator.pending().get(&tx.id).unwrap().actions;
        assert_eq!(staged[0].seq_num, 50_000);

        // Unwind the nested traces iteratively so the test itself does not
        // overflow in Drop.
        let mut stack = tx.action_traces;
        while let Some(mut at) = stack.pop() {
            stack.append(&mut at.inline_traces);
        }
    }
}
