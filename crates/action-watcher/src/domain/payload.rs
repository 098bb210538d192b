//! # Payload Builder
//!
//! Turns the staged actions of one transaction into [`ActionNotif`]s. An
//! action whose data cannot be decoded is dropped on its own; the rest of the
//! batch is unaffected.

use shared_types::{AcceptedBlock, TransactionId};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use watcher_telemetry::metrics::DECODE_FAILURES;

use super::entities::{ActionNotif, SequencedAction};
use crate::ports::AbiDecoder;

pub struct PayloadBuilder {
    decoder: Arc<dyn AbiDecoder>,
    /// Per-action decode budget.
    max_time: Duration,
}

impl PayloadBuilder {
    pub fn new(decoder: Arc<dyn AbiDecoder>, max_time: Duration) -> Self {
        Self { decoder, max_time }
    }

    /// Build notifications for `staged`, in order, stamped with `block`'s
    /// number and time.
    pub fn build(
        &self,
        tx_id: &TransactionId,
        staged: &[SequencedAction],
        block: &AcceptedBlock,
    ) -> Vec<ActionNotif> {
        staged
            .iter()
            .filter_map(|sa| {
                let act = &sa.action;
                match self.decoder.decode_action(act, self.max_time) {
                    Ok(action_data) => Some(ActionNotif {
                        tx_id: *tx_id,
                        account: act.account,
                        name: act.name,
                        seq_num: sa.seq_num,
                        receiver: sa.receiver,
                        block_time: block.timestamp,
                        block_num: block.block_num,
                        authorization: act.authorization.clone(),
                        action_data,
                    }),
                    Err(error) => {
                        DECODE_FAILURES.inc();
                        warn!(
                            tx_id = %tx_id,
                            account = %act.account,
                            action = %act.name,
                            seq_num = sa.seq_num,
                            %error,
                            "Dropping action whose data cannot be decoded"
                        );
                        None
                    }
                }
            })
            .collect()
    }
}
