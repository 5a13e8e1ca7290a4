use std::time::{Duration, SystemTime};

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use futures_retry::FutureRetry;
use tracing::{error, info, warn};

use crate::interface::checkpoint::{CheckpointError, Checkpointer};
use crate::interface::processor::{
    InitializationInput, ProcessRecordsInput, RecordProcessor, ShutdownInput, ShutdownReason,
};
use crate::interface::record::Record;
use crate::util::retry::CheckpointRetryPolicy;

pub const DEFAULT_CHECKPOINT_RETRIES: usize = 5;
pub const DEFAULT_CHECKPOINT_ERROR_SLEEP: Duration = Duration::from_secs(5);

const SHARD_ID_PREFIX: &str = "shardId-";

/// The per-record strategy a [`PerRecordAdapter`] drives. Implementations
/// supply the two required methods; the checkpoint hooks default to no-ops.
#[async_trait]
pub trait PerRecordProcessor: Send + Sync {
    /// Called once for every record in every delivered batch, in arrival
    /// order. Returning an error abandons the rest of the batch.
    async fn process_record(
        &mut self,
        data: Bytes,
        partition_key: &str,
        sequence_number: &str,
        sub_sequence_number: Option<u64>,
        approximate_arrival_timestamp: SystemTime,
    ) -> Result<()>;

    /// Consulted immediately after each record. Returning `Ok(true)`
    /// checkpoints at that record's position before the next record is
    /// processed; returning an error abandons the rest of the batch.
    fn should_checkpoint(&mut self) -> Result<bool>;

    async fn before_checkpoint(
        &mut self,
        _sequence_number: Option<&str>,
        _sub_sequence_number: Option<u64>,
    ) {
    }

    /// Invoked once per successful checkpoint, with the position that was
    /// originally requested.
    async fn after_checkpoint(
        &mut self,
        _sequence_number: Option<&str>,
        _sub_sequence_number: Option<u64>,
    ) {
    }
}

/// Adapts a [`PerRecordProcessor`] strategy to the daemon's
/// [`RecordProcessor`] protocol and owns checkpointing with retries.
///
/// One adapter serves one shard. The daemon never observes an error from any
/// lifecycle method: strategy and checkpointer failures degrade to log lines
/// and a bounded retry. An error escaping to the daemon would take down the
/// hosting process and every shard it serves.
pub struct PerRecordAdapter<P> {
    strategy: P,
    shard_id: Option<String>,
    checkpoint_retries: usize,
    checkpoint_error_sleep: Duration,
    lease_lost: bool,
}

impl<P> PerRecordAdapter<P>
where
    P: PerRecordProcessor,
{
    pub fn new(strategy: P) -> Self {
        Self {
            strategy,
            shard_id: None,
            checkpoint_retries: DEFAULT_CHECKPOINT_RETRIES,
            checkpoint_error_sleep: DEFAULT_CHECKPOINT_ERROR_SLEEP,
            lease_lost: false,
        }
    }

    /// Maximum checkpoint attempts per checkpoint call. Must be positive;
    /// zero is treated as one.
    pub fn with_checkpoint_retries(mut self, retries: usize) -> Self {
        self.checkpoint_retries = retries.max(1);
        self
    }

    /// Delay between failed checkpoint attempts. Fixed, not exponential; the
    /// retry loop blocks its caller for up to `retries × sleep`.
    pub fn with_checkpoint_error_sleep(mut self, sleep: Duration) -> Self {
        self.checkpoint_error_sleep = sleep;
        self
    }

    /// The normalized shard identifier, once `initialize` has run.
    pub fn shard_id(&self) -> Option<&str> {
        self.shard_id.as_deref()
    }

    fn shard_label(&self) -> &str {
        self.shard_id.as_deref().unwrap_or("<unassigned>")
    }

    /// Checkpoints at the given position, retrying on retryable failures up
    /// to the configured budget. Never returns an error: budget exhaustion
    /// and lease loss degrade to log lines.
    pub async fn checkpoint(
        &mut self,
        checkpointer: &dyn Checkpointer,
        sequence_number: Option<&str>,
        sub_sequence_number: Option<u64>,
    ) {
        if self.lease_lost {
            warn!(
                shard_id = %self.shard_label(),
                "lease is already lost, not attempting to checkpoint"
            );
            return;
        }

        info!(
            shard_id = %self.shard_label(),
            sequence_number = sequence_number.unwrap_or("<latest>"),
            "checkpointing"
        );
        self.strategy
            .before_checkpoint(sequence_number, sub_sequence_number)
            .await;

        let attempts = FutureRetry::new(
            || checkpointer.checkpoint(sequence_number, sub_sequence_number),
            CheckpointRetryPolicy::new(self.checkpoint_retries, self.checkpoint_error_sleep),
        );
        match attempts.await {
            Ok(((), _)) => {
                self.strategy
                    .after_checkpoint(sequence_number, sub_sequence_number)
                    .await;
            }
            Err((CheckpointError::Shutdown, _)) => {
                info!(
                    shard_id = %self.shard_label(),
                    "encountered shutdown while checkpointing, skipping checkpoint"
                );
            }
            Err((err, attempt)) => {
                error!(
                    shard_id = %self.shard_label(),
                    error = %err,
                    attempts = attempt,
                    "failed to checkpoint, giving up"
                );
            }
        }
    }

    async fn process_batch(
        &mut self,
        records: Vec<Record>,
        checkpointer: &dyn Checkpointer,
    ) -> Result<()> {
        for record in records {
            self.strategy
                .process_record(
                    record.data,
                    &record.partition_key,
                    &record.sequence_number,
                    record.sub_sequence_number,
                    record.approximate_arrival_timestamp,
                )
                .await?;
            if self.strategy.should_checkpoint()? {
                self.checkpoint(
                    checkpointer,
                    Some(&record.sequence_number),
                    record.sub_sequence_number,
                )
                .await;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl<P> RecordProcessor for PerRecordAdapter<P>
where
    P: PerRecordProcessor,
{
    async fn initialize(&mut self, input: InitializationInput) {
        let shard_id = input
            .shard_id
            .strip_prefix(SHARD_ID_PREFIX)
            .unwrap_or(&input.shard_id)
            .to_owned();
        info!(%shard_id, "initializing record processor");
        self.shard_id = Some(shard_id);
    }

    async fn process_records(&mut self, input: ProcessRecordsInput) {
        let ProcessRecordsInput {
            records,
            checkpointer,
        } = input;
        if let Err(err) = self.process_batch(records, checkpointer.as_ref()).await {
            error!(
                shard_id = %self.shard_label(),
                error = %err,
                "error while processing records, abandoning the rest of the batch"
            );
        }
    }

    async fn shutdown(&mut self, input: ShutdownInput) {
        match input.reason {
            ShutdownReason::Terminate => {
                // Checkpointing with no position checkpoints at the largest
                // sequence number reached on this shard, which the daemon
                // needs before it can start on the child shards.
                info!(
                    shard_id = %self.shard_label(),
                    "was told to terminate, will attempt a final checkpoint"
                );
                self.checkpoint(input.checkpointer.as_ref(), None, None).await;
            }
            ShutdownReason::Zombie => {
                info!(
                    shard_id = %self.shard_label(),
                    "shutting down due to failover, will not checkpoint"
                );
                self.lease_lost = true;
            }
        }
    }
}
