use std::sync::Arc;

use async_trait::async_trait;

use super::checkpoint::Checkpointer;
use super::record::Record;

pub struct InitializationInput {
    pub shard_id: String,
}

pub struct ProcessRecordsInput {
    pub records: Vec<Record>,
    pub checkpointer: Arc<dyn Checkpointer>,
}

/// Why the daemon is revoking a record processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// The shard is ending (split or merge). A final checkpoint is required
    /// for the daemon to start processing the child shards.
    Terminate,
    /// The lease was lost. Checkpointing after this always fails.
    Zombie,
}

pub struct ShutdownInput {
    pub reason: ShutdownReason,
    pub checkpointer: Arc<dyn Checkpointer>,
}

/// The record-processor protocol spoken by the host daemon. One instance is
/// bound to one shard; calls arrive sequentially, `initialize` first and
/// `shutdown` last.
#[async_trait]
pub trait RecordProcessor: Send + Sync {
    async fn initialize(&mut self, input: InitializationInput);
    async fn process_records(&mut self, input: ProcessRecordsInput);
    async fn shutdown(&mut self, input: ShutdownInput);
}
