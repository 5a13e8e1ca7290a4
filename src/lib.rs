//! A convenience layer for consuming a shard-partitioned record stream under
//! an external record-processing daemon (the Amazon KCL MultiLangDaemon
//! model). Implement the small [`PerRecordProcessor`] strategy and
//! [`PerRecordAdapter`] speaks the daemon's record-processor protocol for
//! you, including checkpointing with bounded retries.

pub mod interface;
pub mod launch;
pub mod processor;

mod util;

pub use interface::checkpoint::{CheckpointError, Checkpointer};
pub use interface::processor::{
    InitializationInput, ProcessRecordsInput, RecordProcessor, ShutdownInput, ShutdownReason,
};
pub use interface::record::Record;
pub use processor::{PerRecordAdapter, PerRecordProcessor};
