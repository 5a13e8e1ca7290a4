use std::time::SystemTime;

use bytes::Bytes;

/// A single record as delivered by the host daemon. Ordered within a batch by
/// `sequence_number`; aggregated records additionally carry a
/// `sub_sequence_number`.
#[derive(Debug, Clone)]
pub struct Record {
    pub sequence_number: String,
    pub sub_sequence_number: Option<u64>,
    pub partition_key: String,
    pub data: Bytes,
    pub approximate_arrival_timestamp: SystemTime,
}
