use async_trait::async_trait;
use thiserror::Error;

/// Failure categories a [`Checkpointer`] reports. The daemon hands these over
/// pre-categorized; nothing in this crate re-derives them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckpointError {
    /// The lease for this shard was lost, e.g. another worker took it over
    /// during a failover. Checkpointing can never succeed again on this
    /// processor instance.
    #[error("record processor is being shut down")]
    Shutdown,

    /// A dependency of the checkpoint store is over capacity and wants us to
    /// back off before trying again.
    #[error("checkpoint dependency is being throttled")]
    Throttling,

    /// The daemon reported an inconsistency on its side. May self-resolve.
    #[error("daemon is in an invalid state")]
    InvalidState,

    #[error("checkpoint failed: {0}")]
    Other(String),
}

impl CheckpointError {
    /// Maps an exception name as reported on the daemon protocol to a
    /// category.
    pub fn from_daemon_error(name: &str) -> Self {
        match name {
            "ShutdownException" => Self::Shutdown,
            "ThrottlingException" => Self::Throttling,
            "InvalidStateException" => Self::InvalidState,
            other => Self::Other(other.to_owned()),
        }
    }
}

/// Capability to durably acknowledge stream progress, provided by the host
/// daemon alongside each record batch and at shutdown.
#[async_trait]
pub trait Checkpointer: Send + Sync {
    /// Checkpoints at the given position. A `sequence_number` of `None`
    /// checkpoints at the furthest position reached on this shard.
    async fn checkpoint(
        &self,
        sequence_number: Option<&str>,
        sub_sequence_number: Option<u64>,
    ) -> Result<(), CheckpointError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn daemon_error_names_map_to_categories() {
        assert_eq!(
            CheckpointError::from_daemon_error("ShutdownException"),
            CheckpointError::Shutdown
        );
        assert_eq!(
            CheckpointError::from_daemon_error("ThrottlingException"),
            CheckpointError::Throttling
        );
        assert_eq!(
            CheckpointError::from_daemon_error("InvalidStateException"),
            CheckpointError::InvalidState
        );
        assert_eq!(
            CheckpointError::from_daemon_error("KmsAccessDeniedException"),
            CheckpointError::Other("KmsAccessDeniedException".to_owned())
        );
    }
}
