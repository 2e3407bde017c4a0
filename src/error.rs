//!
//! Defines error types for the object registry.

use crate::primitives::Handle;
use crate::types::{ObjectId, ObjectKind};

/// Represents errors that can occur while managing tracked objects, workers or configuration.
///
/// Running out of memory is not represented here: allocation failure aborts the
/// process, since a fuzzer cannot do anything useful without basic memory.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// A thread panicked while holding the global store lock.
    #[error("Global object store lock is poisoned")]
    LockPoisoned,
    /// The requested worker slot is outside the configured worker count.
    #[error("Worker slot {0} out of range (max workers: {1})")]
    WorkerOutOfRange(u32, u32),
    /// The requested worker slot is still occupied by a running worker.
    #[error("Worker slot {0} is already in use")]
    WorkerSlotBusy(u32),
    /// A raw kind tag does not name any object kind.
    #[error("Invalid object kind tag: {0}")]
    InvalidKind(u8),
    /// The Object's handle is already owned by a live Object in the same store.
    #[error("{0} is already tracked by {1} object {2}")]
    HandleInUse(Handle, ObjectKind, ObjectId),
    /// The campaign configuration could not be parsed.
    #[error("Configuration error: {0}")]
    Config(String),
    /// Reading a configuration file failed.
    #[error("I/O error: {0}")]
    Io(String),
}

impl<T> From<std::sync::PoisonError<T>> for RegistryError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        RegistryError::LockPoisoned
    }
}

impl From<serde_json::Error> for RegistryError {
    fn from(err: serde_json::Error) -> Self {
        RegistryError::Config(err.to_string())
    }
}

impl From<std::io::Error> for RegistryError {
    fn from(err: std::io::Error) -> Self {
        RegistryError::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(RegistryError::WorkerOutOfRange(9, 4).to_string(), "Worker slot 9 out of range (max workers: 4)");
        assert_eq!(RegistryError::InvalidKind(200).to_string(), "Invalid object kind tag: 200");
        assert_eq!(
            RegistryError::HandleInUse(Handle::Fd(3), ObjectKind::FdPipe, ObjectId(0)).to_string(),
            "fd 3 is already tracked by fd_pipe object #0"
        );
    }

    #[test]
    fn test_json_error_maps_to_config() {
        let err = serde_json::from_str::<u32>("not json").unwrap_err();
        assert!(matches!(RegistryError::from(err), RegistryError::Config(_)));
    }
}
