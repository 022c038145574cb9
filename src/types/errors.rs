use std::fmt;

// === StorageError ===

/// Errors from the synced storage area.
///
/// The coordination core itself has no fatal errors — out-of-range and
/// malformed values are absorbed by the settings normalizer — so this enum
/// only covers the durable-storage boundary.
#[derive(Debug)]
pub enum StorageError {
    /// Underlying database operation failed.
    DatabaseError(String),
    /// Failed to serialize or deserialize a stored value.
    SerializationError(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::DatabaseError(msg) => write!(f, "Storage database error: {}", msg),
            StorageError::SerializationError(msg) => {
                write!(f, "Storage serialization error: {}", msg)
            }
        }
    }
}

impl std::error::Error for StorageError {}

impl From<rusqlite::Error> for StorageError {
    fn from(e: rusqlite::Error) -> Self {
        StorageError::DatabaseError(e.to_string())
    }
}
