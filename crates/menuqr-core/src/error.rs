//! # Error Types
//!
//! Every fallible core operation returns [`CoreResult`]. The app layer maps
//! each variant onto an HTTP status; the messages here are shown to users
//! verbatim, so they stay short and free of internals.

use thiserror::Error;

/// Errors produced by the core domain and storage layers.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Input failed validation (maps to 400).
    #[error("{0}")]
    Validation(String),

    /// The referenced entity does not exist (maps to 404).
    #[error("{0}")]
    NotFound(String),

    /// A uniqueness constraint would be violated (maps to 409).
    #[error("{0}")]
    Conflict(String),

    /// No free QR code string was found within the attempt bound.
    #[error("Could not generate unique code after {attempts} attempts")]
    CodeSpaceExhausted { attempts: u32 },

    /// The underlying database failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// A record could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A lock was poisoned by a panicking thread.
    #[error("Lock poisoned: {0}")]
    LockPoisoned(&'static str),
}

impl CoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// True for errors caused by the caller rather than the server.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::NotFound(_) | Self::Conflict(_)
        )
    }
}

/// Result alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

macro_rules! storage_error_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for CoreError {
                fn from(err: $ty) -> Self {
                    Self::Storage(err.to_string())
                }
            }
        )*
    };
}

storage_error_from!(
    redb::Error,
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);

impl From<postcard::Error> for CoreError {
    fn from(err: postcard::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_are_classified() {
        assert!(CoreError::validation("bad").is_client_error());
        assert!(CoreError::not_found("gone").is_client_error());
        assert!(CoreError::conflict("dup").is_client_error());
        assert!(!CoreError::Storage("disk".into()).is_client_error());
        assert!(!CoreError::CodeSpaceExhausted { attempts: 3 }.is_client_error());
    }

    #[test]
    fn exhaustion_message_names_attempts() {
        let err = CoreError::CodeSpaceExhausted { attempts: 1000 };
        assert_eq!(
            err.to_string(),
            "Could not generate unique code after 1000 attempts"
        );
    }
}
