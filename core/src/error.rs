use chrono::NaiveDate;
use thiserror::Error;

/// Failures surfaced to the user as inline or form-level messages.
///
/// Authentication failures are ordinary values of this enum; nothing in the
/// directory panics on bad credentials.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackerError {
    #[error("{0}")]
    Validation(String),

    #[error("Password must be at least 4 characters")]
    WeakPassword,

    #[error("A profile named '{0}' already exists")]
    DuplicateName(String),

    #[error("No profile named '{0}'")]
    NotFound(String),

    #[error("Wrong password")]
    WrongPassword,

    #[error("No active profile. Log in or register first")]
    NoActiveProfile,

    #[error("Physical data missing. Run setup to calculate your daily target")]
    SetupRequired,

    #[error("{0} is in the future")]
    FutureDate(NaiveDate),
}

impl TrackerError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

/// Failures of the persistent store. These never cross the store's public
/// read/write API: reads fall back to a default and writes are dropped.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage backend failed for key '{key}': {source}")]
    Backend {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("value for key '{key}' could not be parsed: {source}")]
    Parse {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("value for key '{key}' could not be serialized: {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, TrackerError>;
