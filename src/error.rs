// MIT License - Copyright (c) 2026 ialarm-mk-core contributors
// Error taxonomy

/// All errors that can occur in the ialarm-mk-core library.
///
/// Only panel identity resolution (`AlarmPanel::connect`, `read_mac`) surfaces
/// errors to callers. Steady-state operations catch and log failures locally,
/// leaving last-known state untouched.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Login or session establishment failed, connection refused, or the
    /// panel could not be reached in time.
    #[error("Connectivity error: {reason}")]
    Connectivity { reason: String },

    /// The panel replied, but the reply was malformed or unexpected.
    #[error("Protocol error: {details}")]
    Protocol { details: String },

    /// Operation attempted before panel identity was established, or after
    /// shutdown.
    #[error("Not ready: {reason}")]
    NotReady { reason: String },

    #[error("Channel closed")]
    ChannelClosed,
}

impl CoreError {
    /// Whether this error is transient and the operation may be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CoreError::Io(_) | CoreError::Connectivity { .. } | CoreError::ChannelClosed
        )
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
