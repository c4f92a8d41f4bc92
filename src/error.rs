use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failures surfaced by the file streamer and its positional readers.
#[derive(Error, Debug)]
pub enum TsError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot open stream file {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt stream: {0}")]
    Corrupt(String),

    #[error("no data update for {0:?}")]
    Stall(Duration),

    #[error("position {position} already overwritten (oldest readable is {oldest})")]
    Evicted { position: u64, oldest: u64 },

    #[error("stream is stopped")]
    Stopped,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("precondition failed: {0}")]
    Precondition(String),
}

impl TsError {
    /// Whether the failure is transient and the caller should retry or re-tune.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TsError::Stall(_) | TsError::Corrupt(_) | TsError::Io(_))
    }
}

pub type Result<T> = std::result::Result<T, TsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_kinds() {
        assert!(TsError::Stall(Duration::from_secs(10)).is_retryable());
        assert!(TsError::Corrupt("no sync".into()).is_retryable());
        assert!(!TsError::Stopped.is_retryable());
        assert!(!TsError::Evicted { position: 0, oldest: 188 }.is_retryable());
    }

    #[test]
    fn test_display() {
        let err = TsError::Evicted { position: 10, oldest: 20 };
        assert_eq!(
            err.to_string(),
            "position 10 already overwritten (oldest readable is 20)"
        );
    }
}
