use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Every condition that aborts a pipeline run. None of them are recoverable:
/// the run either completes with a full summary or yields one of these.
#[derive(Error, Debug)]
pub enum Error {
    #[error("malformed record {record:?}: {reason}")]
    MalformedRecord { record: String, reason: &'static str },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("key table full: more than {capacity} distinct keys")]
    Capacity { capacity: usize },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("pipeline stage `{stage}` panicked")]
    StagePanicked { stage: String },
}

impl Error {
    pub(crate) fn malformed(record: &[u8], reason: &'static str) -> Self {
        Error::MalformedRecord {
            record: String::from_utf8_lossy(record).into_owned(),
            reason,
        }
    }
}
