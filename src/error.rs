use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("topic already exists: {0}")]
    TopicAlreadyExists(String),

    #[error("unknown topic: {0}")]
    UnknownTopic(String),

    #[error("unknown partition: {0}")]
    UnknownPartition(u32),

    #[error("malformed record frame at offset {offset}")]
    Decode { offset: u64 },

    #[error("invalid segment file name: {0}")]
    InvalidSegmentFile(PathBuf),

    #[error(transparent)]
    Config(#[from] figment::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
