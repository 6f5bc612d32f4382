use thiserror::Error;

use crate::error_codes;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected status {status} from {endpoint}")]
    UnexpectedStatus { endpoint: String, status: u16 },

    #[error("could not decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("drive list has {0} entries, expected {expected}", expected = crate::sync_engine::types::DRIVE_COUNT)]
    InvalidSnapshot(usize),

    #[error("slot {0} is out of range (1..=8)")]
    InvalidSlot(i64),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ClientError {
    /// Stable code for front ends.
    pub fn code(&self) -> &'static str {
        match self {
            ClientError::Transport(_) => error_codes::ERR_TRANSPORT,
            ClientError::UnexpectedStatus { .. } => error_codes::ERR_UNEXPECTED_STATUS,
            ClientError::Decode(_) => error_codes::ERR_DECODE,
            ClientError::InvalidSnapshot(_) => error_codes::ERR_INVALID_SNAPSHOT,
            ClientError::InvalidSlot(_) => error_codes::ERR_INVALID_SLOT,
            ClientError::Io(_) => error_codes::ERR_IO,
            ClientError::Config(_) => error_codes::ERR_CONFIG,
        }
    }
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;
