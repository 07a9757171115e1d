use floe_core::CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChainError {
    #[error("chain read failed: {0}")]
    ReadFailure(String),

    #[error("chain write failed: {reason}")]
    WriteFailure { reason: String },

    #[error("confirmation timed out for tx {0}")]
    ConfirmationTimeout(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("core error: {0}")]
    Core(#[from] CoreError),
}

pub type Result<T> = std::result::Result<T, ChainError>;
