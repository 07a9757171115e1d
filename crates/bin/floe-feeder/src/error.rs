use floe_chain::ChainError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeederError {
    #[error("market feed unavailable: {0}")]
    FeedUnavailable(String),

    #[error("market feed malformed: {0}")]
    FeedMalformed(String),

    #[error("chain read failed: {0}")]
    ChainRead(String),

    #[error("chain write failed: {0}")]
    ChainWrite(String),

    #[error("{0} timed out")]
    Timeout(&'static str),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("core error: {0}")]
    Core(#[from] floe_core::CoreError),
}

pub type Result<T> = std::result::Result<T, FeederError>;

impl From<ChainError> for FeederError {
    fn from(err: ChainError) -> Self {
        match err {
            ChainError::ReadFailure(msg) => FeederError::ChainRead(msg),
            ChainError::WriteFailure { reason } => FeederError::ChainWrite(reason),
            ChainError::ConfirmationTimeout(hash) => {
                FeederError::ChainWrite(format!("no confirmation for {}", hash))
            }
            ChainError::InvalidConfig(msg) => FeederError::InvalidConfig(msg),
            ChainError::Core(e) => FeederError::Core(e),
        }
    }
}
