//! error types for floe-core

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("invalid decimal base: {0}")]
    InvalidBase(u8),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("math overflow")]
    MathOverflow,

    #[error("division by zero")]
    DivisionByZero,
}

pub type Result<T> = std::result::Result<T, CoreError>;
