use thiserror::Error;

/// Type-boundary validation result
pub type Result<T> = std::result::Result<T, TypeError>;

#[derive(Debug, Error)]
pub enum TypeError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid identifier: {0}")]
    InvalidId(String),
}
