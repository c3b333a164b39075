use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShimError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, ShimError>;
