use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("unknown message key: {0}")]
    UnknownMessage(String),
    #[error("{0}")]
    Message(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;
