use tally_error::ChainError;
use tally_serialization::{ReadError, WriteError};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainbaseError {
    #[error("item not found")]
    NotFound,
    #[error("item already exists")]
    AlreadyExists,
    #[error("error reading data: {0}")]
    ReadError(#[from] ReadError),
    #[error("error writing data: {0}")]
    WriteError(#[from] WriteError),
    #[error("undo scope closed out of order: expected depth {expected}, got {actual}")]
    ScopeMismatch { expected: usize, actual: usize },
    #[error("cannot commit with {0} undo scopes still open")]
    OpenScopes(usize),
    #[error("internal error: {0}")]
    InternalError(String),
}

impl From<fjall::Error> for ChainbaseError {
    fn from(e: fjall::Error) -> Self {
        ChainbaseError::InternalError(e.to_string())
    }
}

impl From<ChainbaseError> for ChainError {
    fn from(e: ChainbaseError) -> Self {
        ChainError::DatabaseError(e.to_string())
    }
}
