//! Fixed-layout little-endian codec used for every record the resource
//! accounting core persists. Layouts are part of consensus: two nodes that
//! encode the same record differently would diverge on state roots.

use tally_error::ChainError;
use thiserror::Error;

mod primitives;

/// Error that can be returned when writing bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WriteError {
    /// Not enough space in the destination buffer.
    #[error("not enough space to write value")]
    NotEnoughSpace,
    /// A length did not fit the on-disk width.
    #[error("length does not fit in the encoded width")]
    TryFromIntError,
}

/// Error that can be returned when reading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ReadError {
    #[error("not enough bytes to read value")]
    NotEnoughBytes,
    #[error("malformed value")]
    ParseError,
    #[error("trailing bytes after value")]
    TrailingBytes,
}

impl From<ReadError> for ChainError {
    fn from(e: ReadError) -> Self {
        ChainError::SerializationError(e.to_string())
    }
}

impl From<WriteError> for ChainError {
    fn from(e: WriteError) -> Self {
        ChainError::SerializationError(e.to_string())
    }
}

/// Number of bytes a value occupies once written.
pub trait NumBytes {
    fn num_bytes(&self) -> usize;
}

pub trait Read: Sized {
    fn read(bytes: &[u8], pos: &mut usize) -> Result<Self, ReadError>;

    /// Decodes a value that must span the whole buffer.
    fn unpack(bytes: &[u8]) -> Result<Self, ReadError> {
        let mut pos = 0;
        let value = Self::read(bytes, &mut pos)?;
        if pos != bytes.len() {
            return Err(ReadError::TrailingBytes);
        }
        Ok(value)
    }
}

pub trait Write {
    fn write(&self, bytes: &mut [u8], pos: &mut usize) -> Result<(), WriteError>;

    fn pack(&self) -> Result<Vec<u8>, WriteError>
    where
        Self: NumBytes,
    {
        let mut bytes = vec![0u8; self.num_bytes()];
        let mut pos = 0;
        self.write(&mut bytes, &mut pos)?;
        Ok(bytes)
    }
}
