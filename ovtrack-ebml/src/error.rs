//! EBML and container specific error types.
//!
//! This module provides error types for `.ov` container parsing and writing
//! and for chunk payload coding.

use ovtrack_core::error::{CodecError, ContainerError};
use thiserror::Error;

/// EBML-specific error types.
#[derive(Error, Debug)]
pub enum EbmlError {
    /// Invalid EBML header.
    #[error("Invalid EBML header: {0}")]
    InvalidEbmlHeader(String),

    /// Invalid variable-length integer.
    #[error("Invalid VINT encoding at offset {offset}")]
    InvalidVint {
        /// Byte offset where the invalid VINT was found.
        offset: u64,
    },

    /// Element content runs past its parent.
    #[error("Element 0x{id:X} at offset {offset} overruns its parent by {excess} bytes")]
    Overrun {
        /// Identifier of the offending element.
        id: u64,
        /// Byte offset of the element header.
        offset: u64,
        /// Number of bytes past the parent's end.
        excess: u64,
    },

    /// Element larger than the configured limit.
    #[error("Element 0x{id:X} declares {size} bytes, limit is {limit}")]
    ElementTooLarge {
        /// Identifier of the offending element.
        id: u64,
        /// Declared content size.
        size: u64,
        /// Configured maximum.
        limit: u64,
    },

    /// Recursion limit exceeded.
    #[error("Recursion limit exceeded at depth {depth}")]
    RecursionLimit {
        /// The depth at which recursion was limited.
        depth: u32,
    },

    /// Leaf value of an unexpected width.
    #[error("Element 0x{id:X} holds {len} bytes, expected {expected}")]
    InvalidLeafSize {
        /// Identifier of the leaf.
        id: u64,
        /// Actual content length.
        len: usize,
        /// Expected content length description.
        expected: &'static str,
    },

    /// Missing required element.
    #[error("Missing required element: {0}")]
    MissingElement(&'static str),

    /// A chunk referenced a stream that was never declared.
    #[error("Chunk for undeclared stream {index}")]
    UndeclaredStream {
        /// The stream index carried by the chunk.
        index: u64,
    },

    /// A repeated stream declaration disagrees with the existing stream.
    #[error("Stream {index} redeclared as 0x{declared:016X}, already holds 0x{existing:016X}")]
    StreamRedeclared {
        /// The stream index.
        index: usize,
        /// The newly declared type.
        declared: u64,
        /// The type of the stream in the bundle.
        existing: u64,
    },

    /// Malformed chunk payload.
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Muxer used in the wrong order.
    #[error("Muxer state error: {0}")]
    MuxerState(&'static str),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error raised by the stream model.
    #[error(transparent)]
    Core(#[from] ovtrack_core::Error),

    /// Generic error.
    #[error("{0}")]
    Other(String),
}

impl From<String> for EbmlError {
    fn from(s: String) -> Self {
        EbmlError::Other(s)
    }
}

impl From<&str> for EbmlError {
    fn from(s: &str) -> Self {
        EbmlError::Other(s.to_string())
    }
}

impl From<CodecError> for EbmlError {
    fn from(err: CodecError) -> Self {
        EbmlError::Core(err.into())
    }
}

/// Result type for EBML operations.
pub type Result<T> = std::result::Result<T, EbmlError>;

/// Convert EbmlError to ovtrack_core::Error.
impl From<EbmlError> for ovtrack_core::Error {
    fn from(err: EbmlError) -> Self {
        match err {
            EbmlError::Io(e) => ovtrack_core::Error::Io(e),
            EbmlError::Core(e) => e,
            EbmlError::InvalidEbmlHeader(msg) => ovtrack_core::Error::Container(ContainerError::InvalidStructure(msg)),
            EbmlError::MissingElement(name) => {
                ovtrack_core::Error::Container(ContainerError::MissingElement(name.to_string()))
            }
            EbmlError::RecursionLimit { depth } => {
                ovtrack_core::Error::Container(ContainerError::RecursionLimit { depth })
            }
            EbmlError::UndeclaredStream { index } => {
                ovtrack_core::Error::Container(ContainerError::StreamNotFound { index: index as u32 })
            }
            EbmlError::InvalidPayload(msg) => ovtrack_core::Error::Codec(CodecError::MalformedPayload(msg)),
            _ => ovtrack_core::Error::Container(ContainerError::Other(err.to_string())),
        }
    }
}
