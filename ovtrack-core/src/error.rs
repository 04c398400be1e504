//! Error types for the ovtrack libraries.
//!
//! Every layer (container, codec, stream, bundle) has its own enum which
//! converts into the top-level [`Error`].

use thiserror::Error;

/// Main error type for the ovtrack libraries.
#[derive(Error, Debug)]
pub enum Error {
    /// Container format errors (demuxing/muxing).
    #[error("Container error: {0}")]
    Container(#[from] ContainerError),

    /// Chunk codec errors (encoding/decoding).
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// Stream manipulation errors.
    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

    /// Stream bundle errors.
    #[error("Bundle error: {0}")]
    Bundle(#[from] BundleError),

    /// I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid parameter provided.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Container format errors.
#[derive(Error, Debug)]
pub enum ContainerError {
    /// Invalid or corrupted container structure.
    #[error("Invalid container structure: {0}")]
    InvalidStructure(String),

    /// Missing required element.
    #[error("Missing required element: {0}")]
    MissingElement(String),

    /// Recursion limit exceeded during parsing.
    #[error("Recursion limit exceeded at depth {depth}")]
    RecursionLimit { depth: u32 },

    /// A chunk referenced a stream index that was never declared.
    #[error("Stream {index} not found")]
    StreamNotFound { index: u32 },

    /// Generic container error message.
    #[error("{0}")]
    Other(String),
}

/// Chunk codec errors.
#[derive(Error, Debug)]
pub enum CodecError {
    /// The stream type has no registered codec.
    #[error("No codec for stream type 0x{type_id:016X}")]
    UnknownStreamType { type_id: u64 },

    /// The encoded chunk does not belong to the codec's stream type.
    #[error("Chunk of type 0x{found:016X} fed to codec for 0x{expected:016X}")]
    TypeMismatch { expected: u64, found: u64 },

    /// The payload could not be parsed.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// A buffer was decoded before the stream header.
    #[error("Buffer received before header")]
    MissingHeader,

    /// Buffer payload disagrees with the header layout.
    #[error("Buffer holds {found} values, header declares {expected}")]
    SizeMismatch { expected: usize, found: usize },
}

/// Stream manipulation errors.
#[derive(Error, Debug)]
pub enum StreamError {
    /// Copy or assignment between streams of different types.
    #[error("Cannot copy a {source_kind} stream into a {target_kind} stream")]
    TypeMismatch {
        source_kind: &'static str,
        target_kind: &'static str,
    },

    /// A chunk with `start > end` was offered to the stream.
    #[error("Chunk start {start} is after its end {end}")]
    InvalidInterval { start: u64, end: u64 },
}

/// Stream bundle errors.
#[derive(Error, Debug)]
pub enum BundleError {
    /// `create_stream` targeted a slot that already holds a stream.
    #[error("Stream slot {index} is already occupied")]
    SlotOccupied { index: usize },

    /// Stream index outside the bundle.
    #[error("Stream {index} out of range (bundle holds {len})")]
    StreamOutOfRange { index: usize, len: usize },

    /// Bundles or selections whose stream layouts differ.
    #[error("Inconsistent stream layout: {0}")]
    InconsistentLayout(String),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an invalid parameter error.
    pub fn invalid_param(msg: impl Into<String>) -> Self {
        Error::InvalidParameter(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidParameter("test parameter".into());
        assert_eq!(err.to_string(), "Invalid parameter: test parameter");
    }

    #[test]
    fn test_bundle_error_conversion() {
        let err: Error = BundleError::SlotOccupied { index: 3 }.into();
        assert!(matches!(err, Error::Bundle(BundleError::SlotOccupied { index: 3 })));
        assert_eq!(err.to_string(), "Bundle error: Stream slot 3 is already occupied");
    }

    #[test]
    fn test_container_error_display() {
        let err: Error = ContainerError::StreamNotFound { index: 2 }.into();
        assert_eq!(err.to_string(), "Container error: Stream 2 not found");
    }

    #[test]
    fn test_unknown_type_display() {
        let err = CodecError::UnknownStreamType { type_id: 0xABCD };
        assert_eq!(err.to_string(), "No codec for stream type 0x000000000000ABCD");
    }
}
