//! # ovtrack core
//!
//! Core types shared by every ovtrack component:
//! - Error handling types
//! - Fixed-point stream time
//! - Typed and encoded chunks
//! - Per-type header and buffer payloads
//! - Typed streams with a read cursor, and their type-erased form
//! - Stream bundles with time-ordered merging

pub mod any;
pub mod bundle;
pub mod chunk;
pub mod error;
pub mod kind;
pub mod matrix;
pub mod payload;
pub mod stream;
pub mod time;
pub mod types;

pub use any::{AnyStream, ErrorStream, StreamPtr};
pub use bundle::StreamBundle;
pub use chunk::{Chunk, ChunkKind, EncodedChunk, EndChunk};
pub use error::{Error, Result};
pub use kind::StreamKind;
pub use matrix::Matrix;
pub use payload::{
    DynamicMatrixHeader, EmptyBuffer, ExperimentInfoHeader, MatrixBuffer, MatrixHeader, SignalHeader,
    SpectrumHeader, Stimulation, StimulationBuffer, StimulationHeader, StimulationSet,
};
pub use stream::{CurrentChunk, Cursor, Stream};
pub use time::Time;
pub use types::{
    ChannelLocalisation, ChannelUnits, ExperimentInfo, FeatureVector, Signal, Spectrum, Stimulations, StreamType,
    StreamedMatrix,
};
