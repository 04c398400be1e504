//! # ovtrack
//!
//! Load, edit, concatenate and save multi-track OpenViBE stream recordings.
//!
//! A recording is a [`StreamBundle`]: an indexed set of typed streams
//! (signal, stimulations, spectrum ...) stored together in a `.ov` file.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ovtrack::{read_bundle_from_file, save_bundle_to_file, LoadOptions};
//!
//! fn main() -> ovtrack::Result<()> {
//!     let mut bundle = read_bundle_from_file("session.ov", &LoadOptions::new())?;
//!     println!("{} streams, {}", bundle.num_streams(), bundle.max_duration());
//!
//!     bundle.delete_stream(1)?;
//!     save_bundle_to_file(&mut bundle, "edited.ov")?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! The library is organized into several crates:
//! - `ovtrack-core`: time, chunks, payload types, streams and bundles
//! - `ovtrack-ebml`: EBML coding, payload codecs, demuxer and muxer
//!
//! This crate re-exports the most commonly used types and adds file
//! import/export, concatenation and the track workspace.

pub mod concat;
mod io;
mod options;
pub mod report;
pub mod workspace;

// Re-export core types
pub use ovtrack_core::{
    error::{BundleError, CodecError, ContainerError, StreamError},
    AnyStream, Chunk, ChunkKind, EncodedChunk, EndChunk, Error, Matrix, Result, Stream, StreamBundle, StreamKind,
    StreamPtr, StreamType, Time,
};

// Re-export stream types
pub use ovtrack_core::{
    ChannelLocalisation, ChannelUnits, ExperimentInfo, FeatureVector, Signal, Spectrum, Stimulation, Stimulations,
    StreamedMatrix,
};

// Re-export payload types
pub use ovtrack_core::{
    DynamicMatrixHeader, EmptyBuffer, ExperimentInfoHeader, MatrixBuffer, MatrixHeader, SignalHeader, SpectrumHeader,
    StimulationBuffer, StimulationHeader, StimulationSet,
};

// Re-export container types
pub use ovtrack_ebml::{
    AnyDecoder, AnyEncoder, ByteSource, Decoder, Demuxer, DemuxerConfig, Encoder, Muxer, MuxerConfig, ReadSource,
    SliceSource,
};

// High-level API
pub use concat::{catenate, catenate_bundles, ConcatConfig};
pub use io::{read_bundle, read_bundle_from_file, save_bundle_to_file, save_bundle_with, write_bundle};
pub use options::{LoadMode, LoadOptions, WorkspaceConfig};
pub use report::{BundleSummary, CheckReport};
pub use workspace::{PlaylistEntry, Workspace, WorkspaceError};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library version string.
pub fn version() -> &'static str {
    VERSION
}
