//! # ovtrack-ebml
//!
//! `.ov` stream container support for ovtrack.
//!
//! This crate provides:
//! - EBML variable-length integer coding and element writing
//! - An incremental, push-fed EBML reader
//! - Typed payload codecs for every stream type
//! - A demuxer that rebuilds a [`StreamBundle`](ovtrack_core::StreamBundle)
//!   from a byte source
//! - A muxer that writes a bundle back in time-merged order
//!
//! ## Example: round trip through memory
//!
//! ```no_run
//! use ovtrack_core::StreamBundle;
//! use ovtrack_ebml::{Demuxer, Muxer, MuxerConfig, SliceSource};
//!
//! # fn run(bundle: &StreamBundle) -> ovtrack_ebml::Result<()> {
//! let mut muxer = Muxer::new(Vec::new(), MuxerConfig::default());
//! muxer.write_bundle(bundle)?;
//! muxer.finalize()?;
//! let bytes = muxer.into_inner();
//!
//! let mut copy = StreamBundle::new();
//! let mut demuxer = Demuxer::new(SliceSource::new(&bytes));
//! while demuxer.step(&mut copy)? {}
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod demuxer;
pub mod ebml;
pub mod elements;
pub mod error;
pub mod muxer;
pub mod reader;
pub mod source;
pub mod writer;

pub use codec::{classify_payload, AnyDecoder, AnyEncoder, Decoded, Decoder, Encoder, PayloadCodec};
pub use demuxer::{Action, ContainerChunk, ContainerParser, Demuxer, DemuxerConfig};
pub use ebml::{EbmlHeader, Node};
pub use error::{EbmlError, Result};
pub use muxer::{selected_view, Muxer, MuxerConfig};
pub use reader::{Event, Reader};
pub use source::{ByteSource, ReadSource, SliceSource};
pub use writer::Writer;
