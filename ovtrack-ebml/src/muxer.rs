//! `.ov` container muxer.
//!
//! Writes an EBML header, one stream header section declaring every stream,
//! then one buffer node per encoded chunk. Chunks of a bundle are written in
//! time-merged order, as chosen by [`StreamBundle::next_stream`].

use crate::codec::AnyEncoder;
use crate::ebml::{EbmlHeader, OV_DOC_TYPE};
use crate::elements::*;
use crate::error::{EbmlError, Result};
use crate::writer::Writer;
use ovtrack_core::{ChunkKind, EncodedChunk, StreamBundle, Time};
use std::io::Write;
use std::sync::Arc;
use tracing::debug;

/// Muxer configuration.
#[derive(Debug, Clone)]
pub struct MuxerConfig {
    /// Write an EBML header before the stream header section.
    pub write_ebml_header: bool,
    /// Document type announced in the EBML header.
    pub doc_type: String,
}

impl Default for MuxerConfig {
    fn default() -> Self {
        Self {
            write_ebml_header: true,
            doc_type: OV_DOC_TYPE.to_string(),
        }
    }
}

impl MuxerConfig {
    /// Configuration for the legacy layout without EBML header.
    pub fn headerless() -> Self {
        Self {
            write_ebml_header: false,
            ..Default::default()
        }
    }
}

/// Muxer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MuxerState {
    /// Nothing written yet.
    Initial,
    /// Stream header section written.
    Ready,
    /// Writing chunks.
    Writing,
    /// Finalized.
    Finalized,
}

/// The selected, known-type streams of `bundle`, in slot order.
///
/// The returned bundle shares its streams with `bundle`.
pub fn selected_view(bundle: &StreamBundle) -> StreamBundle {
    let mut view = StreamBundle::new();
    for (_, stream) in bundle.streams() {
        let exported = {
            let guard = stream.read();
            guard.is_selected() && !guard.is_error()
        };
        if exported {
            view.push_stream(Arc::clone(stream));
        }
    }
    view.set_dirty(false);
    view
}

/// `.ov` container writer.
pub struct Muxer<W: Write> {
    writer: W,
    config: MuxerConfig,
    state: MuxerState,
    stream_count: usize,
    chunks_written: u64,
    bytes_written: u64,
}

impl<W: Write> Muxer<W> {
    /// Create a muxer.
    pub fn new(writer: W, config: MuxerConfig) -> Self {
        Self {
            writer,
            config,
            state: MuxerState::Initial,
            stream_count: 0,
            chunks_written: 0,
            bytes_written: 0,
        }
    }

    /// Write the EBML header and the stream header section.
    ///
    /// Stream `i` of the container has type `types[i]`.
    pub fn write_header(&mut self, types: &[u64]) -> Result<()> {
        if self.state != MuxerState::Initial {
            return Err(EbmlError::MuxerState("header already written"));
        }

        if self.config.write_ebml_header {
            let header = EbmlHeader {
                doc_type: self.config.doc_type.clone(),
                ..Default::default()
            };
            self.emit(&header.to_bytes()?)?;
        }

        let mut writer = Writer::new();
        writer.open_child(STREAM_HEADER);
        writer.uint(STREAM_HEADER_COMPRESSION, 0)?;
        for &type_id in types {
            writer.uint(STREAM_HEADER_STREAM_TYPE, type_id)?;
        }
        writer.close_child()?;
        self.emit(&writer.finish()?)?;

        self.stream_count = types.len();
        self.state = MuxerState::Ready;
        debug!(streams = types.len(), "Stream header written");
        Ok(())
    }

    /// Write one encoded chunk for container stream `stream_index`.
    pub fn write_chunk(&mut self, stream_index: usize, chunk: &EncodedChunk) -> Result<()> {
        match self.state {
            MuxerState::Initial => return Err(EbmlError::MuxerState("header not written")),
            MuxerState::Finalized => return Err(EbmlError::MuxerState("muxer finalized")),
            MuxerState::Ready | MuxerState::Writing => {}
        }
        if stream_index >= self.stream_count {
            return Err(EbmlError::UndeclaredStream {
                index: stream_index as u64,
            });
        }
        self.state = MuxerState::Writing;

        let mut writer = Writer::new();
        writer.open_child(STREAM_BUFFER);
        writer.uint(STREAM_BUFFER_STREAM_INDEX, stream_index as u64)?;
        writer.uint(STREAM_BUFFER_START_TIME, chunk.start_time.raw())?;
        writer.uint(STREAM_BUFFER_END_TIME, chunk.end_time.raw())?;
        writer.leaf(STREAM_BUFFER_CONTENT, &chunk.data)?;
        writer.close_child()?;
        self.emit(&writer.finish()?)?;
        self.chunks_written += 1;
        Ok(())
    }

    /// Encode every stream of `view` in time-merged order, shifted by
    /// `offset`, writing the chunks accepted by `filter`.
    ///
    /// Stream `i` of `view` is written as container stream `i`. Streams are
    /// rewound before and after. Returns the number of chunks written.
    pub fn write_merged(
        &mut self,
        view: &StreamBundle,
        offset: Time,
        mut filter: impl FnMut(ChunkKind) -> bool,
    ) -> Result<u64> {
        let encoders: Vec<Option<AnyEncoder>> = (0..view.num_streams())
            .map(|i| {
                view.stream(i).map(|s| {
                    let mut encoder = AnyEncoder::new(s.read().type_id());
                    encoder.set_encode_offset(offset);
                    encoder
                })
            })
            .collect();

        view.rewind();
        let result = self.encode_merged(view, &encoders, &mut filter);
        view.rewind();
        result
    }

    fn encode_merged(
        &mut self,
        view: &StreamBundle,
        encoders: &[Option<AnyEncoder>],
        filter: &mut impl FnMut(ChunkKind) -> bool,
    ) -> Result<u64> {
        let mut written = 0;
        while let Some((index, stream)) = view.next_stream() {
            let mut stream = stream.write();
            let encoded = match encoders.get(index).and_then(Option::as_ref) {
                Some(encoder) => encoder.encode(&stream)?,
                None => None,
            };
            if let Some(chunk) = encoded {
                if filter(chunk.kind) {
                    self.write_chunk(index, &chunk.with_stream_index(index))?;
                    written += 1;
                }
            }
            stream.step();
        }
        Ok(written)
    }

    /// Write a whole bundle: its selected streams, every chunk, in
    /// time-merged order. Returns the number of chunks written.
    pub fn write_bundle(&mut self, bundle: &StreamBundle) -> Result<u64> {
        let view = selected_view(bundle);
        let types: Vec<u64> = view.stream_types().into_iter().flatten().collect();
        self.write_header(&types)?;
        self.write_merged(&view, Time::ZERO, |_| true)
    }

    /// Flush the output. No more chunks can be written.
    pub fn finalize(&mut self) -> Result<()> {
        if self.state == MuxerState::Finalized {
            return Ok(());
        }
        if self.state == MuxerState::Initial {
            return Err(EbmlError::MuxerState("header not written"));
        }
        self.writer.flush()?;
        self.state = MuxerState::Finalized;
        debug!(chunks = self.chunks_written, bytes = self.bytes_written, "Container finalized");
        Ok(())
    }

    /// Number of chunks written.
    pub fn chunks_written(&self) -> u64 {
        self.chunks_written
    }

    /// Number of bytes written.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Get the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn emit(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer.write_all(bytes)?;
        self.bytes_written += bytes.len() as u64;
        Ok(())
    }
}

impl<W: Write> std::fmt::Debug for Muxer<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Muxer")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("streams", &self.stream_count)
            .field("chunks_written", &self.chunks_written)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ebml::Node;
    use ovtrack_core::kind::{TYPE_ID_SIGNAL, TYPE_ID_STIMULATIONS};

    #[test]
    fn test_header_layout() {
        let mut muxer = Muxer::new(Vec::new(), MuxerConfig::default());
        muxer.write_header(&[TYPE_ID_SIGNAL, TYPE_ID_STIMULATIONS]).unwrap();
        let bytes = muxer.into_inner();

        let nodes = Node::parse_all(&bytes).unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].id, EBML);
        let types: Vec<u64> = nodes[1]
            .children_with(STREAM_HEADER_STREAM_TYPE)
            .map(|n| n.as_uint().unwrap())
            .collect();
        assert_eq!(types, vec![TYPE_ID_SIGNAL, TYPE_ID_STIMULATIONS]);
    }

    #[test]
    fn test_headerless() {
        let mut muxer = Muxer::new(Vec::new(), MuxerConfig::headerless());
        muxer.write_header(&[]).unwrap();
        let nodes = Node::parse_all(&muxer.into_inner()).unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].id, STREAM_HEADER);
    }

    #[test]
    fn test_state_checks() {
        let chunk = EncodedChunk::new(ChunkKind::Header, TYPE_ID_SIGNAL, Time::ZERO, Time::ZERO, Vec::new());
        let mut muxer = Muxer::new(Vec::new(), MuxerConfig::default());
        assert!(muxer.write_chunk(0, &chunk).is_err());
        assert!(muxer.finalize().is_err());

        muxer.write_header(&[TYPE_ID_SIGNAL]).unwrap();
        assert!(muxer.write_header(&[TYPE_ID_SIGNAL]).is_err());
        assert!(matches!(
            muxer.write_chunk(1, &chunk),
            Err(EbmlError::UndeclaredStream { index: 1 })
        ));
        muxer.write_chunk(0, &chunk).unwrap();
        muxer.finalize().unwrap();
        assert!(muxer.write_chunk(0, &chunk).is_err());
        assert_eq!(muxer.chunks_written(), 1);
    }

    #[test]
    fn test_selected_view_skips_unselected_and_unknown() {
        let mut bundle = StreamBundle::new();
        bundle.create_stream(0, TYPE_ID_SIGNAL).unwrap();
        bundle.create_stream(1, 0xDEAD).unwrap();
        bundle.create_stream(2, TYPE_ID_STIMULATIONS).unwrap();
        bundle.stream(2).unwrap().write().set_selected(false);

        let view = selected_view(&bundle);
        assert_eq!(view.num_streams(), 1);
        assert_eq!(view.stream_types(), vec![Some(TYPE_ID_SIGNAL)]);
        assert!(!view.is_dirty());
    }
}
