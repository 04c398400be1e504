//! `.ov` container demuxer.
//!
//! Demuxing runs in two layers. [`ContainerParser`] is a pure state machine
//! turning reader [`Event`]s into [`Action`]s: stream declarations and
//! complete chunks. [`Demuxer`] pulls bytes from a [`ByteSource`], feeds the
//! parser and applies its actions to a [`StreamBundle`] through one
//! [`AnyDecoder`] per stream.

use crate::codec::AnyDecoder;
use crate::ebml::{read_unsigned_int, EbmlHeader};
use crate::elements::*;
use crate::error::{EbmlError, Result};
use crate::reader::{Event, Reader, DEFAULT_MAX_ELEMENT_SIZE};
use crate::source::ByteSource;
use ovtrack_core::{EncodedChunk, StreamBundle, Time};
use std::collections::HashMap;
use tracing::{debug, error, info, warn};

/// Default number of bytes pulled from the source per read.
pub const DEFAULT_BLOCK_SIZE: usize = 64 * 1024;

/// Demuxer configuration.
#[derive(Debug, Clone)]
pub struct DemuxerConfig {
    /// Fail on payloads that cannot be decoded instead of skipping them.
    pub strict: bool,
    /// Bytes read from the source at a time.
    pub block_size: usize,
    /// Largest accepted leaf element.
    pub max_element_size: u64,
}

impl Default for DemuxerConfig {
    fn default() -> Self {
        Self {
            strict: true,
            block_size: DEFAULT_BLOCK_SIZE,
            max_element_size: DEFAULT_MAX_ELEMENT_SIZE,
        }
    }
}

impl DemuxerConfig {
    /// Skip undecodable payloads with a warning.
    pub fn lenient() -> Self {
        Self {
            strict: false,
            ..Default::default()
        }
    }

    /// Set the read block size.
    #[must_use]
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size.max(1);
        self
    }
}

/// A complete chunk read from a buffer node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerChunk {
    /// Stream index as declared in the header section.
    pub stream_index: u64,
    /// Start time.
    pub start_time: Time,
    /// End time.
    pub end_time: Time,
    /// Encoded payload.
    pub data: Vec<u8>,
}

/// Output of the container state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// The EBML header is complete.
    EbmlHeader(EbmlHeader),
    /// A stream header section starts; previous declarations are void.
    HeaderSection,
    /// A stream is declared.
    DeclareStream {
        /// Stream index, in declaration order.
        index: usize,
        /// Stream type identifier.
        type_id: u64,
    },
    /// A buffer node carried all of its fields.
    Chunk(ContainerChunk),
}

#[derive(Debug, Default)]
struct PendingChunk {
    stream_index: Option<u64>,
    start_time: Option<u64>,
    end_time: Option<u64>,
    data: Option<Vec<u8>>,
}

impl PendingChunk {
    fn complete(&mut self) -> Option<ContainerChunk> {
        let pending = std::mem::take(self);
        Some(ContainerChunk {
            stream_index: pending.stream_index?,
            start_time: Time::from_raw(pending.start_time?),
            end_time: Time::from_raw(pending.end_time?),
            data: pending.data?,
        })
    }
}

/// Event-driven container state machine.
#[derive(Debug, Default)]
pub struct ContainerParser {
    stack: Vec<u64>,
    ebml_header: Option<EbmlHeader>,
    seen_ebml_header: bool,
    declared: Vec<u64>,
    pending: PendingChunk,
}

impl ContainerParser {
    /// Create a parser.
    pub fn new() -> Self {
        Self::default()
    }

    /// True if `id` is a master element of the container.
    pub fn is_master_child(id: u64) -> bool {
        is_master_element(id)
    }

    /// Stream types declared by the current header section.
    pub fn declared_types(&self) -> &[u64] {
        &self.declared
    }

    /// Consume one reader event.
    pub fn handle(&mut self, event: Event) -> Result<Option<Action>> {
        match event {
            Event::Open { id, .. } => Ok(self.open_child(id)),
            Event::Data { id, data } => self.process_child_data(id, &data),
            Event::Close { id } => Ok(self.close_child(id)),
        }
    }

    fn open_child(&mut self, id: u64) -> Option<Action> {
        self.stack.push(id);
        match id {
            EBML => {
                self.ebml_header = Some(EbmlHeader::default());
                None
            }
            STREAM_HEADER => {
                if !self.seen_ebml_header {
                    info!("No EBML header, reading file in outdated format");
                    self.seen_ebml_header = true;
                }
                self.declared.clear();
                Some(Action::HeaderSection)
            }
            STREAM_BUFFER => {
                self.pending = PendingChunk::default();
                None
            }
            _ => None,
        }
    }

    fn parent(&self) -> Option<u64> {
        self.stack.iter().rev().nth(1).copied()
    }

    fn process_child_data(&mut self, id: u64, data: &[u8]) -> Result<Option<Action>> {
        if self.parent() == Some(EBML) {
            if let Some(header) = self.ebml_header.as_mut() {
                header.apply_child(id, data)?;
            }
            return Ok(None);
        }

        match id {
            STREAM_HEADER_COMPRESSION => {
                if read_unsigned_int(data)? != 0 {
                    warn!("Compressed streams are not supported, compression flag ignored");
                }
            }
            STREAM_HEADER_STREAM_TYPE => {
                let type_id = read_unsigned_int(data)?;
                let index = self.declared.len();
                self.declared.push(type_id);
                return Ok(Some(Action::DeclareStream { index, type_id }));
            }
            STREAM_BUFFER_STREAM_INDEX => self.pending.stream_index = Some(read_unsigned_int(data)?),
            STREAM_BUFFER_START_TIME => self.pending.start_time = Some(read_unsigned_int(data)?),
            STREAM_BUFFER_END_TIME => self.pending.end_time = Some(read_unsigned_int(data)?),
            STREAM_BUFFER_CONTENT => self.pending.data = Some(data.to_vec()),
            _ => debug!(id = format_args!("0x{id:X}"), "Skipping unknown element"),
        }
        Ok(None)
    }

    fn close_child(&mut self, id: u64) -> Option<Action> {
        self.stack.pop();
        match id {
            EBML => {
                self.seen_ebml_header = true;
                self.ebml_header.take().map(Action::EbmlHeader)
            }
            STREAM_BUFFER => {
                let chunk = self.pending.complete();
                if chunk.is_none() {
                    warn!("Buffer node with missing fields skipped");
                }
                chunk.map(Action::Chunk)
            }
            _ => None,
        }
    }
}

/// Reads a `.ov` container into a [`StreamBundle`], one chunk per step.
pub struct Demuxer<S: ByteSource> {
    source: Option<S>,
    reader: Reader,
    parser: ContainerParser,
    decoders: HashMap<usize, AnyDecoder>,
    config: DemuxerConfig,
    block: Vec<u8>,
    ebml_header: Option<EbmlHeader>,
    chunks: u64,
}

impl<S: ByteSource> Demuxer<S> {
    /// Create a demuxer with the default configuration.
    pub fn new(source: S) -> Self {
        Self::with_config(source, DemuxerConfig::default())
    }

    /// Create a demuxer.
    pub fn with_config(source: S, config: DemuxerConfig) -> Self {
        Self {
            source: Some(source),
            reader: Reader::new().with_max_element_size(config.max_element_size),
            parser: ContainerParser::new(),
            decoders: HashMap::new(),
            block: vec![0; config.block_size.max(1)],
            config,
            ebml_header: None,
            chunks: 0,
        }
    }

    /// The EBML header, if the file had one.
    pub fn ebml_header(&self) -> Option<&EbmlHeader> {
        self.ebml_header.as_ref()
    }

    /// Number of chunks dispatched so far.
    pub fn chunk_count(&self) -> u64 {
        self.chunks
    }

    /// True once every declared stream has received its header.
    pub fn headers_complete(&self) -> bool {
        !self.decoders.is_empty() && self.decoders.values().all(|d| d.is_error() || d.has_header())
    }

    /// Release the byte source. Later steps report end of input.
    pub fn uninitialize(&mut self) -> Option<S> {
        self.decoders.clear();
        self.source.take()
    }

    /// Read until one chunk has been dispatched into `bundle`.
    ///
    /// Returns `Ok(false)` at end of input.
    pub fn step(&mut self, bundle: &mut StreamBundle) -> Result<bool> {
        loop {
            while let Some(event) = self.next_event()? {
                let Some(action) = self.parser.handle(event)? else {
                    continue;
                };
                if self.apply(action, bundle)? {
                    return Ok(true);
                }
            }

            let Some(source) = self.source.as_mut() else {
                return Ok(false);
            };
            let n = source.read(&mut self.block);
            if n == 0 {
                if !self.reader.is_idle() {
                    warn!(offset = self.reader.offset(), "Input ends inside an element");
                }
                return Ok(false);
            }
            self.reader.feed(&self.block[..n]);
        }
    }

    /// Step until end of input. Returns the number of chunks dispatched.
    pub fn read_all(&mut self, bundle: &mut StreamBundle) -> Result<u64> {
        let before = self.chunks;
        while self.step(bundle)? {}
        Ok(self.chunks - before)
    }

    fn next_event(&mut self) -> Result<Option<Event>> {
        self.reader.next_event().map_err(|e| {
            error!(offset = self.reader.offset(), error = %e, "Malformed container");
            e
        })
    }

    /// Apply one action. Returns true when a chunk was dispatched.
    fn apply(&mut self, action: Action, bundle: &mut StreamBundle) -> Result<bool> {
        match action {
            Action::EbmlHeader(header) => {
                if !header.is_stream_file() {
                    warn!(doc_type = %header.doc_type, "Unexpected document type");
                }
                debug!(version = header.version, doc_type = %header.doc_type, "EBML header");
                self.ebml_header = Some(header);
                Ok(false)
            }
            Action::HeaderSection => {
                self.decoders.clear();
                Ok(false)
            }
            Action::DeclareStream { index, type_id } => {
                self.declare(index, type_id, bundle)?;
                Ok(false)
            }
            Action::Chunk(chunk) => {
                self.dispatch(chunk, bundle)?;
                Ok(true)
            }
        }
    }

    fn declare(&mut self, index: usize, type_id: u64, bundle: &mut StreamBundle) -> Result<()> {
        match bundle.stream(index) {
            Some(existing) => {
                let existing_type = existing.read().type_id();
                if existing_type != type_id {
                    return Err(EbmlError::StreamRedeclared {
                        index,
                        declared: type_id,
                        existing: existing_type,
                    });
                }
                debug!(stream = index, "Reusing stream for repeated declaration");
            }
            None => {
                bundle.create_stream(index, type_id)?;
                debug!(stream = index, type_id = format_args!("0x{type_id:016X}"), "Stream declared");
            }
        }
        self.decoders.insert(index, AnyDecoder::new(type_id));
        Ok(())
    }

    fn dispatch(&mut self, chunk: ContainerChunk, bundle: &mut StreamBundle) -> Result<()> {
        let undeclared = EbmlError::UndeclaredStream {
            index: chunk.stream_index,
        };
        let Ok(slot) = usize::try_from(chunk.stream_index) else {
            return Err(undeclared);
        };
        let (Some(decoder), Some(stream)) = (self.decoders.get_mut(&slot), bundle.stream(slot)) else {
            error!(stream = chunk.stream_index, "Chunk for undeclared stream");
            return Err(undeclared);
        };

        self.chunks += 1;
        if decoder.is_error() {
            debug!(stream = slot, "Skipping chunk of unknown stream type");
            return Ok(());
        }

        let mut stream = stream.write();
        let decoded = decoder.infer_kind(&chunk.data).and_then(|kind| {
            let encoded = EncodedChunk::new(kind, stream.type_id(), chunk.start_time, chunk.end_time, chunk.data)
                .with_stream_index(slot);
            decoder.decode_into(&encoded, &mut stream)
        });

        match decoded {
            Ok(_) => Ok(()),
            Err(e) if self.config.strict => {
                error!(stream = slot, error = %e, "Chunk could not be decoded");
                Err(e)
            }
            Err(e) => {
                warn!(stream = slot, error = %e, "Undecodable chunk skipped");
                Ok(())
            }
        }
    }
}

impl<S: ByteSource> std::fmt::Debug for Demuxer<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Demuxer")
            .field("streams", &self.decoders.len())
            .field("chunks", &self.chunks)
            .field("offset", &self.reader.offset())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SliceSource;
    use crate::writer::Writer;
    use ovtrack_core::kind::{TYPE_ID_SIGNAL, TYPE_ID_STIMULATIONS};

    fn header_section(writer: &mut Writer, types: &[u64]) {
        writer.open_child(STREAM_HEADER);
        writer.uint(STREAM_HEADER_COMPRESSION, 0).unwrap();
        for &type_id in types {
            writer.uint(STREAM_HEADER_STREAM_TYPE, type_id).unwrap();
        }
        writer.close_child().unwrap();
    }

    fn buffer_node(writer: &mut Writer, index: Option<u64>, start: u64, end: u64, content: Option<&[u8]>) {
        writer.open_child(STREAM_BUFFER);
        if let Some(index) = index {
            writer.uint(STREAM_BUFFER_STREAM_INDEX, index).unwrap();
        }
        writer.uint(STREAM_BUFFER_START_TIME, start).unwrap();
        writer.uint(STREAM_BUFFER_END_TIME, end).unwrap();
        if let Some(content) = content {
            writer.leaf(STREAM_BUFFER_CONTENT, content).unwrap();
        }
        writer.close_child().unwrap();
    }

    fn actions(bytes: &[u8]) -> Vec<Action> {
        let mut reader = Reader::new();
        reader.feed(bytes);
        let mut parser = ContainerParser::new();
        let mut out = Vec::new();
        while let Some(event) = reader.next_event().unwrap() {
            if let Some(action) = parser.handle(event).unwrap() {
                out.push(action);
            }
        }
        out
    }

    #[test]
    fn test_parser_actions() {
        let mut writer = Writer::new();
        header_section(&mut writer, &[TYPE_ID_SIGNAL, TYPE_ID_STIMULATIONS]);
        buffer_node(&mut writer, Some(1), 0, 10, Some(&[]));
        let bytes = writer.finish().unwrap();

        assert_eq!(
            actions(&bytes),
            vec![
                Action::HeaderSection,
                Action::DeclareStream {
                    index: 0,
                    type_id: TYPE_ID_SIGNAL
                },
                Action::DeclareStream {
                    index: 1,
                    type_id: TYPE_ID_STIMULATIONS
                },
                Action::Chunk(ContainerChunk {
                    stream_index: 1,
                    start_time: Time::from_raw(0),
                    end_time: Time::from_raw(10),
                    data: Vec::new(),
                }),
            ]
        );
    }

    #[test]
    fn test_incomplete_buffer_is_not_dispatched() {
        let mut writer = Writer::new();
        header_section(&mut writer, &[TYPE_ID_STIMULATIONS]);
        buffer_node(&mut writer, Some(0), 0, 0, None);
        buffer_node(&mut writer, Some(0), 5, 5, Some(&[]));
        let bytes = writer.finish().unwrap();

        let chunks: Vec<_> = actions(&bytes)
            .into_iter()
            .filter_map(|a| match a {
                Action::Chunk(c) => Some(c),
                _ => None,
            })
            .collect();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].start_time, Time::from_raw(5));
    }

    #[test]
    fn test_ebml_header_is_parsed() {
        let mut bytes = EbmlHeader::default().to_bytes().unwrap();
        let mut writer = Writer::new();
        header_section(&mut writer, &[TYPE_ID_STIMULATIONS]);
        bytes.extend(writer.finish().unwrap());

        let parsed = actions(&bytes);
        assert_eq!(parsed[0], Action::EbmlHeader(EbmlHeader::default()));
    }

    #[test]
    fn test_undeclared_stream_is_fatal() {
        let mut writer = Writer::new();
        header_section(&mut writer, &[TYPE_ID_STIMULATIONS]);
        buffer_node(&mut writer, Some(4), 0, 0, Some(&[]));
        let bytes = writer.finish().unwrap();

        let mut bundle = StreamBundle::new();
        let mut demuxer = Demuxer::new(SliceSource::new(&bytes));
        assert!(matches!(
            demuxer.step(&mut bundle),
            Err(EbmlError::UndeclaredStream { index: 4 })
        ));
    }

    #[test]
    fn test_unknown_type_is_skipped() {
        let mut writer = Writer::new();
        header_section(&mut writer, &[0xDEAD_BEEF, TYPE_ID_STIMULATIONS]);
        buffer_node(&mut writer, Some(0), 0, 0, Some(&[1, 2, 3]));
        buffer_node(&mut writer, Some(1), 0, 0, Some(&[]));
        let bytes = writer.finish().unwrap();

        let mut bundle = StreamBundle::new();
        let mut demuxer = Demuxer::new(SliceSource::new(&bytes));
        assert_eq!(demuxer.read_all(&mut bundle).unwrap(), 2);
        assert!(bundle.stream(0).unwrap().read().is_error());
        assert!(demuxer.headers_complete());
    }

    #[test]
    fn test_repeated_header_reuses_streams() {
        let mut writer = Writer::new();
        header_section(&mut writer, &[TYPE_ID_STIMULATIONS]);
        header_section(&mut writer, &[TYPE_ID_STIMULATIONS]);
        let bytes = writer.finish().unwrap();

        let mut bundle = StreamBundle::new();
        let mut demuxer = Demuxer::new(SliceSource::new(&bytes));
        assert!(!demuxer.step(&mut bundle).unwrap());
        assert_eq!(bundle.num_streams(), 1);
    }

    #[test]
    fn test_conflicting_redeclaration() {
        let mut writer = Writer::new();
        header_section(&mut writer, &[TYPE_ID_STIMULATIONS]);
        header_section(&mut writer, &[TYPE_ID_SIGNAL]);
        let bytes = writer.finish().unwrap();

        let mut bundle = StreamBundle::new();
        let mut demuxer = Demuxer::new(SliceSource::new(&bytes));
        assert!(matches!(
            demuxer.step(&mut bundle),
            Err(EbmlError::StreamRedeclared { index: 0, .. })
        ));
    }

    #[test]
    fn test_uninitialize_ends_input() {
        let mut writer = Writer::new();
        header_section(&mut writer, &[TYPE_ID_STIMULATIONS]);
        buffer_node(&mut writer, Some(0), 0, 0, Some(&[]));
        let bytes = writer.finish().unwrap();

        let mut bundle = StreamBundle::new();
        let mut demuxer = Demuxer::with_config(SliceSource::new(&bytes), DemuxerConfig::default().with_block_size(4));
        assert!(demuxer.uninitialize().is_some());
        assert!(!demuxer.step(&mut bundle).unwrap());
        assert_eq!(bundle.num_streams(), 0);
    }
}
