//! Typed chunk codecs.
//!
//! An [`Encoder`] turns the chunk under a stream's cursor into an
//! [`EncodedChunk`]; a [`Decoder`] does the reverse for one stream type.
//! [`AnyEncoder`] and [`AnyDecoder`] close over every known stream type so
//! a container with streams of different types can be handled uniformly.
//!
//! Payloads are small EBML trees:
//!
//! ```text
//! Header: PayloadHeader { StreamType, StreamVersion, <type section>... }
//! Buffer: PayloadBuffer { <type section>... }
//! End:    PayloadEnd {}
//! ```

mod experiment;
mod matrix;
mod stimulation;

pub use matrix::MAX_MATRIX_ELEMENTS;

use crate::ebml::{decode_vint, Node};
use crate::elements::*;
use crate::error::{EbmlError, Result};
use crate::writer::Writer;
use ovtrack_core::error::CodecError;
use ovtrack_core::{
    AnyStream, ChannelLocalisation, ChannelUnits, Chunk, ChunkKind, CurrentChunk, EncodedChunk, EndChunk,
    ExperimentInfo, FeatureVector, Signal, Spectrum, Stimulations, Stream, StreamKind, StreamType, StreamedMatrix,
    Time,
};
use std::marker::PhantomData;

/// Payload serialization of one stream type.
pub trait PayloadCodec: StreamType {
    /// Header and End chunks are written without any bytes.
    const EMPTY_MARKERS: bool = false;

    /// Write the type-specific sections of a header payload.
    fn write_header(header: &Self::Header, writer: &mut Writer) -> Result<()>;

    /// Write the type-specific sections of a buffer payload.
    ///
    /// `offset` is the encode offset, for payloads carrying absolute dates.
    fn write_buffer(buffer: &Self::Buffer, offset: Time, writer: &mut Writer) -> Result<()>;

    /// Read a header from its payload root.
    fn read_header(root: &Node) -> Result<Self::Header>;

    /// Read a buffer from its payload root, using the header for its layout.
    fn read_buffer(root: &Node, header: &Self::Header) -> Result<Self::Buffer>;
}

/// Infer the kind of a payload from its root element.
///
/// Returns `None` for empty or unrecognized payloads.
pub fn classify_payload(data: &[u8]) -> Option<ChunkKind> {
    let (id, _) = decode_vint(data).ok().flatten()?;
    match id {
        PAYLOAD_HEADER => Some(ChunkKind::Header),
        PAYLOAD_BUFFER => Some(ChunkKind::Buffer),
        PAYLOAD_END => Some(ChunkKind::End),
        _ => None,
    }
}

fn payload_root(data: &[u8], expected: u64) -> Result<Node> {
    let mut nodes = Node::parse_all(data)?;
    if nodes.len() != 1 || nodes[0].id != expected {
        return Err(EbmlError::InvalidPayload(format!(
            "expected a single 0x{:X} root, found {} elements",
            expected,
            nodes.len()
        )));
    }
    Ok(nodes.remove(0))
}

// ============================================================================
// Encoder
// ============================================================================

/// Encodes the chunk under a stream's cursor.
#[derive(Debug, Clone, Copy)]
pub struct Encoder<T: PayloadCodec> {
    offset: Time,
    _marker: PhantomData<T>,
}

impl<T: PayloadCodec> Default for Encoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: PayloadCodec> Encoder<T> {
    /// Create an encoder without offset.
    pub fn new() -> Self {
        Self {
            offset: Time::ZERO,
            _marker: PhantomData,
        }
    }

    /// Shift every timestamp encoded from now on by `offset`.
    pub fn set_encode_offset(&mut self, offset: Time) {
        self.offset = offset;
    }

    /// The current encode offset.
    pub fn encode_offset(&self) -> Time {
        self.offset
    }

    /// Encode the chunk under the cursor of `stream`.
    ///
    /// The cursor is not moved. Returns `Ok(None)` once the stream is past
    /// its end marker. An end marker that was never set is placed at the
    /// stream duration.
    pub fn encode(&self, stream: &Stream<T>) -> Result<Option<EncodedChunk>> {
        let Some(current) = stream.current() else {
            return Ok(None);
        };

        let (kind, start, end, data) = match current {
            CurrentChunk::Header(header) => (
                ChunkKind::Header,
                header.start_time,
                header.end_time,
                self.header_bytes(&header.payload)?,
            ),
            CurrentChunk::Buffer(_, buffer) => (
                ChunkKind::Buffer,
                buffer.start_time,
                buffer.end_time,
                self.buffer_bytes(&buffer.payload)?,
            ),
            CurrentChunk::End(marker) => {
                let (start, end) = if marker.is_set() {
                    (marker.start_time, marker.end_time)
                } else {
                    let duration = stream.duration();
                    (duration, duration)
                };
                (ChunkKind::End, start, end, self.end_bytes()?)
            }
        };

        Ok(Some(EncodedChunk::new(
            kind,
            T::KIND.type_id(),
            start + self.offset,
            end + self.offset,
            data,
        )))
    }

    /// Encode from a type-erased stream holding a `Stream<T>`.
    pub fn encode_any(&self, stream: &AnyStream) -> Result<Option<EncodedChunk>> {
        let typed = T::from_any(stream).ok_or(CodecError::TypeMismatch {
            expected: T::KIND.type_id(),
            found: stream.type_id(),
        })?;
        self.encode(typed)
    }

    fn header_bytes(&self, header: &T::Header) -> Result<Vec<u8>> {
        if T::EMPTY_MARKERS {
            return Ok(Vec::new());
        }
        let mut writer = Writer::new();
        writer.open_child(PAYLOAD_HEADER);
        writer.uint(PAYLOAD_HEADER_STREAM_TYPE, 0)?;
        writer.uint(PAYLOAD_HEADER_STREAM_VERSION, 0)?;
        T::write_header(header, &mut writer)?;
        writer.close_child()?;
        writer.finish()
    }

    fn buffer_bytes(&self, buffer: &T::Buffer) -> Result<Vec<u8>> {
        let mut writer = Writer::new();
        writer.open_child(PAYLOAD_BUFFER);
        T::write_buffer(buffer, self.offset, &mut writer)?;
        writer.close_child()?;
        writer.finish()
    }

    fn end_bytes(&self) -> Result<Vec<u8>> {
        if T::EMPTY_MARKERS {
            return Ok(Vec::new());
        }
        let mut writer = Writer::new();
        writer.open_child(PAYLOAD_END);
        writer.close_child()?;
        writer.finish()
    }
}

// ============================================================================
// Decoder
// ============================================================================

/// A decoded typed chunk.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded<T: StreamType> {
    /// Stream header.
    Header(Chunk<T::Header>),
    /// One buffer.
    Buffer(Chunk<T::Buffer>),
    /// End marker.
    End(EndChunk),
}

impl<T: StreamType> Decoded<T> {
    /// The kind of the decoded chunk.
    pub fn kind(&self) -> ChunkKind {
        match self {
            Decoded::Header(_) => ChunkKind::Header,
            Decoded::Buffer(_) => ChunkKind::Buffer,
            Decoded::End(_) => ChunkKind::End,
        }
    }
}

/// Decodes encoded chunks of one stream type.
///
/// The last decoded header is kept, since buffers are laid out according
/// to it.
#[derive(Debug, Clone)]
pub struct Decoder<T: PayloadCodec> {
    layout: Option<T::Header>,
    last: Option<Decoded<T>>,
}

impl<T: PayloadCodec> Default for Decoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: PayloadCodec> Decoder<T> {
    /// Create a decoder that has not seen a header yet.
    pub fn new() -> Self {
        Self {
            layout: None,
            last: None,
        }
    }

    /// Decode one chunk.
    ///
    /// On success exactly one of the `is_*_received` queries reports true
    /// until the next call. On failure none does.
    pub fn decode(&mut self, chunk: &EncodedChunk) -> Result<ChunkKind> {
        self.last = None;
        if chunk.stream_type != T::KIND.type_id() {
            return Err(CodecError::TypeMismatch {
                expected: T::KIND.type_id(),
                found: chunk.stream_type,
            }
            .into());
        }

        let decoded = match chunk.kind {
            ChunkKind::Header => {
                let header = if chunk.is_empty() {
                    T::Header::default()
                } else {
                    T::read_header(&payload_root(&chunk.data, PAYLOAD_HEADER)?)?
                };
                self.layout = Some(header.clone());
                Decoded::Header(Chunk::new(chunk.start_time, chunk.end_time, header))
            }
            ChunkKind::Buffer => {
                let layout = self.layout.as_ref().ok_or(CodecError::MissingHeader)?;
                if chunk.is_empty() {
                    return Err(CodecError::MalformedPayload("empty buffer payload".to_string()).into());
                }
                let buffer = T::read_buffer(&payload_root(&chunk.data, PAYLOAD_BUFFER)?, layout)?;
                Decoded::Buffer(Chunk::new(chunk.start_time, chunk.end_time, buffer))
            }
            ChunkKind::End => {
                if !chunk.is_empty() {
                    payload_root(&chunk.data, PAYLOAD_END)?;
                }
                Decoded::End(Chunk::new(chunk.start_time, chunk.end_time, ()))
            }
        };

        let kind = decoded.kind();
        self.last = Some(decoded);
        Ok(kind)
    }

    /// Decode one chunk and attach it to `stream`.
    pub fn decode_into(&mut self, chunk: &EncodedChunk, stream: &mut Stream<T>) -> Result<ChunkKind> {
        let kind = self.decode(chunk)?;
        match self.take() {
            Some(Decoded::Header(header)) => stream.set_header(header),
            Some(Decoded::Buffer(buffer)) => stream.push(buffer)?,
            Some(Decoded::End(end)) => stream.set_end(end),
            None => {}
        }
        Ok(kind)
    }

    /// Decode into a type-erased stream holding a `Stream<T>`.
    pub fn decode_into_any(&mut self, chunk: &EncodedChunk, stream: &mut AnyStream) -> Result<ChunkKind> {
        let found = stream.type_id();
        let typed = T::from_any_mut(stream).ok_or(CodecError::TypeMismatch {
            expected: T::KIND.type_id(),
            found,
        })?;
        self.decode_into(chunk, typed)
    }

    /// True once a header has been decoded.
    pub fn has_header(&self) -> bool {
        self.layout.is_some()
    }

    /// The last call decoded a header.
    pub fn is_header_received(&self) -> bool {
        matches!(self.last, Some(Decoded::Header(_)))
    }

    /// The last call decoded a buffer.
    pub fn is_buffer_received(&self) -> bool {
        matches!(self.last, Some(Decoded::Buffer(_)))
    }

    /// The last call decoded an end marker.
    pub fn is_end_received(&self) -> bool {
        matches!(self.last, Some(Decoded::End(_)))
    }

    /// The header decoded by the last call.
    pub fn header(&self) -> Option<&Chunk<T::Header>> {
        match &self.last {
            Some(Decoded::Header(header)) => Some(header),
            _ => None,
        }
    }

    /// The buffer decoded by the last call.
    pub fn buffer(&self) -> Option<&Chunk<T::Buffer>> {
        match &self.last {
            Some(Decoded::Buffer(buffer)) => Some(buffer),
            _ => None,
        }
    }

    /// The end marker decoded by the last call.
    pub fn end(&self) -> Option<&EndChunk> {
        match &self.last {
            Some(Decoded::End(end)) => Some(end),
            _ => None,
        }
    }

    /// Take the chunk decoded by the last call.
    pub fn take(&mut self) -> Option<Decoded<T>> {
        self.last.take()
    }
}

// ============================================================================
// Type-erased codecs
// ============================================================================

macro_rules! with_codec {
    ($value:expr, $ty:ident, $c:ident => $body:expr, $e:ident => $error:expr) => {
        match $value {
            $ty::StreamedMatrix($c) => $body,
            $ty::Signal($c) => $body,
            $ty::Stimulations($c) => $body,
            $ty::Spectrum($c) => $body,
            $ty::FeatureVector($c) => $body,
            $ty::ChannelLocalisation($c) => $body,
            $ty::ChannelUnits($c) => $body,
            $ty::ExperimentInfo($c) => $body,
            $ty::Error($e) => $error,
        }
    };
}

macro_rules! any_codec {
    ($(#[$meta:meta])* $name:ident, $codec:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub enum $name {
            /// Streamed matrix codec.
            StreamedMatrix($codec<StreamedMatrix>),
            /// Signal codec.
            Signal($codec<Signal>),
            /// Stimulation codec.
            Stimulations($codec<Stimulations>),
            /// Spectrum codec.
            Spectrum($codec<Spectrum>),
            /// Feature vector codec.
            FeatureVector($codec<FeatureVector>),
            /// Channel localisation codec.
            ChannelLocalisation($codec<ChannelLocalisation>),
            /// Channel units codec.
            ChannelUnits($codec<ChannelUnits>),
            /// Experiment information codec.
            ExperimentInfo($codec<ExperimentInfo>),
            /// Placeholder for an unknown type identifier. Always fails.
            Error(u64),
        }

        impl $name {
            /// Create the codec for a type identifier.
            pub fn new(type_id: u64) -> Self {
                match StreamKind::from_type_id(type_id) {
                    Some(StreamKind::StreamedMatrix) => $name::StreamedMatrix($codec::new()),
                    Some(StreamKind::Signal) => $name::Signal($codec::new()),
                    Some(StreamKind::Stimulations) => $name::Stimulations($codec::new()),
                    Some(StreamKind::Spectrum) => $name::Spectrum($codec::new()),
                    Some(StreamKind::FeatureVector) => $name::FeatureVector($codec::new()),
                    Some(StreamKind::ChannelLocalisation) => $name::ChannelLocalisation($codec::new()),
                    Some(StreamKind::ChannelUnits) => $name::ChannelUnits($codec::new()),
                    Some(StreamKind::ExperimentInfo) => $name::ExperimentInfo($codec::new()),
                    None => $name::Error(type_id),
                }
            }

            /// True for the unknown-type placeholder.
            pub fn is_error(&self) -> bool {
                matches!(self, $name::Error(_))
            }
        }
    };
}

any_codec!(
    /// Encoder for any stream type.
    AnyEncoder,
    Encoder
);
any_codec!(
    /// Decoder for any stream type.
    AnyDecoder,
    Decoder
);

impl AnyEncoder {
    /// Shift every timestamp encoded from now on by `offset`.
    pub fn set_encode_offset(&mut self, offset: Time) {
        with_codec!(self, AnyEncoder, c => c.set_encode_offset(offset), _e => {})
    }

    /// Encode the chunk under the cursor of `stream`.
    pub fn encode(&self, stream: &AnyStream) -> Result<Option<EncodedChunk>> {
        with_codec!(self, AnyEncoder, c => c.encode_any(stream), e => {
            Err(CodecError::UnknownStreamType { type_id: *e }.into())
        })
    }
}

impl AnyDecoder {
    /// Decode one chunk and attach it to `stream`.
    pub fn decode_into(&mut self, chunk: &EncodedChunk, stream: &mut AnyStream) -> Result<ChunkKind> {
        with_codec!(self, AnyDecoder, c => c.decode_into_any(chunk, stream), e => {
            Err(CodecError::UnknownStreamType { type_id: *e }.into())
        })
    }

    /// True once a header has been decoded.
    pub fn has_header(&self) -> bool {
        with_codec!(self, AnyDecoder, c => c.has_header(), _e => false)
    }

    /// Kind of a chunk read from a container.
    ///
    /// Container framing does not tag chunks, so the kind comes from the
    /// payload root. An empty payload is a header until a header has been
    /// seen, an end marker afterwards.
    pub fn infer_kind(&self, data: &[u8]) -> Result<ChunkKind> {
        if data.is_empty() {
            return Ok(if self.has_header() {
                ChunkKind::End
            } else {
                ChunkKind::Header
            });
        }
        classify_payload(data).ok_or_else(|| EbmlError::InvalidPayload("unrecognized payload root".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ovtrack_core::{Matrix, MatrixBuffer, SignalHeader, Stimulation, StimulationBuffer};

    fn signal_stream() -> Stream<Signal> {
        let mut stream = Stream::with_header(SignalHeader {
            matrix: Matrix::with_shape(2, 4).with_labels(0, ["Cz", "Pz"]),
            sampling_rate: 256,
        });
        for i in 0..3u32 {
            let values = (0..8).map(|v| f64::from(v + i * 8)).collect();
            let matrix = Matrix::from_values(&[2, 4], values).unwrap();
            stream
                .push(Chunk::new(
                    Time::from_millis(u64::from(i) * 100),
                    Time::from_millis(u64::from(i + 1) * 100),
                    MatrixBuffer::new(matrix),
                ))
                .unwrap();
        }
        stream
    }

    fn encode_all<T: PayloadCodec>(encoder: &Encoder<T>, stream: &mut Stream<T>) -> Vec<EncodedChunk> {
        let mut chunks = Vec::new();
        while let Some(chunk) = encoder.encode(stream).unwrap() {
            chunks.push(chunk);
            stream.step();
        }
        chunks
    }

    #[test]
    fn test_encode_does_not_advance() {
        let stream = signal_stream();
        let encoder = Encoder::<Signal>::new();
        let first = encoder.encode(&stream).unwrap().unwrap();
        let again = encoder.encode(&stream).unwrap().unwrap();
        assert_eq!(first, again);
        assert_eq!(first.kind, ChunkKind::Header);
    }

    #[test]
    fn test_signal_roundtrip() {
        let mut source = signal_stream();
        let chunks = encode_all(&Encoder::new(), &mut source);
        assert_eq!(chunks.len(), 5);

        let mut decoder = Decoder::<Signal>::new();
        let mut target = Stream::<Signal>::new();
        for chunk in &chunks {
            decoder.decode_into(chunk, &mut target).unwrap();
        }
        assert_eq!(target.header().payload, source.header().payload);
        assert_eq!(target.buffers(), source.buffers());
        assert_eq!(target.end().start_time, Time::from_millis(300));
    }

    #[test]
    fn test_synthesized_end() {
        let mut stream = signal_stream();
        while stream.cursor() != ovtrack_core::Cursor::End {
            stream.step();
        }
        let end = Encoder::<Signal>::new().encode(&stream).unwrap().unwrap();
        assert_eq!(end.kind, ChunkKind::End);
        assert_eq!((end.start_time, end.end_time), (Time::from_millis(300), Time::from_millis(300)));

        let mut empty = Stream::<Signal>::new();
        empty.step();
        let end = Encoder::<Signal>::new().encode(&empty).unwrap().unwrap();
        assert_eq!(end.start_time, Time::MIN);
    }

    #[test]
    fn test_offset_applies_to_every_kind() {
        let mut stream = signal_stream();
        let mut encoder = Encoder::<Signal>::new();
        encoder.set_encode_offset(Time::from_secs(5));
        let chunks = encode_all(&encoder, &mut stream);
        assert_eq!(chunks[0].start_time, Time::from_secs(5));
        assert_eq!(chunks[1].start_time, Time::from_secs(5));
        assert_eq!(chunks[3].end_time, Time::from_millis(5300));
        assert_eq!(chunks[4].start_time, Time::from_millis(5300));
    }

    #[test]
    fn test_decoder_flags_are_exclusive() {
        let mut stream = signal_stream();
        let chunks = encode_all(&Encoder::new(), &mut stream);
        let mut decoder = Decoder::<Signal>::new();

        decoder.decode(&chunks[0]).unwrap();
        assert!(decoder.is_header_received() && !decoder.is_buffer_received() && !decoder.is_end_received());
        decoder.decode(&chunks[1]).unwrap();
        assert!(!decoder.is_header_received() && decoder.is_buffer_received() && !decoder.is_end_received());
        assert_eq!(decoder.buffer().map(|b| b.payload.matrix.values()[7]), Some(7.0));
        decoder.decode(&chunks[4]).unwrap();
        assert!(decoder.is_end_received());
        assert!(decoder.end().is_some());
    }

    #[test]
    fn test_buffer_before_header() {
        let mut stream = signal_stream();
        let chunks = encode_all(&Encoder::new(), &mut stream);
        let mut decoder = Decoder::<Signal>::new();
        let err = decoder.decode(&chunks[1]).unwrap_err();
        assert!(matches!(err, EbmlError::Core(ovtrack_core::Error::Codec(CodecError::MissingHeader))));
        assert!(!decoder.is_buffer_received());
    }

    #[test]
    fn test_type_mismatch() {
        let mut stream = signal_stream();
        let chunks = encode_all(&Encoder::new(), &mut stream);
        let mut decoder = Decoder::<StreamedMatrix>::new();
        assert!(decoder.decode(&chunks[0]).is_err());
    }

    #[test]
    fn test_stimulation_markers_are_empty() {
        let mut stream = Stream::<Stimulations>::new();
        stream
            .push(Chunk::new(
                Time::ZERO,
                Time::from_secs(1),
                StimulationBuffer {
                    stimulations: [Stimulation::new(0x8001, Time::from_millis(500), Time::ZERO)]
                        .into_iter()
                        .collect(),
                },
            ))
            .unwrap();
        let chunks = encode_all(&Encoder::new(), &mut stream);
        assert_eq!(chunks.len(), 3);
        assert!(chunks[0].is_empty());
        assert!(!chunks[1].is_empty());
        assert!(chunks[2].is_empty());

        let decoder = AnyDecoder::new(Stimulations::KIND.type_id());
        assert_eq!(decoder.infer_kind(&chunks[0].data).unwrap(), ChunkKind::Header);
    }

    #[test]
    fn test_classify_payload() {
        let mut stream = signal_stream();
        let chunks = encode_all(&Encoder::new(), &mut stream);
        assert_eq!(classify_payload(&chunks[0].data), Some(ChunkKind::Header));
        assert_eq!(classify_payload(&chunks[2].data), Some(ChunkKind::Buffer));
        assert_eq!(classify_payload(&chunks[4].data), Some(ChunkKind::End));
        assert_eq!(classify_payload(&[]), None);
    }

    #[test]
    fn test_any_codecs_cover_every_kind() {
        for kind in StreamKind::ALL {
            let encoder = AnyEncoder::new(kind.type_id());
            assert!(!encoder.is_error());
            let mut stream = AnyStream::for_kind(kind);
            let mut decoder = AnyDecoder::new(kind.type_id());
            let mut target = AnyStream::for_kind(kind);
            while let Some(chunk) = encoder.encode(&stream).unwrap() {
                let inferred = decoder.infer_kind(&chunk.data).unwrap();
                assert_eq!(inferred, chunk.kind);
                decoder.decode_into(&chunk, &mut target).unwrap();
                stream.step();
            }
            assert!(decoder.has_header());
        }
    }

    #[test]
    fn test_unknown_type_always_fails() {
        let encoder = AnyEncoder::new(0xDEAD);
        assert!(encoder.is_error());
        let stream = AnyStream::new(0xDEAD);
        assert!(encoder.encode(&stream).is_err());

        let mut decoder = AnyDecoder::new(0xDEAD);
        let mut target = AnyStream::new(0xDEAD);
        let chunk = EncodedChunk::new(ChunkKind::Header, 0xDEAD, Time::ZERO, Time::ZERO, Vec::new());
        assert!(decoder.decode_into(&chunk, &mut target).is_err());
    }
}
