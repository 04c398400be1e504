//! Type-erased streams.
//!
//! [`AnyStream`] is the closed sum of every typed stream plus an error
//! placeholder for type identifiers without a codec. Bundles hold streams as
//! shared [`StreamPtr`] handles.

use crate::error::{Result, StreamError};
use crate::kind::{self, StreamKind};
use crate::stream::{Cursor, Stream};
use crate::time::Time;
use crate::types::{
    ChannelLocalisation, ChannelUnits, ExperimentInfo, FeatureVector, Signal, Spectrum, Stimulations,
    StreamType, StreamedMatrix,
};
use parking_lot::RwLock;
use std::sync::Arc;

/// Shared, lockable handle to a stream.
pub type StreamPtr = Arc<RwLock<AnyStream>>;

/// Placeholder for a declared stream whose type has no codec.
///
/// It holds no chunks and is always exhausted, so playback and muxing pass
/// over it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorStream {
    type_id: u64,
    selected: bool,
}

impl ErrorStream {
    /// Create a placeholder for `type_id`.
    pub fn new(type_id: u64) -> Self {
        Self {
            type_id,
            selected: false,
        }
    }

    /// The unrecognised type identifier.
    pub fn type_id(&self) -> u64 {
        self.type_id
    }
}

/// A stream of any type.
#[derive(Debug, Clone)]
pub enum AnyStream {
    /// Generic matrix stream.
    StreamedMatrix(Stream<StreamedMatrix>),
    /// Signal stream.
    Signal(Stream<Signal>),
    /// Stimulation stream.
    Stimulations(Stream<Stimulations>),
    /// Spectrum stream.
    Spectrum(Stream<Spectrum>),
    /// Feature vector stream.
    FeatureVector(Stream<FeatureVector>),
    /// Channel localisation stream.
    ChannelLocalisation(Stream<ChannelLocalisation>),
    /// Channel units stream.
    ChannelUnits(Stream<ChannelUnits>),
    /// Experiment information stream.
    ExperimentInfo(Stream<ExperimentInfo>),
    /// Declared stream of an unknown type.
    Error(ErrorStream),
}

/// Run `$body` on the typed stream inside `$any`, or evaluate `$error` for
/// the placeholder.
macro_rules! with_stream {
    ($any:expr, $s:ident => $body:expr, $e:ident => $error:expr) => {
        match $any {
            AnyStream::StreamedMatrix($s) => $body,
            AnyStream::Signal($s) => $body,
            AnyStream::Stimulations($s) => $body,
            AnyStream::Spectrum($s) => $body,
            AnyStream::FeatureVector($s) => $body,
            AnyStream::ChannelLocalisation($s) => $body,
            AnyStream::ChannelUnits($s) => $body,
            AnyStream::ExperimentInfo($s) => $body,
            AnyStream::Error($e) => $error,
        }
    };
}

impl AnyStream {
    /// Create an empty stream for a type identifier.
    ///
    /// Unknown identifiers yield an [`AnyStream::Error`] placeholder.
    pub fn new(type_id: u64) -> Self {
        match StreamKind::from_type_id(type_id) {
            Some(kind) => Self::for_kind(kind),
            None => AnyStream::Error(ErrorStream::new(type_id)),
        }
    }

    /// Create an empty stream of a known kind.
    pub fn for_kind(kind: StreamKind) -> Self {
        match kind {
            StreamKind::StreamedMatrix => AnyStream::StreamedMatrix(Stream::new()),
            StreamKind::Signal => AnyStream::Signal(Stream::new()),
            StreamKind::Stimulations => AnyStream::Stimulations(Stream::new()),
            StreamKind::Spectrum => AnyStream::Spectrum(Stream::new()),
            StreamKind::FeatureVector => AnyStream::FeatureVector(Stream::new()),
            StreamKind::ChannelLocalisation => AnyStream::ChannelLocalisation(Stream::new()),
            StreamKind::ChannelUnits => AnyStream::ChannelUnits(Stream::new()),
            StreamKind::ExperimentInfo => AnyStream::ExperimentInfo(Stream::new()),
        }
    }

    /// Wrap this stream into a shared handle.
    pub fn into_ptr(self) -> StreamPtr {
        Arc::new(RwLock::new(self))
    }

    /// The stream kind, `None` for the error placeholder.
    pub fn kind(&self) -> Option<StreamKind> {
        with_stream!(self, _s => Some(stream_kind(_s)), _e => None)
    }

    /// The type identifier, including unknown ones.
    pub fn type_id(&self) -> u64 {
        match self {
            AnyStream::Error(e) => e.type_id(),
            other => other.kind().map_or(0, StreamKind::type_id),
        }
    }

    /// Display name of the stream type.
    pub fn type_name(&self) -> String {
        kind::type_name(self.type_id())
    }

    /// True for the unknown-type placeholder.
    pub fn is_error(&self) -> bool {
        matches!(self, AnyStream::Error(_))
    }

    /// Borrow as a typed stream.
    pub fn downcast_ref<T: StreamType>(&self) -> Option<&Stream<T>> {
        T::from_any(self)
    }

    /// Mutably borrow as a typed stream.
    pub fn downcast_mut<T: StreamType>(&mut self) -> Option<&mut Stream<T>> {
        T::from_any_mut(self)
    }

    /// Number of buffers.
    pub fn len(&self) -> usize {
        with_stream!(self, s => s.len(), _e => 0)
    }

    /// True if the stream holds no buffers.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Advance the cursor; false once exhausted.
    pub fn step(&mut self) -> bool {
        with_stream!(self, s => s.step(), _e => false)
    }

    /// Rewind the cursor before the header.
    pub fn reset(&mut self) {
        with_stream!(self, s => s.reset(), _e => ())
    }

    /// Current cursor.
    pub fn cursor(&self) -> Cursor {
        with_stream!(self, s => s.cursor(), _e => Cursor::Exhausted)
    }

    /// Time interval under the cursor.
    pub fn peek(&self) -> Option<(Time, Time)> {
        with_stream!(self, s => s.peek(), _e => None)
    }

    /// True once the cursor is past the end marker.
    pub fn is_exhausted(&self) -> bool {
        self.peek().is_none()
    }

    /// End of the last buffer.
    pub fn duration(&self) -> Time {
        with_stream!(self, s => s.duration(), _e => Time::MIN)
    }

    /// Start of the first buffer.
    pub fn start_time(&self) -> Time {
        with_stream!(self, s => s.start_time(), _e => Time::MIN)
    }

    /// True if some buffers overlap.
    pub fn overlapping(&self) -> bool {
        with_stream!(self, s => s.overlapping(), _e => false)
    }

    /// True if there are gaps between buffers.
    pub fn noncontinuous(&self) -> bool {
        with_stream!(self, s => s.noncontinuous(), _e => false)
    }

    /// Number of buffers inside `[start, end]`.
    pub fn count_chunks(&self, start: Time, end: Time) -> usize {
        with_stream!(self, s => s.count_chunks(start, end), _e => 0)
    }

    /// Drop every buffer.
    pub fn clear(&mut self) {
        with_stream!(self, s => s.clear(), _e => ())
    }

    /// Selection flag. Placeholders are never selected.
    pub fn is_selected(&self) -> bool {
        with_stream!(self, s => s.is_selected(), e => e.selected)
    }

    /// Change the selection flag. Ignored for placeholders.
    pub fn set_selected(&mut self, selected: bool) {
        with_stream!(self, s => s.set_selected(selected), _e => ())
    }

    /// Deep copy `other` into this stream.
    ///
    /// Fails without touching `self` when the stream types differ.
    pub fn copy_from(&mut self, other: &AnyStream) -> Result<()> {
        match (self, other) {
            (AnyStream::StreamedMatrix(a), AnyStream::StreamedMatrix(b)) => a.copy_from(b),
            (AnyStream::Signal(a), AnyStream::Signal(b)) => a.copy_from(b),
            (AnyStream::Stimulations(a), AnyStream::Stimulations(b)) => a.copy_from(b),
            (AnyStream::Spectrum(a), AnyStream::Spectrum(b)) => a.copy_from(b),
            (AnyStream::FeatureVector(a), AnyStream::FeatureVector(b)) => a.copy_from(b),
            (AnyStream::ChannelLocalisation(a), AnyStream::ChannelLocalisation(b)) => a.copy_from(b),
            (AnyStream::ChannelUnits(a), AnyStream::ChannelUnits(b)) => a.copy_from(b),
            (AnyStream::ExperimentInfo(a), AnyStream::ExperimentInfo(b)) => a.copy_from(b),
            (AnyStream::Error(a), AnyStream::Error(b)) if a.type_id == b.type_id => {}
            (target, source) => {
                return Err(StreamError::TypeMismatch {
                    source_kind: kind_label(source),
                    target_kind: kind_label(target),
                }
                .into())
            }
        }
        Ok(())
    }
}

impl<T: StreamType> From<Stream<T>> for AnyStream {
    fn from(stream: Stream<T>) -> Self {
        T::into_any(stream)
    }
}

fn stream_kind<T: StreamType>(_stream: &Stream<T>) -> StreamKind {
    T::KIND
}

fn kind_label(stream: &AnyStream) -> &'static str {
    stream.kind().map_or("unknown", StreamKind::name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::Chunk;
    use crate::kind::{TYPE_ID_SIGNAL, TYPE_ID_STIMULATIONS};
    use crate::matrix::Matrix;
    use crate::payload::MatrixBuffer;

    fn signal_stream(buffers: usize) -> AnyStream {
        let mut stream = Stream::<Signal>::new();
        for i in 0..buffers as u64 {
            stream
                .push(Chunk::new(
                    Time::from_millis(i * 100),
                    Time::from_millis((i + 1) * 100),
                    MatrixBuffer::new(Matrix::with_shape(2, 8)),
                ))
                .unwrap();
        }
        stream.into()
    }

    #[test]
    fn test_new_from_type_id() {
        assert_eq!(AnyStream::new(TYPE_ID_SIGNAL).kind(), Some(StreamKind::Signal));
        let unknown = AnyStream::new(0xDEAD_BEEF);
        assert!(unknown.is_error());
        assert_eq!(unknown.type_id(), 0xDEAD_BEEF);
        assert_eq!(unknown.kind(), None);
    }

    #[test]
    fn test_error_stream_is_exhausted() {
        let mut placeholder = AnyStream::new(0x1234);
        assert!(placeholder.is_exhausted());
        assert!(!placeholder.step());
        assert!(!placeholder.is_selected());
    }

    #[test]
    fn test_copy_type_mismatch_leaves_target() {
        let mut target = signal_stream(3);
        let source = AnyStream::new(TYPE_ID_STIMULATIONS);

        let err = target.copy_from(&source).unwrap_err();
        assert!(err.to_string().contains("Stimulations"));
        assert_eq!(target.len(), 3);
        assert_eq!(target.kind(), Some(StreamKind::Signal));
    }

    #[test]
    fn test_copy_same_type() {
        let mut target = AnyStream::new(TYPE_ID_SIGNAL);
        let source = signal_stream(2);
        target.copy_from(&source).unwrap();
        assert_eq!(target.len(), 2);
        assert_eq!(target.duration(), Time::from_millis(200));
    }

    #[test]
    fn test_downcast() {
        let mut any = signal_stream(1);
        assert!(any.downcast_ref::<Signal>().is_some());
        assert!(any.downcast_ref::<Stimulations>().is_none());
        any.downcast_mut::<Signal>().unwrap().clear();
        assert!(any.is_empty());
    }
}
