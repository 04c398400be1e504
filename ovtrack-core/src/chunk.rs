//! Timestamped chunks, typed and encoded.

use crate::time::Time;
use serde::{Deserialize, Serialize};

/// Which part of a stream a chunk belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkKind {
    /// Stream header (layout, sampling rate, ...).
    Header,
    /// One block of stream data.
    Buffer,
    /// End-of-stream marker.
    End,
}

impl ChunkKind {
    /// Short lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkKind::Header => "header",
            ChunkKind::Buffer => "buffer",
            ChunkKind::End => "end",
        }
    }
}

/// A decoded chunk: a time interval plus a typed payload.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Chunk<P> {
    /// Start of the interval covered by this chunk.
    pub start_time: Time,
    /// End of the interval covered by this chunk.
    pub end_time: Time,
    /// Decoded payload.
    pub payload: P,
}

impl<P> Chunk<P> {
    /// Create a chunk.
    pub fn new(start_time: Time, end_time: Time, payload: P) -> Self {
        Self {
            start_time,
            end_time,
            payload,
        }
    }

    /// Check `start_time <= end_time`.
    pub fn is_well_formed(&self) -> bool {
        self.start_time <= self.end_time
    }

    /// Length of the interval.
    pub fn duration(&self) -> Time {
        self.end_time - self.start_time
    }

    /// Shift both times by `offset`.
    pub fn shift(&mut self, offset: Time) {
        self.start_time += offset;
        self.end_time += offset;
    }
}

/// End-of-stream marker. Both times are [`Time::MAX`] until set.
pub type EndChunk = Chunk<()>;

impl EndChunk {
    /// An end marker whose time was never set.
    pub fn unset() -> Self {
        Chunk::new(Time::MAX, Time::MAX, ())
    }

    /// An end marker at `time`.
    pub fn at(time: Time) -> Self {
        Chunk::new(time, time, ())
    }

    /// Check whether the end time was set.
    pub fn is_set(&self) -> bool {
        self.start_time.is_set()
    }
}

/// A chunk in its serialized form, as carried by the container.
///
/// An empty `data` buffer is valid and means "no payload".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedChunk {
    /// Header, buffer or end.
    pub kind: ChunkKind,
    /// Type identifier of the owning stream.
    pub stream_type: u64,
    /// Index of the owning stream in its bundle.
    pub stream_index: usize,
    /// Start time.
    pub start_time: Time,
    /// End time.
    pub end_time: Time,
    /// Serialized payload.
    pub data: Vec<u8>,
}

impl EncodedChunk {
    /// Create an encoded chunk.
    pub fn new(kind: ChunkKind, stream_type: u64, start_time: Time, end_time: Time, data: Vec<u8>) -> Self {
        Self {
            kind,
            stream_type,
            stream_index: 0,
            start_time,
            end_time,
            data,
        }
    }

    /// Builder-style stream index assignment.
    #[must_use]
    pub fn with_stream_index(mut self, index: usize) -> Self {
        self.stream_index = index;
        self
    }

    /// Payload size in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// True if the chunk carries no payload.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Check `start_time <= end_time`.
    pub fn is_well_formed(&self) -> bool {
        self.start_time <= self.end_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_shift() {
        let mut chunk = Chunk::new(Time::from_millis(100), Time::from_millis(200), 7u8);
        chunk.shift(Time::from_secs(1));
        assert_eq!(chunk.start_time, Time::from_millis(1100));
        assert_eq!(chunk.end_time, Time::from_millis(1200));
        assert_eq!(chunk.duration(), Time::from_millis(100));
        assert!(chunk.is_well_formed());
    }

    #[test]
    fn test_end_chunk_unset() {
        let end = EndChunk::unset();
        assert!(!end.is_set());
        assert!(EndChunk::at(Time::from_secs(3)).is_set());
    }

    #[test]
    fn test_encoded_chunk() {
        let chunk = EncodedChunk::new(ChunkKind::End, 1, Time::ZERO, Time::ZERO, Vec::new()).with_stream_index(4);
        assert_eq!(chunk.stream_index, 4);
        assert!(chunk.is_empty());
        assert_eq!(chunk.kind.as_str(), "end");
    }
}
