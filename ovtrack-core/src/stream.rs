//! Typed streams: one header, an ordered list of buffers, one end marker,
//! and a read cursor.

use crate::chunk::{Chunk, EndChunk};
use crate::error::{Result, StreamError};
use crate::time::Time;
use crate::types::StreamType;

/// Read position inside a stream.
///
/// A stream is walked header first, then every buffer in order, then the
/// end marker, after which it is exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Cursor {
    /// Positioned on the header.
    #[default]
    BeforeStart,
    /// Positioned on a buffer.
    Buffer(usize),
    /// Positioned on the end marker.
    End,
    /// Past the end marker.
    Exhausted,
}

/// The chunk under the cursor.
#[derive(Debug, Clone, Copy)]
pub enum CurrentChunk<'a, T: StreamType> {
    /// The stream header.
    Header(&'a Chunk<T::Header>),
    /// A buffer with its index.
    Buffer(usize, &'a Chunk<T::Buffer>),
    /// The end marker.
    End(&'a EndChunk),
}

/// A typed stream.
#[derive(Debug, Clone)]
pub struct Stream<T: StreamType> {
    header: Chunk<T::Header>,
    buffers: Vec<Chunk<T::Buffer>>,
    end: EndChunk,
    cursor: Cursor,
    selected: bool,
}

impl<T: StreamType> Default for Stream<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: StreamType> Stream<T> {
    /// Create an empty stream with a default header and an unset end marker.
    pub fn new() -> Self {
        Self {
            header: Chunk::default(),
            buffers: Vec::new(),
            end: EndChunk::unset(),
            cursor: Cursor::BeforeStart,
            selected: true,
        }
    }

    /// Create a stream with the given header payload.
    pub fn with_header(header: T::Header) -> Self {
        let mut stream = Self::new();
        stream.header.payload = header;
        stream
    }

    /// The header chunk.
    pub fn header(&self) -> &Chunk<T::Header> {
        &self.header
    }

    /// Mutable header chunk.
    pub fn header_mut(&mut self) -> &mut Chunk<T::Header> {
        &mut self.header
    }

    /// Replace the header chunk.
    pub fn set_header(&mut self, header: Chunk<T::Header>) {
        self.header = header;
    }

    /// The end marker.
    pub fn end(&self) -> &EndChunk {
        &self.end
    }

    /// Replace the end marker.
    pub fn set_end(&mut self, end: EndChunk) {
        self.end = end;
    }

    /// Append a buffer. Buffers are not reordered.
    pub fn push(&mut self, chunk: Chunk<T::Buffer>) -> Result<()> {
        if !chunk.is_well_formed() {
            return Err(StreamError::InvalidInterval {
                start: chunk.start_time.raw(),
                end: chunk.end_time.raw(),
            }
            .into());
        }
        self.buffers.push(chunk);
        Ok(())
    }

    /// Number of buffers.
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    /// True if the stream holds no buffers.
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// One buffer.
    pub fn chunk(&self, index: usize) -> Option<&Chunk<T::Buffer>> {
        self.buffers.get(index)
    }

    /// One buffer, mutably.
    pub fn chunk_mut(&mut self, index: usize) -> Option<&mut Chunk<T::Buffer>> {
        self.buffers.get_mut(index)
    }

    /// All buffers in order.
    pub fn buffers(&self) -> &[Chunk<T::Buffer>] {
        &self.buffers
    }

    /// Iterate over buffers.
    pub fn iter(&self) -> std::slice::Iter<'_, Chunk<T::Buffer>> {
        self.buffers.iter()
    }

    /// Drop every buffer and rewind. Header and end marker are kept.
    pub fn clear(&mut self) {
        self.buffers.clear();
        self.cursor = Cursor::BeforeStart;
    }

    /// Current cursor.
    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Advance the cursor by one position.
    ///
    /// Returns false once the cursor is already past the end marker.
    pub fn step(&mut self) -> bool {
        let next = match self.cursor {
            Cursor::BeforeStart if self.buffers.is_empty() => Cursor::End,
            Cursor::BeforeStart => Cursor::Buffer(0),
            Cursor::Buffer(i) if i + 1 < self.buffers.len() => Cursor::Buffer(i + 1),
            Cursor::Buffer(_) => Cursor::End,
            Cursor::End => Cursor::Exhausted,
            Cursor::Exhausted => return false,
        };
        self.cursor = next;
        true
    }

    /// Move the cursor back before the header.
    pub fn reset(&mut self) {
        self.cursor = Cursor::BeforeStart;
    }

    /// True once the cursor is past the end marker.
    pub fn is_exhausted(&self) -> bool {
        self.cursor == Cursor::Exhausted
    }

    /// Time interval of the chunk under the cursor.
    pub fn peek(&self) -> Option<(Time, Time)> {
        self.peek_at(self.cursor)
    }

    /// Time interval of the chunk at `cursor`.
    ///
    /// The header sits at `(0, 0)`. The end marker sits at the degenerate
    /// interval `(last end, last end)`; for a stream without buffers it uses
    /// its own time if set, `(0, 0)` otherwise.
    pub fn peek_at(&self, cursor: Cursor) -> Option<(Time, Time)> {
        match cursor {
            Cursor::BeforeStart => Some((Time::MIN, Time::MIN)),
            Cursor::Buffer(i) => self.buffers.get(i).map(|c| (c.start_time, c.end_time)),
            Cursor::End => {
                let time = match self.buffers.last() {
                    Some(last) => last.end_time,
                    None if self.end.is_set() => self.end.start_time,
                    None => Time::MIN,
                };
                Some((time, time))
            }
            Cursor::Exhausted => None,
        }
    }

    /// The chunk under the cursor.
    pub fn current(&self) -> Option<CurrentChunk<'_, T>> {
        match self.cursor {
            Cursor::BeforeStart => Some(CurrentChunk::Header(&self.header)),
            Cursor::Buffer(i) => self.buffers.get(i).map(|c| CurrentChunk::Buffer(i, c)),
            Cursor::End => Some(CurrentChunk::End(&self.end)),
            Cursor::Exhausted => None,
        }
    }

    /// End time of the last buffer, [`Time::MIN`] when empty.
    pub fn duration(&self) -> Time {
        self.buffers.last().map_or(Time::MIN, |c| c.end_time)
    }

    /// Start time of the first buffer, [`Time::MIN`] when empty.
    pub fn start_time(&self) -> Time {
        self.buffers.first().map_or(Time::MIN, |c| c.start_time)
    }

    /// True if some buffer starts before its predecessor ends.
    pub fn overlapping(&self) -> bool {
        self.buffers.windows(2).any(|w| w[1].start_time < w[0].end_time)
    }

    /// True if some buffer starts after its predecessor ends.
    pub fn noncontinuous(&self) -> bool {
        self.buffers.windows(2).any(|w| w[1].start_time > w[0].end_time)
    }

    /// Number of buffers lying entirely inside `[start, end]`.
    pub fn count_chunks(&self, start: Time, end: Time) -> usize {
        self.buffers
            .iter()
            .filter(|c| c.start_time >= start && c.end_time <= end)
            .count()
    }

    /// Replace the content of this stream with a deep copy of `other`.
    ///
    /// The cursor is rewound; the selection flag is kept.
    pub fn copy_from(&mut self, other: &Stream<T>) {
        self.header = other.header.clone();
        self.buffers = other.buffers.clone();
        self.end = other.end.clone();
        self.cursor = Cursor::BeforeStart;
    }

    /// Whether this stream takes part in playback and export.
    pub fn is_selected(&self) -> bool {
        self.selected
    }

    /// Change the selection flag.
    pub fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }
}
