//! Incremental EBML reader.
//!
//! Bytes are fed in arbitrary pieces with [`Reader::feed`]; parsing events
//! are pulled with [`Reader::next_event`]. An event is only produced once all
//! of its bytes are available, so a file can be read in fixed-size blocks
//! without ever seeking.

use crate::ebml::{decode_vint, MAX_RECURSION_DEPTH};
use crate::elements;
use crate::error::{EbmlError, Result};

/// Default upper bound on the size of a single leaf element (256 MiB).
pub const DEFAULT_MAX_ELEMENT_SIZE: u64 = 256 * 1024 * 1024;

/// A parsing event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// An element starts. `size` is its content size.
    Open {
        /// Element identifier.
        id: u64,
        /// Content size in bytes.
        size: u64,
    },
    /// The complete content of a leaf element.
    Data {
        /// Element identifier.
        id: u64,
        /// Leaf content.
        data: Vec<u8>,
    },
    /// The innermost open element ends.
    Close {
        /// Element identifier.
        id: u64,
    },
}

/// Reader state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReaderState {
    /// Waiting for an element identifier.
    FillingIdentifier,
    /// Identifier read, waiting for the content size.
    FillingContentSize { id: u64 },
    /// Leaf header read, waiting for its content.
    FillingContent { id: u64, size: u64 },
}

#[derive(Debug, Clone, Copy)]
struct OpenNode {
    id: u64,
    remaining: u64,
}

/// Push-fed, pull-driven EBML reader.
#[derive(Debug)]
pub struct Reader {
    buffer: Vec<u8>,
    pos: usize,
    offset: u64,
    state: ReaderState,
    stack: Vec<OpenNode>,
    is_master: fn(u64) -> bool,
    max_element_size: u64,
}

impl Default for Reader {
    fn default() -> Self {
        Self::new()
    }
}

impl Reader {
    /// Create a reader using the `.ov` element table to tell masters from
    /// leaves.
    pub fn new() -> Self {
        Self::with_classifier(elements::is_master_element)
    }

    /// Create a reader with a custom master element classifier.
    pub fn with_classifier(is_master: fn(u64) -> bool) -> Self {
        Self {
            buffer: Vec::new(),
            pos: 0,
            offset: 0,
            state: ReaderState::FillingIdentifier,
            stack: Vec::new(),
            is_master,
            max_element_size: DEFAULT_MAX_ELEMENT_SIZE,
        }
    }

    /// Set the maximum accepted leaf size.
    #[must_use]
    pub fn with_max_element_size(mut self, max: u64) -> Self {
        self.max_element_size = max;
        self
    }

    /// Append bytes to the input.
    pub fn feed(&mut self, data: &[u8]) {
        if self.pos > 0 {
            self.buffer.drain(..self.pos);
            self.pos = 0;
        }
        self.buffer.extend_from_slice(data);
    }

    /// Total bytes consumed so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Identifiers of the currently open elements, outermost first.
    pub fn open_elements(&self) -> impl Iterator<Item = u64> + '_ {
        self.stack.iter().map(|n| n.id)
    }

    /// True when no element is open and no partial element is buffered.
    pub fn is_idle(&self) -> bool {
        self.stack.is_empty() && self.state == ReaderState::FillingIdentifier && self.pos == self.buffer.len()
    }

    /// Pull the next event, or `Ok(None)` if more input is needed.
    pub fn next_event(&mut self) -> Result<Option<Event>> {
        if self.state == ReaderState::FillingIdentifier {
            if let Some(top) = self.stack.last() {
                if top.remaining == 0 {
                    let id = top.id;
                    self.stack.pop();
                    return Ok(Some(Event::Close { id }));
                }
            }
        }

        match self.state {
            ReaderState::FillingIdentifier => {
                let Some((id, length)) = decode_vint(&self.buffer[self.pos..]).map_err(|_| self.invalid_vint())?
                else {
                    return Ok(None);
                };
                self.consume(id, length as u64)?;
                self.state = ReaderState::FillingContentSize { id };
                self.next_event()
            }
            ReaderState::FillingContentSize { id } => {
                let Some((size, length)) = decode_vint(&self.buffer[self.pos..]).map_err(|_| self.invalid_vint())?
                else {
                    return Ok(None);
                };
                self.consume(id, length as u64)?;

                if let Some(parent) = self.stack.last() {
                    if size > parent.remaining {
                        return Err(EbmlError::Overrun {
                            id,
                            offset: self.offset,
                            excess: size - parent.remaining,
                        });
                    }
                }
                if self.stack.len() as u32 >= MAX_RECURSION_DEPTH {
                    return Err(EbmlError::RecursionLimit {
                        depth: self.stack.len() as u32,
                    });
                }

                if (self.is_master)(id) {
                    self.state = ReaderState::FillingIdentifier;
                } else {
                    if size > self.max_element_size {
                        return Err(EbmlError::ElementTooLarge {
                            id,
                            size,
                            limit: self.max_element_size,
                        });
                    }
                    self.state = ReaderState::FillingContent { id, size };
                }
                self.stack.push(OpenNode { id, remaining: size });
                Ok(Some(Event::Open { id, size }))
            }
            ReaderState::FillingContent { id, size } => {
                let available = (self.buffer.len() - self.pos) as u64;
                if available < size {
                    return Ok(None);
                }
                let start = self.pos;
                let end = start + size as usize;
                let data = self.buffer[start..end].to_vec();
                self.consume(id, size)?;
                self.state = ReaderState::FillingIdentifier;
                Ok(Some(Event::Data { id, data }))
            }
        }
    }

    fn consume(&mut self, id: u64, count: u64) -> Result<()> {
        for node in self.stack.iter_mut() {
            if node.remaining < count {
                return Err(EbmlError::Overrun {
                    id,
                    offset: self.offset,
                    excess: count - node.remaining,
                });
            }
            node.remaining -= count;
        }
        self.pos += count as usize;
        self.offset += count;
        Ok(())
    }

    fn invalid_vint(&self) -> EbmlError {
        EbmlError::InvalidVint { offset: self.offset }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::*;
    use crate::writer::Writer;

    fn sample() -> Vec<u8> {
        let mut writer = Writer::new();
        writer.open_child(STREAM_BUFFER);
        writer.uint(STREAM_BUFFER_STREAM_INDEX, 1).unwrap();
        writer.leaf(STREAM_BUFFER_CONTENT, &[]).unwrap();
        writer.close_child().unwrap();
        writer.finish().unwrap()
    }

    fn drain(reader: &mut Reader) -> Vec<Event> {
        let mut events = Vec::new();
        while let Some(event) = reader.next_event().unwrap() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_event_sequence() {
        let bytes = sample();
        let mut reader = Reader::new();
        reader.feed(&bytes);
        let events = drain(&mut reader);

        assert_eq!(
            events,
            vec![
                // 9-byte identifier plus 1-byte size
                Event::Open {
                    id: STREAM_BUFFER,
                    size: (bytes.len() - 10) as u64
                },
                Event::Open {
                    id: STREAM_BUFFER_STREAM_INDEX,
                    size: 1
                },
                Event::Data {
                    id: STREAM_BUFFER_STREAM_INDEX,
                    data: vec![1]
                },
                Event::Close {
                    id: STREAM_BUFFER_STREAM_INDEX
                },
                Event::Open {
                    id: STREAM_BUFFER_CONTENT,
                    size: 0
                },
                Event::Data {
                    id: STREAM_BUFFER_CONTENT,
                    data: vec![]
                },
                Event::Close {
                    id: STREAM_BUFFER_CONTENT
                },
                Event::Close { id: STREAM_BUFFER },
            ]
        );
        assert!(reader.is_idle());
        assert_eq!(reader.offset(), bytes.len() as u64);
    }

    #[test]
    fn test_byte_by_byte_feed_matches_bulk() {
        let bytes = sample();

        let mut bulk = Reader::new();
        bulk.feed(&bytes);
        let expected = drain(&mut bulk);

        let mut reader = Reader::new();
        let mut events = Vec::new();
        for byte in &bytes {
            reader.feed(std::slice::from_ref(byte));
            events.extend(drain(&mut reader));
        }
        assert_eq!(events, expected);
    }

    #[test]
    fn test_child_overruns_parent() {
        let mut inner = Vec::new();
        crate::ebml::write_element(&mut inner, STREAM_BUFFER_CONTENT, &[1, 2, 3, 4]).unwrap();
        let mut bytes = Vec::new();
        // Parent claims fewer bytes than its child needs.
        crate::ebml::write_vint(&mut bytes, STREAM_BUFFER).unwrap();
        crate::ebml::write_vint(&mut bytes, (inner.len() - 2) as u64).unwrap();
        bytes.extend_from_slice(&inner);

        let mut reader = Reader::new();
        reader.feed(&bytes);
        assert!(matches!(reader.next_event(), Ok(Some(Event::Open { .. }))));
        assert!(matches!(reader.next_event(), Err(EbmlError::Overrun { .. })));
    }

    #[test]
    fn test_element_size_limit() {
        let mut bytes = Vec::new();
        crate::ebml::write_element(&mut bytes, STREAM_BUFFER_CONTENT, &[0; 32]).unwrap();
        let mut reader = Reader::new().with_max_element_size(16);
        reader.feed(&bytes);
        assert!(matches!(reader.next_event(), Err(EbmlError::ElementTooLarge { size: 32, .. })));
    }

    #[test]
    fn test_partial_input_is_not_idle() {
        let bytes = sample();
        let mut reader = Reader::new();
        reader.feed(&bytes[..bytes.len() - 1]);
        drain(&mut reader);
        assert!(!reader.is_idle());
    }
}
