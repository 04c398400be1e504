//! Nested element writer.
//!
//! Element sizes precede their content, so a master element can only be
//! written once all of its children are known. [`Writer`] keeps one buffer per
//! open element and emits it into its parent when the element is closed.

use crate::ebml::{self, f64_array_bytes, unsigned_int_bytes};
use crate::error::{EbmlError, Result};

/// Builds EBML byte sequences through `open_child` / `close_child` calls.
#[derive(Debug, Default)]
pub struct Writer {
    stack: Vec<(u64, Vec<u8>)>,
    output: Vec<u8>,
}

impl Writer {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open an element. Everything written until the matching
    /// [`close_child`](Self::close_child) becomes its content.
    pub fn open_child(&mut self, id: u64) -> &mut Self {
        self.stack.push((id, Vec::new()));
        self
    }

    /// Append raw content to the innermost open element.
    pub fn set_child_data(&mut self, data: &[u8]) -> Result<&mut Self> {
        match self.stack.last_mut() {
            Some((_, buffer)) => {
                buffer.extend_from_slice(data);
                Ok(self)
            }
            None => Err(EbmlError::MuxerState("child data written outside of an element")),
        }
    }

    /// Close the innermost open element.
    pub fn close_child(&mut self) -> Result<&mut Self> {
        let (id, content) = self
            .stack
            .pop()
            .ok_or(EbmlError::MuxerState("close_child without open element"))?;
        let parent = match self.stack.last_mut() {
            Some((_, buffer)) => buffer,
            None => &mut self.output,
        };
        ebml::write_element(parent, id, &content)?;
        Ok(self)
    }

    /// Write a leaf element with raw content.
    pub fn leaf(&mut self, id: u64, data: &[u8]) -> Result<&mut Self> {
        self.open_child(id).set_child_data(data)?.close_child()
    }

    /// Write an unsigned integer leaf.
    pub fn uint(&mut self, id: u64, value: u64) -> Result<&mut Self> {
        self.leaf(id, &unsigned_int_bytes(value))
    }

    /// Write a string leaf.
    pub fn string(&mut self, id: u64, value: &str) -> Result<&mut Self> {
        self.leaf(id, value.as_bytes())
    }

    /// Write a leaf holding little-endian `f64` values.
    pub fn f64s(&mut self, id: u64, values: &[f64]) -> Result<&mut Self> {
        self.leaf(id, &f64_array_bytes(values))
    }

    /// Number of elements still open.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Take the bytes of every closed top-level element written so far.
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.output)
    }

    /// Finish writing. Fails if an element is still open.
    pub fn finish(self) -> Result<Vec<u8>> {
        if !self.stack.is_empty() {
            return Err(EbmlError::MuxerState("writer finished with open elements"));
        }
        Ok(self.output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ebml::Node;
    use crate::elements::*;

    #[test]
    fn test_nested_sizes() {
        let mut writer = Writer::new();
        writer.open_child(STREAM_BUFFER);
        writer.uint(STREAM_BUFFER_STREAM_INDEX, 3).unwrap();
        writer.leaf(STREAM_BUFFER_CONTENT, &[9, 9]).unwrap();
        writer.close_child().unwrap();
        let bytes = writer.finish().unwrap();

        let nodes = Node::parse_all(&bytes).unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].id, STREAM_BUFFER);
        assert_eq!(nodes[0].require(STREAM_BUFFER_STREAM_INDEX, "index").unwrap().as_uint().unwrap(), 3);
        assert_eq!(nodes[0].child(STREAM_BUFFER_CONTENT).unwrap().data, vec![9, 9]);
    }

    #[test]
    fn test_unbalanced_close() {
        let mut writer = Writer::new();
        assert!(writer.close_child().is_err());
        assert!(writer.set_child_data(&[1]).is_err());
    }

    #[test]
    fn test_finish_with_open_element() {
        let mut writer = Writer::new();
        writer.open_child(STREAM_HEADER);
        assert_eq!(writer.depth(), 1);
        assert!(writer.finish().is_err());
    }

    #[test]
    fn test_take() {
        let mut writer = Writer::new();
        writer.uint(STREAM_HEADER_COMPRESSION, 0).unwrap();
        let first = writer.take();
        assert!(!first.is_empty());
        assert!(writer.take().is_empty());
    }
}
