//! Byte sources feeding the demuxer.

use std::io::{ErrorKind, Read};

/// A sequential source of bytes.
pub trait ByteSource {
    /// Read up to `buf.len()` bytes, returning how many were read.
    ///
    /// A read error is reported as end of input.
    fn read(&mut self, buf: &mut [u8]) -> usize;

    /// True once no more bytes will be produced.
    fn is_eof(&self) -> bool;
}

/// Adapts any [`Read`] implementation.
#[derive(Debug)]
pub struct ReadSource<R: Read> {
    inner: R,
    eof: bool,
}

impl<R: Read> ReadSource<R> {
    /// Wrap a reader.
    pub fn new(inner: R) -> Self {
        Self { inner, eof: false }
    }

    /// Get the underlying reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> ByteSource for ReadSource<R> {
    fn read(&mut self, buf: &mut [u8]) -> usize {
        if self.eof || buf.is_empty() {
            return 0;
        }
        loop {
            match self.inner.read(buf) {
                Ok(0) => {
                    self.eof = true;
                    return 0;
                }
                Ok(n) => return n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::warn!(error = %e, "Read failed, treating as end of input");
                    self.eof = true;
                    return 0;
                }
            }
        }
    }

    fn is_eof(&self) -> bool {
        self.eof
    }
}

/// An in-memory source.
#[derive(Debug, Clone)]
pub struct SliceSource<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> SliceSource<'a> {
    /// Read from `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Bytes not yet read.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }
}

impl ByteSource for SliceSource<'_> {
    fn read(&mut self, buf: &mut [u8]) -> usize {
        let n = buf.len().min(self.remaining());
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        n
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.data.len()
    }
}
