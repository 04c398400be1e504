//! Stream bundles: the set of streams recorded together in one file.

use crate::any::{AnyStream, StreamPtr};
use crate::error::{BundleError, Result};
use crate::time::Time;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// An indexed collection of shared streams.
///
/// Slots may be empty (`None`) while a file is being demultiplexed. Any
/// structural change marks the bundle dirty; the persistence layer clears
/// the flag after a successful write.
#[derive(Debug, Default)]
pub struct StreamBundle {
    streams: Vec<Option<StreamPtr>>,
    dirty: bool,
    source: Option<PathBuf>,
}

impl StreamBundle {
    /// Create an empty bundle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stream slots (occupied or not).
    pub fn num_streams(&self) -> usize {
        self.streams.len()
    }

    /// Shared handle to the stream at `index`.
    pub fn stream(&self, index: usize) -> Option<StreamPtr> {
        self.streams.get(index).and_then(|s| s.clone())
    }

    /// Iterate over occupied slots.
    pub fn streams(&self) -> impl Iterator<Item = (usize, &StreamPtr)> + '_ {
        self.streams
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|s| (i, s)))
    }

    /// Create an empty stream of `type_id` in slot `index`.
    ///
    /// The bundle grows as needed. An unknown type yields an error
    /// placeholder stream, which is not an error. An occupied slot is.
    pub fn create_stream(&mut self, index: usize, type_id: u64) -> Result<StreamPtr> {
        if let Some(Some(_)) = self.streams.get(index) {
            return Err(BundleError::SlotOccupied { index }.into());
        }

        let stream = AnyStream::new(type_id);
        if stream.is_error() {
            warn!(stream = index, "No codec for stream type 0x{:016X}, keeping placeholder", type_id);
        } else {
            debug!(stream = index, kind = %stream.type_name(), "Created stream");
        }

        let ptr = stream.into_ptr();
        self.ensure_slot(index);
        self.streams[index] = Some(Arc::clone(&ptr));
        self.dirty = true;
        Ok(ptr)
    }

    /// Put a shared stream into slot `index`, replacing any previous one.
    pub fn set_stream(&mut self, index: usize, stream: StreamPtr) {
        self.ensure_slot(index);
        self.streams[index] = Some(stream);
        self.dirty = true;
    }

    /// Remove the stream at `index`, shifting later streams down.
    pub fn delete_stream(&mut self, index: usize) -> Result<Option<StreamPtr>> {
        self.check_index(index)?;
        self.dirty = true;
        Ok(self.streams.remove(index))
    }

    /// Exchange two streams.
    pub fn swap_streams(&mut self, a: usize, b: usize) -> Result<()> {
        self.check_index(a)?;
        self.check_index(b)?;
        self.streams.swap(a, b);
        self.dirty = true;
        Ok(())
    }

    /// Move the stream at `from` so that it ends up at index `to`.
    pub fn move_stream(&mut self, from: usize, to: usize) -> Result<()> {
        self.check_index(from)?;
        self.check_index(to)?;
        let stream = self.streams.remove(from);
        self.streams.insert(to, stream);
        self.dirty = true;
        Ok(())
    }

    /// Append a stream after the last slot.
    pub fn push_stream(&mut self, stream: StreamPtr) -> usize {
        self.streams.push(Some(stream));
        self.dirty = true;
        self.streams.len() - 1
    }

    /// The stream whose current chunk starts first.
    ///
    /// Exhausted streams are skipped; ties go to the lowest index. Returns
    /// `None` once every stream is exhausted.
    pub fn next_stream(&self) -> Option<(usize, StreamPtr)> {
        let mut best: Option<(usize, Time, &StreamPtr)> = None;
        for (index, ptr) in self.streams() {
            let Some((start, _)) = ptr.read().peek() else {
                continue;
            };
            match best {
                Some((_, best_start, _)) if start >= best_start => {}
                _ => best = Some((index, start, ptr)),
            }
        }
        best.map(|(index, _, ptr)| (index, Arc::clone(ptr)))
    }

    /// True once every stream is exhausted.
    pub fn is_finished(&self) -> bool {
        self.streams().all(|(_, s)| s.read().is_exhausted())
    }

    /// Rewind every stream.
    pub fn rewind(&self) {
        for (_, stream) in self.streams() {
            stream.write().reset();
        }
    }

    /// Longest stream duration, [`Time::MIN`] for an empty bundle.
    pub fn max_duration(&self) -> Time {
        self.streams()
            .map(|(_, s)| s.read().duration())
            .max()
            .unwrap_or(Time::MIN)
    }

    /// Type identifiers of all streams, `None` for empty slots.
    pub fn stream_types(&self) -> Vec<Option<u64>> {
        self.streams
            .iter()
            .map(|s| s.as_ref().map(|s| s.read().type_id()))
            .collect()
    }

    /// Type identifiers of the selected streams, in order.
    pub fn selected_stream_types(&self) -> Vec<u64> {
        self.streams()
            .filter_map(|(_, s)| {
                let stream = s.read();
                stream.is_selected().then(|| stream.type_id())
            })
            .collect()
    }

    /// Replace this bundle's streams with shared handles to the streams
    /// selected in `other`.
    pub fn copy_from(&mut self, other: &StreamBundle) {
        self.streams = other
            .streams()
            .filter(|(_, s)| s.read().is_selected())
            .map(|(_, s)| Some(Arc::clone(s)))
            .collect();
        self.dirty = true;
    }

    /// Replace this bundle's streams with independent copies of every stream
    /// in `other`.
    pub fn deep_copy(&mut self, other: &StreamBundle) {
        self.streams = other
            .streams
            .iter()
            .map(|slot| slot.as_ref().map(|s| s.read().clone().into_ptr()))
            .collect();
        self.dirty = true;
    }

    /// A fully independent copy of this bundle, including the source path.
    pub fn deep_clone(&self) -> StreamBundle {
        let mut copy = StreamBundle::new();
        copy.deep_copy(self);
        copy.source = self.source.clone();
        copy.dirty = self.dirty;
        copy
    }

    /// Whether the bundle changed since it was last loaded or saved.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Flag content changes made through shared stream handles.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Set or clear the dirty flag.
    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }

    /// File this bundle was loaded from or last saved to.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Record the file backing this bundle.
    pub fn set_source(&mut self, source: impl Into<PathBuf>) {
        self.source = Some(source.into());
    }

    fn ensure_slot(&mut self, index: usize) {
        if self.streams.len() <= index {
            self.streams.resize(index + 1, None);
        }
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.streams.len() {
            return Err(BundleError::StreamOutOfRange {
                index,
                len: self.streams.len(),
            }
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::Chunk;
    use crate::kind::{TYPE_ID_SIGNAL, TYPE_ID_STIMULATIONS};
    use crate::matrix::Matrix;
    use crate::payload::{MatrixBuffer, StimulationBuffer};
    use crate::types::{Signal, Stimulations};
    use pretty_assertions::assert_eq;

    fn push_signal(bundle: &StreamBundle, index: usize, bounds: &[(u64, u64)]) {
        let ptr = bundle.stream(index).unwrap();
        let mut guard = ptr.write();
        let stream = guard.downcast_mut::<Signal>().unwrap();
        for &(start, end) in bounds {
            stream
                .push(Chunk::new(
                    Time::from_millis(start),
                    Time::from_millis(end),
                    MatrixBuffer::new(Matrix::with_shape(1, 1)),
                ))
                .unwrap();
        }
    }

    #[test]
    fn test_create_stream_slot_occupied() {
        let mut bundle = StreamBundle::new();
        bundle.create_stream(0, TYPE_ID_SIGNAL).unwrap();
        push_signal(&bundle, 0, &[(0, 100)]);

        let err = bundle.create_stream(0, TYPE_ID_STIMULATIONS).unwrap_err();
        assert!(matches!(err, crate::Error::Bundle(BundleError::SlotOccupied { index: 0 })));

        let stream = bundle.stream(0).unwrap();
        assert_eq!(stream.read().type_id(), TYPE_ID_SIGNAL);
        assert_eq!(stream.read().len(), 1);
    }

    #[test]
    fn test_create_stream_grows_with_gaps() {
        let mut bundle = StreamBundle::new();
        bundle.create_stream(2, TYPE_ID_SIGNAL).unwrap();
        assert_eq!(bundle.num_streams(), 3);
        assert!(bundle.stream(0).is_none());
        assert_eq!(bundle.stream_types(), vec![None, None, Some(TYPE_ID_SIGNAL)]);
        assert!(bundle.is_dirty());
    }

    #[test]
    fn test_unknown_type_placeholder() {
        let mut bundle = StreamBundle::new();
        let ptr = bundle.create_stream(0, 0x42).unwrap();
        assert!(ptr.read().is_error());
    }

    #[test]
    fn test_next_stream_tie_goes_to_lowest_index() {
        let mut bundle = StreamBundle::new();
        bundle.create_stream(0, TYPE_ID_SIGNAL).unwrap();
        bundle.create_stream(1, TYPE_ID_SIGNAL).unwrap();
        push_signal(&bundle, 0, &[(0, 100)]);
        push_signal(&bundle, 1, &[(0, 100)]);

        let (index, _) = bundle.next_stream().unwrap();
        assert_eq!(index, 0);
    }

    #[test]
    fn test_merge_walk_until_finished() {
        let mut bundle = StreamBundle::new();
        bundle.create_stream(0, TYPE_ID_SIGNAL).unwrap();
        bundle.create_stream(1, TYPE_ID_SIGNAL).unwrap();
        push_signal(&bundle, 0, &[(0, 100), (100, 200)]);
        push_signal(&bundle, 1, &[(50, 150)]);

        let mut visited = Vec::new();
        while let Some((index, ptr)) = bundle.next_stream() {
            let mut stream = ptr.write();
            visited.push((index, stream.peek().unwrap().0));
            stream.step();
        }

        // 2 headers + 3 buffers + 2 ends
        assert_eq!(visited.len(), 7);
        let starts: Vec<_> = visited.iter().map(|(_, t)| *t).collect();
        assert!(starts.windows(2).all(|w| w[0] <= w[1]));
        assert!(bundle.is_finished());

        bundle.rewind();
        assert!(!bundle.is_finished());
    }

    #[test]
    fn test_max_duration() {
        let mut bundle = StreamBundle::new();
        assert_eq!(bundle.max_duration(), Time::MIN);
        bundle.create_stream(0, TYPE_ID_SIGNAL).unwrap();
        bundle.create_stream(1, TYPE_ID_SIGNAL).unwrap();
        push_signal(&bundle, 0, &[(0, 300)]);
        push_signal(&bundle, 1, &[(0, 100)]);
        assert_eq!(bundle.max_duration(), Time::from_millis(300));
    }

    #[test]
    fn test_copy_from_shares_selected() {
        let mut source = StreamBundle::new();
        source.create_stream(0, TYPE_ID_SIGNAL).unwrap();
        source.create_stream(1, TYPE_ID_STIMULATIONS).unwrap();
        source.stream(1).unwrap().write().set_selected(false);

        let mut shallow = StreamBundle::new();
        shallow.copy_from(&source);
        assert_eq!(shallow.num_streams(), 1);
        assert!(Arc::ptr_eq(&shallow.stream(0).unwrap(), &source.stream(0).unwrap()));
    }

    #[test]
    fn test_deep_copy_is_independent() {
        let mut source = StreamBundle::new();
        source.create_stream(0, TYPE_ID_STIMULATIONS).unwrap();

        let mut copy = StreamBundle::new();
        copy.deep_copy(&source);
        {
            let ptr = copy.stream(0).unwrap();
            let mut guard = ptr.write();
            let stream = guard.downcast_mut::<Stimulations>().unwrap();
            stream
                .push(Chunk::new(Time::ZERO, Time::from_millis(10), StimulationBuffer::default()))
                .unwrap();
        }

        assert_eq!(copy.stream(0).unwrap().read().len(), 1);
        assert_eq!(source.stream(0).unwrap().read().len(), 0);
        assert!(!Arc::ptr_eq(&copy.stream(0).unwrap(), &source.stream(0).unwrap()));
    }

    #[test]
    fn test_structural_edits() {
        let mut bundle = StreamBundle::new();
        bundle.create_stream(0, TYPE_ID_SIGNAL).unwrap();
        bundle.create_stream(1, TYPE_ID_STIMULATIONS).unwrap();
        bundle.set_dirty(false);

        bundle.swap_streams(0, 1).unwrap();
        assert!(bundle.is_dirty());
        assert_eq!(bundle.stream_types(), vec![Some(TYPE_ID_STIMULATIONS), Some(TYPE_ID_SIGNAL)]);

        bundle.move_stream(0, 1).unwrap();
        assert_eq!(bundle.stream_types(), vec![Some(TYPE_ID_SIGNAL), Some(TYPE_ID_STIMULATIONS)]);

        assert!(bundle.delete_stream(5).is_err());
        bundle.delete_stream(0).unwrap();
        assert_eq!(bundle.num_streams(), 1);
    }
}
