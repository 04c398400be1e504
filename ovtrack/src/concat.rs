//! Concatenation of bundles into one recording.
//!
//! Bundles are written one after the other into a single container. Each
//! bundle's chunks are shifted by the summed durations of the bundles before
//! it, so the result plays as one continuous recording. Stream headers come
//! from the first bundle and end markers from the last.

use ovtrack_core::error::BundleError;
use ovtrack_core::{ChunkKind, Error, Result, StreamBundle, Time};
use ovtrack_ebml::{selected_view, DemuxerConfig, Demuxer, Muxer, MuxerConfig, SliceSource};
use std::io::Write;
use tracing::{debug, info};

/// Concatenation settings.
#[derive(Debug, Clone, Default)]
pub struct ConcatConfig {
    /// Pause inserted between consecutive bundles.
    pub gap: Time,
    /// Output container settings.
    pub muxer: MuxerConfig,
}

impl ConcatConfig {
    /// Seamless concatenation with default container settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `gap` between consecutive bundles.
    #[must_use]
    pub fn with_gap(mut self, gap: Time) -> Self {
        self.gap = gap;
        self
    }

    /// Set the output container settings.
    #[must_use]
    pub fn with_muxer_config(mut self, muxer: MuxerConfig) -> Self {
        self.muxer = muxer;
        self
    }
}

/// Check that every bundle exposes the same selected stream types, in the
/// same order. Returns that common layout.
pub fn common_layout(bundles: &[&StreamBundle]) -> Result<Vec<u64>> {
    let Some(first) = bundles.first() else {
        return Err(Error::invalid_param("no bundles to concatenate"));
    };
    let layout = selected_view(first).selected_stream_types();
    for (index, bundle) in bundles.iter().enumerate().skip(1) {
        let types = selected_view(bundle).selected_stream_types();
        if types != layout {
            return Err(BundleError::InconsistentLayout(format!(
                "bundle {index} has {} selected streams of types {:X?}, bundle 0 has {} of types {:X?}",
                types.len(),
                types,
                layout.len(),
                layout
            ))
            .into());
        }
    }
    Ok(layout)
}

/// Write `bundles` back to back into `writer` as a single container.
///
/// Returns the total duration of the written recording.
pub fn catenate<W: Write>(bundles: &[&StreamBundle], writer: W) -> Result<Time> {
    catenate_with(bundles, writer, &ConcatConfig::default())
}

/// [`catenate`] with explicit settings.
pub fn catenate_with<W: Write>(bundles: &[&StreamBundle], writer: W, config: &ConcatConfig) -> Result<Time> {
    let layout = common_layout(bundles)?;

    let mut muxer = Muxer::new(writer, config.muxer.clone());
    muxer.write_header(&layout)?;

    let last = bundles.len() - 1;
    let mut offset = Time::ZERO;
    for (index, bundle) in bundles.iter().enumerate() {
        let view = selected_view(bundle);
        let written = muxer.write_merged(&view, offset, |kind| match kind {
            ChunkKind::Header => index == 0,
            ChunkKind::Buffer => true,
            ChunkKind::End => index == last,
        })?;
        debug!(bundle = index, offset = %offset, chunks = written, "Bundle appended");

        offset = offset + view.max_duration();
        if index != last {
            offset = offset + config.gap;
        }
    }
    muxer.finalize()?;

    info!(bundles = bundles.len(), duration = %offset, chunks = muxer.chunks_written(), "Bundles concatenated");
    Ok(offset)
}

/// Concatenate `bundles` into a new in-memory bundle.
pub fn catenate_bundles(bundles: &[&StreamBundle]) -> Result<StreamBundle> {
    catenate_bundles_with(bundles, &ConcatConfig::default())
}

/// [`catenate_bundles`] with explicit settings.
pub fn catenate_bundles_with(bundles: &[&StreamBundle], config: &ConcatConfig) -> Result<StreamBundle> {
    let mut bytes = Vec::new();
    catenate_with(bundles, &mut bytes, config)?;

    let mut result = StreamBundle::new();
    let mut demuxer = Demuxer::with_config(SliceSource::new(&bytes), DemuxerConfig::default());
    demuxer.read_all(&mut result)?;
    result.set_dirty(true);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ovtrack_core::kind::{TYPE_ID_SIGNAL, TYPE_ID_STIMULATIONS};
    use ovtrack_core::{AnyStream, Chunk, StimulationBuffer, Stimulations, Stream};

    fn stimulation_bundle(buffers: u64) -> StreamBundle {
        let mut stream = Stream::<Stimulations>::new();
        for i in 0..buffers {
            stream
                .push(Chunk::new(
                    Time::from_secs(i as u32),
                    Time::from_secs(i as u32 + 1),
                    StimulationBuffer::default(),
                ))
                .unwrap();
        }
        let mut bundle = StreamBundle::new();
        bundle.push_stream(AnyStream::from(stream).into_ptr());
        bundle
    }

    #[test]
    fn test_empty_input_rejected() {
        assert!(matches!(catenate(&[], Vec::new()), Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn test_inconsistent_layout_rejected() {
        let first = stimulation_bundle(1);
        let mut second = StreamBundle::new();
        second.create_stream(0, TYPE_ID_SIGNAL).unwrap();

        let err = catenate(&[&first, &second], Vec::new()).unwrap_err();
        assert!(matches!(err, Error::Bundle(BundleError::InconsistentLayout(_))));
    }

    #[test]
    fn test_unselected_streams_do_not_count() {
        let first = stimulation_bundle(1);
        let mut second = stimulation_bundle(1);
        let extra = second.create_stream(1, TYPE_ID_SIGNAL).unwrap();
        extra.write().set_selected(false);

        assert_eq!(common_layout(&[&first, &second]).unwrap(), vec![TYPE_ID_STIMULATIONS]);
    }

    #[test]
    fn test_gap_is_added_between_bundles() {
        let a = stimulation_bundle(2);
        let b = stimulation_bundle(1);
        let config = ConcatConfig::new().with_gap(Time::from_secs(1));
        let result = catenate_bundles_with(&[&a, &b], &config).unwrap();

        let stream = result.stream(0).unwrap();
        let stream = stream.read();
        let stims = stream.downcast_ref::<Stimulations>().unwrap();
        assert_eq!(stims.len(), 3);
        assert_eq!(stims.chunk(2).unwrap().start_time, Time::from_secs(3));
        assert_eq!(stims.end().start_time, Time::from_secs(4));
    }
}
