//! Reading and writing bundles as `.ov` files.

use crate::options::{LoadMode, LoadOptions};
use ovtrack_core::{Error, Result, StreamBundle};
use ovtrack_ebml::{ByteSource, Demuxer, Muxer, MuxerConfig, ReadSource};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Demux a bundle from any reader.
pub fn read_bundle<R: Read>(reader: R, options: &LoadOptions) -> Result<StreamBundle> {
    let mut bundle = StreamBundle::new();
    let mut demuxer = Demuxer::with_config(ReadSource::new(reader), options.demuxer.clone());
    demux_into(&mut demuxer, &mut bundle, options.mode)?;
    bundle.set_dirty(false);
    Ok(bundle)
}

fn demux_into<S: ByteSource>(demuxer: &mut Demuxer<S>, bundle: &mut StreamBundle, mode: LoadMode) -> Result<()> {
    match mode {
        LoadMode::Full => {
            let chunks = demuxer.read_all(bundle)?;
            debug!(chunks, streams = bundle.num_streams(), "Bundle demuxed");
        }
        LoadMode::HeadersOnly => {
            while !demuxer.headers_complete() {
                if !demuxer.step(bundle)? {
                    break;
                }
            }
            debug!(streams = bundle.num_streams(), "Stream headers demuxed");
        }
    }
    demuxer.uninitialize();
    Ok(())
}

/// Mux every selected stream of `bundle` into `writer`.
///
/// Returns the number of chunks written.
pub fn write_bundle<W: Write>(bundle: &StreamBundle, writer: W, config: MuxerConfig) -> Result<u64> {
    let mut muxer = Muxer::new(writer, config);
    let chunks = muxer.write_bundle(bundle)?;
    muxer.finalize()?;
    Ok(chunks)
}

/// Load a bundle from `path`.
///
/// A missing file fails with an [`io::ErrorKind::NotFound`] I/O error;
/// a malformed one with a container or codec error. The bundle remembers
/// `path` as its source and starts clean.
pub fn read_bundle_from_file(path: impl AsRef<Path>, options: &LoadOptions) -> Result<StreamBundle> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            warn!(path = %path.display(), "File not found");
        }
        Error::Io(e)
    })?;

    let mut bundle = read_bundle(BufReader::new(file), options).map_err(|e| {
        warn!(path = %path.display(), error = %e, "Failed to read bundle");
        e
    })?;
    bundle.set_source(path);
    bundle.set_dirty(false);

    info!(
        path = %path.display(),
        streams = bundle.num_streams(),
        duration = %bundle.max_duration(),
        "Loaded bundle"
    );
    Ok(bundle)
}

/// Save `bundle` to `path`.
///
/// The file is written next to its destination first and renamed over it
/// once complete. On success the bundle's source becomes `path` and its
/// dirty flag is cleared.
pub fn save_bundle_to_file(bundle: &mut StreamBundle, path: impl AsRef<Path>) -> Result<()> {
    save_bundle_with(bundle, path, MuxerConfig::default())
}

/// Save `bundle` to `path` with an explicit muxer configuration.
pub fn save_bundle_with(bundle: &mut StreamBundle, path: impl AsRef<Path>, config: MuxerConfig) -> Result<()> {
    let path = path.as_ref();
    let temp = temp_sibling(path);

    let written = File::create(&temp)
        .map_err(Error::from)
        .and_then(|file| {
            let mut writer = BufWriter::new(file);
            let chunks = write_bundle(bundle, &mut writer, config)?;
            writer.flush()?;
            Ok(chunks)
        })
        .and_then(|chunks| {
            fs::rename(&temp, path)?;
            Ok(chunks)
        });

    let chunks = match written {
        Ok(chunks) => chunks,
        Err(e) => {
            if temp.exists() {
                let _ = fs::remove_file(&temp);
            }
            warn!(path = %path.display(), error = %e, "Failed to save bundle");
            return Err(e);
        }
    };

    bundle.set_source(path);
    bundle.set_dirty(false);
    info!(path = %path.display(), chunks, "Saved bundle");
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ovtrack_core::kind::TYPE_ID_SIGNAL;
    use ovtrack_core::{AnyStream, Chunk, Matrix, MatrixBuffer, Signal, SignalHeader, Stream, Time};

    fn signal_bundle(buffers: u64) -> StreamBundle {
        let mut stream = Stream::<Signal>::with_header(SignalHeader {
            matrix: Matrix::with_shape(1, 2),
            sampling_rate: 20,
        });
        for i in 0..buffers {
            let matrix = Matrix::from_values(&[1, 2], vec![i as f64, 0.5]).unwrap();
            stream
                .push(Chunk::new(
                    Time::from_millis(i * 100),
                    Time::from_millis((i + 1) * 100),
                    MatrixBuffer::new(matrix),
                ))
                .unwrap();
        }
        let mut bundle = StreamBundle::new();
        bundle.push_stream(AnyStream::from(stream).into_ptr());
        bundle
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_bundle_from_file(dir.path().join("absent.ov"), &LoadOptions::new()).unwrap_err();
        assert!(matches!(err, Error::Io(ref e) if e.kind() == io::ErrorKind::NotFound));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("signal.ov");
        let mut bundle = signal_bundle(4);
        assert!(bundle.is_dirty());

        save_bundle_to_file(&mut bundle, &path).unwrap();
        assert!(!bundle.is_dirty());
        assert_eq!(bundle.source(), Some(path.as_path()));
        assert!(!temp_sibling(&path).exists());

        let loaded = read_bundle_from_file(&path, &LoadOptions::new()).unwrap();
        assert!(!loaded.is_dirty());
        assert_eq!(loaded.source(), Some(path.as_path()));
        assert_eq!(loaded.stream_types(), vec![Some(TYPE_ID_SIGNAL)]);
        assert_eq!(loaded.stream(0).unwrap().read().len(), 4);
        assert_eq!(loaded.max_duration(), Time::from_millis(400));
    }

    #[test]
    fn test_headers_only_skips_buffers() {
        let mut bytes = Vec::new();
        write_bundle(&signal_bundle(6), &mut bytes, MuxerConfig::default()).unwrap();

        let bundle = read_bundle(bytes.as_slice(), &LoadOptions::headers_only()).unwrap();
        assert_eq!(bundle.num_streams(), 1);
        let stream = bundle.stream(0).unwrap();
        let stream = stream.read();
        assert!(stream.len() <= 1);
        let signal = stream.downcast_ref::<Signal>().unwrap();
        assert_eq!(signal.header().payload.sampling_rate, 20);
    }

    #[test]
    fn test_garbage_is_a_format_error() {
        let err = read_bundle(&[0x00, 0x01, 0x00][..], &LoadOptions::new()).unwrap_err();
        assert!(matches!(err, Error::Container(_)));
    }
}
