//! Track workspace.
//!
//! A workspace holds an ordered list of tracks, each a [`StreamBundle`]
//! loaded from a `.ov` file. Tracks can be reordered, streams moved between
//! them, and the selected tracks assembled into a playlist. Modified tracks
//! are saved as numbered revisions under the working directory.
//!
//! In memory-save mode tracks are loaded headers-only and their content is
//! read back from the source file whenever it is needed.

use crate::concat::{catenate_bundles, common_layout};
use crate::io::{read_bundle_from_file, save_bundle_with};
use crate::options::{LoadOptions, WorkspaceConfig};
use ovtrack_core::{Error, Result, StreamBundle, Time};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::{debug, info, trace, warn};

/// Errors specific to workspace operations.
#[derive(Error, Debug)]
pub enum WorkspaceError {
    /// Track index outside the track list.
    #[error("Track {index} out of range (workspace holds {len})")]
    TrackOutOfRange { index: usize, len: usize },

    /// Stream index outside a track.
    #[error("Stream {stream} out of range in track {track} (track holds {len})")]
    StreamOutOfRange { track: usize, stream: usize, len: usize },

    /// Saving requires a working directory.
    #[error("Working path not set")]
    NoWorkingPath,

    /// The track was never loaded from or saved to a file.
    #[error("Track {index} has no source file")]
    NoSource { index: usize },

    /// Selected streams differ between tracks.
    #[error("Selected streams must have equal types, in equal amounts and order, in every track")]
    InconsistentSelection,
}

impl From<WorkspaceError> for Error {
    fn from(e: WorkspaceError) -> Self {
        match e {
            WorkspaceError::NoWorkingPath => Error::Config(e.to_string()),
            _ => Error::InvalidParameter(e.to_string()),
        }
    }
}

/// One track scheduled for playback.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistEntry {
    /// Index of the track in the workspace.
    pub track: usize,
    /// File backing the track, if any.
    pub source: Option<PathBuf>,
    /// Longest stream of the track.
    pub duration: Time,
    /// Playback position reached so far.
    pub progress: Time,
}

/// An ordered collection of tracks.
#[derive(Debug)]
pub struct Workspace {
    config: WorkspaceConfig,
    tracks: Vec<StreamBundle>,
    revision: u32,
    playlist: Vec<PlaylistEntry>,
    playlist_duration: Time,
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new(WorkspaceConfig::default())
    }
}

impl Workspace {
    /// Create an empty workspace.
    pub fn new(config: WorkspaceConfig) -> Self {
        Self {
            config,
            tracks: Vec::new(),
            revision: 1,
            playlist: Vec::new(),
            playlist_duration: Time::MIN,
        }
    }

    /// Current configuration.
    pub fn config(&self) -> &WorkspaceConfig {
        &self.config
    }

    // =========================================================================
    // Tracks
    // =========================================================================

    /// Number of tracks.
    pub fn num_tracks(&self) -> usize {
        self.tracks.len()
    }

    /// Track at `index`.
    pub fn track(&self, index: usize) -> Option<&StreamBundle> {
        self.tracks.get(index)
    }

    /// Mutable track at `index`.
    pub fn track_mut(&mut self, index: usize) -> Option<&mut StreamBundle> {
        self.tracks.get_mut(index)
    }

    /// All tracks, in order.
    pub fn tracks(&self) -> &[StreamBundle] {
        &self.tracks
    }

    /// Load `path` and append it as a new track with every stream selected.
    ///
    /// Returns the index of the new track.
    pub fn add_track(&mut self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let track = read_bundle_from_file(path, &self.load_options())?;

        debug!(path = %path.display(), streams = track.num_streams(), "Track loaded");
        for index in 0..track.num_streams() {
            match track.stream(index) {
                Some(stream) => {
                    let mut stream = stream.write();
                    if stream.is_error() {
                        info!(stream = index, "Stream has a type that cannot be decoded");
                    } else {
                        debug!(stream = index, kind = %stream.type_name(), "Stream");
                    }
                    stream.set_selected(true);
                }
                None => info!(stream = index, "Stream slot is empty"),
            }
        }

        self.tracks.push(track);
        Ok(self.tracks.len() - 1)
    }

    /// Append an in-memory track. Returns its index.
    pub fn push_track(&mut self, track: StreamBundle) -> usize {
        self.tracks.push(track);
        self.tracks.len() - 1
    }

    /// Put `track` at `index`, growing the list with empty tracks if needed.
    ///
    /// Returns the track previously at `index`.
    pub fn set_track(&mut self, index: usize, track: StreamBundle) -> Option<StreamBundle> {
        if index >= self.tracks.len() {
            self.tracks.resize_with(index, StreamBundle::new);
            self.tracks.push(track);
            return None;
        }
        Some(std::mem::replace(&mut self.tracks[index], track))
    }

    /// Remove and return the track at `index`.
    pub fn remove_track(&mut self, index: usize) -> Result<StreamBundle> {
        self.check_track(index)?;
        Ok(self.tracks.remove(index))
    }

    /// Move the track at `from` so that it ends up at `to`.
    pub fn move_track(&mut self, from: usize, to: usize) -> Result<()> {
        self.check_track(from)?;
        self.check_track(to)?;
        if from != to {
            let track = self.tracks.remove(from);
            self.tracks.insert(to, track);
        }
        Ok(())
    }

    /// Move a stream within a track or between two tracks.
    ///
    /// Between tracks the stream handle itself moves, so no content is
    /// copied. `dst_stream` may equal the target's stream count to append.
    /// Both tracks become dirty.
    pub fn move_stream(&mut self, src_track: usize, src_stream: usize, dst_track: usize, dst_stream: usize) -> Result<()> {
        self.check_track(src_track)?;
        self.check_track(dst_track)?;
        if src_track == dst_track && src_stream == dst_stream {
            return Ok(());
        }
        self.check_stream(src_track, src_stream)?;

        if src_track == dst_track {
            self.check_stream(dst_track, dst_stream)?;
            return self.tracks[src_track].move_stream(src_stream, dst_stream);
        }

        let len = self.tracks[dst_track].num_streams();
        if dst_stream > len {
            return Err(WorkspaceError::StreamOutOfRange {
                track: dst_track,
                stream: dst_stream,
                len,
            }
            .into());
        }

        let Some(stream) = self.tracks[src_track].delete_stream(src_stream)? else {
            // An empty slot carries no stream; its removal is the whole move.
            return Ok(());
        };
        let target = &mut self.tracks[dst_track];
        let appended = target.push_stream(stream);
        if appended != dst_stream {
            target.move_stream(appended, dst_stream)?;
        }
        debug!(src_track, src_stream, dst_track, dst_stream, "Stream moved");
        Ok(())
    }

    /// Delete a stream from a track.
    pub fn remove_stream(&mut self, track: usize, stream: usize) -> Result<()> {
        self.check_track(track)?;
        self.check_stream(track, stream)?;
        self.tracks[track].delete_stream(stream)?;
        Ok(())
    }

    /// Replace a track with a fresh load of its source file.
    pub fn reload_track(&mut self, index: usize) -> Result<()> {
        self.check_track(index)?;
        let source = self.source_of(index)?;
        self.tracks[index] = read_bundle_from_file(&source, &self.load_options())?;
        debug!(track = index, path = %source.display(), "Track reloaded");
        Ok(())
    }

    /// Drop every track and the playlist.
    pub fn clear_tracks(&mut self) {
        self.tracks.clear();
        self.playlist.clear();
        self.playlist_duration = Time::MIN;
    }

    /// Longest track duration, [`Time::MIN`] without tracks.
    pub fn max_duration(&self) -> Time {
        self.tracks
            .iter()
            .map(StreamBundle::max_duration)
            .max()
            .unwrap_or(Time::MIN)
    }

    // =========================================================================
    // Selection and playlist
    // =========================================================================

    /// Select or deselect every stream of a track.
    pub fn select_track(&mut self, index: usize, selected: bool) -> Result<()> {
        self.check_track(index)?;
        for (_, stream) in self.tracks[index].streams() {
            stream.write().set_selected(selected);
        }
        Ok(())
    }

    /// Select or deselect one stream.
    pub fn select_stream(&mut self, track: usize, stream: usize, selected: bool) -> Result<()> {
        self.check_track(track)?;
        self.check_stream(track, stream)?;
        if let Some(ptr) = self.tracks[track].stream(stream) {
            ptr.write().set_selected(selected);
        }
        Ok(())
    }

    /// True if any stream of the track is selected.
    pub fn is_track_selected(&self, index: usize) -> bool {
        self.tracks
            .get(index)
            .is_some_and(|track| track.streams().any(|(_, s)| s.read().is_selected()))
    }

    /// Indices of the selected tracks, in order.
    pub fn selected_tracks(&self) -> Vec<usize> {
        (0..self.tracks.len()).filter(|&i| self.is_track_selected(i)).collect()
    }

    /// True if every selected track exposes the same selected stream types
    /// in the same order.
    pub fn is_selection_consistent(&self) -> bool {
        let selected: Vec<&StreamBundle> = self.selected_tracks().into_iter().map(|i| &self.tracks[i]).collect();
        selected.len() <= 1 || common_layout(&selected).is_ok()
    }

    /// Rebuild the playlist from the selected tracks.
    ///
    /// Returns the total playlist duration.
    pub fn assemble_playlist(&mut self) -> Time {
        self.playlist = self
            .selected_tracks()
            .into_iter()
            .map(|index| {
                let track = &self.tracks[index];
                PlaylistEntry {
                    track: index,
                    source: track.source().map(Path::to_path_buf),
                    duration: track.max_duration(),
                    progress: Time::MIN,
                }
            })
            .collect();
        self.playlist_duration = self
            .playlist
            .iter()
            .fold(Time::MIN, |total, entry| total + entry.duration);

        debug!(tracks = self.playlist.len(), duration = %self.playlist_duration, "Playlist assembled");
        self.playlist_duration
    }

    /// The playlist built by the last [`assemble_playlist`](Self::assemble_playlist).
    pub fn playlist(&self) -> &[PlaylistEntry] {
        &self.playlist
    }

    /// Record playback progress for a playlist entry.
    pub fn set_progress(&mut self, entry: usize, progress: Time) {
        if let Some(entry) = self.playlist.get_mut(entry) {
            entry.progress = progress;
        }
    }

    /// Summed duration of the playlist tracks.
    pub fn playlist_duration(&self) -> Time {
        self.playlist_duration
    }

    /// The playlist as one recording, for catenate mode.
    ///
    /// Requires a consistent selection. Only the selected streams of each
    /// track take part.
    pub fn catenate_playlist(&mut self) -> Result<StreamBundle> {
        if !self.is_selection_consistent() {
            return Err(WorkspaceError::InconsistentSelection.into());
        }
        self.assemble_playlist();
        let indices: Vec<usize> = self.playlist.iter().map(|entry| entry.track).collect();

        let loaded = indices
            .iter()
            .map(|&index| self.full_content(index))
            .collect::<Result<Vec<_>>>()?;
        let bundles: Vec<&StreamBundle> = indices
            .iter()
            .zip(&loaded)
            .map(|(&index, full)| full.as_ref().unwrap_or(&self.tracks[index]))
            .collect();

        catenate_bundles(&bundles)
    }

    /// Store a processing result for playlist entry `entry`.
    ///
    /// In inplace mode the result replaces the entry's track; otherwise it is
    /// appended after the existing tracks. Returns the index it landed at.
    pub fn place_result(&mut self, entry: usize, result: StreamBundle) -> Result<usize> {
        let index = match (self.config.inplace_mode, self.playlist.get(entry)) {
            (true, Some(entry)) => entry.track,
            (true, None) => {
                return Err(Error::invalid_param(format!(
                    "playlist entry {entry} out of range (playlist holds {})",
                    self.playlist.len()
                )))
            }
            (false, _) => self.tracks.len(),
        };
        self.set_track(index, result);
        if self.config.memory_save_mode {
            self.spool_track(index)?;
        }
        Ok(index)
    }

    // =========================================================================
    // Saving
    // =========================================================================

    /// Current revision number, starting at 1.
    pub fn revision(&self) -> u32 {
        self.revision
    }

    /// Start a new revision. Tracks saved afterwards get the new number.
    pub fn increment_revision(&mut self) -> Result<u32> {
        if self.config.working_path.is_none() {
            return Err(WorkspaceError::NoWorkingPath.into());
        }
        self.revision += 1;
        info!(revision = self.revision, "Revision updated");
        Ok(self.revision)
    }

    /// Path a track is saved to in the current revision.
    pub fn track_path(&self, index: usize) -> Result<PathBuf> {
        let dir = self.config.working_path.as_ref().ok_or(WorkspaceError::NoWorkingPath)?;
        Ok(dir.join(format!("workspace-track{:03}-rev{:03}.ov", index + 1, self.revision)))
    }

    /// Save every dirty track under the working directory.
    ///
    /// Returns the number of tracks written.
    pub fn save_all(&mut self) -> Result<usize> {
        let dir = self.working_dir()?;
        if !self.tracks.is_empty() {
            info!(path = %dir.display(), "Saving modified tracks");
        }

        let total = self.tracks.len();
        let mut saved = 0;
        for index in 0..total {
            if !self.tracks[index].is_dirty() {
                trace!(track = index + 1, total, "Skipping unmodified track");
                continue;
            }
            trace!(track = index + 1, total, "Saving track");

            let path = self.track_path(index)?;
            let config = self.config.muxer_config();
            match self.full_content(index)? {
                Some(mut full) => {
                    save_bundle_with(&mut full, &path, config)?;
                    let track = &mut self.tracks[index];
                    track.set_source(&path);
                    track.set_dirty(false);
                }
                None => save_bundle_with(&mut self.tracks[index], &path, config)?,
            }
            saved += 1;
        }

        info!(saved, revision = self.revision, "Tracks saved");
        Ok(saved)
    }

    /// Write one track to the working directory and make the file its source.
    ///
    /// In memory-save mode the track is then reloaded headers-only.
    pub fn spool_track(&mut self, index: usize) -> Result<PathBuf> {
        self.check_track(index)?;
        self.working_dir()?;
        let path = self.track_path(index)?;
        save_bundle_with(&mut self.tracks[index], &path, self.config.muxer_config())?;
        if self.config.memory_save_mode {
            self.tracks[index] = read_bundle_from_file(&path, &LoadOptions::headers_only())?;
        }
        Ok(path)
    }

    // =========================================================================
    // Modes
    // =========================================================================

    /// Set the working directory.
    pub fn set_working_path(&mut self, path: impl Into<PathBuf>) {
        self.config.working_path = Some(path.into());
    }

    /// Point the working path at a fresh `tracker-workspace-<seconds>-<n>`
    /// directory under `parent`, skipping names already taken.
    ///
    /// The directory itself is created on the first save. Returns the
    /// chosen path.
    pub fn set_unique_working_path(&mut self, parent: impl AsRef<Path>) -> PathBuf {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or_default();
        let prefix = format!("tracker-workspace-{stamp}-");

        let mut counter = 0u32;
        let path = loop {
            let candidate = parent.as_ref().join(format!("{prefix}{counter}"));
            if !candidate.exists() {
                break candidate;
            }
            counter += 1;
        };

        debug!(path = %path.display(), "Working path chosen");
        self.set_working_path(path.clone());
        path
    }

    /// Switch between full and headers-only track storage.
    ///
    /// Entering memory-save mode first saves every modified track. Tracks
    /// are then reloaded from their sources in the new mode.
    pub fn set_memory_save_mode(&mut self, active: bool) -> Result<()> {
        if active == self.config.memory_save_mode {
            return Ok(());
        }

        if active {
            info!("Switching to memory save mode, saving modified tracks");
            if self.tracks.iter().any(StreamBundle::is_dirty) {
                self.save_all()?;
            }
        } else {
            info!("Switching to full mode, loading tracks from disk");
        }
        self.config.memory_save_mode = active;

        let options = self.load_options();
        for (index, track) in self.tracks.iter_mut().enumerate() {
            let Some(source) = track.source().map(Path::to_path_buf) else {
                warn!(track = index, "Track has no source file, keeping it in memory");
                continue;
            };
            *track = read_bundle_from_file(&source, &options)?;
        }
        Ok(())
    }

    /// Play the track list as one concatenated recording.
    pub fn set_catenate_mode(&mut self, active: bool) {
        self.config.catenate_mode = active;
    }

    /// Let processing results replace their source tracks.
    pub fn set_inplace_mode(&mut self, active: bool) {
        self.config.inplace_mode = active;
    }

    fn load_options(&self) -> LoadOptions {
        self.config.load_options()
    }

    /// In memory-save mode, the full content of a track read from its
    /// source. `None` when the in-memory track is already complete.
    fn full_content(&self, index: usize) -> Result<Option<StreamBundle>> {
        if !self.config.memory_save_mode {
            return Ok(None);
        }
        let source = self.source_of(index)?;
        let full = read_bundle_from_file(&source, &LoadOptions::new())?;
        // Keep the in-memory selection.
        for (i, stream) in full.streams() {
            if let Some(current) = self.tracks[index].stream(i) {
                let selected = current.read().is_selected();
                stream.write().set_selected(selected);
            }
        }
        Ok(Some(full))
    }

    fn working_dir(&self) -> Result<PathBuf> {
        let dir = self.config.working_path.clone().ok_or(WorkspaceError::NoWorkingPath)?;
        if !dir.is_dir() {
            fs::create_dir_all(&dir).map_err(|e| {
                warn!(path = %dir.display(), error = %e, "Unable to create working directory");
                e
            })?;
        }
        Ok(dir)
    }

    fn source_of(&self, index: usize) -> Result<PathBuf> {
        self.tracks[index]
            .source()
            .map(Path::to_path_buf)
            .ok_or_else(|| WorkspaceError::NoSource { index }.into())
    }

    fn check_track(&self, index: usize) -> Result<()> {
        if index >= self.tracks.len() {
            return Err(WorkspaceError::TrackOutOfRange {
                index,
                len: self.tracks.len(),
            }
            .into());
        }
        Ok(())
    }

    fn check_stream(&self, track: usize, stream: usize) -> Result<()> {
        let len = self.tracks[track].num_streams();
        if stream >= len {
            return Err(WorkspaceError::StreamOutOfRange { track, stream, len }.into());
        }
        Ok(())
    }
}
