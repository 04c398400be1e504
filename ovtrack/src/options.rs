//! Loading options and workspace configuration.

use ovtrack_ebml::{DemuxerConfig, MuxerConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How much of a file is read when loading a bundle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoadMode {
    /// Read every chunk.
    #[default]
    Full,
    /// Stop once every declared stream has received its header.
    HeadersOnly,
}

/// Options for reading a bundle from a file.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// How much of the file to read.
    pub mode: LoadMode,
    /// Demuxer settings.
    pub demuxer: DemuxerConfig,
}

impl LoadOptions {
    /// Load every chunk with strict payload decoding.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load stream headers only.
    #[must_use]
    pub fn headers_only() -> Self {
        Self::new().mode(LoadMode::HeadersOnly)
    }

    /// Set the load mode.
    #[must_use]
    pub fn mode(mut self, mode: LoadMode) -> Self {
        self.mode = mode;
        self
    }

    /// Skip undecodable chunks instead of failing.
    #[must_use]
    pub fn lenient(mut self) -> Self {
        self.demuxer.strict = false;
        self
    }

    /// Set the read block size.
    #[must_use]
    pub fn block_size(mut self, block_size: usize) -> Self {
        self.demuxer = self.demuxer.with_block_size(block_size);
        self
    }

    /// Set the demuxer configuration.
    #[must_use]
    pub fn demuxer_config(mut self, config: DemuxerConfig) -> Self {
        self.demuxer = config;
        self
    }
}

/// Track workspace configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Directory where modified tracks are saved.
    pub working_path: Option<PathBuf>,
    /// Play the track list as one concatenated recording.
    pub catenate_mode: bool,
    /// Keep only stream headers in memory.
    pub memory_save_mode: bool,
    /// Save tracks back over their source files instead of the working path.
    pub inplace_mode: bool,
    /// Write an EBML header when saving.
    pub write_ebml_header: bool,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            working_path: None,
            catenate_mode: false,
            memory_save_mode: false,
            inplace_mode: false,
            write_ebml_header: true,
        }
    }
}

impl WorkspaceConfig {
    /// Default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the working directory.
    #[must_use]
    pub fn working_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.working_path = Some(path.into());
        self
    }

    /// Enable or disable catenate mode.
    #[must_use]
    pub fn catenate_mode(mut self, active: bool) -> Self {
        self.catenate_mode = active;
        self
    }

    /// Enable or disable memory-save mode.
    #[must_use]
    pub fn memory_save_mode(mut self, active: bool) -> Self {
        self.memory_save_mode = active;
        self
    }

    /// Enable or disable in-place saving.
    #[must_use]
    pub fn inplace_mode(mut self, active: bool) -> Self {
        self.inplace_mode = active;
        self
    }

    /// Load options matching the current memory mode.
    pub fn load_options(&self) -> LoadOptions {
        if self.memory_save_mode {
            LoadOptions::headers_only()
        } else {
            LoadOptions::new()
        }
    }

    /// Muxer configuration used when saving tracks.
    pub fn muxer_config(&self) -> MuxerConfig {
        if self.write_ebml_header {
            MuxerConfig::default()
        } else {
            MuxerConfig::headerless()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_options_builder() {
        let options = LoadOptions::new().lenient().block_size(16);
        assert_eq!(options.mode, LoadMode::Full);
        assert!(!options.demuxer.strict);
        assert_eq!(options.demuxer.block_size, 16);
        assert_eq!(LoadOptions::headers_only().mode, LoadMode::HeadersOnly);
    }

    #[test]
    fn test_workspace_load_options_follow_memory_mode() {
        let config = WorkspaceConfig::new().memory_save_mode(true);
        assert_eq!(config.load_options().mode, LoadMode::HeadersOnly);
        assert_eq!(WorkspaceConfig::new().load_options().mode, LoadMode::Full);
    }

    #[test]
    fn test_load_mode_serde_names() {
        assert_eq!(serde_json::to_string(&LoadMode::HeadersOnly).unwrap(), "\"headers-only\"");
    }
}
