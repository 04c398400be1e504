//! Re-encode a recording.

use clap::Args;
use console::style;
use ovtrack::{read_bundle_from_file, save_bundle_with, MuxerConfig};
use std::path::PathBuf;
use tracing::info;

/// Demux a recording and write it back out.
#[derive(Args, Debug)]
pub struct CmdConvert {
    /// Input `.ov` file.
    pub input: PathBuf,

    /// Output `.ov` file.
    pub output: PathBuf,

    /// Write the legacy layout without an EBML header.
    #[arg(long)]
    pub no_ebml_header: bool,

    /// Keep only these streams (comma separated indices).
    #[arg(long, value_delimiter = ',')]
    pub streams: Vec<usize>,

    /// Skip chunks that cannot be decoded.
    #[arg(long)]
    pub lenient: bool,

    /// Overwrite the output file if it exists.
    #[arg(short = 'y', long)]
    pub overwrite: bool,
}

impl CmdConvert {
    /// Execute the convert command.
    pub fn run(&self) -> anyhow::Result<()> {
        if self.output.exists() && !self.overwrite {
            anyhow::bail!("Output file exists: {} (use -y to overwrite)", self.output.display());
        }

        let mut bundle = read_bundle_from_file(&self.input, &super::load_options(self.lenient))?;
        if !self.streams.is_empty() {
            for (index, stream) in bundle.streams() {
                stream.write().set_selected(self.streams.contains(&index));
            }
        }

        let config = if self.no_ebml_header {
            MuxerConfig::headerless()
        } else {
            MuxerConfig::default()
        };
        save_bundle_with(&mut bundle, &self.output, config)?;

        info!(input = %self.input.display(), output = %self.output.display(), "Converted");
        println!(
            "{} {} -> {} ({})",
            style("✓").green().bold(),
            self.input.display(),
            self.output.display(),
            bundle.max_duration()
        );
        Ok(())
    }
}
