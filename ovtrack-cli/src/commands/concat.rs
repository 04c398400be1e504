//! Concatenate recordings.

use clap::Args;
use console::style;
use ovtrack::concat::catenate_with;
use ovtrack::{read_bundle_from_file, ConcatConfig, StreamBundle, Time};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

/// Join recordings end to end.
#[derive(Args, Debug)]
pub struct CmdConcat {
    /// Output `.ov` file.
    pub output: PathBuf,

    /// Input `.ov` files, in playback order.
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Pause inserted between recordings, in milliseconds.
    #[arg(long, default_value_t = 0)]
    pub gap_ms: u64,

    /// Skip chunks that cannot be decoded.
    #[arg(long)]
    pub lenient: bool,

    /// Overwrite the output file if it exists.
    #[arg(short = 'y', long)]
    pub overwrite: bool,
}

impl CmdConcat {
    /// Execute the concat command.
    pub fn run(&self) -> anyhow::Result<()> {
        if self.output.exists() && !self.overwrite {
            anyhow::bail!("Output file exists: {} (use -y to overwrite)", self.output.display());
        }

        let options = super::load_options(self.lenient);
        let bundles = self
            .inputs
            .iter()
            .map(|path| read_bundle_from_file(path, &options))
            .collect::<Result<Vec<StreamBundle>, _>>()?;
        let refs: Vec<&StreamBundle> = bundles.iter().collect();

        let config = ConcatConfig::new().with_gap(Time::from_millis(self.gap_ms));
        let mut writer = BufWriter::new(File::create(&self.output)?);
        let duration = catenate_with(&refs, &mut writer, &config)?;
        writer.flush()?;

        println!(
            "{} {} recordings -> {} ({})",
            style("✓").green().bold(),
            bundles.len(),
            self.output.display(),
            duration
        );
        Ok(())
    }
}
