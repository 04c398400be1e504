//! Recording inspection command.

use clap::Args;
use console::style;
use ovtrack::{read_bundle_from_file, BundleSummary, LoadMode};
use serde::Serialize;
use std::path::PathBuf;

/// Recording information.
#[derive(Debug, Clone, Serialize)]
pub struct RecordingInfo {
    /// File path.
    pub file: String,
    /// File size in bytes.
    pub size_bytes: u64,
    /// Longest stream duration in seconds.
    pub duration_seconds: f64,
    /// Per-stream details.
    #[serde(flatten)]
    pub summary: BundleSummary,
}

/// Inspect a recording.
#[derive(Args, Debug)]
pub struct CmdInfo {
    /// Path to the `.ov` file.
    pub file: PathBuf,

    /// Output in JSON format.
    #[arg(long)]
    pub json: bool,

    /// Read stream headers only.
    #[arg(long)]
    pub headers_only: bool,

    /// Skip chunks that cannot be decoded.
    #[arg(long)]
    pub lenient: bool,
}

impl CmdInfo {
    /// Execute the info command.
    pub fn run(&self) -> anyhow::Result<()> {
        if !self.file.exists() {
            anyhow::bail!("File not found: {}", self.file.display());
        }
        let size_bytes = std::fs::metadata(&self.file)?.len();

        let mode = if self.headers_only {
            LoadMode::HeadersOnly
        } else {
            LoadMode::Full
        };
        let bundle = read_bundle_from_file(&self.file, &super::load_options(self.lenient).mode(mode))?;
        let summary = BundleSummary::of(&bundle);

        let info = RecordingInfo {
            file: self.file.display().to_string(),
            size_bytes,
            duration_seconds: summary.max_duration.to_seconds(),
            summary,
        };

        if self.json {
            println!("{}", serde_json::to_string_pretty(&info)?);
        } else {
            print_info(&info);
        }
        Ok(())
    }
}

fn print_info(info: &RecordingInfo) {
    println!();
    println!("{}", style("Recording Information").cyan().bold());
    println!();
    println!("  {:<16} {}", style("File:").white(), info.file);
    println!("  {:<16} {}", style("Size:").white(), format_size(info.size_bytes));
    println!("  {:<16} {}", style("Duration:").white(), info.summary.max_duration);
    println!("  {:<16} {}", style("Chunks:").white(), info.summary.total_chunks());

    if info.summary.streams.is_empty() {
        return;
    }
    println!();
    println!("{}", style("Streams:").cyan().bold());
    for stream in &info.summary.streams {
        let kind = if stream.decodable {
            style(stream.kind.clone()).green()
        } else {
            style(stream.kind.clone()).yellow()
        };
        let type_id = stream
            .type_id
            .map(|id| format!("0x{id:016X}"))
            .unwrap_or_else(|| "-".to_string());
        println!();
        println!("  {} #{} {}", style("Stream").bold(), stream.index, kind);
        println!("    {:<14} {}", style("Type:").dim(), type_id);
        println!("    {:<14} {}", style("Chunks:").dim(), stream.chunks);
        println!("    {:<14} {}", style("Start:").dim(), stream.start);
        println!("    {:<14} {}", style("Duration:").dim(), stream.duration);
        if !stream.selected {
            println!("    {}", style("(not selected)").dim());
        }
    }
    println!();
}

/// Format a byte count for display.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.00 MB");
    }
}
