//! Stream timing diagnostics command.

use clap::Args;
use console::style;
use ovtrack::report::Issue;
use ovtrack::{read_bundle_from_file, CheckReport};
use std::path::PathBuf;

/// Report overlapping or discontinuous streams.
#[derive(Args, Debug)]
pub struct CmdCheck {
    /// Path to the `.ov` file.
    pub file: PathBuf,

    /// Output in JSON format.
    #[arg(long)]
    pub json: bool,

    /// Skip chunks that cannot be decoded.
    #[arg(long)]
    pub lenient: bool,
}

impl CmdCheck {
    /// Execute the check command. Returns false if problems were found.
    pub fn run(&self) -> anyhow::Result<bool> {
        let bundle = read_bundle_from_file(&self.file, &super::load_options(self.lenient))?;
        let report = CheckReport::of(&bundle);

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
            return Ok(report.is_clean());
        }

        for stream in &report.streams {
            let status = if stream.issues.is_empty() {
                style("ok".to_string()).green()
            } else if stream.issues == [Issue::Undecodable] {
                style("undecodable".to_string()).yellow()
            } else {
                let names: Vec<&str> = stream.issues.iter().map(|i| issue_name(*i)).collect();
                style(names.join(", ")).red()
            };
            println!("  Stream #{:<3} {:<22} {}", stream.index, stream.kind, status);
        }

        if report.is_clean() {
            println!("{} {}", style("✓").green().bold(), self.file.display());
        } else {
            println!("{} {}: timing problems found", style("✗").red().bold(), self.file.display());
        }
        Ok(report.is_clean())
    }
}

fn issue_name(issue: Issue) -> &'static str {
    match issue {
        Issue::Overlapping => "overlapping chunks",
        Issue::Noncontinuous => "gaps between chunks",
        Issue::Undecodable => "undecodable",
    }
}
