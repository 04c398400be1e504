//! ovtrack CLI - inspect, check, convert and concatenate `.ov` recordings.

mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use commands::{CmdCheck, CmdConcat, CmdConvert, CmdInfo};

/// Command-line arguments for the ovtrack tool.
#[derive(Parser, Debug)]
#[command(name = "ovtrack")]
#[command(version)]
#[command(about = "Inspect and edit OpenViBE .ov stream recordings")]
#[command(long_about = "ovtrack reads and writes OpenViBE .ov stream recordings.\n\n\
    EXAMPLES:\n    \
    ovtrack info session.ov\n    \
    ovtrack info session.ov --json\n    \
    ovtrack check session.ov\n    \
    ovtrack convert old.ov new.ov\n    \
    ovtrack concat merged.ov part1.ov part2.ov")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true, env = "OVTRACK_VERBOSE")]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the streams of a recording
    Info(CmdInfo),
    /// Report overlapping or discontinuous streams
    Check(CmdCheck),
    /// Re-encode a recording
    Convert(CmdConvert),
    /// Join recordings end to end
    Concat(CmdConcat),
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();
    init_logging(args.verbose);

    let success = match &args.command {
        Command::Info(cmd) => cmd.run().map(|()| true)?,
        Command::Check(cmd) => cmd.run()?,
        Command::Convert(cmd) => cmd.run().map(|()| true)?,
        Command::Concat(cmd) => cmd.run().map(|()| true)?,
    };

    Ok(if success { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_concat() {
        let args = Args::try_parse_from(["ovtrack", "concat", "out.ov", "a.ov", "b.ov", "--gap-ms", "250"]).unwrap();
        match args.command {
            Command::Concat(cmd) => {
                assert_eq!(cmd.inputs.len(), 2);
                assert_eq!(cmd.gap_ms, 250);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_concat_needs_an_input() {
        assert!(Args::try_parse_from(["ovtrack", "concat", "out.ov"]).is_err());
    }
}
