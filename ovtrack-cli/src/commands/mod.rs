//! CLI subcommand implementations.

pub mod check;
pub mod concat;
pub mod convert;
pub mod info;

pub use check::CmdCheck;
pub use concat::CmdConcat;
pub use convert::CmdConvert;
pub use info::CmdInfo;

use ovtrack::LoadOptions;

/// Load options shared by the subcommands.
fn load_options(lenient: bool) -> LoadOptions {
    if lenient {
        LoadOptions::new().lenient()
    } else {
        LoadOptions::new()
    }
}
