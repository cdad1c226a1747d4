mod commands;
mod terminal;

use std::process::ExitCode;

use commands::{CommandLine, inventory};
use terminal::{logging, print};
use tracing::error;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let commands = CommandLine::parse_args();

    logging::init(commands.log_level.map(Into::into), commands.verbosity_level());

    let cfg = commands.to_config();
    print::banner(cfg.no_banner, cfg.quiet);

    match inventory::inventory(&cfg).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
