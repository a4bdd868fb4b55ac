mod commands;
mod terminal;

use std::process::ExitCode;

use commands::{CommandLine, scan};
use terminal::logging;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let commands = CommandLine::parse_args();

    logging::init(commands.verbose, commands.quiet);

    scan::scan(&commands).await
}
