use clap::Parser;
use restroute::cli::{run_cli, Cli};
use restroute::logging;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    // Held for the life of the process; dropping it flushes buffered log lines.
    let _guard = logging::init_logging()?;
    run_cli(cli)
}
