//! Forge: star catalog uniformization CLI
//!
//! Bins a catalog on a HEALPix grid, drops near-duplicates, and keeps the
//! best few rows per cell in sweep order.

mod cli;
mod region;
mod uniformize;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Commands::Uniformize(args) => uniformize::run(args, &cli),
        Commands::Region(args) => region::run(args, &cli),
    }
}

/// `RUST_LOG` wins; otherwise `info`, or `debug` with `--verbose`.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
