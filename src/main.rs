//! SpaceLens: progressive disk usage explorer.
//!
//! Thin binary entry point. All logic lives in the `spacelens-core`
//! and `spacelens-cli` crates.

use clap::Parser;

fn main() -> anyhow::Result<()> {
    let cli = spacelens_cli::Cli::parse();

    // Initialise structured logging. Reports go to stdout, logs to stderr.
    tracing_subscriber::fmt()
        .with_max_level(cli.log_level())
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("SpaceLens starting");

    spacelens_cli::run(&cli)
}
