mod cli;
mod commands;

use anyhow::Result;
use imagery_coverage::Config;
use tracing_subscriber::{fmt, EnvFilter};

use cli::{Cli, Commands};
use commands::{coverage, nearest, tiles};

/// `RUST_LOG` wins; otherwise -v raises the level from warn to info, -vv to debug.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    fmt().with_env_filter(filter).with_target(false).with_writer(std::io::stderr).init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    Ok(config.with_env())
}

pub async fn run() -> Result<()> {
    use clap::Parser;

    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = load_config(&cli)?;
    match &cli.command {
        Commands::Tiles(args) => tiles::run(&config, args),
        Commands::Coverage(args) => coverage::run(config, args).await,
        Commands::Nearest(args) => nearest::run(config, args).await,
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> { run().await }
