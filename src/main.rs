mod cli;
mod config;
mod download;
mod error;
mod interrupt;
mod prompt;
mod runner;
mod steps;
mod tunnel_config;

use clap::Parser;
use console::style;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::Cli;
use error::SetupError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "codetunnel=debug"
    } else {
        "codetunnel=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();

    let terminal = interrupt::TerminalGuard::capture();

    if let Err(e) = cli.execute().await {
        terminal.restore();
        eprintln!("\n{} {}", style("✗").red().bold(), e);
        if matches!(e, SetupError::NotRoot) {
            eprintln!("Usage: sudo codetunnel");
        }
        std::process::exit(1);
    }
}
