use console::style;

use crate::config::SetupConfig;
use crate::download::Downloader;
use crate::error::{Result, SetupError};
use crate::prompt::TerminalPrompter;
use crate::runner::SystemRunner;
use crate::steps::code_server::{self, DEFAULT_SERVICE_URL};
use crate::steps::tunnel::{self, TunnelOutcome};
use crate::steps::{cloudflared, Context};

/// Installing packages and system services needs an effective uid of 0.
pub fn require_root() -> Result<()> {
    ensure_root(is_root())
}

#[cfg(unix)]
fn is_root() -> bool {
    nix::unistd::geteuid().is_root()
}

#[cfg(not(unix))]
fn is_root() -> bool {
    false
}

fn ensure_root(is_root: bool) -> Result<()> {
    if is_root {
        Ok(())
    } else {
        Err(SetupError::NotRoot)
    }
}

pub async fn execute(config: &SetupConfig) -> Result<()> {
    println!(
        "{}",
        style("Setting up code-server with Cloudflare Tunnel").bold().cyan()
    );
    tracing::debug!("Target user {} (home {})", config.user.name, config.user.home.display());

    let runner = SystemRunner;
    let downloader = Downloader::new()?;
    let prompter = TerminalPrompter;
    let ctx = Context {
        config,
        runner: &runner,
        downloader: &downloader,
        prompter: &prompter,
    };

    let outcome = run(&ctx).await?;
    tracing::debug!("Tunnel step finished: {:?}", outcome);
    Ok(())
}

/// Run every step in order. The first fatal error stops the rest.
pub async fn run(ctx: &Context<'_>) -> Result<TunnelOutcome> {
    let status = code_server::install(ctx).await?;
    cloudflared::install(ctx).await?;

    let service_url = ctx
        .config
        .tunnel
        .service_url
        .clone()
        .or_else(|| status.service_url())
        .unwrap_or_else(|| DEFAULT_SERVICE_URL.to_string());

    tunnel::setup(ctx, &service_url).await
}
