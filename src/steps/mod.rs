//! The setup steps, run in order by `cli::commands::setup`.
//!
//! Each step takes a [`Context`] so the external world (processes, network,
//! prompts) can be swapped out in tests.

pub mod cloudflared;
pub mod code_server;
pub mod tunnel;

use console::style;

use crate::config::SetupConfig;
use crate::download::Downloader;
use crate::prompt::Prompter;
use crate::runner::CommandRunner;

pub struct Context<'a> {
    pub config: &'a SetupConfig,
    pub runner: &'a dyn CommandRunner,
    pub downloader: &'a Downloader,
    pub prompter: &'a dyn Prompter,
}

pub(crate) fn print_heading(title: &str) {
    println!("\n{}", style(format!("--- {} ---", title)).bold().cyan());
}
