pub mod commands;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::SetupConfig;
use crate::error::Result;

#[derive(Parser)]
#[command(name = "codetunnel")]
#[command(version)]
#[command(about = "Install code-server and expose it through a Cloudflare tunnel")]
#[command(long_about = "Installs code-server, enables it as a systemd service, installs cloudflared and \
connects the editor to your own domain.\n\nNo inbound firewall rules needed.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// YAML file overriding install paths, URLs and tunnel settings
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Install code-server and cloudflared, then connect the tunnel (default)
    Setup(SetupArgs),

    /// Print the code-server login password
    Password,
}

#[derive(Args, Debug, Default, Clone)]
pub struct SetupArgs {
    /// Pre-issued tunnel token; skips the browser login
    #[arg(long, env = "CODETUNNEL_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Public hostname to route to the editor (e.g. code.example.com)
    #[arg(short, long)]
    pub domain: Option<String>,

    /// Name of the tunnel to create
    #[arg(long)]
    pub tunnel_name: Option<String>,

    /// Local address the tunnel forwards to (default: code-server's bind-addr)
    #[arg(long)]
    pub service_url: Option<String>,

    /// Replace an existing DNS record for the domain
    #[arg(long)]
    pub overwrite_dns: bool,
}

impl SetupArgs {
    /// Flags win over the config file.
    pub fn apply(self, config: &mut SetupConfig) {
        if self.token.is_some() {
            config.tunnel.token = self.token;
        }
        if self.domain.is_some() {
            config.tunnel.domain = self.domain;
        }
        if let Some(name) = self.tunnel_name {
            config.tunnel.name = name;
        }
        if self.service_url.is_some() {
            config.tunnel.service_url = self.service_url;
        }
        if self.overwrite_dns {
            config.tunnel.overwrite_dns = true;
        }
    }
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let config_file = self.config.as_deref();

        match self.command.unwrap_or_else(|| Commands::Setup(SetupArgs::default())) {
            Commands::Setup(args) => {
                commands::setup::require_root()?;
                let mut config = SetupConfig::load(config_file)?;
                args.apply(&mut config);
                commands::setup::execute(&config).await
            }
            Commands::Password => {
                let config = SetupConfig::load(config_file)?;
                commands::password::execute(&config)
            }
        }
    }
}
