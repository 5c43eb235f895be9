//! Connecting code-server to Cloudflare.
//!
//! With a token the tunnel is installed as a system service and Cloudflare's
//! dashboard owns the routing. Without one we log in through the browser,
//! create a named tunnel, route the domain to it, write `config.yml` and run
//! the tunnel in the foreground.

use console::style;

use super::{print_heading, Context};
use crate::error::{Result, SetupError};
use crate::runner::{Cmd, CommandOutcome};
use crate::tunnel_config::{find_tunnel_id, TunnelConfig};

/// How the tunnel step ended without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TunnelOutcome {
    /// Token path: `cloudflared service install` succeeded.
    ServiceInstalled,
    /// Browser login was aborted or failed.
    Cancelled,
    /// No `<uuid>.json` credentials were found after creating the tunnel.
    MissingCredentials,
    /// The foreground tunnel exited on its own.
    Exited,
    /// The foreground tunnel was stopped with Ctrl-C.
    Stopped,
}

fn cloudflared() -> Cmd {
    Cmd::new("cloudflared")
}

pub async fn setup(ctx: &Context<'_>, service_url: &str) -> Result<TunnelOutcome> {
    print_heading("Step 4: Connecting to Cloudflare");

    let token = match &ctx.config.tunnel.token {
        Some(token) => token.clone(),
        None => {
            println!("To use your custom domain, we need to create a tunnel.");
            println!(
                "If you already have a Tunnel Token (from Cloudflare Dashboard -> Zero Trust -> Tunnels), paste it below."
            );
            println!("If not, leave it blank and press ENTER to log in manually via browser URL.\n");
            ctx.prompter.tunnel_token().await?
        }
    };
    let token = token.trim();

    if token.is_empty() {
        manual(ctx, service_url).await
    } else {
        install_service(ctx, token, service_url).await
    }
}

async fn install_service(ctx: &Context<'_>, token: &str, service_url: &str) -> Result<TunnelOutcome> {
    println!("Installing tunnel service...");
    ctx.runner
        .run(&cloudflared().args(["service", "install"]).secret_arg(token))
        .await?;

    println!("\n{}", style("SUCCESS! Your tunnel is installed.").green().bold());
    println!(
        "Go to your Cloudflare Dashboard -> Zero Trust -> Tunnels to configure the 'Public Hostname'."
    );
    println!("Point your custom domain to: {}", style(service_url).cyan());

    Ok(TunnelOutcome::ServiceInstalled)
}

async fn manual(ctx: &Context<'_>, service_url: &str) -> Result<TunnelOutcome> {
    let config = ctx.config;
    let name = &config.tunnel.name;

    if config.cert_path().exists() {
        println!(
            "Cloudflare credentials found at {}, skipping login.",
            config.cert_path().display()
        );
    } else {
        println!("\n{}", style("Manual Login Mode:").bold());
        println!("1. Copy the URL below and visit it in a browser.");
        println!("2. Select your custom domain.");
        println!("3. Come back here once authorized.");

        let outcome = ctx
            .runner
            .try_run(&cloudflared().args(["tunnel", "login"]))
            .await?;
        if !outcome.is_success() {
            tracing::warn!("cloudflared login did not complete: {:?}", outcome);
            println!("\nProcess cancelled.");
            return Ok(TunnelOutcome::Cancelled);
        }
    }

    println!("\nNow creating a tunnel named '{}'...", name);
    match ctx
        .runner
        .try_run(&cloudflared().args(["tunnel", "create"]).arg(name))
        .await?
    {
        CommandOutcome::Success => {}
        CommandOutcome::Interrupted => {
            println!("\nProcess cancelled.");
            return Ok(TunnelOutcome::Cancelled);
        }
        CommandOutcome::Failed(_) => {
            println!("Tunnel '{}' might already exist. Continuing...", name);
        }
    }

    print_heading("DNS ROUTING");
    let domain = match &config.tunnel.domain {
        Some(domain) => domain.clone(),
        None => ctx.prompter.domain().await?,
    };
    let domain = domain.trim();
    if domain.is_empty() {
        return Err(SetupError::DomainRequired);
    }

    let mut route = cloudflared().args(["tunnel", "route", "dns"]);
    if config.tunnel.overwrite_dns {
        route = route.arg("--overwrite-dns");
    }
    ctx.runner.run(&route.arg(name).arg(domain)).await?;

    let Some(tunnel_id) = find_tunnel_id(&config.credentials_dir)? else {
        println!("Could not find credentials file. Setup may be incomplete.");
        return Ok(TunnelOutcome::MissingCredentials);
    };

    let config_path = config.tunnel_config_path();
    TunnelConfig::new(tunnel_id, &config.credentials_dir, domain, service_url)
        .write(&config_path)
        .await?;
    println!("Configuration written to {}", config_path.display());

    println!("\nStarting the tunnel...");
    println!(
        "Access your code at: {}  (Press Ctrl+C to stop)",
        style(format!("https://{}", domain)).cyan().bold()
    );

    // Under sudo cloudflared's default lookup is root's home, not the target user's.
    let run = cloudflared()
        .arg("tunnel")
        .arg("--config")
        .arg(config_path.to_string_lossy())
        .args(["run", name.as_str()]);

    match ctx.runner.try_run(&run).await? {
        CommandOutcome::Interrupted => {
            println!("\n{}", style("Tunnel stopped.").dim());
            Ok(TunnelOutcome::Stopped)
        }
        outcome => {
            outcome.check(&run)?;
            Ok(TunnelOutcome::Exited)
        }
    }
}
