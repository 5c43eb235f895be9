//! code-server installation and service enablement.

use std::path::Path;
use std::time::Duration;

use console::style;
use indicatif::ProgressBar;
use serde_yaml::Value;

use super::{print_heading, Context};
use crate::error::Result;
use crate::interrupt::interruptible;
use crate::runner::Cmd;

/// Used when code-server's config does not say where it listens.
pub const DEFAULT_SERVICE_URL: &str = "http://localhost:8080";

/// The fields we care about from `~/.config/code-server/config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeServerConfig {
    pub bind_addr: Option<String>,
    pub auth: Option<String>,
    pub password: Option<String>,
}

impl CodeServerConfig {
    /// Parse the config as YAML, falling back to a line scan for the password.
    pub fn parse(content: &str) -> Self {
        let doc = match serde_yaml::from_str::<Value>(content) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::debug!("code-server config is not valid YAML ({}), scanning lines", e);
                return Self {
                    password: scan_password(content),
                    ..Default::default()
                };
            }
        };

        let string_field = |key: &str| doc.get(key).and_then(Value::as_str).map(str::to_string);

        // A password that YAML reads as a number or bool must be taken verbatim.
        let password = match doc.get("password") {
            Some(Value::String(password)) => Some(password.clone()).filter(|p| !p.is_empty()),
            Some(Value::Null) | None => None,
            Some(_) => scan_password(content),
        };

        Self {
            bind_addr: string_field("bind-addr"),
            auth: string_field("auth"),
            password,
        }
    }

    /// Read the config, `Ok(None)` if code-server has not written it yet.
    pub fn load(path: &Path) -> std::io::Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        Ok(Some(Self::parse(&content)))
    }

    pub fn service_url(&self) -> Option<String> {
        self.bind_addr.as_ref().map(|addr| format!("http://{}", addr))
    }
}

/// Value of the first line that starts with the `password:` key.
///
/// Other keys ending in `password` (`hashed-password:`) never match, and an
/// empty value is no password.
pub fn scan_password(content: &str) -> Option<String> {
    content
        .lines()
        .find_map(|line| line.trim_start().strip_prefix("password:"))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// What the installer step learned about the running service.
#[derive(Debug, Clone, Default)]
pub struct CodeServerStatus {
    pub config: Option<CodeServerConfig>,
}

impl CodeServerStatus {
    pub fn service_url(&self) -> Option<String> {
        self.config.as_ref().and_then(CodeServerConfig::service_url)
    }
}

pub async fn install(ctx: &Context<'_>) -> Result<CodeServerStatus> {
    let settings = &ctx.config.code_server;
    let user = &ctx.config.user;

    print_heading("Step 1: Installing code-server");
    if settings.binary.exists() {
        println!("code-server is already installed.");
    } else {
        println!("Downloading and running install script...");
        let script = ctx.downloader.fetch(&settings.install_script_url).await?;
        ctx.runner.run(&Cmd::new("sh").stdin(script)).await?;
    }

    print_heading("Step 2: Enabling code-server service");
    if user.is_root() {
        println!(
            "{} Running code-server as root is not recommended.",
            style("Warning:").yellow().bold()
        );
    }

    println!("Enabling systemd service for user: {}", style(&user.name).cyan());
    ctx.runner
        .run(
            &Cmd::new("systemctl")
                .args(["enable", "--now"])
                .arg(format!("code-server@{}", user.name)),
        )
        .await?;

    wait_for_config(settings.settle_delay_secs).await?;

    Ok(report(&ctx.config.code_server_config))
}

async fn wait_for_config(secs: u64) -> Result<()> {
    if secs == 0 {
        return Ok(());
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_message("Waiting for code-server to write its config...");
    spinner.enable_steady_tick(Duration::from_millis(100));
    let waited = interruptible("waiting for code-server", async {
        tokio::time::sleep(Duration::from_secs(secs)).await;
        Ok(())
    })
    .await;
    spinner.finish_and_clear();
    waited
}

/// Print the password if the config is there. Never fails the setup.
fn report(path: &Path) -> CodeServerStatus {
    match CodeServerConfig::load(path) {
        Ok(Some(config)) => {
            println!("\n{}", style("SUCCESS: code-server is running!").green().bold());
            match &config.password {
                Some(password) => println!(
                    "YOUR LOGIN PASSWORD IS: {}",
                    style(password).bold()
                ),
                None => println!("No password is set in {}", path.display()),
            }
            CodeServerStatus {
                config: Some(config),
            }
        }
        Ok(None) => {
            println!(
                "\n{} Could not find config file to show password yet. It may take a moment to generate.",
                style("Note:").yellow()
            );
            CodeServerStatus::default()
        }
        Err(e) => {
            tracing::warn!("Could not read {}: {}", path.display(), e);
            println!("Could not read password file at {}", path.display());
            CodeServerStatus::default()
        }
    }
}
