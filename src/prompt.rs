use async_trait::async_trait;
use dialoguer::{Input, Password};

use crate::error::{Result, SetupError};
use crate::interrupt::interruptible;

/// Interactive questions asked during tunnel setup.
#[async_trait]
pub trait Prompter: Send + Sync {
    /// A pre-issued tunnel token, or an empty string to log in through the browser.
    async fn tunnel_token(&self) -> Result<String>;

    /// The public hostname to route to the tunnel.
    async fn domain(&self) -> Result<String>;
}

/// Terminal prompts.
#[derive(Debug, Default)]
pub struct TerminalPrompter;

#[async_trait]
impl Prompter for TerminalPrompter {
    async fn tunnel_token(&self) -> Result<String> {
        let token = ask("the tunnel token prompt", || {
            Password::new()
                .with_prompt("Paste Cloudflare Tunnel Token (or press Enter to login manually)")
                .allow_empty_password(true)
                .interact()
        })
        .await?;
        Ok(token.trim().to_string())
    }

    async fn domain(&self) -> Result<String> {
        let domain = ask("the domain prompt", || {
            Input::<String>::new()
                .with_prompt("Enter the full domain you want to use (e.g., code.example.com)")
                .allow_empty(true)
                .interact_text()
        })
        .await?;
        Ok(domain.trim().to_string())
    }
}

/// Dialoguer reads block, and the read restarts after our SIGINT handler runs,
/// so the prompt sits on a blocking thread while Ctrl-C is watched here.
async fn ask<F>(during: &str, prompt: F) -> Result<String>
where
    F: FnOnce() -> dialoguer::Result<String> + Send + 'static,
{
    interruptible(during, async {
        let answer = tokio::task::spawn_blocking(prompt)
            .await
            .map_err(|e| anyhow::anyhow!("Prompt task failed: {}", e))??;
        Ok::<_, SetupError>(answer)
    })
    .await
}
