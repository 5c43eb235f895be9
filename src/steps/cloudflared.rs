//! cloudflared installation from Cloudflare's apt repository.

use std::path::Path;

use super::{print_heading, Context};
use crate::config::CloudflaredSettings;
use crate::error::Result;
use crate::runner::Cmd;

pub fn is_installed(settings: &CloudflaredSettings) -> bool {
    settings.binaries.iter().any(|bin| bin.exists())
}

pub async fn install(ctx: &Context<'_>) -> Result<()> {
    let settings = &ctx.config.cloudflared;

    print_heading("Step 3: Installing Cloudflare Tunnel (cloudflared)");
    if is_installed(settings) {
        println!("cloudflared is already installed.");
        return Ok(());
    }

    println!("Adding Cloudflare GPG key and Repo...");
    create_keyring_dir(&settings.keyring_dir).await?;

    let key = ctx.downloader.fetch(&settings.gpg_key_url).await?;
    tokio::fs::write(&settings.keyring_path, key).await?;
    tracing::debug!("Stored signing key at {}", settings.keyring_path.display());

    if let Some(parent) = settings.sources_list.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&settings.sources_list, settings.apt_source_line()).await?;
    tracing::debug!("Wrote apt source {}", settings.sources_list.display());

    println!("Updating apt and installing...");
    ctx.runner.run(&Cmd::new("apt-get").arg("update")).await?;
    ctx.runner
        .run(&Cmd::new("apt-get").args(["install", "-y", "cloudflared"]))
        .await?;

    Ok(())
}

async fn create_keyring_dir(dir: &Path) -> Result<()> {
    tokio::fs::create_dir_all(dir).await?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o755)).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::config::{FileConfig, SetupConfig, TargetUser};
    use crate::download::Downloader;
    use crate::prompt::testing::ScriptedPrompter;
    use crate::runner::testing::RecordingRunner;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(root: &Path) -> SetupConfig {
        let user = TargetUser {
            name: "dev".to_string(),
            home: root.join("home"),
        };
        let mut config = SetupConfig::new(user, FileConfig::default());
        config.cloudflared.binaries = vec![
            root.join("usr/bin/cloudflared"),
            root.join("usr/local/bin/cloudflared"),
        ];
        config.cloudflared.keyring_dir = root.join("keyrings");
        config.cloudflared.keyring_path = root.join("keyrings/cloudflare-main.gpg");
        config.cloudflared.sources_list = root.join("sources.list.d/cloudflared.list");
        config
    }

    #[tokio::test]
    async fn test_skips_when_any_binary_exists() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = test_config(temp_dir.path());
        let local_bin: PathBuf = config.cloudflared.binaries[1].clone();
        std::fs::create_dir_all(local_bin.parent().unwrap()).unwrap();
        std::fs::write(&local_bin, "").unwrap();

        let runner = RecordingRunner::new();
        let downloader = Downloader::new().unwrap();
        let prompter = ScriptedPrompter::default();
        let ctx = Context {
            config: &config,
            runner: &runner,
            downloader: &downloader,
            prompter: &prompter,
        };

        install(&ctx).await.unwrap();
        assert!(runner.calls().is_empty());
        assert!(!config.cloudflared.sources_list.exists());
    }

    #[tokio::test]
    async fn test_adds_repository_and_installs() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cloudflare-main.gpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"gpg-key-bytes".to_vec()))
            .mount(&mock_server)
            .await;

        let temp_dir = tempfile::tempdir().unwrap();
        let mut config = test_config(temp_dir.path());
        config.cloudflared.gpg_key_url = format!("{}/cloudflare-main.gpg", mock_server.uri());

        let runner = RecordingRunner::new();
        let downloader = Downloader::new().unwrap();
        let prompter = ScriptedPrompter::default();
        let ctx = Context {
            config: &config,
            runner: &runner,
            downloader: &downloader,
            prompter: &prompter,
        };

        install(&ctx).await.unwrap();

        assert_eq!(
            std::fs::read(&config.cloudflared.keyring_path).unwrap(),
            b"gpg-key-bytes"
        );
        let source = std::fs::read_to_string(&config.cloudflared.sources_list).unwrap();
        assert!(source.starts_with("deb [signed-by="));
        assert!(source.contains("https://pkg.cloudflare.com/cloudflared jammy main"));
        assert_eq!(
            runner.argvs(),
            vec![
                vec!["apt-get", "update"],
                vec!["apt-get", "install", "-y", "cloudflared"],
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_update_skips_install() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"key".to_vec()))
            .mount(&mock_server)
            .await;

        let temp_dir = tempfile::tempdir().unwrap();
        let mut config = test_config(temp_dir.path());
        config.cloudflared.gpg_key_url = format!("{}/key.gpg", mock_server.uri());

        let runner = RecordingRunner::new().failing(&["apt-get", "update"]);
        let downloader = Downloader::new().unwrap();
        let prompter = ScriptedPrompter::default();
        let ctx = Context {
            config: &config,
            runner: &runner,
            downloader: &downloader,
            prompter: &prompter,
        };

        assert!(install(&ctx).await.is_err());
        assert!(!runner.ran(&["apt-get", "install"]));
    }

    #[tokio::test]
    async fn test_key_download_failure_is_fatal() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let temp_dir = tempfile::tempdir().unwrap();
        let mut config = test_config(temp_dir.path());
        config.cloudflared.gpg_key_url = format!("{}/key.gpg", mock_server.uri());

        let runner = RecordingRunner::new();
        let downloader = Downloader::new().unwrap();
        let prompter = ScriptedPrompter::default();
        let ctx = Context {
            config: &config,
            runner: &runner,
            downloader: &downloader,
            prompter: &prompter,
        };

        assert!(install(&ctx).await.is_err());
        assert!(runner.calls().is_empty());
        assert!(!config.cloudflared.sources_list.exists());
    }
}
