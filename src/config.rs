use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SetupError};

/// The account the IDE service runs as and whose home holds the generated files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetUser {
    pub name: String,
    pub home: PathBuf,
}

impl TargetUser {
    /// Resolve from the sudo origin user, falling back to the current user.
    pub fn from_env() -> Result<Self> {
        Self::resolve(std::env::var("SUDO_USER").ok(), std::env::var("USER").ok())
    }

    pub fn resolve(sudo_user: Option<String>, user: Option<String>) -> Result<Self> {
        let name = sudo_user
            .filter(|u| !u.is_empty())
            .or(user.filter(|u| !u.is_empty()))
            .ok_or_else(|| {
                SetupError::Config("neither SUDO_USER nor USER is set".to_string())
            })?;

        let home = if name == "root" {
            PathBuf::from("/root")
        } else {
            PathBuf::from("/home").join(&name)
        };

        Ok(Self { name, home })
    }

    pub fn is_root(&self) -> bool {
        self.name == "root"
    }

    pub fn code_server_config(&self) -> PathBuf {
        self.home.join(".config").join("code-server").join("config.yaml")
    }

    pub fn credentials_dir(&self) -> PathBuf {
        self.home.join(".cloudflared")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CodeServerSettings {
    pub binary: PathBuf,
    pub install_script_url: String,
    /// Seconds to wait after starting the service before reading its config.
    pub settle_delay_secs: u64,
}

impl Default for CodeServerSettings {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("/usr/bin/code-server"),
            install_script_url: "https://code-server.dev/install.sh".to_string(),
            settle_delay_secs: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudflaredSettings {
    /// Any of these existing means the client is already installed.
    pub binaries: Vec<PathBuf>,
    pub keyring_dir: PathBuf,
    pub keyring_path: PathBuf,
    pub gpg_key_url: String,
    pub sources_list: PathBuf,
    pub repo_url: String,
    pub codename: String,
}

impl Default for CloudflaredSettings {
    fn default() -> Self {
        Self {
            binaries: vec![
                PathBuf::from("/usr/bin/cloudflared"),
                PathBuf::from("/usr/local/bin/cloudflared"),
            ],
            keyring_dir: PathBuf::from("/usr/share/keyrings"),
            keyring_path: PathBuf::from("/usr/share/keyrings/cloudflare-main.gpg"),
            gpg_key_url: "https://pkg.cloudflare.com/cloudflare-main.gpg".to_string(),
            sources_list: PathBuf::from("/etc/apt/sources.list.d/cloudflared.list"),
            repo_url: "https://pkg.cloudflare.com/cloudflared".to_string(),
            codename: "jammy".to_string(),
        }
    }
}

impl CloudflaredSettings {
    pub fn apt_source_line(&self) -> String {
        format!(
            "deb [signed-by={}] {} {} main\n",
            self.keyring_path.display(),
            self.repo_url,
            self.codename
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TunnelSettings {
    pub name: String,
    /// Local address the ingress rule points at. When unset it is derived
    /// from code-server's `bind-addr`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_url: Option<String>,
    /// Pass `-f` to `tunnel route dns` so an existing record is replaced.
    pub overwrite_dns: bool,
    #[serde(skip)]
    pub token: Option<String>,
    #[serde(skip)]
    pub domain: Option<String>,
}

impl Default for TunnelSettings {
    fn default() -> Self {
        Self {
            name: "vscode".to_string(),
            service_url: None,
            overwrite_dns: false,
            token: None,
            domain: None,
        }
    }
}

/// Overrides accepted from a YAML file passed with `--config`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub code_server: CodeServerSettings,
    pub cloudflared: CloudflaredSettings,
    pub tunnel: TunnelSettings,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let expanded = shellexpand::tilde(&path.to_string_lossy()).to_string();
        let path = PathBuf::from(expanded);

        if !path.exists() {
            return Err(SetupError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(&path)?;
        serde_yaml::from_str(&content)
            .map_err(|e| SetupError::Config(format!("Invalid config: {}", e)))
    }
}

/// Everything the setup steps need, resolved once at startup.
#[derive(Debug, Clone)]
pub struct SetupConfig {
    pub user: TargetUser,
    pub code_server: CodeServerSettings,
    pub cloudflared: CloudflaredSettings,
    pub tunnel: TunnelSettings,
    /// Location of code-server's generated config.
    pub code_server_config: PathBuf,
    /// Directory cloudflared writes `cert.pem` and `<uuid>.json` into.
    pub credentials_dir: PathBuf,
}

impl SetupConfig {
    pub fn new(user: TargetUser, file: FileConfig) -> Self {
        Self {
            code_server_config: user.code_server_config(),
            credentials_dir: user.credentials_dir(),
            user,
            code_server: file.code_server,
            cloudflared: file.cloudflared,
            tunnel: file.tunnel,
        }
    }

    /// Resolve the target user from the environment and apply an optional overrides file.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let user = TargetUser::from_env()?;
        let file = match config_file {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Ok(Self::new(user, file))
    }

    pub fn tunnel_config_path(&self) -> PathBuf {
        self.credentials_dir.join("config.yml")
    }

    pub fn cert_path(&self) -> PathBuf {
        self.credentials_dir.join("cert.pem")
    }
}
