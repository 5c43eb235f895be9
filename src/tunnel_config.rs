//! cloudflared credentials discovery and the locally-managed tunnel config.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;

/// Catch-all service for requests that match no hostname.
pub const FALLBACK_SERVICE: &str = "http_status:404";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    pub service: String,
}

/// Contents of `~/.cloudflared/config.yml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunnelConfig {
    pub tunnel: String,
    #[serde(rename = "credentials-file")]
    pub credentials_file: PathBuf,
    pub ingress: Vec<IngressRule>,
}

impl TunnelConfig {
    /// Route `domain` to `service_url`, rejecting everything else with a 404.
    pub fn new(tunnel_id: Uuid, credentials_dir: &Path, domain: &str, service_url: &str) -> Self {
        Self {
            tunnel: tunnel_id.to_string(),
            credentials_file: credentials_file(credentials_dir, tunnel_id),
            ingress: vec![
                IngressRule {
                    hostname: Some(domain.to_string()),
                    service: service_url.to_string(),
                },
                IngressRule {
                    hostname: None,
                    service: FALLBACK_SERVICE.to_string(),
                },
            ],
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Write the config, replacing any previous one.
    pub async fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, self.to_yaml()?).await?;
        Ok(())
    }
}

pub fn credentials_file(credentials_dir: &Path, tunnel_id: Uuid) -> PathBuf {
    credentials_dir.join(format!("{}.json", tunnel_id))
}

/// Find the tunnel whose credentials `cloudflared tunnel create` left in `dir`.
///
/// Only `<uuid>.json` files count. When several exist the first in file name
/// order wins. A missing directory is the same as an empty one.
pub fn find_tunnel_id(dir: &Path) -> Result<Option<Uuid>> {
    if !dir.is_dir() {
        return Ok(None);
    }

    let mut ids: Vec<Uuid> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .filter_map(|path| {
            path.file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| Uuid::parse_str(stem).ok())
        })
        .collect();

    ids.sort();
    if ids.len() > 1 {
        tracing::warn!(
            "Found {} tunnel credential files in {}, using {}",
            ids.len(),
            dir.display(),
            ids[0]
        );
    }

    Ok(ids.into_iter().next())
}
