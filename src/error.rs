use thiserror::Error;

#[derive(Error, Debug)]
pub enum SetupError {
    /// An external command exited unsuccessfully or could not be spawned.
    #[error("Error running command: {command}\nDetails: {detail}")]
    Command { command: String, detail: String },

    /// Ctrl-C during a fatal command, a download, the settle delay or a prompt.
    #[error("Interrupted while {during}")]
    Interrupted { during: String },

    #[error("This program must be run as root (use sudo).")]
    NotRoot,

    #[error("A domain is required to route the tunnel (e.g. code.example.com)")]
    DomainRequired,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Dialog error: {0}")]
    Dialog(#[from] dialoguer::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, SetupError>;
