use std::path::PathBuf;

use console::style;

use crate::config::SetupConfig;
use crate::error::Result;
use crate::steps::code_server::CodeServerConfig;

/// What the code-server config says about logging in.
#[derive(Debug, PartialEq, Eq)]
enum Login {
    Password {
        password: String,
        url: Option<String>,
    },
    NoPassword {
        auth: Option<String>,
        url: Option<String>,
    },
    /// code-server has not written its config yet.
    NotSetUp(PathBuf),
}

fn lookup(config: &SetupConfig) -> Result<Login> {
    let path = &config.code_server_config;
    let Some(code_server) = CodeServerConfig::load(path)? else {
        return Ok(Login::NotSetUp(path.clone()));
    };

    let url = code_server.service_url();
    Ok(match code_server.password {
        Some(password) => Login::Password { password, url },
        None => Login::NoPassword {
            auth: code_server.auth,
            url,
        },
    })
}

pub fn execute(config: &SetupConfig) -> Result<()> {
    let url = match lookup(config)? {
        Login::NotSetUp(path) => {
            println!(
                "{} No code-server config found at {}",
                style("!").yellow().bold(),
                style(path.display()).dim()
            );
            println!("Run {} first.", style("sudo codetunnel setup").cyan());
            return Ok(());
        }
        Login::Password { password, url } => {
            println!("{}", password);
            url
        }
        Login::NoPassword { auth, url } => {
            println!(
                "{} No password set (auth: {})",
                style("!").yellow().bold(),
                auth.as_deref().unwrap_or("unknown")
            );
            url
        }
    };

    if let Some(url) = url {
        println!("{} {}", style("Listening on").dim(), style(url).dim());
    }

    Ok(())
}
