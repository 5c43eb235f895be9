//! Ctrl-C handling outside child processes.
//!
//! Once tokio has seen `ctrl_c()` the default SIGINT action is gone for the
//! rest of the process, so every await point that is not a child wait has to
//! race the signal itself.

use std::future::Future;

use crate::error::{Result, SetupError};

/// Run `fut`, aborting with [`SetupError::Interrupted`] if Ctrl-C arrives first.
pub async fn interruptible<T, F>(during: &str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    race(during, fut, tokio::signal::ctrl_c()).await
}

async fn race<T, F, I>(during: &str, fut: F, interrupt: I) -> Result<T>
where
    F: Future<Output = Result<T>>,
    I: Future,
{
    tokio::select! {
        biased;
        _ = interrupt => {
            tracing::debug!("Interrupted while {}", during);
            Err(SetupError::Interrupted {
                during: during.to_string(),
            })
        }
        result = fut => result,
    }
}

/// Terminal modes saved at startup, put back when we exit early.
///
/// A prompt interrupted mid-read (e.g. the masked token prompt) would
/// otherwise leave echo disabled.
pub struct TerminalGuard {
    #[cfg(unix)]
    saved: Option<nix::sys::termios::Termios>,
}

impl TerminalGuard {
    pub fn capture() -> Self {
        Self {
            #[cfg(unix)]
            saved: nix::sys::termios::tcgetattr(std::io::stdin()).ok(),
        }
    }

    pub fn restore(&self) {
        #[cfg(unix)]
        {
            if let Some(saved) = &self.saved {
                let _ = nix::sys::termios::tcsetattr(
                    std::io::stdin(),
                    nix::sys::termios::SetArg::TCSANOW,
                    saved,
                );
            }
        }
        let _ = console::Term::stderr().show_cursor();
    }
}
