//! External command execution.
//!
//! Commands are built as a program plus an argument vector and never go
//! through a shell, so user input (tokens, domains) cannot change their
//! meaning. Output streams straight to the console.

use std::fmt;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::{Result, SetupError};

#[derive(Clone, PartialEq, Eq)]
struct Arg {
    value: String,
    secret: bool,
}

/// A single external command invocation.
#[derive(Clone, PartialEq, Eq)]
pub struct Cmd {
    program: String,
    args: Vec<Arg>,
    stdin: Option<Vec<u8>>,
}

impl Cmd {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdin: None,
        }
    }

    pub fn arg(mut self, value: impl Into<String>) -> Self {
        self.args.push(Arg {
            value: value.into(),
            secret: false,
        });
        self
    }

    pub fn args<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for value in values {
            self = self.arg(value);
        }
        self
    }

    /// An argument that is passed to the process but masked when displayed.
    pub fn secret_arg(mut self, value: impl Into<String>) -> Self {
        self.args.push(Arg {
            value: value.into(),
            secret: true,
        });
        self
    }

    /// Bytes piped into the child's stdin.
    pub fn stdin(mut self, input: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(input.into());
        self
    }
}

fn quote(value: &str) -> String {
    let plain = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=@,+%".contains(c));
    if plain {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}

impl fmt::Display for Cmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", quote(&self.program))?;
        for arg in &self.args {
            if arg.secret {
                write!(f, " ****")?;
            } else {
                write!(f, " {}", quote(&arg.value))?;
            }
        }
        if self.stdin.is_some() {
            write!(f, " < (stdin)")?;
        }
        Ok(())
    }
}

// Debug goes through Display so secrets never reach logs.
impl fmt::Debug for Cmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cmd({})", self)
    }
}

/// How a command finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Success,
    /// Non-zero exit. `None` when the process was killed by a signal.
    Failed(Option<i32>),
    /// Ctrl-C was pressed while the command ran.
    Interrupted,
}

impl CommandOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CommandOutcome::Success)
    }

    /// Turn anything but success into the error for `cmd`.
    pub fn check(self, cmd: &Cmd) -> Result<()> {
        match self {
            CommandOutcome::Success => Ok(()),
            CommandOutcome::Failed(code) => Err(SetupError::Command {
                command: cmd.to_string(),
                detail: match code {
                    Some(code) => format!("exited with status {}", code),
                    None => "terminated by signal".to_string(),
                },
            }),
            CommandOutcome::Interrupted => Err(SetupError::Interrupted {
                during: format!("running: {}", cmd),
            }),
        }
    }
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run a command and report how it finished. Only a failure to spawn is an error.
    async fn try_run(&self, cmd: &Cmd) -> Result<CommandOutcome>;

    /// Run a command that must succeed.
    async fn run(&self, cmd: &Cmd) -> Result<()> {
        self.try_run(cmd).await?.check(cmd)
    }
}

/// Runs commands as child processes of this one.
#[derive(Debug, Default)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn try_run(&self, cmd: &Cmd) -> Result<CommandOutcome> {
        tracing::debug!("Running: {}", cmd);

        let mut command = tokio::process::Command::new(&cmd.program);
        command.args(cmd.args.iter().map(|a| a.value.as_str()));
        if cmd.stdin.is_some() {
            command.stdin(Stdio::piped());
        }

        let mut child = command.spawn().map_err(|e| SetupError::Command {
            command: cmd.to_string(),
            detail: e.to_string(),
        })?;

        if let Some(input) = &cmd.stdin {
            let mut stdin = child
                .stdin
                .take()
                .ok_or_else(|| anyhow::anyhow!("stdin of '{}' was not captured", cmd.program))?;
            stdin.write_all(input).await?;
            // Closing stdin lets the child see EOF.
            drop(stdin);
        }

        // The child shares our process group, so Ctrl-C usually kills it too and
        // both branches become ready together.
        let status = tokio::select! {
            biased;
            _ = tokio::signal::ctrl_c() => None,
            status = child.wait() => Some(status?),
        };

        let outcome = match status {
            Some(status) => outcome_from_status(status),
            None => {
                let _ = child.start_kill();
                let _ = child.wait().await;
                CommandOutcome::Interrupted
            }
        };

        tracing::debug!("{} finished: {:?}", cmd.program, outcome);
        Ok(outcome)
    }
}

fn outcome_from_status(status: std::process::ExitStatus) -> CommandOutcome {
    if status.success() {
        return CommandOutcome::Success;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if status.signal() == Some(nix::sys::signal::Signal::SIGINT as i32) {
            return CommandOutcome::Interrupted;
        }
    }
    CommandOutcome::Failed(status.code())
}

#[cfg(test)]
pub mod testing {
    //! A runner that records commands instead of executing them.

    use std::sync::Mutex;

    use super::*;

    impl Cmd {
        pub fn program(&self) -> &str {
            &self.program
        }

        /// Program followed by the raw argument values.
        pub fn argv(&self) -> Vec<&str> {
            std::iter::once(self.program.as_str())
                .chain(self.args.iter().map(|a| a.value.as_str()))
                .collect()
        }

        pub fn stdin_bytes(&self) -> Option<&[u8]> {
            self.stdin.as_deref()
        }
    }

    #[derive(Default)]
    pub struct RecordingRunner {
        calls: Mutex<Vec<Cmd>>,
        scripted: Vec<(Vec<String>, CommandOutcome)>,
    }

    impl RecordingRunner {
        pub fn new() -> Self {
            Self::default()
        }

        /// Commands whose argv starts with `prefix` finish with `outcome`.
        /// Everything else succeeds.
        pub fn with_outcome(mut self, prefix: &[&str], outcome: CommandOutcome) -> Self {
            self.scripted
                .push((prefix.iter().map(|s| s.to_string()).collect(), outcome));
            self
        }

        pub fn failing(self, prefix: &[&str]) -> Self {
            self.with_outcome(prefix, CommandOutcome::Failed(Some(1)))
        }

        pub fn calls(&self) -> Vec<Cmd> {
            self.calls.lock().unwrap().clone()
        }

        pub fn argvs(&self) -> Vec<Vec<String>> {
            self.calls()
                .iter()
                .map(|c| c.argv().into_iter().map(String::from).collect())
                .collect()
        }

        pub fn ran(&self, prefix: &[&str]) -> bool {
            self.calls().iter().any(|c| c.argv().starts_with(prefix))
        }
    }

    #[async_trait]
    impl CommandRunner for RecordingRunner {
        async fn try_run(&self, cmd: &Cmd) -> Result<CommandOutcome> {
            self.calls.lock().unwrap().push(cmd.clone());
            let argv = cmd.argv();
            let outcome = self
                .scripted
                .iter()
                .find(|(prefix, _)| {
                    argv.len() >= prefix.len() && prefix.iter().zip(&argv).all(|(p, a)| p == a)
                })
                .map(|(_, outcome)| *outcome)
                .unwrap_or(CommandOutcome::Success);
            Ok(outcome)
        }
    }
}
