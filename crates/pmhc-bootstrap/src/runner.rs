//! External process execution.
//!
//! Every conda, pip and git invocation goes through [`CommandRunner`], which
//! keeps the pipeline testable without the real toolchain installed.

use async_trait::async_trait;
use pmhc_common::{Result, SetupError};
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// A program invocation: argv, working directory and extra environment.
#[derive(Clone, Default)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: Vec<(String, String)>,
    /// Capture stdout/stderr instead of passing them through to the terminal.
    pub capture: bool,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into(), ..Self::default() }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn capture(mut self) -> Self {
        self.capture = true;
        self
    }

    /// Program and arguments joined with spaces, for logs and test assertions.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn env_value(&self, key: &str) -> Option<&str> {
        self.env.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }
}

// Environment values can carry the license key; only names are printed.
impl fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSpec")
            .field("command", &self.command_line())
            .field("cwd", &self.cwd)
            .field("env", &self.env.iter().map(|(k, _)| k.as_str()).collect::<Vec<_>>())
            .field("capture", &self.capture)
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run to completion. A non-zero exit is `SetupError::CommandFailed`.
    async fn run(&self, cmd: &CommandSpec) -> Result<CommandOutput>;

    /// Resolve a program name against PATH.
    fn locate(&self, program: &str) -> Option<PathBuf>;
}

/// Runs commands on the host with `tokio::process`.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, cmd: &CommandSpec) -> Result<CommandOutput> {
        debug!(command = %cmd.command_line(), cwd = ?cmd.cwd, "Spawning");

        let mut command = Command::new(&cmd.program);
        command.args(&cmd.args);
        if let Some(dir) = &cmd.cwd {
            command.current_dir(dir);
        }
        for (key, value) in &cmd.env {
            command.env(key, value);
        }

        if cmd.capture {
            let output = command
                .stdin(Stdio::null())
                .output()
                .await
                .map_err(|e| spawn_error(&cmd.program, e))?;

            let result = CommandOutput {
                code: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            };
            if !output.status.success() {
                return Err(SetupError::CommandFailed {
                    program: cmd.program.clone(),
                    code: result.code,
                    stderr: result.stderr,
                });
            }
            return Ok(result);
        }

        // Long-running children report their own progress on the terminal.
        let status = command
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| spawn_error(&cmd.program, e))?;

        if !status.success() {
            return Err(SetupError::CommandFailed {
                program: cmd.program.clone(),
                code: status.code(),
                stderr: String::new(),
            });
        }

        Ok(CommandOutput { code: status.code(), ..CommandOutput::default() })
    }

    fn locate(&self, program: &str) -> Option<PathBuf> {
        find_on_path(program, std::env::var_os("PATH"))
    }
}

fn spawn_error(program: &str, err: std::io::Error) -> SetupError {
    if err.kind() == std::io::ErrorKind::NotFound {
        SetupError::ProgramNotFound(program.to_string())
    } else {
        SetupError::Io(err)
    }
}

/// First executable named `program` in a PATH-style list.
pub fn find_on_path(program: &str, path: Option<OsString>) -> Option<PathBuf> {
    let path = path?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(program))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
