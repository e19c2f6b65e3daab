//! Subprocess execution utilities.
//!
//! All version control clients are driven through [`CommandRunner`], so the
//! code that decides *what* to run never spawns processes itself.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use crate::resolver::GetError;

/// Builder for subprocess execution.
#[derive(Debug, Clone)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<String>,
    env: BTreeMap<String, String>,
    env_defaults: BTreeMap<String, String>,
    cwd: Option<PathBuf>,
}

impl ProcessBuilder {
    /// Create a new process builder for the given program.
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            env: BTreeMap::new(),
            env_defaults: BTreeMap::new(),
            cwd: None,
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(
            args.into_iter()
                .map(|s| s.as_ref().to_string_lossy().into_owned()),
        );
        self
    }

    /// Set an environment variable.
    pub fn env(mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.env
            .insert(key.as_ref().to_string(), value.as_ref().to_string());
        self
    }

    /// Set an environment variable only if the parent process has not set it.
    pub fn env_default(mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.env_defaults
            .insert(key.as_ref().to_string(), value.as_ref().to_string());
        self
    }

    /// Set the working directory.
    pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    /// Get the program path.
    pub fn get_program(&self) -> &Path {
        &self.program
    }

    /// Get the arguments.
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Get the working directory.
    pub fn get_cwd(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    /// Get an explicitly configured environment value.
    pub fn get_env(&self, key: &str) -> Option<&str> {
        self.env
            .get(key)
            .or_else(|| self.env_defaults.get(key))
            .map(String::as_str)
    }

    /// Build the Command.
    fn build_command(&self, program: &Path) -> Command {
        let mut cmd = Command::new(program);
        cmd.args(&self.args);

        for (key, value) in &self.env_defaults {
            if std::env::var_os(key).is_none() {
                cmd.env(key, value);
            }
        }

        for (key, value) in &self.env {
            cmd.env(key, value);
        }

        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }

        cmd
    }

    /// Execute the command with a resolved program path and wait for completion.
    pub fn exec_with(&self, program: &Path) -> io::Result<Output> {
        let mut cmd = self.build_command(program);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.output()
    }

    /// Display the command for error messages.
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// Captured result of an external command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` if the process was killed by a signal
    pub code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    /// Whether the process exited with status zero.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Standard output as lossy UTF-8.
    pub fn stdout_str(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// Turn a non-zero exit into [`GetError::ExternalCommandFailed`].
    pub fn check(self, cmd: &ProcessBuilder) -> Result<CommandOutput, GetError> {
        if self.success() {
            return Ok(self);
        }

        let mut output = String::from_utf8_lossy(&self.stderr).into_owned();
        if output.trim().is_empty() {
            output = self.stdout_str();
        }
        Err(GetError::ExternalCommandFailed {
            command: cmd.display_command(),
            code: self.code,
            output,
        })
    }
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        CommandOutput {
            code: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        }
    }
}

/// Runs external commands and captures their output.
///
/// Implementations return `Ok` for any process that ran, whatever its exit
/// status; callers use [`CommandOutput::check`] to require success.
pub trait CommandRunner {
    fn run(&self, cmd: &ProcessBuilder) -> Result<CommandOutput, GetError>;
}

/// Runs commands as real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, cmd: &ProcessBuilder) -> Result<CommandOutput, GetError> {
        let name = cmd.get_program();
        let program = find_executable(&name.to_string_lossy()).ok_or_else(|| {
            GetError::ExternalCommandFailed {
                command: cmd.display_command(),
                code: None,
                output: format!("`{}` was not found in PATH", name.display()),
            }
        })?;

        tracing::debug!("Running {}", cmd.display_command());

        let output = cmd
            .exec_with(&program)
            .map_err(|e| GetError::io(format!("failed to run `{}`", cmd.display_command()), e))?;
        Ok(output.into())
    }
}

/// Find an executable in PATH.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}
