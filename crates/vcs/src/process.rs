//! Running external VCS binaries.
//!
//! Every backend talks to its VCS through a [`CommandRunner`]. The default
//! [`SystemRunner`] spawns the real binary and blocks until it exits. There is
//! no built-in timeout; callers that need one wrap the runner.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;

use utils::shell::resolve_executable_path_blocking;

use crate::error::VcsError;

/// Captured result of one process run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    pub code: Option<i32>,
}

impl ProcessOutput {
    /// Successful run with the given stdout
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            success: true,
            code: Some(0),
        }
    }

    /// Failed run with the given stderr and exit code
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            success: false,
            code: Some(code),
        }
    }

    fn failure_message(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            return stdout.to_string();
        }
        match self.code {
            Some(code) => format!("exited with status {code}"),
            None => "terminated by signal".to_string(),
        }
    }
}

/// Runs a program to completion and captures its output.
///
/// Implementations only fail when the program cannot be started; a non-zero
/// exit is reported through [`ProcessOutput::success`].
pub trait CommandRunner: Send + Sync {
    fn output(&self, program: &str, args: &[String], cwd: &Path)
        -> Result<ProcessOutput, VcsError>;
}

/// Runs commands as real subprocesses
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn output(
        &self,
        program: &str,
        args: &[String],
        cwd: &Path,
    ) -> Result<ProcessOutput, VcsError> {
        let executable = resolve_executable_path_blocking(program)
            .ok_or_else(|| VcsError::ToolNotFound(program.to_string()))?;

        let mut cmd = Command::new(&executable);
        cmd.args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        tracing::trace!(cwd = ?cwd, "Running command: {:?}", cmd);

        let output = cmd.output().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => VcsError::ToolNotFound(program.to_string()),
            _ => VcsError::external_tool(command_line(program, args), e.to_string()),
        })?;

        Ok(ProcessOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            success: output.status.success(),
            code: output.status.code(),
        })
    }
}

/// Human-readable command line for logs and error messages
pub fn command_line(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

/// A VCS binary bound to a working directory and a fixed set of global
/// arguments (for example `-c <client>` for p4).
#[derive(Clone)]
pub struct Tool {
    program: String,
    global_args: Vec<String>,
    cwd: PathBuf,
    runner: Arc<dyn CommandRunner>,
}

impl Tool {
    pub fn new(program: impl Into<String>, cwd: impl Into<PathBuf>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            program: program.into(),
            global_args: Vec::new(),
            cwd: cwd.into(),
            runner,
        }
    }

    pub fn with_global_args(mut self, args: Vec<String>) -> Self {
        self.global_args = args;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn set_cwd(&mut self, cwd: impl Into<PathBuf>) {
        self.cwd = cwd.into();
    }

    /// Run and return the raw output, whatever the exit status
    pub fn output<I, S>(&self, args: I) -> Result<(String, ProcessOutput), VcsError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut full_args = self.global_args.clone();
        full_args.extend(args.into_iter().map(|a| a.as_ref().to_string()));

        let cmd = command_line(&self.program, &full_args);
        let output = self.runner.output(&self.program, &full_args, &self.cwd)?;
        tracing::trace!(
            command = %cmd,
            success = output.success,
            stdout_len = output.stdout.len(),
            "command finished"
        );
        Ok((cmd, output))
    }

    /// Run and return stdout, failing on a non-zero exit
    pub fn run<I, S>(&self, args: I) -> Result<String, VcsError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let (cmd, output) = self.output(args)?;
        if !output.success {
            return Err(VcsError::external_tool(cmd, output.failure_message()));
        }
        Ok(output.stdout)
    }

    /// Like [`Tool::run`], but a failure whose message contains one of
    /// `benign` (case-insensitive) is treated as empty output.
    pub fn run_allowing<I, S>(&self, args: I, benign: &[&str]) -> Result<String, VcsError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let (cmd, output) = self.output(args)?;
        if output.success {
            return Ok(output.stdout);
        }

        let message = output.failure_message();
        if is_benign(&message, benign) {
            tracing::debug!(command = %cmd, %message, "treating message as empty result");
            return Ok(output.stdout);
        }
        Err(VcsError::external_tool(cmd, message))
    }
}

/// True if `message` contains one of the `benign` phrases (case-insensitive)
pub fn is_benign(message: &str, benign: &[&str]) -> bool {
    let lower = message.to_ascii_lowercase();
    benign
        .iter()
        .any(|phrase| lower.contains(&phrase.to_ascii_lowercase()))
}
