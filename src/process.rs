//! Centralized external tool execution.
//!
//! `jdeps` and `jlink` are run through the [`ToolRunner`] trait so the
//! analyzer and linker can be exercised without a JDK on the host. The
//! production implementation, [`SystemRunner`], wraps [`Cmd`].

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Captured result of a tool invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandResult {
    /// Exit code, or `None` if the process was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandResult {
    /// Successful result with the given stdout. Mostly useful for test doubles.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Failed result with the given exit code and stderr.
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    pub fn stderr_trimmed(&self) -> &str {
        self.stderr.trim()
    }
}

/// Something that can run an external program and capture its output.
///
/// Returning `Err` means the program could not be started at all. A program
/// that ran and exited non-zero is reported through [`CommandResult::code`].
pub trait ToolRunner {
    fn run(&self, program: &Path, args: &[String]) -> Result<CommandResult>;
}

/// Runs tools as real subprocesses.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl ToolRunner for SystemRunner {
    fn run(&self, program: &Path, args: &[String]) -> Result<CommandResult> {
        Cmd::new(program).args(args).run()
    }
}

/// Builder for a single subprocess invocation.
///
/// A non-zero exit is not an error here; callers read the code from the
/// returned [`CommandResult`].
pub struct Cmd {
    program: PathBuf,
    args: Vec<String>,
}

impl Cmd {
    pub fn new(program: impl AsRef<Path>) -> Self {
        Self {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_string()));
        self
    }

    /// Run to completion, capturing stdout and stderr.
    pub fn run(self) -> Result<CommandResult> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        tracing::debug!(program = %self.program.display(), args = ?self.args, "exec");

        let output = cmd.output().with_context(|| {
            format!(
                "Failed to execute '{}'. Is it installed?",
                self.program.display()
            )
        })?;

        Ok(CommandResult {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Look a program up on `PATH`.
pub fn which(program: &str) -> Option<PathBuf> {
    which::which(program).ok()
}

/// Executable file name for the host (`jdeps` vs `jdeps.exe`).
pub fn host_exe_name(name: &str) -> String {
    if cfg!(windows) {
        format!("{}.exe", name)
    } else {
        name.to_string()
    }
}
