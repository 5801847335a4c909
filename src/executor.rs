//! Subprocess execution for the external packaging toolchain.
//!
//! Every call to `tar`, `gzip`, `openssl`, `uuencode`, `dh_make`, `debuild`,
//! `rpmbuild` and `rpm` goes through the [`CommandExecutor`] trait so the
//! builders can be exercised against a scripted stub. Calls are synchronous:
//! the caller blocks until the tool exits and then inspects its status.

use crate::error::{ArchiveError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use std::fmt;
use std::io::Write;
use std::process::{Command, Output, Stdio};

/// A fully described external command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    /// Program name or path.
    pub program: String,
    /// Arguments, passed verbatim.
    pub args: Vec<String>,
    /// Working directory for the child, when it matters.
    pub current_dir: Option<Utf8PathBuf>,
    /// Extra environment variables.
    pub env: Vec<(String, String)>,
    /// Bytes written to the child's stdin before waiting on it.
    pub stdin: Option<Vec<u8>>,
}

impl Invocation {
    /// Start describing a call to `program`.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    /// Append one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Run the command from `dir`.
    #[must_use]
    pub fn current_dir(mut self, dir: &Utf8Path) -> Self {
        self.current_dir = Some(dir.to_owned());
        self
    }

    /// Set an environment variable for the child.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Feed `input` to the child's stdin.
    #[must_use]
    pub fn stdin(mut self, input: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Returns true if any argument equals `needle`.
    #[must_use]
    pub fn has_arg(&self, needle: &str) -> bool {
        self.args.iter().any(|a| a == needle)
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Abstraction for running external commands.
pub trait CommandExecutor {
    /// Runs the invocation to completion and returns its captured output.
    ///
    /// A non-zero exit status is not an error at this level; see
    /// [`run_checked`].
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::ToolSpawn`] if the program cannot be started
    /// or its stdin cannot be written.
    fn run(&self, invocation: &Invocation) -> Result<Output>;
}

/// Executes commands on the host system.
///
/// # Examples
///
/// ```no_run
/// use rerun_archive::executor::{CommandExecutor, Invocation, SystemCommandExecutor};
///
/// let executor = SystemCommandExecutor;
/// let output = executor.run(&Invocation::new("tar").arg("--version"))?;
/// assert!(output.status.success());
/// # Ok::<(), rerun_archive::error::ArchiveError>(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandExecutor;

impl CommandExecutor for SystemCommandExecutor {
    fn run(&self, invocation: &Invocation) -> Result<Output> {
        let spawn_error = |source| ArchiveError::ToolSpawn {
            program: invocation.program.clone(),
            source,
        };

        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args);
        if let Some(dir) = &invocation.current_dir {
            cmd.current_dir(dir);
        }
        for (key, value) in &invocation.env {
            cmd.env(key, value);
        }
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        cmd.stdin(if invocation.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });

        let mut child = cmd.spawn().map_err(spawn_error)?;
        if let (Some(input), Some(mut pipe)) = (&invocation.stdin, child.stdin.take()) {
            // A tool that exits without reading its prompt answers closes the
            // pipe early; its exit status reports the real outcome.
            match pipe.write_all(input) {
                Err(err) if err.kind() != std::io::ErrorKind::BrokenPipe => {
                    return Err(spawn_error(err));
                }
                _ => {}
            }
        }
        child.wait_with_output().map_err(spawn_error)
    }
}

/// Run `invocation` and fail unless it exits successfully.
///
/// # Errors
///
/// Returns [`ArchiveError::ToolFailed`] carrying the tool's exit status and
/// trimmed stderr when it exits unsuccessfully, or the executor's own error
/// if it cannot be started.
pub fn run_checked(executor: &dyn CommandExecutor, invocation: &Invocation) -> Result<Output> {
    match &invocation.current_dir {
        Some(dir) => debug!("running {invocation} (in {dir})"),
        None => debug!("running {invocation}"),
    }

    let output = executor.run(invocation)?;
    if output.status.success() {
        return Ok(output);
    }

    Err(ArchiveError::ToolFailed {
        program: invocation.program.clone(),
        code: output.status.code(),
        message: stderr_message(&output),
    })
}

/// Returns the trimmed stderr of `output`, falling back to stdout when the
/// tool wrote its complaint there instead.
#[must_use]
pub fn stderr_message(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_owned();
    if stderr.is_empty() {
        String::from_utf8_lossy(&output.stdout).trim().to_owned()
    } else {
        stderr
    }
}
