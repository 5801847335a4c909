//! Shared test utilities for the archive builders.
//!
//! Available to this crate's unit tests and, through the `test-support`
//! feature, to the behaviour suites under `tests/`.

use crate::error::{ArchiveError, Result};
use crate::executor::{CommandExecutor, Invocation};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::process::{ExitStatus, Output};

/// Creates an `ExitStatus` from an exit code (Unix implementation).
#[cfg(unix)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    ExitStatus::from_raw(code << 8)
}

/// Creates an `ExitStatus` from an exit code (Windows implementation).
#[cfg(windows)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;

    ExitStatus::from_raw(code as u32)
}

/// Creates a successful command `Output` with empty stdout and stderr.
#[must_use]
pub fn success_output() -> Output {
    Output {
        status: exit_status(0),
        stdout: Vec::new(),
        stderr: Vec::new(),
    }
}

/// Creates a successful command `Output` with the given stdout.
#[must_use]
pub fn stdout_output(stdout: &str) -> Output {
    Output {
        stdout: stdout.as_bytes().to_vec(),
        ..success_output()
    }
}

/// Creates a failed command `Output` with the given stderr message.
#[must_use]
pub fn failure_output(stderr: &str) -> Output {
    Output {
        status: exit_status(1),
        stdout: Vec::new(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

type Effect = Box<dyn Fn(&Invocation) -> std::io::Result<()>>;

/// A scripted reply to one expected command invocation.
pub struct StubResponse {
    program: String,
    output: Output,
    effect: Option<Effect>,
}

impl StubResponse {
    /// Reply to a call of `program` with `output`.
    #[must_use]
    pub fn new(program: &str, output: Output) -> Self {
        Self {
            program: program.to_owned(),
            output,
            effect: None,
        }
    }

    /// Reply to a call of `program` with a successful, silent output.
    #[must_use]
    pub fn ok(program: &str) -> Self {
        Self::new(program, success_output())
    }

    /// Simulate the tool's filesystem side effects before replying.
    ///
    /// The closure receives the actual invocation so it can create files at
    /// the paths the builder asked for.
    #[must_use]
    pub fn with_effect(
        mut self,
        effect: impl Fn(&Invocation) -> std::io::Result<()> + 'static,
    ) -> Self {
        self.effect = Some(Box::new(effect));
        self
    }
}

impl fmt::Debug for StubResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StubResponse")
            .field("program", &self.program)
            .field("status", &self.output.status)
            .field("has_effect", &self.effect.is_some())
            .finish()
    }
}

/// A stub implementation of `CommandExecutor` for testing.
///
/// Replies to invocations in order from a script of [`StubResponse`]s and
/// records every invocation it receives, allowing tests to verify command
/// execution without running the real toolchain.
#[derive(Debug, Default)]
pub struct StubExecutor {
    expected: RefCell<VecDeque<StubResponse>>,
    received: RefCell<Vec<Invocation>>,
}

impl StubExecutor {
    /// Creates a new `StubExecutor` with the given scripted responses.
    #[must_use]
    pub fn new(expected: Vec<StubResponse>) -> Self {
        Self {
            expected: RefCell::new(expected.into()),
            received: RefCell::new(Vec::new()),
        }
    }

    /// Returns a copy of every invocation received so far.
    #[must_use]
    pub fn invocations(&self) -> Vec<Invocation> {
        self.received.borrow().clone()
    }

    /// Returns the invocations of `program` received so far.
    #[must_use]
    pub fn invocations_of(&self, program: &str) -> Vec<Invocation> {
        self.received
            .borrow()
            .iter()
            .filter(|i| i.program == program)
            .cloned()
            .collect()
    }

    /// Asserts that all scripted responses have been consumed.
    ///
    /// # Panics
    ///
    /// Panics if there are remaining responses that were not used.
    pub fn assert_finished(&self) {
        let remaining = self.expected.borrow();
        assert!(
            remaining.is_empty(),
            "expected no further command invocations, {} left: {:?}",
            remaining.len(),
            remaining
        );
    }
}

impl CommandExecutor for StubExecutor {
    fn run(&self, invocation: &Invocation) -> Result<Output> {
        self.received.borrow_mut().push(invocation.clone());

        let response = self.expected.borrow_mut().pop_front().ok_or_else(|| {
            ArchiveError::StubMismatch {
                message: format!("unexpected command invocation: {invocation}"),
            }
        })?;

        if response.program != invocation.program {
            return Err(ArchiveError::StubMismatch {
                message: format!(
                    "expected a call to {}, received: {invocation}",
                    response.program
                ),
            });
        }

        if let Some(effect) = &response.effect {
            effect(invocation)?;
        }

        Ok(response.output)
    }
}

/// Returns the value following `flag` in the invocation's arguments.
#[must_use]
pub fn arg_after<'a>(invocation: &'a Invocation, flag: &str) -> Option<&'a str> {
    invocation
        .args
        .iter()
        .position(|a| a == flag)
        .and_then(|i| invocation.args.get(i + 1))
        .map(String::as_str)
}
