//! Command execution with bounded retry for transient control-plane failures.
//!
//! The runner owns the retry state machine: a failed kubectl invocation is
//! classified, identical transient failures are counted against a fixed
//! budget with a fixed backoff sleep per repeat, and anything else raises
//! immediately. Non-kubectl commands never retry.

use crate::error::{Error, KubectlFailure, RETRY_BACKOFF, RETRY_LIMIT, Result};
use log::debug;
use std::fmt;
use std::io::Write;
use std::process::{Command, Output, Stdio};
use std::thread;
use std::time::Duration;

/// One external command invocation: a program and its arguments.
#[derive(Debug, Clone)]
pub struct CommandLine {
    /// Program to execute
    pub program: String,
    /// Arguments, one per element (never shell-joined)
    pub args: Vec<String>,
}

impl CommandLine {
    /// Build a command line from a program and its arguments.
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(ToString::to_string).collect(),
        }
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Retry bound and backoff for transient control-plane failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// How many identical transient failures are tolerated before giving up
    pub max_identical: u32,
    /// Fixed sleep inserted per previously seen identical failure
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_identical: RETRY_LIMIT,
            backoff: RETRY_BACKOFF,
        }
    }
}

impl RetryPolicy {
    /// Decide whether the retry loop must stop on this failure.
    ///
    /// A non-retryable failure always stops. A retryable failure stops once
    /// `max_identical` prior failures with equal raw output have been seen;
    /// every equal prior failure costs one backoff sleep before the count is
    /// evaluated. Distinct transient failures therefore never share a
    /// budget.
    pub fn should_stop(&self, failure: &KubectlFailure, history: &[KubectlFailure]) -> bool {
        if !failure.retryable {
            return true;
        }
        let mut identical = 0;
        for prior in history {
            if prior == failure {
                identical += 1;
                thread::sleep(self.backoff);
            }
        }
        identical >= self.max_identical
    }
}

/// Runs external commands, retrying recognized transient kubectl failures.
pub struct Runner {
    kubectl_program: String,
    policy: RetryPolicy,
}

impl Runner {
    /// Create a runner that treats `kubectl_program` as the control-plane
    /// client, with the default retry policy.
    pub fn new(kubectl_program: impl Into<String>) -> Self {
        Self::with_policy(kubectl_program, RetryPolicy::default())
    }

    /// Create a runner with a custom retry policy.
    pub fn with_policy(kubectl_program: impl Into<String>, policy: RetryPolicy) -> Self {
        Self {
            kubectl_program: kubectl_program.into(),
            policy,
        }
    }

    fn is_control_plane(&self, cmd: &CommandLine) -> bool {
        cmd.program == self.kubectl_program
    }

    /// Execute `cmd`, feeding `stdin` to the child when given.
    ///
    /// Returns captured stdout when `capture` is set, `None` otherwise. With
    /// `echo` set the child's stdout is printed to the console regardless of
    /// outcome. Control-plane invocations that fail with a recognized
    /// transient signature re-run after the policy's backoff until the
    /// identical-failure budget is spent; any other failure is fatal on the
    /// first attempt.
    pub fn execute(
        &self,
        cmd: &CommandLine,
        capture: bool,
        echo: bool,
        stdin: Option<&str>,
    ) -> Result<Option<String>> {
        let mut failures: Vec<KubectlFailure> = Vec::new();
        loop {
            debug!("running `{cmd}`");
            let output = run_once(cmd, stdin)?;
            let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
            if echo && !stdout.is_empty() {
                print!("{stdout}");
            }
            if output.status.success() {
                return Ok(if capture { Some(stdout) } else { None });
            }
            let code = output.status.code().unwrap_or(-1);
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            if self.is_control_plane(cmd) {
                let failure = KubectlFailure::classify(code, &cmd.to_string(), &stderr);
                if self.policy.should_stop(&failure, &failures) {
                    return Err(Error::Kubectl(failure));
                }
                failures.push(failure);
            } else {
                return Err(Error::CommandFailed {
                    command: cmd.to_string(),
                    code,
                    stderr,
                });
            }
        }
    }
}

fn run_once(cmd: &CommandLine, stdin: Option<&str>) -> std::io::Result<Output> {
    let mut child = Command::new(&cmd.program)
        .args(&cmd.args)
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    if let Some(payload) = stdin {
        if let Some(mut pipe) = child.stdin.take() {
            // A child that exits without draining stdin is reported via its
            // exit status, not as a broken pipe
            if let Err(err) = pipe.write_all(payload.as_bytes()) {
                if err.kind() != std::io::ErrorKind::BrokenPipe {
                    return Err(err);
                }
            }
        }
    }

    child.wait_with_output()
}
