//! Error types and failure classification for kubectl invocations.
//!
//! Everything the control-plane tells us about a failure arrives as stderr
//! text. A small fixed set of signatures marks a failure as transient and
//! eligible for bounded retry; anything else is fatal on the first attempt.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// How many identical transient failures are tolerated before giving up.
pub const RETRY_LIMIT: u32 = 3;

/// Fixed backoff slept per previously seen identical failure.
pub const RETRY_BACKOFF: Duration = Duration::from_secs(3);

/// Ordered stderr substring pairs that mark a failure as transient.
///
/// Both parts must appear, the second somewhere after the first.
const TRANSIENT_SIGNATURES: &[(&str, &str)] = &[
    ("couldn't read version from server", "i/o timeout"),
    ("couldn't read version from server", "connection refused"),
];

fn is_transient(stderr: &str) -> bool {
    TRANSIENT_SIGNATURES.iter().any(|(first, second)| {
        stderr
            .find(first)
            .is_some_and(|at| stderr[at + first.len()..].contains(second))
    })
}

/// A classified control-plane command failure.
///
/// Two failures are "the same failure" for retry-counting purposes iff their
/// raw stderr output is equal; the command and exit code carry no identity.
#[derive(Debug, Clone)]
pub struct KubectlFailure {
    /// Rendered command line that failed
    pub command: String,
    /// Exit code reported by the process
    pub code: i32,
    /// Raw stderr text, the identity of the failure
    pub output: String,
    /// Whether the output matched a transient-failure signature
    pub retryable: bool,
}

impl KubectlFailure {
    /// Classify a failed kubectl invocation from its stderr text.
    pub fn classify(code: i32, command: &str, stderr: &str) -> Self {
        Self {
            command: command.to_string(),
            code,
            output: stderr.to_string(),
            retryable: is_transient(stderr),
        }
    }
}

impl PartialEq for KubectlFailure {
    fn eq(&self, other: &Self) -> bool {
        self.output == other.output
    }
}

impl fmt::Display for KubectlFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.retryable {
            write!(f, "(tried {RETRY_LIMIT} times) ")?;
        }
        write!(
            f,
            "exit code {} running `{}`:\n{}",
            self.code,
            self.command,
            self.output.trim_end()
        )
    }
}

/// Errors that can occur while driving kubectl.
#[derive(Debug, Error)]
pub enum Error {
    /// A kubectl invocation failed; raised after the retry budget is spent
    /// (or immediately when the failure is not transient)
    #[error("{0}")]
    Kubectl(KubectlFailure),

    /// A non-kubectl command failed; these are never retried
    #[error("command `{command}` exited with code {code}:\n{stderr}")]
    CommandFailed {
        /// Rendered command line that failed
        command: String,
        /// Exit code reported by the process
        code: i32,
        /// Captured stderr text
        stderr: String,
    },

    /// A named context was not present in the local kubectl configuration
    #[error("context '{0}' not found")]
    ContextNotFound(String),

    /// A context specification is missing required fields
    #[error("invalid context: {0}")]
    InvalidContext(String),

    /// kubectl is not installed or not found in PATH
    #[error("kubectl not found in PATH")]
    KubectlNotFound,

    /// IO error spawning or talking to a subprocess
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// kubectl produced output that is not valid YAML
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type for kubectl operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_io_timeout_is_retryable() {
        let failure = KubectlFailure::classify(
            1,
            "kubectl get pods",
            "error: couldn't read version from server https://cluster.example: i/o timeout",
        );
        assert!(failure.retryable);
    }

    #[test]
    fn test_classify_connection_refused_is_retryable() {
        let failure = KubectlFailure::classify(
            1,
            "kubectl get pods",
            "error: couldn't read version from server 10.0.0.1:6443: connection refused",
        );
        assert!(failure.retryable);
    }

    #[test]
    fn test_classify_other_stderr_is_fatal() {
        let failure =
            KubectlFailure::classify(1, "kubectl create -f -", "error: resource already exists");
        assert!(!failure.retryable);
    }

    #[test]
    fn test_signature_parts_must_appear_in_order() {
        // The suffix alone, without the version-probe prefix, is not enough
        let failure = KubectlFailure::classify(1, "kubectl get pods", "dial tcp: i/o timeout");
        assert!(!failure.retryable);
    }

    #[test]
    fn test_equality_is_by_raw_output_only() {
        let a = KubectlFailure::classify(1, "kubectl get pods", "same output");
        let b = KubectlFailure::classify(7, "kubectl get services", "same output");
        let c = KubectlFailure::classify(1, "kubectl get pods", "different output");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_retryable_message_reports_the_retry_count() {
        let failure = KubectlFailure::classify(
            1,
            "kubectl get pods",
            "error: couldn't read version from server x: connection refused",
        );
        assert!(failure.to_string().contains("tried 3 times"));
    }

    #[test]
    fn test_fatal_message_has_no_retry_note() {
        let failure = KubectlFailure::classify(2, "kubectl get pods", "no such resource");
        let message = failure.to_string();
        assert!(!message.contains("tried"));
        assert!(message.contains("exit code 2"));
        assert!(message.contains("kubectl get pods"));
    }
}
