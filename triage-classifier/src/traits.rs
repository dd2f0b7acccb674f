//! Shared classifier trait and transport-level data structures.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Result alias used by classifier transports.
pub type ClassifierResult<T> = Result<T, ClassifierError>;

/// Transport failures raised before a usable exit status was obtained.
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// The classifier could not be started.
    #[error("classifier failed to start: {reason}")]
    Spawn {
        /// Additional context for the failure.
        reason: String,
    },

    /// The classifier did not exit within the allotted time.
    #[error("classifier timed out after {after:?}")]
    Timeout {
        /// Time budget that was exceeded.
        after: Duration,
    },

    /// Communication with a running classifier failed.
    #[error("classifier i/o error: {reason}")]
    Io {
        /// Additional context for the failure.
        reason: String,
    },

    /// Standard output exceeded the configured cap.
    #[error("classifier output exceeded {limit} bytes")]
    OutputTooLarge {
        /// Configured byte cap.
        limit: usize,
    },
}

impl ClassifierError {
    /// Convenience constructor for spawn failures.
    #[must_use]
    pub fn spawn(reason: impl Into<String>) -> Self {
        Self::Spawn {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for i/o failures.
    #[must_use]
    pub fn io(reason: impl Into<String>) -> Self {
        Self::Io {
            reason: reason.into(),
        }
    }
}

/// Minimal metadata describing a classifier instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassifierMetadata {
    transport: &'static str,
    name: String,
}

impl ClassifierMetadata {
    /// Creates metadata for the supplied transport and classifier name.
    #[must_use]
    pub fn new(transport: &'static str, name: impl Into<String>) -> Self {
        Self {
            transport,
            name: name.into(),
        }
    }

    /// Returns the transport identifier (e.g., "process").
    #[must_use]
    pub const fn transport(&self) -> &'static str {
        self.transport
    }

    /// Returns the classifier name, typically the program path.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Everything a classifier produced: exit status and both output streams.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawOutput {
    exit_code: Option<i32>,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

impl RawOutput {
    /// Creates an output record. `exit_code` is `None` when the process was
    /// terminated by a signal.
    #[must_use]
    pub fn new(exit_code: Option<i32>, stdout: impl Into<Vec<u8>>, stderr: impl Into<Vec<u8>>) -> Self {
        Self {
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// Returns the exit code, if the process exited normally.
    #[must_use]
    pub const fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    /// Returns `true` for a zero exit code.
    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.exit_code, Some(0))
    }

    /// Returns the captured standard output.
    #[must_use]
    pub fn stdout(&self) -> &[u8] {
        &self.stdout
    }

    /// Returns the captured standard error.
    #[must_use]
    pub fn stderr(&self) -> &[u8] {
        &self.stderr
    }

    /// Returns standard error as trimmed, lossily decoded text.
    #[must_use]
    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).trim().to_owned()
    }
}

/// Trait implemented by all classifier transports.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Returns basic metadata describing the classifier.
    fn metadata(&self) -> &ClassifierMetadata;

    /// Runs the classifier once on `input` (a serialized JSON object).
    ///
    /// Implementations must give up and release every resource they hold
    /// once `timeout` has elapsed, returning [`ClassifierError::Timeout`].
    async fn run(&self, input: Vec<u8>, timeout: Duration) -> ClassifierResult<RawOutput>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_status_helpers() {
        assert!(RawOutput::new(Some(0), "{}", "").success());
        assert!(!RawOutput::new(Some(2), "", "boom").success());
        assert!(!RawOutput::new(None, "", "").success());
        assert_eq!(RawOutput::new(Some(1), "", " boom \n").stderr_text(), "boom");
    }
}
