//! Drives one classifier invocation end to end.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};
use triage_primitives::IntakeRecord;

use crate::limit::ProcessLimiter;
use crate::outcome::{FailureKind, InvocationFailure, Outcome};
use crate::traits::Classifier;

/// Default invocation timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Extra time granted to a transport to clean up after its own timeout
/// before the invoker stops waiting for it.
const CLEANUP_GRACE: Duration = Duration::from_secs(2);

/// Invocation settings.
#[derive(Debug, Clone)]
pub struct InvokerConfig {
    timeout: Duration,
    limiter: Option<ProcessLimiter>,
}

impl InvokerConfig {
    /// Creates a configuration with the supplied timeout and no process limit.
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            limiter: None,
        }
    }

    /// Shares `limiter` across every invocation made with this config.
    #[must_use]
    pub fn with_limiter(mut self, limiter: ProcessLimiter) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// Returns the timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the process limiter, if any.
    #[must_use]
    pub fn limiter(&self) -> Option<&ProcessLimiter> {
        self.limiter.as_ref()
    }
}

impl Default for InvokerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT).with_limiter(ProcessLimiter::default())
    }
}

/// Sends an intake record to a classifier and reduces the result to an
/// [`Outcome`]. Never returns an error: every problem becomes
/// [`Outcome::Failure`].
#[derive(Clone)]
pub struct ProcessInvoker {
    classifier: Arc<dyn Classifier>,
    config: InvokerConfig,
}

impl fmt::Debug for ProcessInvoker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessInvoker")
            .field("classifier", self.classifier.metadata())
            .field("config", &self.config)
            .finish()
    }
}

impl ProcessInvoker {
    /// Creates an invoker for `classifier`.
    #[must_use]
    pub fn new(classifier: Arc<dyn Classifier>, config: InvokerConfig) -> Self {
        Self { classifier, config }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &InvokerConfig {
        &self.config
    }

    /// Invokes the classifier with the configured timeout.
    pub async fn invoke(&self, intake: &IntakeRecord) -> Outcome {
        self.invoke_with_timeout(intake, self.config.timeout).await
    }

    /// Invokes the classifier, giving up after `timeout`. Time spent waiting
    /// for a process slot counts against the timeout.
    pub async fn invoke_with_timeout(&self, intake: &IntakeRecord, timeout: Duration) -> Outcome {
        let outcome = self.run(intake, timeout).await;
        if let Outcome::Failure(failure) = &outcome {
            warn!(
                classifier = self.classifier.metadata().name(),
                kind = %failure.kind(),
                exit_code = ?failure.exit_code(),
                diagnostic = failure.diagnostic(),
                "classifier invocation failed"
            );
        }
        outcome
    }

    async fn run(&self, intake: &IntakeRecord, timeout: Duration) -> Outcome {
        let started = Instant::now();

        let input = match intake.to_json_bytes() {
            Ok(bytes) => bytes,
            Err(err) => return Outcome::failure(FailureKind::SpawnError, err.to_string()),
        };

        let _permit = match &self.config.limiter {
            Some(limiter) => match tokio::time::timeout(timeout, limiter.acquire()).await {
                Ok(Ok(permit)) => Some(permit),
                Ok(Err(closed)) => return Outcome::failure(FailureKind::SpawnError, closed.to_string()),
                Err(_) => {
                    return Outcome::failure(
                        FailureKind::Timeout,
                        format!("no classifier slot free within {timeout:?}"),
                    );
                }
            },
            None => None,
        };

        let remaining = timeout.saturating_sub(started.elapsed());
        if remaining.is_zero() {
            return Outcome::failure(FailureKind::Timeout, "timeout elapsed before spawn");
        }

        debug!(
            classifier = self.classifier.metadata().name(),
            transport = self.classifier.metadata().transport(),
            ?remaining,
            "invoking classifier"
        );

        let run = self.classifier.run(input, remaining);
        match tokio::time::timeout(remaining.saturating_add(CLEANUP_GRACE), run).await {
            Ok(Ok(raw)) => Outcome::from_raw(&raw),
            Ok(Err(err)) => Outcome::Failure(InvocationFailure::from(err)),
            Err(_) => Outcome::failure(
                FailureKind::Timeout,
                format!("classifier ignored its {remaining:?} timeout"),
            ),
        }
    }
}
