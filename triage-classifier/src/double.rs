//! In-memory classifier double for deterministic tests.

use std::fmt;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::traits::{Classifier, ClassifierError, ClassifierMetadata, ClassifierResult, RawOutput};

#[derive(Clone, Debug)]
enum Reply {
    Output(RawOutput),
    SpawnFailure(String),
}

/// Classifier that returns a scripted reply without spawning anything.
///
/// Every input it receives is recorded and can be inspected with
/// [`StaticClassifier::received`].
pub struct StaticClassifier {
    metadata: ClassifierMetadata,
    reply: Reply,
    delay: Option<Duration>,
    received: Mutex<Vec<Vec<u8>>>,
}

impl fmt::Debug for StaticClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticClassifier")
            .field("reply", &self.reply)
            .field("delay", &self.delay)
            .finish_non_exhaustive()
    }
}

impl StaticClassifier {
    fn with_reply(reply: Reply) -> Self {
        Self {
            metadata: ClassifierMetadata::new("static", "static"),
            reply,
            delay: None,
            received: Mutex::new(Vec::new()),
        }
    }

    /// Replies with the supplied raw output.
    #[must_use]
    pub fn replying(output: RawOutput) -> Self {
        Self::with_reply(Reply::Output(output))
    }

    /// Exits with code 0 and prints `value` as JSON.
    #[must_use]
    pub fn json(value: &Value) -> Self {
        Self::replying(RawOutput::new(Some(0), value.to_string(), Vec::new()))
    }

    /// Exits with `code` after printing `stderr`.
    #[must_use]
    pub fn exiting(code: i32, stderr: impl Into<Vec<u8>>) -> Self {
        Self::replying(RawOutput::new(Some(code), Vec::new(), stderr))
    }

    /// Fails as if the program could not be started.
    #[must_use]
    pub fn unreachable(reason: impl Into<String>) -> Self {
        Self::with_reply(Reply::SpawnFailure(reason.into()))
    }

    /// Delays the reply. A delay longer than the invocation timeout yields
    /// [`ClassifierError::Timeout`].
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Returns every input received so far, in call order.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock has been poisoned.
    #[must_use]
    pub fn received(&self) -> Vec<Vec<u8>> {
        self.received.lock().expect("received inputs poisoned").clone()
    }

    /// Returns every input received so far, parsed as JSON.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock has been poisoned or an input was not JSON.
    #[must_use]
    pub fn received_json(&self) -> Vec<Value> {
        self.received()
            .iter()
            .map(|bytes| serde_json::from_slice(bytes).expect("classifier input is JSON"))
            .collect()
    }
}

#[async_trait]
impl Classifier for StaticClassifier {
    fn metadata(&self) -> &ClassifierMetadata {
        &self.metadata
    }

    async fn run(&self, input: Vec<u8>, timeout: Duration) -> ClassifierResult<RawOutput> {
        let output = match &self.reply {
            Reply::SpawnFailure(reason) => return Err(ClassifierError::spawn(reason.clone())),
            Reply::Output(output) => output.clone(),
        };
        self.received
            .lock()
            .expect("received inputs poisoned")
            .push(input);

        if let Some(delay) = self.delay {
            if delay > timeout {
                tokio::time::sleep(timeout).await;
                return Err(ClassifierError::Timeout { after: timeout });
            }
            tokio::time::sleep(delay).await;
        }

        Ok(output)
    }
}
