//! External classifier invocation.
//!
//! A classifier is any process that reads one JSON object on standard input
//! and writes one JSON object on standard output. The [`Classifier`] trait
//! abstracts the transport so that tests can swap the real process
//! ([`ProcessClassifier`]) for an in-memory double ([`StaticClassifier`]).
//! [`ProcessInvoker`] drives one invocation and reduces whatever happened to
//! an [`Outcome`].

#![warn(missing_docs, clippy::pedantic)]

pub mod double;
pub mod invoker;
pub mod limit;
pub mod outcome;
pub mod process;
pub mod traits;

pub use double::StaticClassifier;
pub use invoker::{InvokerConfig, ProcessInvoker};
pub use limit::{LimiterClosed, ProcessLimiter};
pub use outcome::{ClassifierPayload, FailureKind, InvocationFailure, Outcome};
pub use process::{ProcessClassifier, ProcessClassifierConfig};
pub use traits::{Classifier, ClassifierError, ClassifierMetadata, ClassifierResult, RawOutput};
