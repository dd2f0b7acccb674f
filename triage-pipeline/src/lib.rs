//! Triage decision pipeline.
//!
//! [`DecisionPipeline::evaluate`] always computes the rule-engine baseline
//! first, then makes one classifier call and [`reconcile`]s its outcome with
//! the baseline. Classifier problems never surface as errors; they degrade to
//! the baseline and are logged with their category.

#![warn(missing_docs, clippy::pedantic)]

mod pipeline;
mod reconcile;

pub use pipeline::{DecisionPipeline, DecisionSource, Evaluation, PipelineError, PipelineResult};
pub use reconcile::reconcile;
