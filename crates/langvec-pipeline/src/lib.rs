//! # langvec Pipeline
//!
//! Composition on top of the embedding adapters:
//!
//! - [`Pipeline`]: a featurizer followed by a [`Classifier`]
//! - [`FeatureUnion`]: several featurizers side by side, itself a
//!   [`Transformer`](langvec_embeddings::Transformer)
//! - [`LogisticRegression`]: a small gradient-descent classifier
//!
//! Nested parameters are addressed as `<stage>__<param>`.

mod classifier;
mod error;
mod pipeline;
mod routing;
mod union;

pub use classifier::{Classifier, LogisticRegression, LogisticRegressionConfig};
pub use error::{PipelineError, PipelineResult};
pub use pipeline::Pipeline;
pub use union::FeatureUnion;
