//! Paper input error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while preparing the paper set handed to the pipeline.
#[derive(Debug, Error)]
pub enum PaperError {
    /// Paper listing could not be read.
    #[error("failed to read paper listing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Paper listing is not a JSON array of papers.
    #[error("failed to parse paper listing {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// "Physics" is an umbrella topic; a physics archive must be chosen.
    #[error("topic 'Physics' requires a physics sub-topic")]
    PhysicsSubtopicRequired,

    #[error("unknown topic '{topic}'")]
    UnknownTopic { topic: String },
}
