//! Paper records flowing into and out of the scoring pipeline.
//!
//! [`Paper`] is owned by the fetch collaborator and passed by value into the pipeline.
//! [`ScoredPaper`] is only ever built from a parsed model record that matched one of those
//! papers (see [`crate::filter`]).

pub mod error;
pub mod subjects;
pub mod types;

#[cfg(test)]
mod tests;

pub use error::PaperError;
pub use subjects::{filter_by_categories, parse_subject_field, resolve_topic};
pub use types::{AnalysisField, InterestQuery, Paper, ScoredPaper, TextOrList};

use std::path::Path;

/// Loads a JSON array of papers produced by the fetch collaborator.
pub async fn load_papers(path: &Path) -> Result<Vec<Paper>, PaperError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| PaperError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    serde_json::from_str(&raw).map_err(|source| PaperError::Json {
        path: path.to_path_buf(),
        source,
    })
}
