//! Subject-category parsing, category filtering, and arXiv topic resolution.

use std::collections::HashSet;

use tracing::debug;

use super::error::PaperError;
use super::types::Paper;

/// Top-level arXiv topics and their archive codes. Physics is split into archives below.
const TOPICS: &[(&str, &str)] = &[
    ("Mathematics", "math"),
    ("Computer Science", "cs"),
    ("Quantitative Biology", "q-bio"),
    ("Quantitative Finance", "q-fin"),
    ("Statistics", "stat"),
    ("Electrical Engineering and Systems Science", "eess"),
    ("Economics", "econ"),
];

const PHYSICS_TOPICS: &[(&str, &str)] = &[
    ("Astrophysics", "astro-ph"),
    ("Condensed Matter", "cond-mat"),
    ("General Relativity and Quantum Cosmology", "gr-qc"),
    ("High Energy Physics - Experiment", "hep-ex"),
    ("High Energy Physics - Lattice", "hep-lat"),
    ("High Energy Physics - Phenomenology", "hep-ph"),
    ("High Energy Physics - Theory", "hep-th"),
    ("Mathematical Physics", "math-ph"),
    ("Nonlinear Sciences", "nlin"),
    ("Nuclear Experiment", "nucl-ex"),
    ("Nuclear Theory", "nucl-th"),
    ("Physics", "physics"),
    ("Quantum Physics", "quant-ph"),
];

/// Resolves a topic display name to its arXiv archive code.
///
/// Physics archives are addressed by their own names ("Quantum Physics" -> `quant-ph`);
/// the bare umbrella "Physics" is rejected.
pub fn resolve_topic(topic: &str) -> Result<&'static str, PaperError> {
    let topic = topic.trim();
    if topic == "Physics" {
        return Err(PaperError::PhysicsSubtopicRequired);
    }

    PHYSICS_TOPICS
        .iter()
        .chain(TOPICS.iter())
        .find(|(name, _)| *name == topic)
        .map(|(_, code)| *code)
        .ok_or_else(|| PaperError::UnknownTopic {
            topic: topic.to_string(),
        })
}

/// Splits a `;`-separated subject line and strips the trailing archive code of each entry.
pub fn parse_subject_field(raw: &str) -> Vec<String> {
    raw.split(';')
        .map(|subject| match subject.find(" (") {
            Some(idx) => &subject[..idx],
            None => subject,
        })
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Keeps papers whose subjects intersect `categories`. An empty filter keeps everything.
pub fn filter_by_categories(papers: Vec<Paper>, categories: &[String]) -> Vec<Paper> {
    if categories.is_empty() {
        return papers;
    }

    let wanted: HashSet<&str> = categories.iter().map(|c| c.trim()).collect();
    let before = papers.len();

    let kept: Vec<Paper> = papers
        .into_iter()
        .filter(|paper| {
            paper
                .subject_categories()
                .iter()
                .any(|subject| wanted.contains(subject.as_str()))
        })
        .collect();

    debug!(
        before,
        after = kept.len(),
        categories = categories.len(),
        "Applied subject-category filter"
    );

    kept
}
