use std::collections::HashMap;

use tracing::{debug, warn};

use crate::paper::{Paper, ScoredPaper};
use crate::parser::ScoreRecord;

/// Verified papers of one batch plus whether anything fabricated was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterOutcome {
    /// In the order the model emitted them.
    pub papers: Vec<ScoredPaper>,
    pub hallucinated: bool,
}

/// Keeps records whose title exactly matches a title of `batch` and joins them with that
/// paper.
///
/// Titles are compared after trimming surrounding whitespace, otherwise verbatim and
/// case-sensitive. The trim is intentional and is the only normalization applied. A record
/// without a title, or with a title not in the batch, is dropped and sets `hallucinated`. A
/// second record for an already matched paper is dropped without setting the flag.
pub fn filter(records: Vec<ScoreRecord>, batch: &[Paper]) -> FilterOutcome {
    let by_title: HashMap<&str, &Paper> = batch
        .iter()
        .rev()
        .map(|p| (p.title.trim(), p))
        .collect();

    let mut matched: Vec<&str> = Vec::with_capacity(batch.len());
    let mut outcome = FilterOutcome::default();

    for record in records {
        let Some(title) = record.title.as_deref() else {
            warn!("Dropping record without a title");
            outcome.hallucinated = true;
            continue;
        };

        let Some((key, paper)) = by_title.get_key_value(title.trim()) else {
            warn!(title = %title, "Dropping record for a paper not in the batch");
            outcome.hallucinated = true;
            continue;
        };

        if matched.contains(key) {
            debug!(title = %title, "Dropping duplicate record");
            continue;
        }
        matched.push(key);

        let paper = (*paper).clone();
        let relevancy_score = record.relevancy_score;
        outcome.papers.push(ScoredPaper {
            paper,
            relevancy_score,
            analysis: record.into_analysis(),
        });
    }

    outcome
}
