use crate::paper::ScoredPaper;

/// Keeps papers with `relevancy_score >= threshold`, preserving order.
pub fn select(papers: Vec<ScoredPaper>, threshold: u8) -> Vec<ScoredPaper> {
    papers
        .into_iter()
        .filter(|p| p.relevancy_score >= threshold)
        .collect()
}
