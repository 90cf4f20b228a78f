use std::fmt::Write;

use tracing::debug;

use crate::constants::{FIELD_PLACEHOLDER, LimitsError, MAX_RELEVANCY_SCORE};
use crate::hashing::{hash_titles, prompt_fingerprint};
use crate::paper::{InterestQuery, Paper};

use super::fields::{FieldSet, SCORE_KEY, TITLE_KEY};

/// One rendered prompt and the papers it covers.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptBatch {
    /// Position of the batch across the whole run.
    pub index: usize,
    /// Papers covered, in input order.
    pub papers: Vec<Paper>,
    /// Rendered model input.
    pub prompt: String,
}

impl PromptBatch {
    pub fn titles(&self) -> impl Iterator<Item = &str> {
        self.papers.iter().map(|p| p.title.as_str())
    }

    pub fn len(&self) -> usize {
        self.papers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.papers.is_empty()
    }

    /// Short BLAKE3 label of the rendered prompt.
    pub fn fingerprint(&self) -> String {
        prompt_fingerprint(&self.prompt)
    }

    /// Hash of the covered titles, stable across prompt wording changes.
    pub fn titles_hash(&self) -> u64 {
        hash_titles(self.titles())
    }
}

/// Splits papers into batches of at most `batch_size` and renders their prompts.
#[derive(Debug, Clone)]
pub struct PromptBatcher {
    batch_size: usize,
    fields: FieldSet,
}

impl PromptBatcher {
    pub fn new(batch_size: usize, fields: FieldSet) -> Result<Self, LimitsError> {
        if batch_size == 0 {
            return Err(LimitsError::ZeroBatchSize);
        }
        Ok(Self { batch_size, fields })
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn fields(&self) -> &FieldSet {
        &self.fields
    }

    /// Batches a single fetch.
    pub fn build(&self, interest: &InterestQuery, papers: Vec<Paper>) -> Vec<PromptBatch> {
        self.build_grouped(interest, vec![papers])
    }

    /// Batches several fetches; each fetch is chunked independently and batch indices run
    /// continuously across fetches.
    pub fn build_grouped(
        &self,
        interest: &InterestQuery,
        fetches: Vec<Vec<Paper>>,
    ) -> Vec<PromptBatch> {
        let mut batches = Vec::new();

        for papers in fetches {
            let mut remaining = papers.into_iter().peekable();
            while remaining.peek().is_some() {
                let chunk: Vec<Paper> = remaining.by_ref().take(self.batch_size).collect();
                let prompt = self.render(interest, &chunk);
                batches.push(PromptBatch {
                    index: batches.len(),
                    papers: chunk,
                    prompt,
                });
            }
        }

        debug!(
            batches = batches.len(),
            batch_size = self.batch_size,
            "Built prompt batches"
        );

        batches
    }

    /// Renders the interest statement, the papers, and the per-paper response instruction.
    pub fn render(&self, interest: &InterestQuery, papers: &[Paper]) -> String {
        let mut prompt = String::new();

        // Writing to a String cannot fail.
        let _ = writeln!(
            prompt,
            "You have been asked to read a list of {} arXiv papers, each with title, authors, subjects and abstract.",
            papers.len()
        );
        let _ = writeln!(
            prompt,
            "Based on my specific research interests, provide a relevancy score out of {} for each paper, with a higher score indicating greater relevance. A relevancy score of 7 or more means the paper needs my attention.",
            MAX_RELEVANCY_SCORE
        );
        prompt.push_str("Also fill in every field shown in the example for each paper.\n");
        prompt.push_str(
            "Keep the papers in the same order as the input list and respond with exactly one JSON object per paper, one object per line. Copy each title exactly as given. Example:\n",
        );
        let _ = writeln!(prompt, "1. {}", self.example_object());
        let _ = writeln!(prompt, "\nMy research interests are: {}\n", interest);

        for (i, paper) in papers.iter().enumerate() {
            prompt.push_str("###\n");
            let _ = writeln!(prompt, "{}. Title: {}", i + 1, paper.title.trim());
            let _ = writeln!(prompt, "Authors: {}", or_placeholder(paper.authors.display()));
            let _ = writeln!(
                prompt,
                "Subjects: {}",
                or_placeholder(paper.subjects.display())
            );
            let _ = writeln!(
                prompt,
                "Abstract: {}",
                or_placeholder(paper.abstract_text.trim().to_string())
            );
        }

        prompt.push_str("###\n\nGenerate response:\n");
        prompt
    }

    fn example_object(&self) -> String {
        let mut entries = vec![
            (TITLE_KEY.to_string(), "the exact paper title".to_string()),
            (
                SCORE_KEY.to_string(),
                format!("an integer score out of {}", MAX_RELEVANCY_SCORE),
            ),
        ];
        entries.extend(
            self.fields
                .iter()
                .map(|f| (f.name.clone(), f.instruction.clone())),
        );

        let body = entries
            .into_iter()
            .map(|(k, v)| format!("{}: {}", json_string(&k), json_string(&v)))
            .collect::<Vec<_>>()
            .join(", ");
        format!("{{{}}}", body)
    }
}

fn json_string(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

fn or_placeholder(value: String) -> String {
    if value.is_empty() {
        FIELD_PLACEHOLDER.to_string()
    } else {
        value
    }
}
