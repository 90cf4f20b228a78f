use chrono::Utc;
use futures_util::stream::{self, StreamExt};
use tracing::{Instrument, debug, error, info, info_span, instrument, warn};
use uuid::Uuid;

use crate::completion::{CompletionClient, CompletionError};
use crate::filter::{filter, select};
use crate::paper::{InterestQuery, Paper, ScoredPaper};
use crate::parser::{BatchResult, ResponseParser};
use crate::prompt::{FieldSet, PromptBatch, PromptBatcher};

use super::error::{PipelineError, PipelineResult};
use super::types::{
    BatchFailurePolicy, BatchReport, DigestRun, PipelineOptions, RunState, RunStats,
};

struct BatchOutput {
    report: BatchReport,
    papers: Vec<ScoredPaper>,
}

/// Runs batches through call → parse → verify and merges them into a [`DigestRun`].
#[derive(Debug, Clone)]
pub struct Pipeline {
    batcher: PromptBatcher,
    parser: ResponseParser,
    client: CompletionClient,
    options: PipelineOptions,
}

impl Pipeline {
    /// Builds a pipeline with the default analysis fields.
    pub fn new(client: CompletionClient, options: PipelineOptions) -> PipelineResult<Self> {
        Self::with_fields(client, FieldSet::default(), options)
    }

    pub fn with_fields(
        client: CompletionClient,
        fields: FieldSet,
        options: PipelineOptions,
    ) -> PipelineResult<Self> {
        options.limits.validate()?;
        let batcher = PromptBatcher::new(options.limits.batch_size, fields.clone())?;
        Ok(Self {
            batcher,
            parser: ResponseParser::new(fields),
            client,
            options,
        })
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Scores a single fetch.
    pub async fn run(
        &self,
        interest: &InterestQuery,
        papers: Vec<Paper>,
    ) -> PipelineResult<DigestRun> {
        self.run_fetches(interest, vec![papers]).await
    }

    /// Scores several fetches; batches never mix papers from different fetches.
    pub async fn run_fetches(
        &self,
        interest: &InterestQuery,
        fetches: Vec<Vec<Paper>>,
    ) -> PipelineResult<DigestRun> {
        let run_id = Uuid::new_v4();
        let span = info_span!("digest_run", %run_id);

        match self.options.run_timeout {
            Some(limit) => {
                tokio::time::timeout(limit, self.execute(run_id, interest, fetches))
                    .instrument(span)
                    .await
                    .unwrap_or_else(|_| {
                        error!(%run_id, timeout_secs = limit.as_secs_f64(), "Run timed out");
                        Err(PipelineError::RunTimedOut { limit })
                    })
            }
            None => self.execute(run_id, interest, fetches).instrument(span).await,
        }
    }

    async fn execute(
        &self,
        run_id: Uuid,
        interest: &InterestQuery,
        fetches: Vec<Vec<Paper>>,
    ) -> PipelineResult<DigestRun> {
        let input_papers: usize = fetches.iter().map(Vec::len).sum();
        debug!(state = %RunState::Batching, input_papers, "Starting run");

        let batches = self.batcher.build_grouped(interest, fetches);
        let batch_count = batches.len();
        info!(
            input_papers,
            batches = batch_count,
            concurrency = self.options.concurrency,
            "Scoring papers"
        );

        let mut outputs = stream::iter(batches)
            .map(|batch| async move {
                let index = batch.index;
                let fingerprint = batch.fingerprint();
                let papers = batch.len();
                (index, fingerprint, papers, self.process_batch(batch).await)
            })
            .buffered(self.options.concurrency.max(1));

        let mut reports = Vec::with_capacity(batch_count);
        let mut verified: Vec<ScoredPaper> = Vec::new();
        let mut hallucination_detected = false;
        let mut failed_batches = 0;

        while let Some((index, fingerprint, papers, outcome)) = outputs.next().await {
            match outcome {
                Ok(output) => {
                    hallucination_detected |= output.report.hallucinated;
                    verified.extend(output.papers);
                    reports.push(output.report);
                }
                Err(source) => match self.options.on_batch_failure {
                    BatchFailurePolicy::Abort => {
                        error!(batch = index, error = %source, "Batch failed, aborting run");
                        return Err(PipelineError::BatchFailed {
                            batch: index,
                            source,
                        });
                    }
                    BatchFailurePolicy::Skip => {
                        warn!(batch = index, error = %source, "Batch failed, skipping");
                        failed_batches += 1;
                        reports.push(BatchReport {
                            index,
                            papers,
                            fingerprint,
                            parsed: 0,
                            verified: 0,
                            hallucinated: false,
                            error: Some(source.to_string()),
                        });
                    }
                },
            }
        }

        let verified_count = verified.len();
        let threshold = self.options.limits.threshold;
        let mut selected = select(verified, threshold);
        // Stable: equal scores keep input order.
        selected.sort_by(|a, b| b.relevancy_score.cmp(&a.relevancy_score));

        if hallucination_detected {
            warn!("Model returned papers that were not in the input");
        }
        info!(
            state = %RunState::Done,
            verified = verified_count,
            selected = selected.len(),
            threshold,
            hallucination_detected,
            failed_batches,
            "Run finished"
        );

        Ok(DigestRun {
            run_id,
            generated_at: Utc::now(),
            threshold,
            stats: RunStats {
                input_papers,
                batches: batch_count,
                failed_batches,
                verified: verified_count,
                selected: selected.len(),
            },
            papers: selected,
            hallucination_detected,
            batches: reports,
        })
    }

    #[instrument(skip_all, fields(batch = batch.index, papers = batch.len(), fingerprint = %batch.fingerprint()))]
    async fn process_batch(&self, batch: PromptBatch) -> Result<BatchOutput, CompletionError> {
        debug!(state = %RunState::CallingModel, "Requesting scores");
        let text = self.client.complete(&batch.prompt).await?;

        debug!(state = %RunState::Parsing, chars = text.len(), "Parsing response");
        let result = BatchResult::new(text, batch.titles().map(str::to_string).collect());
        let records = self.parser.parse(&result);
        let parsed = records.len();

        debug!(state = %RunState::Filtering, parsed, "Verifying titles");
        let mut outcome = filter(records, &batch.papers);
        outcome.papers.sort_by_key(|scored| {
            batch
                .papers
                .iter()
                .position(|p| p.title == scored.paper.title)
                .unwrap_or(usize::MAX)
        });

        if outcome.hallucinated {
            warn!(batch = batch.index, "Batch response contained hallucinated papers");
        }

        Ok(BatchOutput {
            report: BatchReport {
                index: batch.index,
                papers: batch.len(),
                fingerprint: batch.fingerprint(),
                parsed,
                verified: outcome.papers.len(),
                hallucinated: outcome.hallucinated,
                error: None,
            },
            papers: outcome.papers,
        })
    }
}
