//! Pipeline orchestrator.
//!
//! Drives one submission through
//! `Idle -> Accumulating -> Extracting -> Scoring -> Done`, with `Failed`
//! reachable from every non-idle state. Each submission gets its own
//! accumulator and color assignment; the orchestrator keeps nothing between
//! submissions except its state, which re-enters `Idle` on the next submit.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::accumulator::{ChunkObserver, StreamAccumulator};
use crate::error::{AccumulateError, ExtractError, MissingInput, PipelineError};
use crate::highlight::{escape_text, highlight_with, ColorStrategy, StableColors, TextEscape};
use crate::histogram::{word_lengths, LengthHistogram, DEFAULT_BUCKET_WIDTH, DEFAULT_DOMAIN_MAX};
use crate::keywords::{extract_keywords, summary_body, KeywordList};
use crate::producer::{Credential, TextProducer};
use crate::similarity::{jaccard, SimilarityScore};

static SUBMISSION_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    Accumulating,
    Extracting,
    Scoring,
    Done,
    Failed,
}

#[derive(Debug, Clone)]
pub struct Submission {
    pub query: String,
    pub credential: Credential,
}

impl Submission {
    pub fn new(query: impl Into<String>, credential: Credential) -> Self {
        Self {
            query: query.into(),
            credential,
        }
    }

    fn missing_input(&self) -> Option<MissingInput> {
        match (self.query.trim().is_empty(), self.credential.is_blank()) {
            (true, true) => Some(MissingInput::Both),
            (true, false) => Some(MissingInput::Query),
            (false, true) => Some(MissingInput::Credential),
            (false, false) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SubmissionId(String);

impl SubmissionId {
    fn generate() -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_else(|_| Duration::from_secs(0));
        let counter = SUBMISSION_COUNTER.fetch_add(1, Ordering::Relaxed);

        let mut h = Sha256::new();
        h.update(now.as_nanos().to_le_bytes());
        h.update(std::process::id().to_le_bytes());
        h.update(counter.to_le_bytes());
        let digest = h.finalize();
        Self(digest[..16].iter().map(|b| format!("{b:02x}")).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Trailing completion marker stripped once at finalization.
    pub sentinel: Option<char>,
    /// Escaping applied to rendered summary and query text.
    pub escape: TextEscape,
    pub bucket_width: usize,
    pub domain_max: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            sentinel: None,
            escape: TextEscape::None,
            bucket_width: DEFAULT_BUCKET_WIDTH,
            domain_max: DEFAULT_DOMAIN_MAX,
        }
    }
}

/// Terminal record of a successful submission.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub submission_id: SubmissionId,
    /// Highlighted summary followed by the (unhighlighted) keyword paragraph.
    pub rendered_summary: String,
    pub rendered_query: String,
    pub similarity: SimilarityScore,
    /// One entry per whitespace-delimited token of the finalized text.
    pub word_lengths: Vec<usize>,
    pub histogram: LengthHistogram,
    pub keywords: KeywordList,
    pub summary_matches: BTreeSet<String>,
    pub query_matches: BTreeSet<String>,
    /// Finalized text exactly as produced.
    pub summary_text: String,
}

/// Where a submission's outcome is shown.
pub trait DisplaySink: Send {
    /// Accumulated text so far, while the producer is still delivering.
    fn partial(&mut self, _text: &str) {}

    fn result(&mut self, result: &PipelineResult);

    /// Transport or malformed-output failure. Use
    /// [`PipelineError::diagnostic_text`] for the partial or raw text.
    fn failure(&mut self, error: &PipelineError);

    /// A submission was rejected before running (missing query or credential).
    fn prompt(&mut self, message: &str);
}

pub struct Orchestrator<P, C> {
    producer: P,
    colors: C,
    options: PipelineOptions,
    state: PipelineState,
}

impl<P, C> Orchestrator<P, C>
where
    P: TextProducer,
    C: ColorStrategy,
{
    pub fn new(producer: P, colors: C) -> Self {
        Self {
            producer,
            colors,
            options: PipelineOptions::default(),
            state: PipelineState::Idle,
        }
    }

    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn reset(&mut self) {
        self.transition(PipelineState::Idle);
    }

    /// Run one submission and return its result.
    ///
    /// Missing input is rejected while still `Idle`. Cancelling `cancel`
    /// stops the submission without a result and returns to `Idle`.
    pub async fn submit(
        &mut self,
        submission: &Submission,
        observer: &mut dyn ChunkObserver,
        cancel: CancellationToken,
    ) -> Result<PipelineResult, PipelineError> {
        if matches!(self.state, PipelineState::Done | PipelineState::Failed) {
            self.reset();
        }
        if let Some(missing) = submission.missing_input() {
            debug!(%missing, "submission rejected before accumulation");
            return Err(PipelineError::EmptyInput(missing));
        }

        let id = SubmissionId::generate();
        info!(
            submission = %id,
            query_chars = submission.query.chars().count(),
            "submission started"
        );
        self.transition(PipelineState::Accumulating);

        let produced = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            produced = self.producer.produce(&submission.credential, &submission.query) => Some(produced),
        };
        let source = match produced {
            None => return Err(self.cancelled(&id)),
            Some(Ok(source)) => source,
            Some(Err(source)) => {
                return Err(self.fail(
                    &id,
                    PipelineError::Transport {
                        source,
                        partial: String::new(),
                    },
                ))
            }
        };

        let accumulator = StreamAccumulator::new(cancel).with_sentinel(self.options.sentinel);
        let text = match accumulator.accumulate(source, observer).await {
            Ok(text) => text.into_string(),
            Err(AccumulateError::Cancelled { .. }) => return Err(self.cancelled(&id)),
            Err(err) => return Err(self.fail(&id, err.into())),
        };

        self.transition(PipelineState::Extracting);
        let (keywords, body_len) = match split_summary(&text) {
            Ok(parts) => parts,
            Err(source) => {
                return Err(self.fail(
                    &id,
                    PipelineError::MalformedOutput {
                        source,
                        raw_text: text,
                    },
                ))
            }
        };

        self.transition(PipelineState::Scoring);
        let (body, tail) = text.split_at(body_len);
        let escape = self.options.escape;
        let mut colors = StableColors::new(&mut self.colors);
        let summary = highlight_with(&keywords, body, &mut colors, escape);
        let query = highlight_with(&keywords, &submission.query, &mut colors, escape);
        let similarity = jaccard(&summary.matched, &query.matched);

        let mut rendered_summary = summary.rendered;
        rendered_summary.push_str(&escape_text(tail, escape));

        let lengths = word_lengths(&text);
        let histogram =
            LengthHistogram::from_lengths(&lengths, self.options.bucket_width, self.options.domain_max);

        let result = PipelineResult {
            submission_id: id,
            rendered_summary,
            rendered_query: query.rendered,
            similarity,
            word_lengths: lengths,
            histogram,
            keywords,
            summary_matches: summary.matched,
            query_matches: query.matched,
            summary_text: text,
        };

        self.transition(PipelineState::Done);
        info!(
            submission = %result.submission_id,
            keywords = result.keywords.len(),
            similarity = %result.similarity,
            "submission done"
        );
        Ok(result)
    }

    /// Run one submission and hand its outcome to `sink`.
    ///
    /// Cancelled submissions reach the sink only through `partial` calls made
    /// before the cancellation.
    pub async fn run(
        &mut self,
        submission: &Submission,
        sink: &mut dyn DisplaySink,
        cancel: CancellationToken,
    ) -> Option<PipelineResult> {
        let mut observer = |current: &str| sink.partial(current);
        let outcome = self.submit(submission, &mut observer, cancel).await;
        match outcome {
            Ok(result) => {
                sink.result(&result);
                Some(result)
            }
            Err(err @ PipelineError::EmptyInput(_)) => {
                sink.prompt(&err.user_message());
                None
            }
            Err(PipelineError::Cancelled) => None,
            Err(err) => {
                sink.failure(&err);
                None
            }
        }
    }

    fn transition(&mut self, next: PipelineState) {
        debug!(from = ?self.state, to = ?next, "pipeline state");
        self.state = next;
    }

    fn fail(&mut self, id: &SubmissionId, err: PipelineError) -> PipelineError {
        warn!(submission = %id, error = %err, "submission failed");
        self.transition(PipelineState::Failed);
        err
    }

    fn cancelled(&mut self, id: &SubmissionId) -> PipelineError {
        info!(submission = %id, "submission cancelled");
        self.transition(PipelineState::Idle);
        PipelineError::Cancelled
    }
}

/// Keyword list plus the byte length of the summary before the keyword
/// paragraph. An empty keyword list counts as malformed.
fn split_summary(text: &str) -> Result<(KeywordList, usize), ExtractError> {
    let keywords = extract_keywords(text)?;
    if keywords.is_empty() {
        return Err(ExtractError::NoKeywords);
    }
    Ok((keywords, summary_body(text)?.len()))
}
