use std::collections::BTreeSet;
use std::sync::Arc;

use rmcp::{
    Json, RoleServer, ServerHandler,
    handler::server::router::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::*,
    service::RequestContext,
    tool, tool_handler, tool_router,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use llm_common::mcp_api::{
    ExtractKeywordsParams, HighlightKeywordsParams, HighlightResponse, HistogramBucket,
    KeywordSimilarityParams, KeywordsResponse, SimilarityResponse, SimilarityView,
    SummarizeParams, SummarizeResponse, SummarizeStatus,
};
use llm_common::openai::OpenAiClient;
use summary_core::error::PipelineError;
use summary_core::highlight::{highlight_with, PastelColors, StableColors, TextEscape};
use summary_core::keywords::{self, KeywordList};
use summary_core::pipeline::{
    DisplaySink, Orchestrator, PipelineOptions, PipelineResult, Submission,
};
use summary_core::producer::Credential;
use summary_core::similarity::{jaccard, SimilarityScore};

use crate::config::Config;
use crate::producer::{OpenAiProducer, ProducerMode};
use crate::rate_limit::RateLimiter;

#[derive(Clone)]
pub struct SummarizerServer {
    openai: Arc<OpenAiClient>,
    config: Arc<Config>,
    limiter: Option<RateLimiter>,
    tool_router: ToolRouter<SummarizerServer>,
}

impl SummarizerServer {
    pub fn new(openai: Arc<OpenAiClient>, config: Arc<Config>, limiter: Option<RateLimiter>) -> Self {
        Self {
            openai,
            config,
            limiter,
            tool_router: Self::tool_router(),
        }
    }

    async fn gate(&self) -> Result<(), String> {
        if let Some(limiter) = &self.limiter {
            limiter.check().await.map_err(|e| e.to_string())?;
        }
        Ok(())
    }

    fn credential_for(&self, api_key: Option<String>) -> Credential {
        api_key
            .map(Credential::new)
            .filter(|c| !c.is_blank())
            .or_else(|| self.config.fallback_credential.clone())
            .unwrap_or_else(|| Credential::new(""))
    }

    async fn run_summary(
        &self,
        params: SummarizeParams,
        cancel: CancellationToken,
    ) -> Result<SummarizeResponse, String> {
        let mode = if params.stream.unwrap_or(self.config.stream_by_default) {
            ProducerMode::Streaming
        } else {
            ProducerMode::SingleShot
        };
        let submission = Submission::new(params.query, self.credential_for(params.api_key));

        let producer = OpenAiProducer::new(Arc::clone(&self.openai), mode);
        let mut orchestrator = Orchestrator::new(producer, PastelColors).with_options(PipelineOptions {
            sentinel: self.config.sentinel,
            escape: TextEscape::Html,
            ..PipelineOptions::default()
        });

        // Submissions the orchestrator will reject never reach upstream.
        if !submission.credential.is_blank() && !submission.query.trim().is_empty() {
            self.gate().await?;
        }

        let mut sink = ResponseSink::default();
        orchestrator.run(&submission, &mut sink, cancel).await;
        debug!(partials = sink.partials, "summary stream drained");
        Ok(sink.into_response())
    }
}

/// Collects one submission's outcome as a tool response.
#[derive(Default)]
struct ResponseSink {
    partials: usize,
    response: Option<SummarizeResponse>,
}

impl ResponseSink {
    fn into_response(self) -> SummarizeResponse {
        self.response.unwrap_or_else(|| {
            let mut response = SummarizeResponse::empty(SummarizeStatus::Failed);
            response.message = Some(PipelineError::Cancelled.user_message());
            response
        })
    }
}

impl DisplaySink for ResponseSink {
    fn partial(&mut self, _text: &str) {
        self.partials += 1;
    }

    fn result(&mut self, result: &PipelineResult) {
        self.response = Some(done_response(result));
    }

    fn failure(&mut self, error: &PipelineError) {
        let mut response = SummarizeResponse::empty(SummarizeStatus::Failed);
        response.message = Some(error.user_message());
        response.text = error.diagnostic_text().map(str::to_string);
        self.response = Some(response);
    }

    fn prompt(&mut self, message: &str) {
        let mut response = SummarizeResponse::empty(SummarizeStatus::Prompt);
        response.message = Some(message.to_string());
        self.response = Some(response);
    }
}

fn done_response(result: &PipelineResult) -> SummarizeResponse {
    SummarizeResponse {
        status: SummarizeStatus::Done,
        submission_id: Some(result.submission_id.to_string()),
        rendered_summary: Some(result.rendered_summary.clone()),
        rendered_query: Some(result.rendered_query.clone()),
        similarity: Some(similarity_view(result.similarity)),
        keywords: result.keywords.as_slice().to_vec(),
        summary_matches: sorted(&result.summary_matches),
        query_matches: sorted(&result.query_matches),
        word_lengths: result.word_lengths.clone(),
        histogram: result
            .histogram
            .buckets()
            .iter()
            .map(|b| HistogramBucket {
                start: b.start,
                end: b.end,
                count: b.count,
            })
            .collect(),
        message: None,
        text: Some(result.summary_text.clone()),
    }
}

fn similarity_view(score: SimilarityScore) -> SimilarityView {
    SimilarityView {
        shared: score.shared(),
        total: score.total(),
        value: score.value(),
        display: score.to_string(),
    }
}

fn sorted(set: &BTreeSet<String>) -> Vec<String> {
    set.iter().cloned().collect()
}

#[tool_router]
impl SummarizerServer {
    #[tool(description = "Summarize a text with the configured OpenAI model, extract the model's keyword list, highlight the keywords in the summary and in the original text, and score their overlap (Jaccard). Returns status done, failed (with partial or raw text) or prompt (missing API key or text).")]
    async fn summarize(
        &self,
        Parameters(params): Parameters<SummarizeParams>,
        ctx: RequestContext<RoleServer>,
    ) -> Result<Json<SummarizeResponse>, String> {
        info!(?params, "summarize called");
        let response = self.run_summary(params, ctx.ct.clone()).await?;
        Ok(Json(response))
    }

    #[tool(description = "Extract the keyword list from model output that ends with a blank line followed by a 'Keywords: a, b, c' paragraph. Does not call the model.")]
    async fn extract_keywords(
        &self,
        Parameters(params): Parameters<ExtractKeywordsParams>,
    ) -> Result<Json<KeywordsResponse>, String> {
        let list = keywords::extract_keywords(&params.text)
            .map_err(|e| format!("extract_keywords failed: {e}"))?;
        Ok(Json(KeywordsResponse {
            keywords: list.into_vec(),
        }))
    }

    #[tool(description = "Wrap whole-word, case-insensitive keyword occurrences in colored <mark> spans (longest keyword wins on overlap). Text is HTML-escaped. Does not call the model.")]
    async fn highlight_keywords(
        &self,
        Parameters(params): Parameters<HighlightKeywordsParams>,
    ) -> Result<Json<HighlightResponse>, String> {
        let keywords = KeywordList::from(params.keywords);
        let result = highlight_with(&keywords, &params.text, &mut PastelColors, TextEscape::Html);
        Ok(Json(HighlightResponse {
            rendered: result.rendered,
            matched: sorted(&result.matched),
        }))
    }

    #[tool(description = "Highlight a keyword list in a summary and in the original query with shared colors, and return the Jaccard similarity of the two matched keyword sets. Does not call the model.")]
    async fn keyword_similarity(
        &self,
        Parameters(params): Parameters<KeywordSimilarityParams>,
    ) -> Result<Json<SimilarityResponse>, String> {
        let keywords = KeywordList::from(params.keywords);
        let mut colors = StableColors::new(PastelColors);
        let summary = highlight_with(&keywords, &params.summary, &mut colors, TextEscape::Html);
        let query = highlight_with(&keywords, &params.query, &mut colors, TextEscape::Html);
        let score = jaccard(&summary.matched, &query.matched);
        Ok(Json(SimilarityResponse {
            rendered_summary: summary.rendered,
            rendered_query: query.rendered,
            summary_matches: sorted(&summary.matched),
            query_matches: sorted(&query.matched),
            similarity: similarity_view(score),
        }))
    }
}

#[tool_handler]
impl ServerHandler for SummarizerServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_06_18,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "summarizer".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Keyword summarizer MCP server. Call summarize with the text (and an api_key unless \
the server has OPENAI_API_KEY set) to get a highlighted summary, its keywords and a similarity \
score. extract_keywords, highlight_keywords and keyword_similarity run the local steps without \
calling the model."
                    .to_string(),
            ),
        }
    }
}
