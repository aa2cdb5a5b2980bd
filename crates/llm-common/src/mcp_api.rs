use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Clone, Deserialize, JsonSchema)]
pub struct SummarizeParams {
    /// The text to summarize.
    pub query: String,
    /// OpenAI API key. Falls back to the server's OPENAI_API_KEY when omitted.
    pub api_key: Option<String>,
    /// Stream the completion (default: server setting, normally true).
    pub stream: Option<bool>,
}

impl std::fmt::Debug for SummarizeParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SummarizeParams")
            .field("query_chars", &self.query.chars().count())
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("stream", &self.stream)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ExtractKeywordsParams {
    /// Model output ending in a blank line and a "Keywords: a, b, c" paragraph.
    pub text: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct HighlightKeywordsParams {
    pub keywords: Vec<String>,
    pub text: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct KeywordSimilarityParams {
    pub keywords: Vec<String>,
    /// Summary text without its keyword paragraph.
    pub summary: String,
    pub query: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SummarizeStatus {
    Done,
    Failed,
    /// Input was missing; `message` says what to enter.
    Prompt,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SimilarityView {
    pub shared: usize,
    pub total: usize,
    pub value: f64,
    /// Three-decimal rendering, e.g. "0.333".
    pub display: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct HistogramBucket {
    pub start: usize,
    pub end: usize,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SummarizeResponse {
    pub status: SummarizeStatus,
    pub submission_id: Option<String>,
    /// Highlighted summary, HTML-escaped, followed by the keyword paragraph.
    pub rendered_summary: Option<String>,
    pub rendered_query: Option<String>,
    pub similarity: Option<SimilarityView>,
    pub keywords: Vec<String>,
    pub summary_matches: Vec<String>,
    pub query_matches: Vec<String>,
    pub word_lengths: Vec<usize>,
    pub histogram: Vec<HistogramBucket>,
    /// Human-readable error or prompt text.
    pub message: Option<String>,
    /// Finalized text on success, partial text on transport failure, raw
    /// model output on malformed output.
    pub text: Option<String>,
}

impl SummarizeResponse {
    pub fn empty(status: SummarizeStatus) -> Self {
        Self {
            status,
            submission_id: None,
            rendered_summary: None,
            rendered_query: None,
            similarity: None,
            keywords: Vec::new(),
            summary_matches: Vec::new(),
            query_matches: Vec::new(),
            word_lengths: Vec::new(),
            histogram: Vec::new(),
            message: None,
            text: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct KeywordsResponse {
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct HighlightResponse {
    pub rendered: String,
    pub matched: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SimilarityResponse {
    pub rendered_summary: String,
    pub rendered_query: String,
    pub summary_matches: Vec<String>,
    pub query_matches: Vec<String>,
    pub similarity: SimilarityView,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summarize_params_debug_hides_api_key() {
        let params = SummarizeParams {
            query: "text".into(),
            api_key: Some("sk-secret".into()),
            stream: None,
        };
        let dbg = format!("{params:?}");
        assert!(!dbg.contains("sk-secret"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_value(SummarizeResponse::empty(SummarizeStatus::Prompt)).unwrap();
        assert_eq!(json["status"], "prompt");
        assert!(json["keywords"].as_array().is_some_and(Vec::is_empty));
    }
}
