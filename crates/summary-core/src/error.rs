//! Error taxonomy for the summary pipeline.
//!
//! `TransportError` comes from the external text producer, `ExtractError` from
//! keyword extraction over a finalized text, and `PipelineError` is what the
//! orchestrator surfaces to its caller. Partial or raw text travels with the
//! error so the display side can still show it.

/// Failure reported by a text producer, either when opening the request or
/// mid-stream.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("credential rejected: {0}")]
    InvalidCredential(String),

    #[error("producer unreachable: {0}")]
    Unreachable(String),

    #[error("upstream returned error: status={status} message={message}")]
    Upstream { status: u16, message: String },

    #[error("stream interrupted: {0}")]
    Interrupted(String),
}

impl TransportError {
    pub fn is_credential_failure(&self) -> bool {
        matches!(self, Self::InvalidCredential(_))
    }

    /// Single human-readable message for display. Credential rejections are
    /// called out separately from every other transport failure.
    pub fn user_message(&self) -> String {
        if self.is_credential_failure() {
            format!("Error: {self}. Most likely, the API key is invalid.")
        } else {
            format!("Error: {self}. The summary service could not be reached.")
        }
    }
}

/// The finalized text does not follow the `...\n\nLabel: a, b, c` layout.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    #[error("no blank-line separated keyword section")]
    NoKeywordSection,

    #[error("keyword section has no ':' after its label")]
    MissingColon,

    #[error("keyword section lists no keywords")]
    NoKeywords,
}

/// Which required submission field was missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingInput {
    Query,
    Credential,
    Both,
}

impl std::fmt::Display for MissingInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Query => f.write_str("text to summarize"),
            Self::Credential => f.write_str("API key"),
            Self::Both => f.write_str("API key and text to summarize"),
        }
    }
}

/// Failure of the stream accumulator. Both variants keep whatever text had
/// been appended before the stop.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccumulateError {
    #[error("{source}")]
    Transport {
        source: TransportError,
        partial: String,
    },

    #[error("accumulation cancelled")]
    Cancelled { partial: String },
}

impl AccumulateError {
    pub fn partial(&self) -> &str {
        match self {
            Self::Transport { partial, .. } | Self::Cancelled { partial } => partial,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
    #[error("missing input: {0}")]
    EmptyInput(MissingInput),

    #[error("transport error: {source}")]
    Transport {
        source: TransportError,
        partial: String,
    },

    #[error("malformed model output: {source}")]
    MalformedOutput {
        source: ExtractError,
        raw_text: String,
    },

    #[error("submission cancelled")]
    Cancelled,
}

impl PipelineError {
    /// Text worth showing next to the error: the partial stream on transport
    /// failure, the raw model output on malformed output.
    pub fn diagnostic_text(&self) -> Option<&str> {
        match self {
            Self::Transport { partial, .. } if !partial.is_empty() => Some(partial),
            Self::MalformedOutput { raw_text, .. } => Some(raw_text),
            _ => None,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::EmptyInput(missing) => format!("Please enter your {missing}."),
            Self::Transport { source, .. } => source.user_message(),
            Self::MalformedOutput { source, .. } => format!(
                "Error: the summary did not end with a keyword paragraph ({source})."
            ),
            Self::Cancelled => "Submission cancelled.".to_string(),
        }
    }
}

impl From<AccumulateError> for PipelineError {
    fn from(err: AccumulateError) -> Self {
        match err {
            AccumulateError::Transport { source, partial } => Self::Transport { source, partial },
            AccumulateError::Cancelled { .. } => Self::Cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_failures_mention_api_key() {
        let err = TransportError::InvalidCredential("status 401".into());
        assert!(err.user_message().contains("API key is invalid"));

        let err = TransportError::Unreachable("connection refused".into());
        assert!(!err.user_message().contains("API key"));
        assert!(err.user_message().contains("could not be reached"));
    }

    #[test]
    fn cancellation_drops_partial_text() {
        let err: PipelineError = AccumulateError::Cancelled {
            partial: "Summary: half".into(),
        }
        .into();
        assert_eq!(err, PipelineError::Cancelled);
        assert_eq!(err.diagnostic_text(), None);
    }

    #[test]
    fn transport_failure_keeps_partial_text() {
        let err: PipelineError = AccumulateError::Transport {
            source: TransportError::Interrupted("reset".into()),
            partial: "Summary: half".into(),
        }
        .into();
        assert_eq!(err.diagnostic_text(), Some("Summary: half"));
    }

    #[test]
    fn empty_input_prompt_names_missing_fields() {
        let err = PipelineError::EmptyInput(MissingInput::Both);
        assert_eq!(
            err.user_message(),
            "Please enter your API key and text to summarize."
        );
    }
}
