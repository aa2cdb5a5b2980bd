use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use tracing::debug;

use llm_common::openai::{ChatStream, OpenAiClient, OpenAiClientError};
use llm_common::prompt::summary_request;
use llm_common::sse::ChatStreamEvent;
use summary_core::error::TransportError;
use summary_core::producer::{ChunkSource, ChunkStream, Credential, Fragment, TextProducer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProducerMode {
    SingleShot,
    Streaming,
}

/// Summary text from an OpenAI-compatible chat-completions endpoint.
#[derive(Clone)]
pub struct OpenAiProducer {
    client: Arc<OpenAiClient>,
    mode: ProducerMode,
}

impl OpenAiProducer {
    pub fn new(client: Arc<OpenAiClient>, mode: ProducerMode) -> Self {
        Self { client, mode }
    }
}

#[async_trait]
impl TextProducer for OpenAiProducer {
    async fn produce(
        &self,
        credential: &Credential,
        query: &str,
    ) -> Result<ChunkSource, TransportError> {
        let request = summary_request(self.client.config(), query);
        debug!(mode = ?self.mode, model = %request.model, "requesting summary");
        match self.mode {
            ProducerMode::SingleShot => self
                .client
                .chat_text(credential.expose(), request)
                .await
                .map(ChunkSource::Complete)
                .map_err(transport_error),
            ProducerMode::Streaming => self
                .client
                .chat_completions_stream(credential.expose(), request)
                .await
                .map(|stream| ChunkSource::Stream(fragments(stream)))
                .map_err(transport_error),
        }
    }
}

/// Once the stream is open the endpoint has been reached, so every failure
/// is an interruption regardless of its underlying cause.
fn fragments(stream: ChatStream) -> ChunkStream {
    stream
        .map(|item| {
            item.map(|event| match event {
                ChatStreamEvent::Delta(text) => Fragment::Text(text),
                ChatStreamEvent::Done => Fragment::End,
            })
            .map_err(|err| TransportError::Interrupted(err.to_string()))
        })
        .boxed()
}

pub fn transport_error(err: OpenAiClientError) -> TransportError {
    if err.is_auth_failure() {
        return TransportError::InvalidCredential(err.to_string());
    }
    if err.is_unreachable() {
        return TransportError::Unreachable(err.to_string());
    }
    match err {
        OpenAiClientError::Upstream { status, message } => TransportError::Upstream {
            status: status.as_u16(),
            message,
        },
        OpenAiClientError::UpstreamBody { status, body } => TransportError::Upstream {
            status: status.as_u16(),
            message: body,
        },
        OpenAiClientError::StreamEnded
        | OpenAiClientError::StreamBody(_)
        | OpenAiClientError::Request(_)
        | OpenAiClientError::HeaderTimeout(_) => TransportError::Interrupted(err.to_string()),
        OpenAiClientError::InvalidJson(_) | OpenAiClientError::MissingContent => {
            TransportError::Upstream {
                status: 502,
                message: err.to_string(),
            }
        }
    }
}
