//! Boundary contracts for the external text producer.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::TransportError;

/// One item of a streaming response. `End` is the explicit end-of-stream
/// marker; a stream that stops yielding without it ended abnormally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    Text(String),
    End,
}

pub type ChunkStream = BoxStream<'static, Result<Fragment, TransportError>>;

/// The two shapes a producer can answer with.
pub enum ChunkSource {
    /// A single, already complete text value.
    Complete(String),
    /// A live ordered sequence of fragments.
    Stream(ChunkStream),
}

impl std::fmt::Debug for ChunkSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Complete(text) => f.debug_tuple("Complete").field(&text.len()).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Opaque credential handed through to the producer. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Produces the summary text for a query, either as one blob or as a stream.
///
/// Credential validation, timeouts and retries all belong to the implementor.
#[async_trait]
pub trait TextProducer: Send + Sync {
    async fn produce(
        &self,
        credential: &Credential,
        query: &str,
    ) -> Result<ChunkSource, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_debug_is_redacted() {
        let credential = Credential::new("sk-secret");
        assert_eq!(format!("{credential:?}"), "Credential(<redacted>)");
        assert_eq!(credential.expose(), "sk-secret");
    }

    #[test]
    fn whitespace_credential_is_blank() {
        assert!(Credential::new("  \n").is_blank());
        assert!(!Credential::new("k").is_blank());
    }
}
