//! Stream accumulator.
//!
//! Appends producer fragments in delivery order into one growing string,
//! notifying an observer with the full current value after every append.
//! Finalization consumes the accumulator, so a text is finalized exactly once.

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{AccumulateError, TransportError};
use crate::producer::{ChunkSource, Fragment};

/// Receives the accumulated text (not the delta) after each append.
pub trait ChunkObserver: Send {
    fn on_text(&mut self, current: &str);
}

impl<F> ChunkObserver for F
where
    F: FnMut(&str) + Send,
{
    fn on_text(&mut self, current: &str) {
        self(current)
    }
}

/// Text that will not receive further fragments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizedText(String);

impl FinalizedText {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

pub struct StreamAccumulator {
    text: String,
    chunks: usize,
    sentinel: Option<char>,
    cancel: CancellationToken,
}

impl StreamAccumulator {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            text: String::new(),
            chunks: 0,
            sentinel: None,
            cancel,
        }
    }

    /// Character some producers append to mark completion. Stripped once at
    /// finalization when it is the last character of the text.
    pub fn with_sentinel(mut self, sentinel: Option<char>) -> Self {
        self.sentinel = sentinel;
        self
    }

    /// Drain `source` into the accumulator and finalize it.
    ///
    /// A single complete value is delivered to the observer once. A stream is
    /// read until its `End` fragment; fragments after `End` are ignored. On
    /// cancellation nothing further is appended and the observer is not
    /// called again.
    pub async fn accumulate(
        mut self,
        source: ChunkSource,
        observer: &mut dyn ChunkObserver,
    ) -> Result<FinalizedText, AccumulateError> {
        match source {
            ChunkSource::Complete(text) => {
                if self.cancel.is_cancelled() {
                    return Err(self.into_cancelled());
                }
                self.append(&text, observer);
            }
            ChunkSource::Stream(mut stream) => {
                let cancel = self.cancel.clone();
                loop {
                    let next = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => None,
                        item = stream.next() => Some(item),
                    };
                    let Some(item) = next else {
                        return Err(self.into_cancelled());
                    };
                    match item {
                        Some(Ok(Fragment::Text(chunk))) => {
                            if cancel.is_cancelled() {
                                return Err(self.into_cancelled());
                            }
                            self.append(&chunk, observer);
                        }
                        Some(Ok(Fragment::End)) => break,
                        Some(Err(source)) => {
                            debug!(chunks = self.chunks, error = %source, "stream failed");
                            return Err(AccumulateError::Transport {
                                source,
                                partial: self.text,
                            });
                        }
                        None => {
                            debug!(chunks = self.chunks, "stream closed before end marker");
                            return Err(AccumulateError::Transport {
                                source: TransportError::Interrupted(
                                    "stream ended without an end-of-stream marker".to_string(),
                                ),
                                partial: self.text,
                            });
                        }
                    }
                }
            }
        }
        Ok(self.finalize())
    }

    fn append(&mut self, chunk: &str, observer: &mut dyn ChunkObserver) {
        self.text.push_str(chunk);
        self.chunks += 1;
        observer.on_text(&self.text);
    }

    fn into_cancelled(self) -> AccumulateError {
        debug!(chunks = self.chunks, "accumulation cancelled");
        AccumulateError::Cancelled { partial: self.text }
    }

    fn finalize(mut self) -> FinalizedText {
        if let Some(sentinel) = self.sentinel {
            if self.text.ends_with(sentinel) {
                self.text.pop();
            }
        }
        debug!(
            chunks = self.chunks,
            bytes = self.text.len(),
            "accumulation finalized"
        );
        FinalizedText(self.text)
    }
}
