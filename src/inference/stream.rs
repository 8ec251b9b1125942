//! Pull-based reader for chat-completions SSE streams.
//!
//! The wire stream looks like:
//!
//! ```text
//! data: {"choices":[{"delta":{"role":"assistant","content":""}}]}
//! data: {"choices":[{"delta":{"content":"Hello"}}]}
//! data: [DONE]
//! ```
//!
//! Only `data:` lines are read. Each chunk whose first choice carries
//! `delta.content` becomes one fragment.

use futures::stream::{self, BoxStream, Stream, StreamExt};
use log::{debug, info, warn};
use serde::Deserialize;

use super::provider::ProviderError;

#[derive(Deserialize, Debug)]
struct ChunkEvent {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Deserialize, Debug)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Deserialize, Debug, Default)]
struct ChunkDelta {
    content: Option<String>,
}

/// What a single SSE line means for the consumer.
#[derive(Debug, PartialEq)]
enum LineEvent {
    Fragment(String),
    Done,
    Skip,
}

fn parse_line(line: &str) -> Result<LineEvent, ProviderError> {
    let line = line.trim();
    let Some(data) = line.strip_prefix("data:") else {
        // Comments, `event:` and `id:` lines, blank separators
        return Ok(LineEvent::Skip);
    };
    let data = data.trim_start();

    if data == "[DONE]" {
        return Ok(LineEvent::Done);
    }

    let event: ChunkEvent = serde_json::from_str(data)
        .map_err(|e| ProviderError::Parse(format!("bad stream chunk: {e}")))?;

    Ok(event
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .map(LineEvent::Fragment)
        .unwrap_or(LineEvent::Skip))
}

/// A lazy, finite, non-restartable sequence of reply fragments.
///
/// Fragments are produced only as the consumer pulls them. Nothing is
/// reassembled here; use [`CompletionStream::collect_text`] to join them.
pub struct CompletionStream {
    body: BoxStream<'static, Result<Vec<u8>, ProviderError>>,
    // Raw bytes; a UTF-8 sequence may be split across transport chunks.
    buffer: Vec<u8>,
    body_done: bool,
    finished: bool,
    fragments: usize,
}

impl CompletionStream {
    /// Wraps a raw SSE body.
    pub fn new<S>(body: S) -> Self
    where
        S: Stream<Item = Result<Vec<u8>, ProviderError>> + Send + 'static,
    {
        Self {
            body: body.boxed(),
            buffer: Vec::new(),
            body_done: false,
            finished: false,
            fragments: 0,
        }
    }

    pub(crate) fn from_response(response: reqwest::Response) -> Self {
        Self::new(response.bytes_stream().map(|chunk| {
            chunk
                .map(|bytes| bytes.to_vec())
                .map_err(|e| ProviderError::Network(e.to_string()))
        }))
    }

    /// Number of fragments handed out so far.
    pub fn fragments_yielded(&self) -> usize {
        self.fragments
    }

    /// Pulls the next fragment. `None` once the stream has ended; stays `None`.
    pub async fn next_fragment(&mut self) -> Option<Result<String, ProviderError>> {
        loop {
            if self.finished {
                return None;
            }

            if let Some(line) = self.take_line() {
                match line.and_then(|line| parse_line(&line)) {
                    Ok(LineEvent::Fragment(text)) => {
                        self.fragments += 1;
                        return Some(Ok(text));
                    }
                    Ok(LineEvent::Done) => {
                        debug!("Received [DONE] marker");
                        self.finish();
                        return None;
                    }
                    Ok(LineEvent::Skip) => continue,
                    Err(e) => {
                        warn!("Stream chunk could not be parsed: {}", e);
                        self.finished = true;
                        return Some(Err(e));
                    }
                }
            }

            if self.body_done {
                self.finish();
                return None;
            }

            match self.body.next().await {
                Some(Ok(chunk)) => {
                    debug!("Raw chunk received: {} bytes", chunk.len());
                    self.buffer.extend_from_slice(&chunk);
                }
                Some(Err(e)) => {
                    warn!("Stream transport failed: {}", e);
                    self.finished = true;
                    return Some(Err(e));
                }
                None => self.body_done = true,
            }
        }
    }

    /// Drains the stream and joins every fragment.
    pub async fn collect_text(mut self) -> Result<String, ProviderError> {
        let mut text = String::new();
        while let Some(fragment) = self.next_fragment().await {
            text.push_str(&fragment?);
        }
        Ok(text)
    }

    /// Adapts this reader into a [`futures::Stream`].
    pub fn into_stream(self) -> impl Stream<Item = Result<String, ProviderError>> + Send {
        stream::unfold(self, |mut reader| async move {
            reader.next_fragment().await.map(|item| (item, reader))
        })
    }

    /// Takes the next complete line from the buffer. After the body has ended,
    /// a trailing line without a newline is returned too.
    fn take_line(&mut self) -> Option<Result<String, ProviderError>> {
        let bytes = if let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            line.pop();
            line
        } else if self.body_done && !self.buffer.is_empty() {
            std::mem::take(&mut self.buffer)
        } else {
            return None;
        };
        Some(
            String::from_utf8(bytes)
                .map_err(|e| ProviderError::Parse(format!("stream line is not UTF-8: {e}"))),
        )
    }

    fn finish(&mut self) {
        if !self.finished {
            info!("Stream ended: {} fragments", self.fragments);
        }
        self.finished = true;
    }
}
