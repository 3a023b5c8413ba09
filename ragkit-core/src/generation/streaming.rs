//! Streamed answers
//!
//! A provider yields [`AnswerChunk`]s until it sends [`AnswerChunk::End`] or fails.
//! Anything after `End` is ignored by the helpers here.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::{future, Stream, StreamExt};

use crate::error::{Error, Result};

/// One item of a streamed answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerChunk {
    /// Next piece of answer text
    Fragment(String),
    /// The provider has finished
    End,
}

impl AnswerChunk {
    /// Text of a fragment, `None` for `End`
    pub fn fragment(&self) -> Option<&str> {
        match self {
            Self::Fragment(text) => Some(text),
            Self::End => None,
        }
    }

    /// Whether this chunk closes the answer
    pub fn is_end(&self) -> bool {
        matches!(self, Self::End)
    }
}

/// Boxed chunk stream as produced by providers
pub type BoxAnswerStream = Pin<Box<dyn Stream<Item = Result<AnswerChunk>> + Send>>;

/// Answer text arriving from a generation provider
///
/// Finite and not restartable. Dropping it stops consumption.
pub struct AnswerStream {
    chunks: BoxAnswerStream,
}

impl AnswerStream {
    /// Wrap a provider's chunk stream
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<AnswerChunk>> + Send + 'static,
    {
        Self {
            chunks: Box::pin(stream),
        }
    }

    /// Text fragments up to the first `End`; errors are passed through
    pub fn fragments(self) -> impl Stream<Item = Result<String>> + Send {
        self.chunks
            .take_while(|chunk| future::ready(!matches!(chunk, Ok(AnswerChunk::End))))
            .map(|chunk| {
                chunk.map(|c| match c {
                    AnswerChunk::Fragment(text) => text,
                    AnswerChunk::End => String::new(),
                })
            })
    }

    /// Concatenate the whole answer
    ///
    /// Fails with the first error the provider reports.
    pub async fn collect_text(self) -> Result<String> {
        let mut fragments = Box::pin(self.fragments());
        let mut answer = String::new();
        while let Some(fragment) = fragments.next().await {
            answer.push_str(&fragment?);
        }
        Ok(answer)
    }
}

impl Stream for AnswerStream {
    type Item = Result<AnswerChunk>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.chunks.as_mut().poll_next(cx)
    }
}

/// Canned answer streams for tests and offline runs
#[derive(Default)]
pub struct ScriptedStream {
    script: Vec<Result<AnswerChunk>>,
}

impl ScriptedStream {
    /// Empty script
    pub fn new() -> Self {
        Self::default()
    }

    /// `text` cut into fragments of at most `chars` characters, then `End`
    pub fn chunked(text: &str, chars: usize) -> Self {
        let letters: Vec<char> = text.chars().collect();
        let script = letters
            .chunks(chars.max(1))
            .map(|c| Ok(AnswerChunk::Fragment(c.iter().collect())))
            .chain(std::iter::once(Ok(AnswerChunk::End)))
            .collect();
        Self { script }
    }

    /// Append a fragment
    pub fn fragment(mut self, text: impl Into<String>) -> Self {
        self.script.push(Ok(AnswerChunk::Fragment(text.into())));
        self
    }

    /// Append the end marker
    pub fn end(mut self) -> Self {
        self.script.push(Ok(AnswerChunk::End));
        self
    }

    /// Append a provider failure
    pub fn fail(mut self, error: Error) -> Self {
        self.script.push(Err(error));
        self
    }

    /// Play the script as an [`AnswerStream`]
    pub fn build(self) -> AnswerStream {
        AnswerStream::from_stream(futures::stream::iter(self.script))
    }
}
