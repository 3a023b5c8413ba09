//! Utilities for streamed provider responses

use std::collections::VecDeque;

use bytes::{BufMut, Bytes, BytesMut};
use futures::{Stream, StreamExt};

use crate::{AnswerChunk, Error, Result};

/// Delimiter between Server-Sent Events
pub const SSE_DELIMITER: &[u8] = b"\n\n";
/// Delimiter between newline-delimited JSON objects
pub const NDJSON_DELIMITER: &[u8] = b"\n";

/// Parses one complete frame (SSE message or NDJSON line)
pub type FrameParser = fn(&str) -> Result<Option<AnswerChunk>>;

/// A buffer for accumulating streamed bytes.
///
/// Frames are only cut at ASCII delimiters, so a UTF-8 character split across
/// network chunks is always reassembled before it is decoded.
#[derive(Debug)]
pub struct StreamBuffer {
    buffer: BytesMut,
    max_capacity: usize,
}

impl Default for StreamBuffer {
    fn default() -> Self {
        Self {
            buffer: BytesMut::new(),
            max_capacity: 10 * 1024 * 1024, // Default 10MB
        }
    }
}

impl StreamBuffer {
    /// Create a new empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with custom capacity limit
    pub fn with_capacity_limit(max_capacity: usize) -> Self {
        Self {
            buffer: BytesMut::new(),
            max_capacity,
        }
    }

    /// Add bytes to the buffer
    pub fn extend_from_slice(&mut self, bytes: &[u8]) -> Result<()> {
        if self.buffer.len() + bytes.len() > self.max_capacity {
            return Err(Error::StreamInterrupted(format!(
                "stream buffer exceeded max capacity of {} bytes",
                self.max_capacity
            )));
        }
        self.buffer.put_slice(bytes);
        Ok(())
    }

    /// Extract every complete frame ending in `delimiter`.
    ///
    /// The delimiter is stripped; an incomplete trailing frame stays buffered.
    pub fn extract_frames(&mut self, delimiter: &[u8]) -> Result<Vec<String>> {
        let mut frames = Vec::new();

        while let Some(pos) = self.find(delimiter) {
            let chunk = self.buffer.split_to(pos + delimiter.len());
            let frame = String::from_utf8(chunk[..pos].to_vec()).map_err(|e| {
                Error::StreamInterrupted(format!("Invalid UTF-8 in stream: {}", e))
            })?;
            frames.push(frame);
        }

        Ok(frames)
    }

    /// Drain whatever is left once the stream has ended
    pub fn take_remaining(&mut self) -> Result<String> {
        let rest = self.buffer.split();
        String::from_utf8(rest.to_vec())
            .map_err(|e| Error::StreamInterrupted(format!("Invalid UTF-8 in stream: {}", e)))
    }

    /// Bytes currently buffered
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    fn find(&self, delimiter: &[u8]) -> Option<usize> {
        self.buffer
            .windows(delimiter.len())
            .position(|window| window == delimiter)
    }
}

/// Turn a raw byte stream into [`AnswerChunk`]s.
///
/// Stops after the first `Done`, after a transport error, or when the byte
/// stream ends (a final frame without a trailing delimiter is still parsed).
pub fn decode_stream<S>(
    stream: S,
    delimiter: &'static [u8],
    parse: FrameParser,
) -> impl Stream<Item = Result<AnswerChunk>> + Send
where
    S: Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Send + Unpin + 'static,
{
    struct State<S> {
        stream: S,
        buffer: StreamBuffer,
        pending: VecDeque<Result<AnswerChunk>>,
        finished: bool,
    }

    impl<S> State<S> {
        fn push_frame(&mut self, frame: &str, parse: FrameParser) {
            if self.finished || frame.trim().is_empty() {
                return;
            }
            match parse(frame.trim()) {
                Ok(Some(choice)) => {
                    self.finished = choice.is_end();
                    self.pending.push_back(Ok(choice));
                }
                Ok(None) => {}
                Err(e) => {
                    self.finished = true;
                    self.pending.push_back(Err(e));
                }
            }
        }

        fn fail(&mut self, error: Error) {
            self.finished = true;
            self.pending.push_back(Err(error));
        }
    }

    let state = State {
        stream,
        buffer: StreamBuffer::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    futures::stream::unfold(state, move |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.finished {
                return None;
            }

            match state.stream.next().await {
                Some(Ok(bytes)) => {
                    let frames = state
                        .buffer
                        .extend_from_slice(&bytes)
                        .and_then(|_| state.buffer.extract_frames(delimiter));
                    match frames {
                        Ok(frames) => {
                            for frame in frames {
                                state.push_frame(&frame, parse);
                            }
                        }
                        Err(e) => state.fail(e),
                    }
                }
                Some(Err(e)) => state.fail(Error::StreamInterrupted(e.to_string())),
                None => {
                    match state.buffer.take_remaining() {
                        Ok(rest) => state.push_frame(&rest, parse),
                        Err(e) => state.fail(e),
                    }
                    state.finished = true;
                }
            }
        }
    })
}
