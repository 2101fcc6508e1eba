//! Server-Sent Events decoding for `generate-page-stream`.

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::{Stream, TryStreamExt};

use crate::error::GenerationError;
use crate::types::StreamEvent;

/// One raw SSE frame: the text between two blank-line delimiters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseFrame {
    pub event: Option<String>,
    pub data: String,
}

impl SseFrame {
    /// Parse the `event:` and `data:` fields of a frame.
    ///
    /// Fields are only recognized at the start of a line, so streamed markup
    /// containing "data: " cannot produce false matches. Multiple `data:`
    /// lines are joined with `\n`. Returns `None` for comment-only frames.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut event = None;
        let mut data: Option<String> = None;

        for line in raw.split('\n') {
            if line.is_empty() || line.starts_with(':') {
                continue;
            }
            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line, ""),
            };
            match field {
                "event" => event = Some(value.trim().to_string()),
                "data" => match data.as_mut() {
                    Some(existing) => {
                        existing.push('\n');
                        existing.push_str(value);
                    }
                    None => data = Some(value.to_string()),
                },
                other => tracing::trace!("SSE: ignoring field {:?}", other),
            }
        }

        if event.is_none() && data.is_none() {
            return None;
        }
        Some(Self {
            event,
            data: data.unwrap_or_default(),
        })
    }

    /// Decode the frame into a protocol event.
    ///
    /// Unknown event names and malformed payloads are logged and yield
    /// `None`; neither is fatal to the stream.
    pub fn into_event(self) -> Option<StreamEvent> {
        let name = self.event.as_deref().unwrap_or("message");
        if !StreamEvent::is_known(name) {
            tracing::warn!("SSE: ignoring unknown event type {:?}", name);
            return None;
        }
        match StreamEvent::decode(name, &self.data) {
            Ok(event) => Some(event),
            Err(e) => {
                tracing::warn!(
                    "SSE: failed to parse {} event: {} - data: {}",
                    name,
                    e,
                    &self.data[..floor_char_boundary(&self.data, 200)]
                );
                None
            }
        }
    }
}

/// Incremental decoder from raw body bytes to SSE frames.
///
/// Bytes are buffered at UTF-8 boundaries: a code point split across two
/// network chunks is held back until the rest arrives. Text after the last
/// delimiter is retained and re-examined when the next chunk lands.
#[derive(Debug, Default)]
pub struct SseDecoder {
    /// Undecoded bytes (an incomplete UTF-8 sequence)
    pending_bytes: Vec<u8>,
    /// Decoded text not yet terminated by a blank line
    buffer: String,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every frame it completed.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<SseFrame> {
        self.decode_utf8(bytes);
        if self.buffer.contains('\r') {
            self.buffer = self.buffer.replace("\r\n", "\n");
        }

        let mut frames = Vec::new();
        while let Some(pos) = self.buffer.find("\n\n") {
            let raw: String = self.buffer.drain(..pos + 2).collect();
            if let Some(frame) = SseFrame::parse(&raw[..pos]) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Flush whatever is left once the body has ended.
    pub fn finish(&mut self) -> Option<SseFrame> {
        if !self.pending_bytes.is_empty() {
            tracing::warn!(
                "SSE: dropping {} trailing bytes of truncated UTF-8",
                self.pending_bytes.len()
            );
            self.pending_bytes.clear();
        }
        let rest = std::mem::take(&mut self.buffer);
        let rest = rest.trim_end_matches(['\r', '\n']);
        if rest.trim().is_empty() {
            return None;
        }
        SseFrame::parse(rest)
    }

    /// Characters currently buffered (decoded but not yet framed).
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    fn decode_utf8(&mut self, bytes: &[u8]) {
        self.pending_bytes.extend_from_slice(bytes);
        loop {
            match std::str::from_utf8(&self.pending_bytes) {
                Ok(text) => {
                    self.buffer.push_str(text);
                    self.pending_bytes.clear();
                    return;
                }
                Err(err) => {
                    let valid = err.valid_up_to();
                    if let Ok(text) = std::str::from_utf8(&self.pending_bytes[..valid]) {
                        self.buffer.push_str(text);
                    }
                    match err.error_len() {
                        // Incomplete sequence at the end: wait for more bytes.
                        None => {
                            self.pending_bytes.drain(..valid);
                            return;
                        }
                        Some(len) => {
                            tracing::warn!("SSE: replacing {} invalid UTF-8 bytes", len);
                            self.buffer.push(char::REPLACEMENT_CHARACTER);
                            self.pending_bytes.drain(..valid + len);
                        }
                    }
                }
            }
        }
    }
}

type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, GenerationError>> + Send>>;

/// A decoded `generate-page-stream` response.
///
/// Yields protocol events in arrival order. Transport failures are yielded
/// as `Err` items; protocol problems (unknown events, bad JSON) are skipped.
pub struct SectionStream {
    /// The underlying byte stream
    inner: ByteStream,
    /// Frame decoder holding partial data between chunks
    decoder: SseDecoder,
    /// Events decoded but not yet handed out
    ready: VecDeque<StreamEvent>,
    /// Whether the byte stream has ended
    done: bool,
}

impl SectionStream {
    /// Create a stream from a streaming HTTP response.
    pub fn new(response: reqwest::Response) -> Self {
        tracing::debug!(
            "SectionStream::new - content-type: {:?}",
            response.headers().get(reqwest::header::CONTENT_TYPE)
        );
        Self::from_byte_stream(response.bytes_stream().map_err(GenerationError::HttpError))
    }

    /// Create a stream from any byte stream (tests, alternate transports).
    pub fn from_byte_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, GenerationError>> + Send + 'static,
    {
        Self {
            inner: Box::pin(stream),
            decoder: SseDecoder::new(),
            ready: VecDeque::new(),
            done: false,
        }
    }

    fn enqueue(&mut self, frames: Vec<SseFrame>) {
        self.ready
            .extend(frames.into_iter().filter_map(SseFrame::into_event));
    }
}

impl Stream for SectionStream {
    type Item = Result<StreamEvent, GenerationError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            if let Some(event) = self.ready.pop_front() {
                return Poll::Ready(Some(Ok(event)));
            }
            if self.done {
                return Poll::Ready(None);
            }

            match self.inner.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    tracing::trace!("poll_next: received {} bytes", bytes.len());
                    let frames = self.decoder.push(&bytes);
                    self.enqueue(frames);
                }
                Poll::Ready(Some(Err(e))) => {
                    tracing::error!("poll_next: stream error: {}", e);
                    self.done = true;
                    return Poll::Ready(Some(Err(e)));
                }
                Poll::Ready(None) => {
                    tracing::debug!(
                        "poll_next: stream ended, {} chars left in buffer",
                        self.decoder.buffered_len()
                    );
                    self.done = true;
                    if let Some(frame) = self.decoder.finish() {
                        self.enqueue(vec![frame]);
                    }
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

fn floor_char_boundary(s: &str, max: usize) -> usize {
    if s.len() <= max {
        return s.len();
    }
    let mut idx = max;
    while !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}
