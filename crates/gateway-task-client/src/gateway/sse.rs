use std::collections::VecDeque;

use bytes::Bytes;
use futures::{Stream, StreamExt as _, stream};

use super::FrameStream;
use crate::errors::TransportError;

/// One server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    /// `event:` field, when present.
    pub event: Option<String>,
    /// `id:` field, when present.
    pub id: Option<String>,
    /// `data:` lines joined with `\n`.
    pub data: String,
}

impl SseFrame {
    /// Creates an unnamed frame carrying `data`.
    pub fn data(data: impl Into<String>) -> Self {
        Self {
            event: None,
            id: None,
            data: data.into(),
        }
    }
}

/// Incremental SSE decoder. Chunks may split frames (and UTF-8 sequences)
/// anywhere; a frame is only emitted once its blank-line terminator arrives.
#[derive(Default)]
pub(crate) struct SseDecoder {
    buf: Vec<u8>,
    /// Bytes of `buf` already searched for a terminator.
    scanned: usize,
}

impl SseDecoder {
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buf.extend_from_slice(chunk);
        let mut frames = Vec::new();
        loop {
            // A terminator may straddle the previous chunk's tail.
            let from = self.scanned.saturating_sub(3);
            let Some((end, terminator)) = frame_boundary(&self.buf, from) else {
                self.scanned = self.buf.len();
                break;
            };
            let block: Vec<u8> = self.buf.drain(..end + terminator).take(end).collect();
            self.scanned = 0;
            if let Some(frame) = parse_block(&String::from_utf8_lossy(&block)) {
                frames.push(frame);
            }
        }
        frames
    }
}

/// Finds the first blank line at or after `from`, returning the block length
/// and terminator size.
fn frame_boundary(buf: &[u8], from: usize) -> Option<(usize, usize)> {
    (from..buf.len()).find_map(|i| {
        let rest = &buf[i..];
        if rest.starts_with(b"\r\n\r\n") {
            Some((i, 4))
        } else if rest.starts_with(b"\n\n") {
            Some((i, 2))
        } else {
            None
        }
    })
}

fn parse_block(block: &str) -> Option<SseFrame> {
    let mut frame = SseFrame {
        event: None,
        id: None,
        data: String::new(),
    };
    let mut data_lines = Vec::new();
    for line in block.lines() {
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => frame.event = Some(value.to_string()),
            "id" => frame.id = Some(value.to_string()),
            "data" => data_lines.push(value),
            _ => {}
        }
    }
    if frame.event.is_none() && frame.id.is_none() && data_lines.is_empty() {
        return None;
    }
    frame.data = data_lines.join("\n");
    Some(frame)
}

/// Turns a response byte stream into decoded frames.
///
/// The first read error is yielded once and ends the stream.
pub(crate) fn frame_stream<S, E>(bytes: S) -> FrameStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    struct State<S> {
        bytes: std::pin::Pin<Box<S>>,
        decoder: SseDecoder,
        pending: VecDeque<SseFrame>,
        done: bool,
    }

    let state = State {
        bytes: Box::pin(bytes),
        decoder: SseDecoder::default(),
        pending: VecDeque::new(),
        done: false,
    };
    Box::pin(stream::unfold(state, |mut state| async move {
        loop {
            if let Some(frame) = state.pending.pop_front() {
                return Some((Ok(frame), state));
            }
            if state.done {
                return None;
            }
            match state.bytes.next().await {
                Some(Ok(chunk)) => state.pending.extend(state.decoder.push_chunk(&chunk)),
                Some(Err(e)) => {
                    state.done = true;
                    return Some((
                        Err(TransportError::Read(format!("event stream read failed: {e}"))),
                        state,
                    ));
                }
                None => state.done = true,
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decoder_handles_partial_chunk_boundaries() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push_chunk(b"event: status\ndata: {\"status\":{\"sta").is_empty());
        let frames = decoder.push_chunk(b"te\":\"working\"}}\n\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event.as_deref(), Some("status"));
        assert_eq!(frames[0].data, r#"{"status":{"state":"working"}}"#);
    }

    #[test]
    fn decoder_resumes_scanning_across_byte_sized_chunks() {
        let mut decoder = SseDecoder::default();
        let input = b"data: first\r\n\r\ndata: second\n\n";
        let mut frames = Vec::new();
        for byte in input {
            frames.extend(decoder.push_chunk(std::slice::from_ref(byte)));
            assert!(decoder.scanned <= decoder.buf.len());
        }
        assert_eq!(frames, vec![SseFrame::data("first"), SseFrame::data("second")]);
        assert!(decoder.buf.is_empty());

        assert!(decoder.push_chunk(b"data: partial").is_empty());
        assert_eq!(decoder.scanned, decoder.buf.len());
    }

    #[test]
    fn decoder_joins_multiline_data_and_skips_comments() {
        let mut decoder = SseDecoder::default();
        let frames = decoder.push_chunk(b": keep-alive\n\nid: 7\r\ndata: one\r\ndata: two\r\n\r\n");
        assert_eq!(
            frames,
            vec![SseFrame {
                event: None,
                id: Some("7".into()),
                data: "one\ntwo".into(),
            }]
        );
    }

    #[tokio::test]
    async fn frame_stream_stops_after_read_error() {
        let chunks: Vec<Result<Bytes, String>> = vec![
            Ok(Bytes::from_static(b"data: a\n\ndata: b\n\n")),
            Err("connection reset".into()),
            Ok(Bytes::from_static(b"data: never\n\n")),
        ];
        let frames: Vec<_> = frame_stream(stream::iter(chunks)).collect().await;
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0], Ok(SseFrame::data("a")));
        assert_eq!(frames[1], Ok(SseFrame::data("b")));
        assert!(matches!(&frames[2], Err(TransportError::Read(msg)) if msg.contains("connection reset")));
    }
}
