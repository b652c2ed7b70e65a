//! Incremental decoder for Server-Sent Events.
//!
//! Converts the raw byte chunks of a streaming HTTP response into
//! [`SseFrame`]s. Handles frames split across chunk boundaries, multi-line
//! `data:` fields (joined with `\n`), `event:` types, comment lines, CRLF
//! line endings, and the `[DONE]` sentinel.
//!
//! # Wire format
//!
//! ```text
//! event: content
//! data: {"delta":"Hi"}
//!
//! data: [DONE]
//! ```

/// A decoded Server-Sent Event frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    /// The frame type (from `event:`), if any.
    pub event: Option<String>,
    /// The data payload; multiple `data:` lines joined with `\n`.
    pub data: String,
}

impl SseFrame {
    /// Whether this frame is the `[DONE]` sentinel.
    pub fn is_done_sentinel(&self) -> bool {
        self.data.trim() == "[DONE]"
    }
}

/// Incremental SSE decoder.
///
/// Feed byte chunks via [`push`](FrameDecoder::push); call
/// [`finish`](FrameDecoder::finish) at end of stream to flush a trailing
/// frame that was not terminated by an empty line.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    line_buffer: String,
    event: Option<String>,
    data_lines: Vec<String>,
}

impl FrameDecoder {
    /// Create a new decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a chunk of bytes, returning any frames completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        let text = String::from_utf8_lossy(chunk);
        let mut frames = Vec::new();

        for ch in text.chars() {
            if ch == '\n' {
                let line = std::mem::take(&mut self.line_buffer);
                let line = line.strip_suffix('\r').unwrap_or(&line);
                if let Some(frame) = self.take_line(line) {
                    frames.push(frame);
                }
            } else {
                self.line_buffer.push(ch);
            }
        }

        frames
    }

    /// Flush any buffered data as a final frame.
    pub fn finish(&mut self) -> Option<SseFrame> {
        if !self.line_buffer.is_empty() {
            let line = std::mem::take(&mut self.line_buffer);
            let line = line.strip_suffix('\r').unwrap_or(&line);
            if let Some(frame) = self.take_line(line) {
                return Some(frame);
            }
        }
        if self.data_lines.is_empty() {
            return None;
        }
        Some(self.build_frame())
    }

    /// Consume one complete line; returns a frame at an event boundary.
    fn take_line(&mut self, line: &str) -> Option<SseFrame> {
        // Empty line terminates the current frame.
        if line.is_empty() {
            if self.data_lines.is_empty() {
                return None;
            }
            return Some(self.build_frame());
        }

        // Comment line.
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = split_field(line)?;
        match field {
            "data" => self.data_lines.push(value.to_owned()),
            "event" => self.event = Some(value.to_owned()),
            // `id`, `retry`, and unknown fields are unused by this protocol.
            _ => {}
        }
        None
    }

    fn build_frame(&mut self) -> SseFrame {
        SseFrame {
            event: self.event.take(),
            data: std::mem::take(&mut self.data_lines).join("\n"),
        }
    }
}

/// Split `field: value`, stripping the single optional space after the colon.
fn split_field(line: &str) -> Option<(&str, &str)> {
    let colon = line.find(':')?;
    let value = &line[colon + 1..];
    Some((&line[..colon], value.strip_prefix(' ').unwrap_or(value)))
}
