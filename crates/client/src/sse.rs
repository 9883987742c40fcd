//! Incremental decoder for the `text/event-stream` wire format.
//!
//! Bytes arrive in arbitrary chunks; [`SseDecoder::push`] buffers partial
//! lines and returns every event completed by the chunk. Lines end in
//! `\r\n`, `\n` or a lone `\r`.

/// Longest unterminated line kept in the buffer.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// A dispatched server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// Value of the `event:` field, if any.
    pub event: Option<String>,
    /// Concatenated `data:` lines, joined with `\n`.
    pub data: String,
    /// Last `id:` seen on the stream.
    pub id: Option<String>,
}

impl SseEvent {
    /// `true` for events of the default `message` type.
    pub fn is_message(&self) -> bool {
        match self.event.as_deref() {
            None | Some("") | Some("message") => true,
            Some(_) => false,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SseError {
    #[error("Event stream line is not valid UTF-8")]
    InvalidUtf8,

    #[error("Event stream line exceeds {limit} bytes")]
    LineTooLong { limit: usize },
}

/// Stateful line parser for one event stream.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    event: Option<String>,
    data: String,
    last_id: Option<String>,
    /// The previous chunk ended in `\r`; a leading `\n` belongs to it.
    after_cr: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and collect the events it completes.
    pub fn push(&mut self, mut chunk: &[u8]) -> Result<Vec<SseEvent>, SseError> {
        if self.after_cr && !chunk.is_empty() {
            self.after_cr = false;
            if chunk[0] == b'\n' {
                chunk = &chunk[1..];
            }
        }
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.buffer[start..]
            .iter()
            .position(|&b| b == b'\n' || b == b'\r')
        {
            let end = start + offset;
            let mut next = end + 1;
            if self.buffer[end] == b'\r' {
                match self.buffer.get(next) {
                    Some(b'\n') => next += 1,
                    Some(_) => {}
                    None => self.after_cr = true,
                }
            }
            let line = std::str::from_utf8(&self.buffer[start..end])
                .map_err(|_| SseError::InvalidUtf8)?
                .to_owned();
            start = next;
            if let Some(event) = self.process_line(&line) {
                events.push(event);
            }
        }
        self.buffer.drain(..start);

        if self.buffer.len() > MAX_LINE_BYTES {
            self.buffer.clear();
            return Err(SseError::LineTooLong {
                limit: MAX_LINE_BYTES,
            });
        }
        Ok(events)
    }

    fn process_line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            // comment / keep-alive
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "data" => {
                self.data.push_str(value);
                self.data.push('\n');
            }
            "event" => self.event = Some(value.to_string()),
            "id" => self.last_id = Some(value.to_string()),
            "retry" => tracing::trace!(retry = %value, "Ignoring SSE retry hint"),
            other => tracing::trace!(field = %other, "Ignoring unknown SSE field"),
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }
        let mut data = std::mem::take(&mut self.data);
        data.pop();
        Some(SseEvent {
            event,
            data,
            id: self.last_id.clone(),
        })
    }
}
