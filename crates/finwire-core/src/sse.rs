//! Incremental decoder for `text/event-stream` bodies.
//!
//! Fragments arrive with arbitrary boundaries; the decoder buffers partial
//! lines and yields an [`SseEvent`] each time a blank line terminates one.

/// One dispatched server-sent event.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SseEvent {
    pub event: Option<String>,
    pub data: String,
}

impl SseEvent {
    /// OpenAI-compatible servers end streams with a literal `[DONE]` payload.
    pub fn is_done_marker(&self) -> bool {
        self.data.trim() == "[DONE]"
    }
}

#[derive(Debug, Default)]
pub struct SseDecoder {
    line_buffer: String,
    current: SseEvent,
    has_fields: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, fragment: &str) -> Vec<SseEvent> {
        self.line_buffer.push_str(fragment);
        let mut events = Vec::new();
        while let Some(position) = self.line_buffer.find('\n') {
            let mut line: String = self.line_buffer.drain(..=position).collect();
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
            if let Some(event) = self.process_line(&line) {
                events.push(event);
            }
        }
        events
    }

    /// Flushes a trailing event that was not followed by a blank line.
    pub fn finish(mut self) -> Option<SseEvent> {
        if !self.line_buffer.is_empty() {
            let line = std::mem::take(&mut self.line_buffer);
            if let Some(event) = self.process_line(line.trim_end_matches('\r')) {
                return Some(event);
            }
        }
        self.process_line("")
    }

    fn process_line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            if !self.has_fields {
                return None;
            }
            self.has_fields = false;
            return Some(std::mem::take(&mut self.current));
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "data" => {
                if !self.current.data.is_empty() {
                    self.current.data.push('\n');
                }
                self.current.data.push_str(value);
                self.has_fields = true;
            }
            "event" => {
                self.current.event = Some(value.to_owned());
                self.has_fields = true;
            }
            _ => {}
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reassembles_events_split_across_fragments() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push("event: response.output_text.delta\nda").is_empty());
        let events = decoder.push("ta: {\"delta\":\"Hi\"}\n\ndata: [DONE]\n\n");

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event.as_deref(), Some("response.output_text.delta"));
        assert_eq!(events[0].data, "{\"delta\":\"Hi\"}");
        assert!(events[1].is_done_marker());
    }

    #[test]
    fn ignores_comments_and_handles_crlf() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(": keep-alive\r\n\r\ndata: a\r\ndata: b\r\n\r\n");
        assert_eq!(events, vec![SseEvent {
            event: None,
            data: String::from("a\nb"),
        }]);
    }

    #[test]
    fn finish_flushes_unterminated_event() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push("data: {\"x\":1}").is_empty());
        let event = decoder.finish().expect("trailing event");
        assert_eq!(event.data, "{\"x\":1}");
    }
}
