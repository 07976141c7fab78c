use std::io::Write;

use serde::Serialize;
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::error::CliError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamEventType {
    Chunk,
    End,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamEvent {
    pub event: StreamEventType,
    pub seq: u64,
    pub ts: String,
    pub data: Value,
}

/// Writes one JSON event per line, flushing after each.
pub struct NdjsonStreamWriter<W: Write> {
    writer: W,
    next_seq: u64,
}

impl<W: Write> NdjsonStreamWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            next_seq: 1,
        }
    }

    pub fn emit_chunk(&mut self, data: Value) -> Result<(), CliError> {
        self.emit(StreamEventType::Chunk, data)
    }

    pub fn emit_end(&mut self, data: Value) -> Result<(), CliError> {
        self.emit(StreamEventType::End, data)
    }

    pub fn emit_error(&mut self, data: Value) -> Result<(), CliError> {
        self.emit(StreamEventType::Error, data)
    }

    fn emit(&mut self, event: StreamEventType, data: Value) -> Result<(), CliError> {
        let event = StreamEvent {
            event,
            seq: self.next_seq,
            ts: OffsetDateTime::now_utc()
                .format(&Rfc3339)
                .unwrap_or_default(),
            data,
        };
        self.next_seq += 1;

        let payload = serde_json::to_string(&event)?;
        self.writer.write_all(payload.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn numbers_events_in_order() {
        let mut sink = Vec::<u8>::new();
        {
            let mut writer = NdjsonStreamWriter::new(&mut sink);
            writer
                .emit_chunk(json!({"type": "output_text", "data": "Hi"}))
                .expect("chunk");
            writer.emit_end(json!({"success": true})).expect("end");
        }

        let events: Vec<Value> = std::str::from_utf8(&sink)
            .expect("utf8")
            .lines()
            .map(|line| serde_json::from_str(line).expect("json line"))
            .collect();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0]["event"], "chunk");
        assert_eq!(events[0]["seq"], 1);
        assert_eq!(events[1]["event"], "end");
        assert_eq!(events[1]["seq"], 2);
    }
}
