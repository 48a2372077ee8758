/// One dispatched server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEvent {
    pub event: String,
    pub data: String,
}

/// Incremental `text/event-stream` decoder. Chunks may split events, lines
/// or UTF-8 sequences anywhere.
#[derive(Debug, Default)]
pub struct EventDecoder {
    buffer: Vec<u8>,
    /// Bytes of `buffer` already searched for a blank line
    scanned: usize,
}

impl EventDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, chunk: &[u8]) -> Vec<ServerEvent> {
        self.buffer.extend(chunk.iter().copied().filter(|byte| *byte != b'\r'));

        let mut events = Vec::new();
        let mut consumed = 0;
        // A terminator may straddle the previous chunk boundary.
        let mut from = self.scanned.saturating_sub(1);

        while let Some(offset) = self.buffer[from..].windows(2).position(|pair| pair == b"\n\n") {
            let end = from + offset + 2;
            if let Some(event) = Self::parse_block(&String::from_utf8_lossy(&self.buffer[consumed..end])) {
                events.push(event);
            }
            consumed = end;
            from = end;
        }

        self.buffer.drain(..consumed);
        self.scanned = self.buffer.len();

        events
    }

    fn parse_block(block: &str) -> Option<ServerEvent> {
        let mut event = None;
        let mut data: Vec<&str> = Vec::new();

        for line in block.lines() {
            if line.is_empty() || line.starts_with(':') {
                continue;
            }

            let (field, value) = line.split_once(':').unwrap_or((line, ""));
            let value = value.strip_prefix(' ').unwrap_or(value);

            match field {
                "event" => event = Some(value.to_string()),
                "data" => data.push(value),
                _ => {}
            }
        }

        if event.is_none() && data.is_empty() {
            return None;
        }

        Some(ServerEvent {
            event: event.unwrap_or_else(|| "message".to_string()),
            data: data.join("\n"),
        })
    }
}
