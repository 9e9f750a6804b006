/// Incremental decoder for `text/event-stream` bodies.
///
/// Bytes arrive in arbitrary network chunks; [`SseDecoder::next_event`] only
/// returns an event once its terminating blank line has been seen, one event
/// at a time.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Joined `data:` payload of the next complete event, if one is buffered.
    /// Events without data lines (comments, keep-alives) are skipped.
    pub fn next_event(&mut self) -> Option<String> {
        loop {
            let (end, sep_len) = find_event_end(&self.buf)?;
            let raw: Vec<u8> = self.buf.drain(..end + sep_len).take(end).collect();
            if let Some(data) = event_data(&String::from_utf8_lossy(&raw)) {
                return Some(data);
            }
        }
    }

    /// Data of a trailing event that was never terminated by a blank line.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buf);
        event_data(&String::from_utf8_lossy(&rest))
    }
}

fn find_event_end(buf: &[u8]) -> Option<(usize, usize)> {
    let lf = buf.windows(2).position(|w| w == b"\n\n").map(|i| (i, 2));
    let crlf = buf.windows(4).position(|w| w == b"\r\n\r\n").map(|i| (i, 4));
    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

fn event_data(raw: &str) -> Option<String> {
    let lines: Vec<&str> = raw
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|d| d.strip_prefix(' ').unwrap_or(d))
        .collect();
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_split_across_chunks() {
        let mut dec = SseDecoder::new();
        dec.push(b"data: {\"a\"");
        assert_eq!(dec.next_event(), None);
        dec.push(b":1}\n\ndata: {\"b\":2}\n\n");
        assert_eq!(dec.next_event().as_deref(), Some("{\"a\":1}"));
        assert_eq!(dec.next_event().as_deref(), Some("{\"b\":2}"));
        assert_eq!(dec.next_event(), None);
    }

    #[test]
    fn test_crlf_separators_and_comments() {
        let mut dec = SseDecoder::new();
        dec.push(b": keep-alive\r\n\r\ndata: one\r\n\r\n");
        assert_eq!(dec.next_event().as_deref(), Some("one"));
    }

    #[test]
    fn test_multi_line_data_is_joined() {
        let mut dec = SseDecoder::new();
        dec.push(b"data: first\ndata: second\n\n");
        assert_eq!(dec.next_event().as_deref(), Some("first\nsecond"));
    }

    #[test]
    fn test_finish_returns_unterminated_event() {
        let mut dec = SseDecoder::new();
        dec.push(b"data: tail");
        assert_eq!(dec.next_event(), None);
        assert_eq!(dec.finish().as_deref(), Some("tail"));
        assert_eq!(dec.finish(), None);
    }
}
