//! Split arbitrary byte chunks into newline-delimited text lines.
//!
//! The chunked response body does not align with record boundaries, so a
//! partial tail is buffered until its newline arrives in a later chunk.

/// Stateful chunk-to-lines splitter. CRLF is tolerated; bytes that are not
/// valid UTF-8 are replaced rather than dropped so a corrupt record still
/// reaches the parser (and its error log) intact enough to diagnose.
#[derive(Debug, Default)]
pub struct LineSplitter {
    pending: Vec<u8>,
}

impl LineSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk; returns every line completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for byte in chunk {
            if *byte == b'\n' {
                lines.push(take_line(&mut self.pending));
            } else {
                self.pending.push(*byte);
            }
        }
        lines
    }

    /// Flush a trailing line that never got its newline (clean EOF).
    pub fn take_remainder(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        Some(take_line(&mut self.pending))
    }
}

fn take_line(pending: &mut Vec<u8>) -> String {
    if pending.last() == Some(&b'\r') {
        pending.pop();
    }
    let line = String::from_utf8_lossy(pending).into_owned();
    pending.clear();
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_lines_in_one_chunk() {
        let mut s = LineSplitter::new();
        assert_eq!(s.push(b"one\ntwo\n"), vec!["one", "two"]);
        assert_eq!(s.take_remainder(), None);
    }

    #[test]
    fn line_split_across_chunks() {
        let mut s = LineSplitter::new();
        assert!(s.push(b"{\"id\":").is_empty());
        assert_eq!(s.push(b"1}\n"), vec!["{\"id\":1}"]);
    }

    #[test]
    fn keepalive_newlines_become_empty_lines() {
        let mut s = LineSplitter::new();
        assert_eq!(s.push(b"\n\n"), vec!["", ""]);
    }

    #[test]
    fn crlf_is_stripped() {
        let mut s = LineSplitter::new();
        assert_eq!(s.push(b"abc\r\n\r\n"), vec!["abc", ""]);
    }

    #[test]
    fn remainder_flushes_unterminated_tail() {
        let mut s = LineSplitter::new();
        assert!(s.push(b"tail").is_empty());
        assert_eq!(s.take_remainder(), Some("tail".to_string()));
        assert_eq!(s.take_remainder(), None);
    }

    #[test]
    fn invalid_utf8_is_replaced_not_dropped() {
        let mut s = LineSplitter::new();
        let lines = s.push(b"ab\xffcd\n");
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("ab"));
        assert!(lines[0].ends_with("cd"));
    }
}
