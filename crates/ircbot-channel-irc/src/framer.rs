//! Line framing for inbound reads.

use ircbot_config::FramingMode;
use tracing::warn;

/// Longest unterminated fragment kept in buffered mode. Tagged IRC lines
/// top out at 8191 bytes plus the terminator.
pub const MAX_PENDING_BYTES: usize = 8192;

/// Decode one raw line, dropping `\r` and `\t` wherever they occur.
fn clean_line(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .chars()
        .filter(|c| !matches!(c, '\r' | '\t'))
        .collect()
}

/// Split one read on `\n` with no state carried between reads.
///
/// A chunk ending in `\n` yields a trailing empty line, and a line cut by
/// the read boundary comes out as a fragment.
pub fn split_lines(chunk: &[u8]) -> Vec<String> {
    chunk.split(|b| *b == b'\n').map(clean_line).collect()
}

/// Splits transport reads into protocol lines according to a [`FramingMode`].
#[derive(Debug)]
pub struct LineFramer {
    mode: FramingMode,
    pending: Vec<u8>,
    /// Set after an oversized fragment was dropped; input is skipped up to
    /// the next `\n`.
    discarding: bool,
}

impl LineFramer {
    pub fn new(mode: FramingMode) -> Self {
        Self {
            mode,
            pending: Vec::new(),
            discarding: false,
        }
    }

    pub fn mode(&self) -> FramingMode {
        self.mode
    }

    /// Bytes held back waiting for their line terminator.
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    /// Frame one read.
    ///
    /// In [`FramingMode::Buffered`] only complete, non-empty lines are
    /// returned; a trailing partial line waits for the next read. A fragment
    /// growing past [`MAX_PENDING_BYTES`] is dropped along with the rest of
    /// its line.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        match self.mode {
            FramingMode::PerRead => split_lines(chunk),
            FramingMode::Buffered => self.push_buffered(chunk),
        }
    }

    fn push_buffered(&mut self, mut chunk: &[u8]) -> Vec<String> {
        if self.discarding {
            let Some(end) = chunk.iter().position(|b| *b == b'\n') else {
                return Vec::new();
            };
            chunk = &chunk[end + 1..];
            self.discarding = false;
        }

        self.pending.extend_from_slice(chunk);
        let lines = match self.pending.iter().rposition(|b| *b == b'\n') {
            Some(last_newline) => {
                let rest = self.pending.split_off(last_newline + 1);
                let complete = std::mem::replace(&mut self.pending, rest);
                complete[..last_newline]
                    .split(|b| *b == b'\n')
                    .map(clean_line)
                    .filter(|line| !line.is_empty())
                    .collect()
            }
            None => Vec::new(),
        };

        if self.pending.len() > MAX_PENDING_BYTES {
            warn!(
                bytes = self.pending.len(),
                "Dropping unterminated inbound line over {MAX_PENDING_BYTES} bytes"
            );
            self.pending.clear();
            self.discarding = true;
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_lines_strips_cr_and_tab_everywhere() {
        let lines = split_lines(b"PING :a\tb\r\n:x!y@z QUIT\r\n");
        assert_eq!(lines, vec!["PING :ab", ":x!y@z QUIT", ""]);
    }

    #[test]
    fn test_split_lines_empty_chunk() {
        assert_eq!(split_lines(b""), vec![""]);
    }

    #[test]
    fn test_per_read_mode_does_not_carry_fragments() {
        let mut framer = LineFramer::new(FramingMode::PerRead);
        let first = framer.push(b":alice!u@h PRIVMSG #room :hel");
        let second = framer.push(b"lo\r\n");
        assert_eq!(first, vec![":alice!u@h PRIVMSG #room :hel"]);
        assert_eq!(second, vec!["lo", ""]);
        assert!(framer.pending().is_empty());
    }

    #[test]
    fn test_buffered_mode_joins_fragments() {
        let mut framer = LineFramer::new(FramingMode::Buffered);
        assert!(framer.push(b":alice!u@h PRIVMSG #room :hel").is_empty());
        assert_eq!(framer.pending(), b":alice!u@h PRIVMSG #room :hel");

        let lines = framer.push(b"lo\r\nPING :srv\r\n:bob");
        assert_eq!(lines, vec![":alice!u@h PRIVMSG #room :hello", "PING :srv"]);
        assert_eq!(framer.pending(), b":bob");
    }

    #[test]
    fn test_buffered_mode_drops_empty_lines() {
        let mut framer = LineFramer::new(FramingMode::Buffered);
        assert_eq!(framer.push(b"\r\n\nPING :x\n"), vec!["PING :x"]);
        assert!(framer.pending().is_empty());
    }

    #[test]
    fn test_buffered_mode_keeps_split_utf8_intact() {
        let mut framer = LineFramer::new(FramingMode::Buffered);
        let text = "PRIVMSG #room :♩♫\n".as_bytes();
        let (a, b) = text.split_at(17);
        assert!(framer.push(a).is_empty());
        assert_eq!(framer.push(b), vec!["PRIVMSG #room :♩♫"]);
    }

    #[test]
    fn test_buffered_mode_drops_oversized_fragment() {
        let mut framer = LineFramer::new(FramingMode::Buffered);
        let junk = vec![b'x'; 4096];
        for _ in 0..1024 {
            assert!(framer.push(&junk).is_empty());
            assert!(framer.pending().len() <= MAX_PENDING_BYTES);
        }

        // The tail of the dropped line is skipped, the next line survives.
        let lines = framer.push(b"xxxx\r\nPING :srv\r\n");
        assert_eq!(lines, vec!["PING :srv"]);
        assert!(framer.pending().is_empty());
    }

    #[test]
    fn test_buffered_mode_keeps_fragment_at_limit() {
        let mut framer = LineFramer::new(FramingMode::Buffered);
        let line = vec![b'a'; MAX_PENDING_BYTES];
        assert!(framer.push(&line).is_empty());
        assert_eq!(framer.pending().len(), MAX_PENDING_BYTES);

        let lines = framer.push(b"\n");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].len(), MAX_PENDING_BYTES);
    }
}
