//! Marker-line scanner.
//!
//! Finds lines containing a fixed literal with a deterministic automaton
//! (Knuth-Morris-Pratt transitions) instead of a regex engine. The state is the
//! length of the longest marker prefix that ends at the current byte.

/// Marker identifying the script line that carries the post payload.
pub const TIME_SLICE_MARKER: &[u8] = b"TimeSliceImpl";

/// A marker occurrence on a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerMatch<'a> {
    pub line: &'a [u8],
    /// Offset of the first byte after the marker.
    pub end: usize,
    /// Offset of the first marker byte.
    pub start: usize,
}

impl<'a> MarkerMatch<'a> {
    /// Bytes following the marker up to the end of the line.
    pub fn payload(&self) -> &'a [u8] {
        &self.line[self.end..]
    }

    /// Quote character immediately before the marker, if the marker is quoted.
    pub fn opening_quote(&self) -> Option<u8> {
        let before = *self.line.get(self.start.checked_sub(1)?)?;
        matches!(before, b'"' | b'\'' | b'`').then_some(before)
    }
}

/// Scanner for a single fixed marker.
#[derive(Debug, Clone)]
pub struct MarkerScanner<'m> {
    marker: &'m [u8],
    /// `fallback[i]`: state to resume from after a mismatch in state `i + 1`.
    fallback: Vec<usize>,
}

impl<'m> MarkerScanner<'m> {
    pub fn new(marker: &'m [u8]) -> Self {
        let mut fallback = vec![0; marker.len()];
        let mut state = 0;
        for i in 1..marker.len() {
            while state > 0 && marker[i] != marker[state] {
                state = fallback[state - 1];
            }
            if marker[i] == marker[state] {
                state += 1;
            }
            fallback[i] = state;
        }
        Self { marker, fallback }
    }

    /// First marker occurrence on `line`.
    pub fn match_line<'a>(&self, line: &'a [u8]) -> Option<MarkerMatch<'a>> {
        if self.marker.is_empty() {
            return Some(MarkerMatch { line, start: 0, end: 0 });
        }

        let mut state = 0;
        for (i, &byte) in line.iter().enumerate() {
            while state > 0 && byte != self.marker[state] {
                state = self.fallback[state - 1];
            }
            if byte == self.marker[state] {
                state += 1;
            }
            if state == self.marker.len() {
                return Some(MarkerMatch { line, start: i + 1 - self.marker.len(), end: i + 1 });
            }
        }
        None
    }

    /// Marker occurrence on the last line in `body` that contains it.
    ///
    /// Every line is scanned; a later match replaces an earlier one.
    pub fn last_match<'a>(&self, body: &'a [u8]) -> Option<MarkerMatch<'a>> {
        let mut found = None;
        for line in body.split(|&b| b == b'\n') {
            if let Some(hit) = self.match_line(line) {
                found = Some(hit);
            }
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_line_returns_remainder() {
        let scanner = MarkerScanner::new(TIME_SLICE_MARKER);
        let line = br#"<script>requireLazy(["TimeSliceImpl","ServerJS"],function(){})</script>"#;
        let hit = scanner.match_line(line).unwrap();
        assert_eq!(hit.payload(), &br#"","ServerJS"],function(){})</script>"#[..]);
        assert_eq!(hit.opening_quote(), Some(b'"'));
        assert_eq!(&line[hit.start..hit.end], TIME_SLICE_MARKER);
    }

    #[test]
    fn test_no_match() {
        let scanner = MarkerScanner::new(TIME_SLICE_MARKER);
        assert!(scanner.match_line(b"TimeSlice Impl").is_none());
        assert!(scanner.match_line(b"").is_none());
        assert!(scanner.last_match(b"a\nb\nc").is_none());
    }

    #[test]
    fn test_overlapping_prefix() {
        let scanner = MarkerScanner::new(b"aab");
        assert_eq!(scanner.match_line(b"aaab!").unwrap().payload(), b"!");

        let scanner = MarkerScanner::new(b"abab");
        assert_eq!(scanner.match_line(b"abaabab-rest").unwrap().payload(), b"-rest");
    }

    #[test]
    fn test_last_match_wins() {
        let scanner = MarkerScanner::new(TIME_SLICE_MARKER);
        let body = b"x\nTimeSliceImpl first\ny\nTimeSliceImpl second\nz";
        assert_eq!(scanner.last_match(body).unwrap().payload(), b" second");
    }

    #[test]
    fn test_marker_at_end_of_line() {
        let scanner = MarkerScanner::new(TIME_SLICE_MARKER);
        let hit = scanner.last_match(b"TimeSliceImpl\nnext").unwrap();
        assert!(hit.payload().is_empty());
        assert_eq!(hit.opening_quote(), None);
    }
}
