//! File-backed replay of recorded feed payloads.
//!
//! A replay file holds one StopMonitoring document per line. Lines starting
//! with `#` are comments and blank lines are ignored. Entries are served in
//! order and wrap around forever, so a replay can never run dry.

use std::path::Path;

use chrono::Utc;

use super::error::{FeedError, ReplayError};
use super::{FeedSource, Payload};

/// Comment marker for replay files.
const COMMENT_MARKER: char = '#';

/// One recorded payload and its position in the replay sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestEntry {
    pub index: usize,
    pub payload: String,
}

/// Feed source that cycles through recorded payloads.
#[derive(Debug, Clone)]
pub struct ReplaySource {
    entries: Vec<TestEntry>,
    next: usize,
}

impl ReplaySource {
    /// Load entries from a replay file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ReplayError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ReplayError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_text(&text).ok_or_else(|| ReplayError::Empty(path.to_path_buf()))
    }

    /// Build from replay-file text. Returns `None` when no payload lines remain.
    pub fn from_text(text: &str) -> Option<Self> {
        let entries: Vec<TestEntry> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with(COMMENT_MARKER))
            .enumerate()
            .map(|(index, line)| TestEntry {
                index,
                payload: line.to_string(),
            })
            .collect();

        if entries.is_empty() {
            return None;
        }

        Some(Self { entries, next: 0 })
    }

    /// Number of entries in the sequence.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false; an empty replay cannot be constructed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Index of the entry the next call will return.
    pub fn position(&self) -> usize {
        self.next
    }

    pub fn entries(&self) -> &[TestEntry] {
        &self.entries
    }

    /// Return the current entry and advance by exactly one, wrapping to 0.
    pub fn advance(&mut self) -> &TestEntry {
        let index = self.next;
        self.next = (self.next + 1) % self.entries.len();
        &self.entries[index]
    }
}

impl FeedSource for ReplaySource {
    async fn next_payload(&mut self) -> Result<Option<Payload>, FeedError> {
        let entry = self.advance();
        Ok(Some(Payload {
            body: entry.payload.clone(),
            received_at: Utc::now(),
            entry: Some(entry.index),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const TEXT: &str = concat!(
        "# recorded at West Portal\n",
        "\n",
        "{\"a\":1}\n",
        "  # indented comment\n",
        "{\"b\":2}\n",
        "{\"c\":3}\n",
    );

    #[test]
    fn skips_comments_and_blank_lines() {
        let source = ReplaySource::from_text(TEXT).unwrap();

        assert_eq!(source.len(), 3);
        assert_eq!(source.entries()[0].payload, "{\"a\":1}");
        assert_eq!(source.entries()[2].index, 2);
    }

    #[test]
    fn wraps_after_last_entry() {
        let mut source = ReplaySource::from_text(TEXT).unwrap();

        let visited: Vec<usize> = (0..7).map(|_| source.advance().index).collect();
        assert_eq!(visited, vec![0, 1, 2, 0, 1, 2, 0]);
        assert_eq!(source.position(), 1);
    }

    #[test]
    fn only_comments_is_empty() {
        assert!(ReplaySource::from_text("# nothing\n\n# here\n").is_none());
    }

    #[test]
    fn loads_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(TEXT.as_bytes()).unwrap();

        let source = ReplaySource::from_file(file.path()).unwrap();
        assert_eq!(source.len(), 3);
    }

    #[test]
    fn empty_file_is_an_error() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"# only a comment\n").unwrap();

        let result = ReplaySource::from_file(file.path());
        assert!(matches!(result, Err(ReplayError::Empty(_))));
    }

    #[test]
    fn missing_file_is_an_error() {
        let result = ReplaySource::from_file("/nonexistent/replay.jsonl");
        assert!(matches!(result, Err(ReplayError::Io { .. })));
    }

    #[tokio::test]
    async fn serves_payloads_with_entry_index() {
        let mut source = ReplaySource::from_text(TEXT).unwrap();

        let first = source.next_payload().await.unwrap().unwrap();
        assert_eq!(first.entry, Some(0));
        assert_eq!(first.body, "{\"a\":1}");

        let second = source.next_payload().await.unwrap().unwrap();
        assert_eq!(second.entry, Some(1));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Indices 0..N-1 are visited in order, then repeat from 0.
        #[test]
        fn visits_every_index_cyclically(n in 1usize..20, cycles in 1usize..100) {
            let text: String = (0..n).map(|i| format!("{{\"i\":{i}}}\n")).collect();
            let mut source = ReplaySource::from_text(&text).unwrap();

            for cycle in 0..cycles {
                let entry = source.advance();
                prop_assert_eq!(entry.index, cycle % n);
                prop_assert!(source.position() < n);
            }
        }
    }
}
