//! Bounded store of product-facing log lines
//!
//! Lines land here through `Action::Log`, so every consumer (terminal,
//! web UI, snapshots) sees the same stream.

use super::ManifestName;
use std::collections::VecDeque;

/// Default number of lines kept before the oldest are dropped
pub const DEFAULT_LOG_CAPACITY: usize = 10_000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

/// One log line, tagged with the resource and span it belongs to
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogLine {
    /// Empty for global (non-resource) output
    pub manifest: ManifestName,
    pub span_id: String,
    pub level: LogLevel,
    /// Lines sharing a progress id replace each other in interactive views
    pub progress_id: Option<String>,
    pub text: String,
}

impl LogLine {
    pub fn new(manifest: ManifestName, span_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            manifest,
            span_id: span_id.into(),
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_progress_id(mut self, progress_id: impl Into<String>) -> Self {
        self.progress_id = Some(progress_id.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogStore {
    lines: VecDeque<LogLine>,
    capacity: usize,
    /// Total lines ever appended, including dropped ones
    checkpoint: usize,
}

impl Default for LogStore {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_LOG_CAPACITY)
    }
}

impl LogStore {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            lines: VecDeque::new(),
            capacity: capacity.max(1),
            checkpoint: 0,
        }
    }

    pub fn append(&mut self, line: LogLine) {
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
        self.checkpoint += 1;
    }

    pub fn lines(&self) -> impl Iterator<Item = &LogLine> {
        self.lines.iter()
    }

    pub fn lines_for<'a>(&'a self, manifest: &'a ManifestName) -> impl Iterator<Item = &'a LogLine> + 'a {
        self.lines.iter().filter(move |l| &l.manifest == manifest)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn checkpoint(&self) -> usize {
        self.checkpoint
    }

    /// All retained text joined with newlines
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_drops_oldest_past_capacity() {
        let mut store = LogStore::with_capacity(2);
        store.append(LogLine::new(ManifestName::from("a"), "s", "one"));
        store.append(LogLine::new(ManifestName::from("a"), "s", "two"));
        store.append(LogLine::new(ManifestName::from("b"), "s", "three"));

        assert_eq!(store.len(), 2);
        assert_eq!(store.checkpoint(), 3);
        assert_eq!(store.text(), "two\nthree");
        assert_eq!(store.lines_for(&ManifestName::from("b")).count(), 1);
    }
}
