//! # Undo/Redo History
//!
//! Linear, bounded history of whole-paper snapshots with a cursor naming the
//! entry that matches the live document.
//!
//! - Recording after an undo discards the redo branch.
//! - Snapshots are serialized JSON, so every record costs O(paper size).
//! - When capacity is exceeded the oldest entry is dropped and the cursor is
//!   left where it was instead of advancing. Because recording always
//!   happens at the tip, the cursor stays pinned to the last index.
//! - Recording is ignored while a replay (undo/redo restore) is in progress.

use std::sync::Arc;

use shared::domain::Paper;

use crate::config::DEFAULT_HISTORY_CAPACITY;

/// Immutable serialized copy of a paper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot(Arc<str>);

impl Snapshot {
    pub fn capture(paper: &Paper) -> serde_json::Result<Self> {
        Ok(Self(serde_json::to_string(paper)?.into()))
    }

    pub fn restore(&self) -> serde_json::Result<Paper> {
        serde_json::from_str(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug)]
pub struct HistoryManager {
    entries: Vec<Snapshot>,
    cursor: Option<usize>,
    capacity: usize,
    replaying: bool,
}

impl HistoryManager {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            cursor: None,
            capacity: capacity.max(1),
            replaying: false,
        }
    }

    pub fn record(&mut self, snapshot: Snapshot) {
        if self.replaying {
            return;
        }

        match self.cursor {
            Some(cursor) => self.entries.truncate(cursor + 1),
            None => self.entries.clear(),
        }
        self.entries.push(snapshot);

        if self.entries.len() > self.capacity {
            self.entries.remove(0);
        } else {
            self.cursor = Some(self.cursor.map_or(0, |cursor| cursor + 1));
        }
    }

    /// Clears the history and records `baseline` as its only entry.
    pub fn reset(&mut self, baseline: Snapshot) {
        self.clear();
        self.record(baseline);
    }

    pub fn undo(&mut self) -> Option<Snapshot> {
        let cursor = self.cursor.filter(|cursor| *cursor > 0)?;
        self.cursor = Some(cursor - 1);
        self.entries.get(cursor - 1).cloned()
    }

    pub fn redo(&mut self) -> Option<Snapshot> {
        let cursor = self.cursor.filter(|cursor| cursor + 1 < self.entries.len())?;
        self.cursor = Some(cursor + 1);
        self.entries.get(cursor + 1).cloned()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = None;
        self.replaying = false;
    }

    pub fn begin_replay(&mut self) {
        self.replaying = true;
    }

    pub fn end_replay(&mut self) {
        self.replaying = false;
    }

    pub fn is_replaying(&self) -> bool {
        self.replaying
    }

    pub fn can_undo(&self) -> bool {
        self.cursor.is_some_and(|cursor| cursor > 0)
    }

    pub fn can_redo(&self) -> bool {
        self.cursor
            .is_some_and(|cursor| cursor + 1 < self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn current(&self) -> Option<&Snapshot> {
        self.cursor.and_then(|cursor| self.entries.get(cursor))
    }

    pub fn entries(&self) -> &[Snapshot] {
        &self.entries
    }
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new()
    }
}
