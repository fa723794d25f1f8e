//! Linear undo/redo over whole-document snapshots.

use std::collections::VecDeque;

use tracing::debug;

use crate::document::Document;

/// Depth limit for each stack; oldest entries drop once exceeded.
pub const HISTORY_LIMIT: usize = 64;

/// Two bounded stacks of document snapshots. Any committed mutation pushes
/// the pre-mutation snapshot onto `past` and clears `future`; undo and redo
/// mirror each other.
pub struct History {
    past: VecDeque<Document>,
    future: VecDeque<Document>,
    limit: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(HISTORY_LIMIT)
    }
}

impl History {
    pub fn new(limit: usize) -> Self {
        Self {
            past: VecDeque::new(),
            future: VecDeque::new(),
            limit: limit.max(1),
        }
    }

    /// Records one transaction: the snapshot taken before the mutation.
    pub fn record(&mut self, before: Document) {
        self.past.push_back(before);
        if self.past.len() > self.limit {
            self.past.pop_front();
        }
        self.future.clear();
        debug!(depth = self.past.len(), "transaction recorded");
    }

    /// Pops the most recent past snapshot, parking `current` on the redo
    /// stack. Returns the document to restore.
    pub fn undo(&mut self, current: Document) -> Option<Document> {
        let restored = self.past.pop_back()?;
        self.future.push_back(current);
        if self.future.len() > self.limit {
            self.future.pop_front();
        }
        Some(restored)
    }

    pub fn redo(&mut self, current: Document) -> Option<Document> {
        let restored = self.future.pop_back()?;
        self.past.push_back(current);
        if self.past.len() > self.limit {
            self.past.pop_front();
        }
        Some(restored)
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.past.len()
    }

    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
    }
}
