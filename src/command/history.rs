use log::debug;

use super::{CommandResult, Edit};
use crate::selection::Snapshot;

/// Linear undo/redo log of selection snapshots.
///
/// The entry under the cursor is the current snapshot. `commit` rewrites that
/// entry in place, so a drag updates the preview without growing the log;
/// `lap` duplicates it first so the whole gesture undoes as one step.
#[derive(Debug, Clone)]
pub struct SelectionHistory {
    entries: Vec<Snapshot>,
    cursor: usize,
    /// First snapshot of the session, kept apart from `entries` so the cap
    /// never drops it.
    origin: Snapshot,
    /// Oldest entries are dropped on `lap` beyond this many.
    max_len: Option<usize>,
}

impl Default for SelectionHistory {
    fn default() -> Self {
        Self::new(Snapshot::default())
    }
}

impl SelectionHistory {
    pub fn new(initial: Snapshot) -> Self {
        Self {
            entries: vec![initial],
            cursor: 0,
            origin: initial,
            max_len: None,
        }
    }

    /// Caps the log at `max_len` entries; `None` keeps every entry.
    pub fn with_max_len(mut self, max_len: Option<usize>) -> Self {
        self.max_len = max_len.map(|n| n.max(1));
        self
    }

    pub fn current(&self) -> &Snapshot {
        &self.entries[self.cursor]
    }

    /// The snapshot `restart` returns to.
    pub fn origin(&self) -> &Snapshot {
        &self.origin
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    /// Applies `edit` to the current entry in place. On error the entry is
    /// left unchanged.
    pub fn commit(&mut self, edit: &Edit) -> CommandResult {
        let next = edit.apply(self.current())?;
        self.entries[self.cursor] = next;
        Ok(())
    }

    /// Opens an undo boundary: drops any redo-able entries and pushes a copy
    /// of the current snapshot.
    pub fn lap(&mut self) {
        self.entries.truncate(self.cursor + 1);
        self.entries.push(*self.current());
        self.cursor += 1;

        if let Some(max_len) = self.max_len {
            if self.entries.len() > max_len {
                let excess = self.entries.len() - max_len;
                self.entries.drain(..excess);
                self.cursor -= excess;
            }
        }
        debug!("history lap: {} entries", self.entries.len());
    }

    /// Alias of [`SelectionHistory::lap`].
    pub fn save(&mut self) {
        self.lap();
    }

    pub fn undo(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        debug!("history undo: cursor {}", self.cursor);
        true
    }

    pub fn redo(&mut self) -> bool {
        if !self.can_redo() {
            return false;
        }
        self.cursor += 1;
        debug!("history redo: cursor {}", self.cursor);
        true
    }

    /// Forgets every entry after the cursor.
    pub fn drop_redo(&mut self) {
        self.entries.truncate(self.cursor + 1);
    }

    /// Collapses the log to the current snapshot, which becomes the new
    /// origin.
    pub fn squash(&mut self) {
        let current = *self.current();
        self.entries = vec![current];
        self.cursor = 0;
        self.origin = current;
    }

    /// Reverts to the first snapshot of the session and collapses the log.
    pub fn restart(&mut self) {
        self.entries = vec![self.origin];
        self.cursor = 0;
        debug!("history restart");
    }
}
