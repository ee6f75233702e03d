//! Grouped undo history for a document.

use crate::cursor::Selection;
use std::collections::VecDeque;

/// Default number of undo levels kept.
const DEFAULT_MAX_GROUPS: usize = 1000;

/// One primitive text change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOperation {
    /// `text` was inserted at `position` (in chars).
    Insert { position: usize, text: String },
    /// `text` was removed starting at `position`.
    Delete { position: usize, text: String },
}

impl EditOperation {
    /// The change that cancels this one.
    pub fn inverse(&self) -> EditOperation {
        match self {
            EditOperation::Insert { position, text } => EditOperation::Delete {
                position: *position,
                text: text.clone(),
            },
            EditOperation::Delete { position, text } => EditOperation::Insert {
                position: *position,
                text: text.clone(),
            },
        }
    }
}

/// Changes from one user action, undone and redone as a unit.
#[derive(Debug, Clone)]
pub struct EditGroup {
    pub operations: Vec<EditOperation>,
    pub selection_before: Selection,
    pub selection_after: Selection,
}

impl EditGroup {
    pub fn new(selection_before: Selection) -> Self {
        Self {
            operations: Vec::new(),
            selection_before,
            selection_after: selection_before,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn push(&mut self, op: EditOperation) {
        self.operations.push(op);
    }
}

/// Bounded undo and redo stacks of [`EditGroup`]s.
#[derive(Debug)]
pub struct History {
    done: VecDeque<EditGroup>,
    undone: Vec<EditGroup>,
    limit: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_GROUPS)
    }
}

impl History {
    /// Keeps at most `limit` undoable groups (at least one).
    pub fn new(limit: usize) -> Self {
        Self {
            done: VecDeque::new(),
            undone: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Records a finished edit group. Empty groups are dropped.
    pub fn commit(&mut self, group: EditGroup) {
        if group.is_empty() {
            return;
        }
        self.undone.clear();
        if self.done.len() == self.limit {
            self.done.pop_front();
        }
        self.done.push_back(group);
    }

    pub fn can_undo(&self) -> bool {
        !self.done.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.undone.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.done.len()
    }

    /// Steps back one group: returns the operations that revert it, in
    /// application order, and the selection it started from.
    pub fn undo(&mut self) -> Option<(Vec<EditOperation>, Selection)> {
        let group = self.done.pop_back()?;
        let revert = group.operations.iter().rev().map(EditOperation::inverse).collect();
        let selection = group.selection_before;
        self.undone.push(group);
        Some((revert, selection))
    }

    /// Re-applies the most recently undone group.
    pub fn redo(&mut self) -> Option<(Vec<EditOperation>, Selection)> {
        let group = self.undone.pop()?;
        let replay = group.operations.clone();
        let selection = group.selection_after;
        self.done.push_back(group);
        Some((replay, selection))
    }

    pub fn clear(&mut self) {
        self.done.clear();
        self.undone.clear();
    }
}
