//! An editable document: text, selection and undo history together.

use crate::buffer::TextStore;
use crate::cursor::Selection;
use crate::history::{EditGroup, EditOperation, History};
use std::path::Path;

/// How the document's content is interpreted when exported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextMode {
    #[default]
    Plain,
    /// Rich text format; selections are exported as RTF.
    Rich,
}

impl TextMode {
    /// Detects the mode from a file extension.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("rtf") => TextMode::Rich,
            _ => TextMode::Plain,
        }
    }
}

/// Document state without any I/O or rendering concerns.
///
/// Every mutating method returns whether the text actually changed, so a
/// caller can decide whether to raise a content-changed notification.
#[derive(Debug, Default)]
pub struct Document {
    text: TextStore,
    selection: Selection,
    history: History,
    mode: TextMode,
}

impl Document {
    /// Creates an empty plain-text document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a document holding `text`, caret at the start.
    pub fn from_str(text: &str, mode: TextMode) -> Self {
        Self {
            text: TextStore::from_str(text),
            selection: Selection::default(),
            history: History::default(),
            mode,
        }
    }

    /// Returns the full text.
    pub fn text(&self) -> String {
        self.text.text()
    }

    pub fn len_chars(&self) -> usize {
        self.text.len_chars()
    }

    pub fn is_rich_text(&self) -> bool {
        self.mode == TextMode::Rich
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    /// Moves the selection, clamped to the text.
    pub fn set_selection(&mut self, mut selection: Selection) {
        selection.clamp(self.text.len_chars());
        self.selection = selection;
    }

    /// Returns true if a non-empty range is selected.
    pub fn has_selection(&self) -> bool {
        self.selection.has_selection()
    }

    /// Returns the selected text, or `None` when the selection is empty.
    pub fn selection_text(&self) -> Option<String> {
        if !self.has_selection() {
            return None;
        }
        let (start, end) = self.selection.range();
        Some(self.text.slice(start, end))
    }

    /// Replaces the selection (or inserts at the caret) with `text`.
    pub fn insert(&mut self, text: &str) -> bool {
        let mut group = EditGroup::new(self.selection);
        let (start, end) = self.selection.range();
        if start < end {
            let removed = self.text.remove(start, end);
            group.push(EditOperation::Delete {
                position: start,
                text: removed,
            });
        }
        if !text.is_empty() {
            self.text.insert(start, text);
            group.push(EditOperation::Insert {
                position: start,
                text: text.to_string(),
            });
        }
        self.selection = Selection::new(start + text.chars().count());
        group.selection_after = self.selection;
        self.commit(group)
    }

    /// Deletes the selection, or the character before the caret.
    pub fn delete_backward(&mut self) -> bool {
        let (start, end) = self.selection.range();
        let start = if start == end { start.saturating_sub(1) } else { start };
        if start == end {
            return false;
        }
        let mut group = EditGroup::new(self.selection);
        let removed = self.text.remove(start, end);
        group.push(EditOperation::Delete {
            position: start,
            text: removed,
        });
        self.selection = Selection::new(start);
        group.selection_after = self.selection;
        self.commit(group)
    }

    /// Reverts the last edit group.
    pub fn undo(&mut self) -> bool {
        match self.history.undo() {
            Some((ops, selection)) => {
                self.apply(&ops, selection);
                true
            }
            None => false,
        }
    }

    /// Re-applies the last undone edit group.
    pub fn redo(&mut self) -> bool {
        match self.history.redo() {
            Some((ops, selection)) => {
                self.apply(&ops, selection);
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Selects the whole document.
    pub fn select_all(&mut self) {
        self.selection = Selection::with_range(0, self.text.len_chars());
    }

    /// Collapses the selection onto the caret.
    pub fn clear_selection(&mut self) {
        self.selection.collapse();
    }

    /// Replaces the entire content and forgets the history.
    pub fn replace_all(&mut self, text: &str) {
        self.text = TextStore::from_str(text);
        self.selection = Selection::default();
        self.history.clear();
    }

    fn commit(&mut self, group: EditGroup) -> bool {
        let changed = !group.is_empty();
        self.history.commit(group);
        changed
    }

    fn apply(&mut self, ops: &[EditOperation], selection: Selection) {
        for op in ops {
            match op {
                EditOperation::Insert { position, text } => self.text.insert(*position, text),
                EditOperation::Delete { position, text } => {
                    let end = position + text.chars().count();
                    self.text.remove(*position, end);
                }
            }
        }
        self.set_selection(selection);
    }
}
