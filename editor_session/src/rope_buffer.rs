//! File-backed [`TextBuffer`] built on the core document model.

use crate::buffer::{ContentListener, TextBuffer};
use crate::error::{LoadError, WriteError};
use crate::file::FileHandle;
use async_trait::async_trait;
use develop_core::{Document, Selection, TextMode};
use std::sync::{PoisonError, RwLock};

/// A [`Document`] behind a lock, loaded from and written to disk with tokio.
#[derive(Default)]
pub struct RopeBuffer {
    document: RwLock<Document>,
    listener: RwLock<Option<ContentListener>>,
}

impl RopeBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a buffer that already holds `text`.
    pub fn with_text(text: &str, mode: TextMode) -> Self {
        Self {
            document: RwLock::new(Document::from_str(text, mode)),
            listener: RwLock::new(None),
        }
    }

    fn with_read<R>(&self, f: impl FnOnce(&Document) -> R) -> R {
        let document = self.document.read().unwrap_or_else(PoisonError::into_inner);
        f(&document)
    }

    fn with_write<R>(&self, f: impl FnOnce(&mut Document) -> R) -> R {
        let mut document = self.document.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut document)
    }

    /// Calls the listener with no buffer lock held.
    fn notify(&self, is_reset: bool) {
        let listener = self
            .listener
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(listener) = listener {
            listener(is_reset);
        }
    }

    /// Types `text` over the current selection.
    pub fn insert(&self, text: &str) {
        if self.with_write(|doc| doc.insert(text)) {
            self.notify(false);
        }
    }

    /// Deletes the selection or the character before the caret.
    pub fn delete_backward(&self) {
        if self.with_write(|doc| doc.delete_backward()) {
            self.notify(false);
        }
    }

    pub fn set_selection(&self, selection: Selection) {
        self.with_write(|doc| doc.set_selection(selection));
    }

    pub fn selection(&self) -> Selection {
        self.with_read(|doc| doc.selection())
    }

    /// Replaces the whole content, raising a reset notification.
    pub fn replace_all(&self, text: &str) {
        self.with_write(|doc| doc.replace_all(text));
        self.notify(true);
    }
}

#[async_trait]
impl TextBuffer for RopeBuffer {
    async fn load(&self, file: &FileHandle) -> Result<(), LoadError> {
        let text = tokio::fs::read_to_string(file.path())
            .await
            .map_err(|source| LoadError::Unreadable {
                path: file.path().to_path_buf(),
                source,
            })?;
        let mode = TextMode::from_path(file.path());
        self.with_write(|doc| *doc = Document::from_str(&text, mode));
        log::debug!("Read {} characters from {}", text.chars().count(), file);
        Ok(())
    }

    async fn write(&self, file: &FileHandle) -> Result<bool, WriteError> {
        // Snapshot so the lock is not held across the write
        let text = self.with_read(|doc| doc.text());
        tokio::fs::write(file.path(), text.as_bytes())
            .await
            .map_err(|source| WriteError::Io {
                path: file.path().to_path_buf(),
                source,
            })?;
        Ok(true)
    }

    fn is_selection_valid(&self) -> bool {
        self.with_read(|doc| doc.has_selection())
    }

    fn selection_text(&self) -> String {
        self.with_read(|doc| doc.selection_text()).unwrap_or_default()
    }

    fn is_rich_text(&self) -> bool {
        self.with_read(|doc| doc.is_rich_text())
    }

    fn full_text(&self) -> String {
        self.with_read(|doc| doc.text())
    }

    fn undo(&self) {
        if self.with_write(|doc| doc.undo()) {
            self.notify(false);
        }
    }

    fn redo(&self) {
        if self.with_write(|doc| doc.redo()) {
            self.notify(false);
        }
    }

    fn select_all(&self) {
        self.with_write(|doc| doc.select_all());
    }

    fn clear_selection(&self) {
        self.with_write(|doc| doc.clear_selection());
    }

    fn set_content_listener(&self, listener: Option<ContentListener>) {
        *self.listener.write().unwrap_or_else(PoisonError::into_inner) = listener;
    }
}
