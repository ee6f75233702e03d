//! The text buffer a session edits through.

use crate::error::{LoadError, WriteError};
use crate::file::FileHandle;
use async_trait::async_trait;
use std::sync::Arc;

/// Callback raised whenever buffer content mutates.
/// The argument is true when the whole content was replaced.
pub type ContentListener = Arc<dyn Fn(bool) + Send + Sync>;

/// Owner of document text, selection and undo history.
///
/// Implementations must not hold internal locks while invoking the content
/// listener, since the listener may call back into the buffer.
#[async_trait]
pub trait TextBuffer: Send + Sync {
    /// Reads the file into the buffer.
    async fn load(&self, file: &FileHandle) -> Result<(), LoadError>;

    /// Writes the buffer to the file. `Ok(false)` means the write was refused.
    async fn write(&self, file: &FileHandle) -> Result<bool, WriteError>;

    /// Returns true if a non-empty range is selected.
    fn is_selection_valid(&self) -> bool;

    fn selection_text(&self) -> String;

    /// Returns true if selections should be exported as rich text.
    fn is_rich_text(&self) -> bool;

    fn full_text(&self) -> String;

    fn undo(&self);

    fn redo(&self);

    fn select_all(&self);

    fn clear_selection(&self);

    /// Installs (or with `None`, removes) the content-changed listener.
    fn set_content_listener(&self, listener: Option<ContentListener>);
}
