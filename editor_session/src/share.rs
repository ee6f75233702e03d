//! Deciding what "share" hands to the platform.

use crate::buffer::TextBuffer;
use crate::file::FileHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextFormat {
    Plain,
    /// Rich text; the platform receives it as RTF.
    Rich,
}

/// Content offered to the platform share sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SharePayload {
    /// Only the selected text.
    Selection { text: String, format: TextFormat },
    /// The whole file plus its full text.
    Document { file: FileHandle, text: String },
}

impl SharePayload {
    /// Picks the payload from the buffer's selection state. No side effects.
    pub fn decide(buffer: &dyn TextBuffer, file: &FileHandle) -> Self {
        if buffer.is_selection_valid() {
            let format = if buffer.is_rich_text() {
                TextFormat::Rich
            } else {
                TextFormat::Plain
            };
            SharePayload::Selection {
                text: buffer.selection_text(),
                format,
            }
        } else {
            SharePayload::Document {
                file: file.clone(),
                text: buffer.full_text(),
            }
        }
    }

    pub fn text(&self) -> &str {
        match self {
            SharePayload::Selection { text, .. } | SharePayload::Document { text, .. } => text,
        }
    }
}

/// A pending share request from the platform, filled in by the share hook.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShareRequest {
    payload: Option<SharePayload>,
}

impl ShareRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fulfill(&mut self, payload: SharePayload) {
        self.payload = Some(payload);
    }

    pub fn payload(&self) -> Option<&SharePayload> {
        self.payload.as_ref()
    }

    pub fn into_payload(self) -> Option<SharePayload> {
        self.payload
    }
}
