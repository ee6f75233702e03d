//! Develop Core - Text model for document sessions.
//!
//! This crate holds document text, selection and undo history without any
//! dependency on file I/O, async runtimes or rendering.

pub mod buffer;
pub mod cursor;
pub mod document;
pub mod history;

pub use buffer::TextStore;
pub use cursor::Selection;
pub use document::{Document, TextMode};
pub use history::{EditGroup, EditOperation, History};
