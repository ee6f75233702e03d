//! Rope-backed text storage.

use ropey::Rope;

/// Document text backed by a rope data structure.
/// All positions are character indices and are clamped to the text length.
#[derive(Debug, Clone, Default)]
pub struct TextStore {
    rope: Rope,
}

impl TextStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self { rope: Rope::new() }
    }

    /// Creates a store holding `text`.
    pub fn from_str(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
        }
    }

    /// Returns the total number of characters.
    pub fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    /// Returns the total number of lines.
    pub fn len_lines(&self) -> usize {
        self.rope.len_lines()
    }

    /// Returns true if the store holds no text.
    pub fn is_empty(&self) -> bool {
        self.rope.len_chars() == 0
    }

    /// Inserts a string at the given character index.
    pub fn insert(&mut self, char_idx: usize, text: &str) {
        let idx = char_idx.min(self.len_chars());
        self.rope.insert(idx, text);
    }

    /// Removes the characters in `start..end` and returns them.
    pub fn remove(&mut self, start: usize, end: usize) -> String {
        let start = start.min(self.len_chars());
        let end = end.min(self.len_chars());
        if start >= end {
            return String::new();
        }
        let removed = self.rope.slice(start..end).to_string();
        self.rope.remove(start..end);
        removed
    }

    /// Returns the characters in `start..end` as a string.
    pub fn slice(&self, start: usize, end: usize) -> String {
        let start = start.min(self.len_chars());
        let end = end.min(self.len_chars());
        if start >= end {
            String::new()
        } else {
            self.rope.slice(start..end).to_string()
        }
    }

    /// Returns the entire text.
    pub fn text(&self) -> String {
        self.rope.to_string()
    }
}
