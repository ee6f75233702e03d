//! Editor commands and their keyboard accelerators.

use std::fmt;

/// A command a session can execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditorCommand {
    Undo,
    Redo,
    SelectAll,
    ClearSelection,
    Save,
}

impl EditorCommand {
    pub const ALL: [EditorCommand; 5] = [
        EditorCommand::Undo,
        EditorCommand::Redo,
        EditorCommand::SelectAll,
        EditorCommand::ClearSelection,
        EditorCommand::Save,
    ];

    /// Parses a toolbar tag. Unknown tags yield `None` and are ignored by callers.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "Undo" => Some(EditorCommand::Undo),
            "Redo" => Some(EditorCommand::Redo),
            "SelectAll" => Some(EditorCommand::SelectAll),
            "ClearSelection" => Some(EditorCommand::ClearSelection),
            "Save" => Some(EditorCommand::Save),
            _ => None,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            EditorCommand::Undo => "Undo",
            EditorCommand::Redo => "Redo",
            EditorCommand::SelectAll => "SelectAll",
            EditorCommand::ClearSelection => "ClearSelection",
            EditorCommand::Save => "Save",
        }
    }

    /// Human readable label for menus and toolbars.
    pub fn label(&self) -> &'static str {
        match self {
            EditorCommand::Undo => "Undo",
            EditorCommand::Redo => "Redo",
            EditorCommand::SelectAll => "Select All",
            EditorCommand::ClearSelection => "Clear Selection",
            EditorCommand::Save => "Save",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            EditorCommand::Undo => "Reverse the most recent action",
            EditorCommand::Redo => "Repeat the most recently undone action",
            EditorCommand::SelectAll => "Select all content",
            EditorCommand::ClearSelection => "Deselect the current selection",
            EditorCommand::Save => "Save the file",
        }
    }

    /// Ctrl accelerator, if the command has one.
    pub fn accelerator(&self) -> Option<char> {
        match self {
            EditorCommand::Undo => Some('Z'),
            EditorCommand::Redo => Some('Y'),
            EditorCommand::Save => Some('S'),
            EditorCommand::SelectAll | EditorCommand::ClearSelection => None,
        }
    }

    /// Maps a key chord to the command bound to it.
    pub fn from_chord(chord: KeyChord) -> Option<Self> {
        if !chord.ctrl {
            return None;
        }
        let key = chord.key.to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|command| command.accelerator() == Some(key))
    }

    /// Whether the command completes without awaiting I/O.
    pub fn is_synchronous(&self) -> bool {
        !matches!(self, EditorCommand::Save)
    }
}

impl fmt::Display for EditorCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A key together with the Ctrl modifier state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyChord {
    pub key: char,
    pub ctrl: bool,
}

impl KeyChord {
    pub fn ctrl(key: char) -> Self {
        Self { key, ctrl: true }
    }

    pub fn plain(key: char) -> Self {
        Self { key, ctrl: false }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEventKind {
    KeyDown,
    KeyUp,
}

/// Accelerator notification delivered by the platform input source.
/// Handlers set `handled` when they consume the key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub chord: KeyChord,
    pub kind: KeyEventKind,
    pub handled: bool,
}

impl KeyEvent {
    pub fn key_down(chord: KeyChord) -> Self {
        Self {
            chord,
            kind: KeyEventKind::KeyDown,
            handled: false,
        }
    }

    pub fn key_up(chord: KeyChord) -> Self {
        Self {
            chord,
            kind: KeyEventKind::KeyUp,
            handled: false,
        }
    }
}
