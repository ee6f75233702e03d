//! Develop Session - Lifecycle of open documents.
//!
//! A [`DocumentSession`] owns one file: it loads it through a [`TextBuffer`],
//! tracks unsaved changes, serializes saves through a [`SaveArbiter`] and
//! registers platform hooks (hotkeys, share requests) only while it is shown.
//! A [`SessionHost`] keeps one session per open file.

pub mod buffer;
pub mod command;
pub mod config;
pub mod error;
pub mod file;
pub mod hooks;
pub mod host;
pub mod rope_buffer;
pub mod save;
pub mod session;
pub mod share;

#[cfg(test)]
mod test_support;

pub use buffer::{ContentListener, TextBuffer};
pub use command::{EditorCommand, KeyChord, KeyEvent, KeyEventKind};
pub use config::{AppSettings, Preferences, Settings};
pub use error::{ConfigError, HostError, LoadError, SessionError, WriteError};
pub use file::FileHandle;
pub use hooks::{
    Callback, EventSource, HookCallbacks, HookKind, HookSet, LocalEventSource, PlatformHooks,
    SubscriptionToken,
};
pub use host::{BufferFactory, SessionHost, SessionId, TabInfo};
pub use rope_buffer::RopeBuffer;
pub use save::{SaveArbiter, SaveOutcome};
pub use session::{CloseReport, CommandOutcome, DocumentSession, SessionEvent, SessionState};
pub use share::{SharePayload, ShareRequest, TextFormat};
