//! Controllable collaborators for session and host tests.

use crate::buffer::{ContentListener, TextBuffer};
use crate::command::KeyEvent;
use crate::config::AppSettings;
use crate::error::{LoadError, WriteError};
use crate::file::FileHandle;
use crate::hooks::{LocalEventSource, PlatformHooks};
use crate::session::DocumentSession;
use crate::share::ShareRequest;
use async_trait::async_trait;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{Notify, Semaphore};

/// Holds writes until released, one permit per write.
#[derive(Clone)]
pub struct WriteGate {
    started: Arc<Notify>,
    permits: Arc<Semaphore>,
}

impl WriteGate {
    /// Resolves once a held write has started.
    pub async fn wait_started(&self) {
        self.started.notified().await;
    }

    pub fn release(&self) {
        self.permits.add_permits(1);
    }
}

/// Text buffer double that records calls and can be told to fail.
#[derive(Default)]
pub struct MockBuffer {
    pub loads: AtomicUsize,
    pub writes: AtomicUsize,
    pub undos: AtomicUsize,
    pub redos: AtomicUsize,
    pub select_alls: AtomicUsize,
    pub clears: AtomicUsize,
    pub fail_load: AtomicBool,
    pub fail_write: AtomicBool,
    pub reject_write: AtomicBool,
    pub rich: AtomicBool,
    text: Mutex<String>,
    selection: Mutex<Option<String>>,
    gate: Mutex<Option<WriteGate>>,
    listener: Mutex<Option<ContentListener>>,
}

impl MockBuffer {
    pub fn new(text: &str) -> Arc<Self> {
        let buffer = Self::default();
        *buffer.text.lock().unwrap() = text.to_string();
        Arc::new(buffer)
    }

    pub fn hold_writes(&self) -> WriteGate {
        let gate = WriteGate {
            started: Arc::new(Notify::new()),
            permits: Arc::new(Semaphore::new(0)),
        };
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn set_selection(&self, selection: Option<&str>) {
        *self.selection.lock().unwrap() = selection.map(str::to_string);
    }

    /// Raises a content-changed notification, as an edit would.
    pub fn emit(&self, is_reset: bool) {
        let listener = self.listener.lock().unwrap().clone();
        if let Some(listener) = listener {
            listener(is_reset);
        }
    }

    pub fn has_listener(&self) -> bool {
        self.listener.lock().unwrap().is_some()
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextBuffer for MockBuffer {
    async fn load(&self, file: &FileHandle) -> Result<(), LoadError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.fail_load.load(Ordering::SeqCst) {
            return Err(LoadError::Unreadable {
                path: file.path().to_path_buf(),
                source: io::Error::new(io::ErrorKind::NotFound, "missing"),
            });
        }
        Ok(())
    }

    async fn write(&self, file: &FileHandle) -> Result<bool, WriteError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.started.notify_one();
            if let Ok(permit) = gate.permits.acquire().await {
                permit.forget();
            }
        }
        if self.fail_write.load(Ordering::SeqCst) {
            return Err(WriteError::Io {
                path: file.path().to_path_buf(),
                source: io::Error::new(io::ErrorKind::PermissionDenied, "read-only"),
            });
        }
        Ok(!self.reject_write.load(Ordering::SeqCst))
    }

    fn is_selection_valid(&self) -> bool {
        self.selection.lock().unwrap().is_some()
    }

    fn selection_text(&self) -> String {
        self.selection.lock().unwrap().clone().unwrap_or_default()
    }

    fn is_rich_text(&self) -> bool {
        self.rich.load(Ordering::SeqCst)
    }

    fn full_text(&self) -> String {
        self.text.lock().unwrap().clone()
    }

    fn undo(&self) {
        self.undos.fetch_add(1, Ordering::SeqCst);
    }

    fn redo(&self) {
        self.redos.fetch_add(1, Ordering::SeqCst);
    }

    fn select_all(&self) {
        self.select_alls.fetch_add(1, Ordering::SeqCst);
    }

    fn clear_selection(&self) {
        self.clears.fetch_add(1, Ordering::SeqCst);
    }

    fn set_content_listener(&self, listener: Option<ContentListener>) {
        *self.listener.lock().unwrap() = listener;
    }
}

/// Platform sources shared by a test.
pub struct Platform {
    pub input: Arc<LocalEventSource<KeyEvent>>,
    pub share: Arc<LocalEventSource<ShareRequest>>,
    pub settings: Arc<AppSettings>,
}

impl Platform {
    pub fn new() -> Self {
        Self {
            input: Arc::new(LocalEventSource::new()),
            share: Arc::new(LocalEventSource::new()),
            settings: Arc::new(AppSettings::default()),
        }
    }

    pub fn hooks(&self) -> PlatformHooks {
        PlatformHooks::new(self.input.clone(), self.share.clone())
    }

    pub fn session(&self, path: &str, buffer: &Arc<MockBuffer>) -> DocumentSession {
        DocumentSession::new(
            FileHandle::new(path),
            buffer.clone(),
            self.settings.clone(),
            self.hooks(),
        )
    }

    /// Number of live registrations across both sources.
    pub fn registrations(&self) -> usize {
        self.input.handler_count() + self.share.handler_count()
    }
}
