//! Lifecycle of one open document: load, edit tracking, saving, platform
//! hooks and teardown.
//!
//! A [`DocumentSession`] is a cheap handle; clones share the same state. Hook
//! callbacks and the buffer's content listener only hold weak references, so
//! dropping every handle releases the session even if it was never closed.

use crate::buffer::{ContentListener, TextBuffer};
use crate::command::{EditorCommand, KeyEvent, KeyEventKind};
use crate::config::Settings;
use crate::error::SessionError;
use crate::file::FileHandle;
use crate::hooks::{Callback, HookCallbacks, HookSet, PlatformHooks};
use crate::save::{SaveArbiter, SaveOutcome};
use crate::share::{SharePayload, ShareRequest};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

const EVENT_CAPACITY: usize = 64;

/// Notifications published to [`DocumentSession::subscribe`] receivers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Loaded,
    DirtyChanged(bool),
    SaveFailed(String),
    Closed,
}

/// Externally visible state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unloaded,
    Loading,
    Clean,
    Dirty,
    Saving,
    Closing,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Unloaded,
    Loading,
    Loaded,
    Closing,
    Closed,
}

/// Result of a dispatched command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Applied,
    Save(SaveOutcome),
}

/// What happened while closing. Closing itself never fails.
#[derive(Debug, Default)]
pub struct CloseReport {
    /// Present when unsaved changes triggered a final save attempt.
    pub final_save: Option<Result<SaveOutcome, SessionError>>,
    /// Content changed after the last successful write, for example while
    /// the final save was running, and was never written.
    pub unsaved_changes: bool,
}

impl CloseReport {
    /// True unless the final save failed or changes were left unwritten.
    pub fn saved_cleanly(&self) -> bool {
        !matches!(self.final_save, Some(Err(_))) && !self.unsaved_changes
    }
}

#[derive(Debug)]
struct Flags {
    phase: Phase,
    dirty: bool,
    visible: bool,
    /// Bumped on every content change; a save only clears `dirty` if this
    /// did not move while it was writing.
    generation: u64,
    /// Generation captured by the last successful write.
    saved_generation: u64,
    /// A reset arrived that no write has picked up yet.
    reset_pending: bool,
}

struct SessionInner {
    file: FileHandle,
    buffer: Arc<dyn TextBuffer>,
    settings: Arc<dyn Settings>,
    hooks: PlatformHooks,
    flags: Mutex<Flags>,
    subscriptions: Mutex<HookSet>,
    arbiter: SaveArbiter,
    pending: Mutex<Vec<JoinHandle<()>>>,
    events: broadcast::Sender<SessionEvent>,
    runtime: Option<Handle>,
}

/// Handle to an open document.
#[derive(Clone)]
pub struct DocumentSession {
    inner: Arc<SessionInner>,
}

impl DocumentSession {
    /// Creates an unloaded, visible session and subscribes to the buffer's
    /// content changes. Background saves run on the current tokio runtime, if any.
    pub fn new(
        file: FileHandle,
        buffer: Arc<dyn TextBuffer>,
        settings: Arc<dyn Settings>,
        hooks: PlatformHooks,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let inner = Arc::new(SessionInner {
            file,
            buffer,
            settings,
            hooks,
            flags: Mutex::new(Flags {
                phase: Phase::Unloaded,
                dirty: false,
                visible: true,
                generation: 0,
                saved_generation: 0,
                reset_pending: false,
            }),
            subscriptions: Mutex::new(HookSet::new()),
            arbiter: SaveArbiter::new(),
            pending: Mutex::new(Vec::new()),
            events,
            runtime: Handle::try_current().ok(),
        });

        let weak = Arc::downgrade(&inner);
        let listener: ContentListener = Arc::new(move |is_reset| {
            if let Some(inner) = weak.upgrade() {
                inner.on_content_changed(is_reset);
            }
        });
        inner.buffer.set_content_listener(Some(listener));

        log::debug!("Created session for {}", inner.file);
        Self { inner }
    }

    pub fn file(&self) -> &FileHandle {
        &self.inner.file
    }

    pub fn state(&self) -> SessionState {
        let flags = self.inner.flags();
        match flags.phase {
            Phase::Unloaded => SessionState::Unloaded,
            Phase::Loading => SessionState::Loading,
            Phase::Closing => SessionState::Closing,
            Phase::Closed => SessionState::Closed,
            // Rewriting clean content is not reported as a save in progress
            Phase::Loaded if flags.dirty && self.inner.arbiter.is_saving() => {
                SessionState::Saving
            }
            Phase::Loaded if flags.dirty => SessionState::Dirty,
            Phase::Loaded => SessionState::Clean,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.inner.flags().phase == Phase::Loaded
    }

    pub fn is_dirty(&self) -> bool {
        self.inner.flags().dirty
    }

    pub fn is_visible(&self) -> bool {
        self.inner.flags().visible
    }

    pub fn is_saving(&self) -> bool {
        self.inner.arbiter.is_saving()
    }

    /// True while hooks are registered with the platform.
    pub fn is_attached(&self) -> bool {
        self.inner.subscriptions().is_attached()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// Loads the document. A second call while loading or loaded is a no-op.
    /// On success the hooks are attached if the session is visible.
    pub async fn load(&self) -> Result<(), SessionError> {
        self.inner.load().await
    }

    /// Marks the session visible, loading it on first show and
    /// re-attaching hooks otherwise.
    pub async fn show(&self) -> Result<(), SessionError> {
        let phase = {
            let mut flags = self.inner.flags();
            flags.visible = true;
            flags.phase
        };
        match phase {
            Phase::Unloaded => self.inner.load().await,
            Phase::Loading => Ok(()),
            Phase::Loaded => {
                self.inner.attach_hooks();
                Ok(())
            }
            Phase::Closing | Phase::Closed => Err(SessionError::Closed),
        }
    }

    /// Marks the session hidden and detaches its hooks.
    pub fn hide(&self) {
        self.inner.flags().visible = false;
        self.inner.detach_hooks();
    }

    /// Registers the hotkey and share hooks. Returns false if nothing was
    /// registered: already attached, not loaded, or closing.
    pub fn attach_hooks(&self) -> bool {
        self.inner.attach_hooks()
    }

    /// Unregisters the hooks. Returns false if none were registered.
    pub fn detach_hooks(&self) -> bool {
        self.inner.detach_hooks()
    }

    pub async fn dispatch_command(
        &self,
        command: EditorCommand,
    ) -> Result<CommandOutcome, SessionError> {
        self.inner.admit()?;
        log::trace!("Dispatching {:?} to {}", command, self.inner.file);
        if self.inner.apply_immediate(command) {
            return Ok(CommandOutcome::Applied);
        }
        self.inner.write_through().await.map(CommandOutcome::Save)
    }

    /// Writes the buffer to its file. Collapses into an in-flight save
    /// instead of starting a second write.
    pub async fn save(&self) -> Result<SaveOutcome, SessionError> {
        self.inner.admit()?;
        self.inner.write_through().await
    }

    /// Same entry point the buffer's content listener uses.
    pub fn on_content_changed(&self, is_reset: bool) {
        self.inner.on_content_changed(is_reset);
    }

    /// Waits for background saves started so far and any in-flight write.
    pub async fn flush(&self) {
        self.inner.flush().await;
    }

    /// Tears the session down. Hooks are detached first, background saves
    /// are awaited, and unsaved changes get one final save attempt whose
    /// failure is reported but does not stop the close.
    pub async fn close(&self) -> CloseReport {
        self.inner.close().await
    }

    pub fn decide_share_payload(&self) -> SharePayload {
        self.inner.decide_share_payload()
    }
}

impl SessionInner {
    fn flags(&self) -> MutexGuard<'_, Flags> {
        self.flags.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn subscriptions(&self) -> MutexGuard<'_, HookSet> {
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn pending(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_dirty(&self, flags: &mut Flags, dirty: bool) {
        if flags.dirty != dirty {
            flags.dirty = dirty;
            let _ = self.events.send(SessionEvent::DirtyChanged(dirty));
        }
    }

    fn admit(&self) -> Result<(), SessionError> {
        match self.flags().phase {
            Phase::Loaded => Ok(()),
            Phase::Unloaded | Phase::Loading => Err(SessionError::NotLoaded),
            Phase::Closing | Phase::Closed => Err(SessionError::Closed),
        }
    }

    async fn load(self: &Arc<Self>) -> Result<(), SessionError> {
        {
            let mut flags = self.flags();
            match flags.phase {
                Phase::Loading | Phase::Loaded => return Ok(()),
                Phase::Closing | Phase::Closed => return Err(SessionError::Closed),
                Phase::Unloaded => flags.phase = Phase::Loading,
            }
        }

        log::info!("Loading {}", self.file);
        let result = self.buffer.load(&self.file).await;

        let visible = {
            let mut flags = self.flags();
            if let Err(e) = result {
                if flags.phase == Phase::Loading {
                    flags.phase = Phase::Unloaded;
                }
                log::error!("Failed to load {}: {}", self.file, e);
                return Err(e.into());
            }
            if flags.phase != Phase::Loading {
                log::debug!("{} was closed while loading", self.file);
                return Ok(());
            }
            flags.phase = Phase::Loaded;
            flags.visible
        };

        let _ = self.events.send(SessionEvent::Loaded);
        if visible {
            self.attach_hooks();
        }
        Ok(())
    }

    fn attach_hooks(self: &Arc<Self>) -> bool {
        // Phase is checked under the subscriptions lock so a concurrent
        // close either sees this registration or makes it refuse.
        let mut subscriptions = self.subscriptions();
        let phase = self.flags().phase;
        if phase != Phase::Loaded {
            log::trace!("Not attaching hooks for {} in {:?}", self.file, phase);
            return false;
        }
        let added = subscriptions.attach(&self.hooks, self.hook_callbacks());
        if added > 0 {
            log::debug!("Attached {} hook(s) for {}", added, self.file);
        }
        added > 0
    }

    fn detach_hooks(&self) -> bool {
        let removed = self.subscriptions().detach(&self.hooks);
        if removed > 0 {
            log::debug!("Detached {} hook(s) for {}", removed, self.file);
        }
        removed > 0
    }

    fn hook_callbacks(self: &Arc<Self>) -> HookCallbacks {
        let weak = Arc::downgrade(self);
        let on_key: Callback<KeyEvent> = Arc::new(move |event: &mut KeyEvent| {
            if let Some(inner) = weak.upgrade() {
                inner.handle_hotkey(event);
            }
        });
        let weak = Arc::downgrade(self);
        let on_share: Callback<ShareRequest> = Arc::new(move |request: &mut ShareRequest| {
            if let Some(inner) = weak.upgrade() {
                request.fulfill(inner.decide_share_payload());
            }
        });
        HookCallbacks { on_key, on_share }
    }

    fn handle_hotkey(self: &Arc<Self>, event: &mut KeyEvent) {
        if event.kind != KeyEventKind::KeyDown || self.settings.dialog_shown() {
            return;
        }
        let Some(command) = EditorCommand::from_chord(event.chord) else {
            return;
        };
        {
            let flags = self.flags();
            if flags.phase != Phase::Loaded || !flags.visible {
                return;
            }
        }
        event.handled = true;
        log::trace!("Hotkey {:?} on {}", command, self.file);
        if !self.apply_immediate(command) {
            self.spawn_save();
        }
    }

    /// Runs a command that needs no I/O. Returns false for `Save`.
    fn apply_immediate(&self, command: EditorCommand) -> bool {
        match command {
            EditorCommand::Undo => self.buffer.undo(),
            EditorCommand::Redo => self.buffer.redo(),
            EditorCommand::SelectAll => self.buffer.select_all(),
            EditorCommand::ClearSelection => self.buffer.clear_selection(),
            EditorCommand::Save => return false,
        }
        true
    }

    fn on_content_changed(self: &Arc<Self>, is_reset: bool) {
        let autosave = self.settings.autosave_enabled();
        let save = {
            let mut flags = self.flags();
            match flags.phase {
                Phase::Loaded => {}
                Phase::Closing => {
                    // No more background saves; close reports it if unwritten
                    flags.generation += 1;
                    if !is_reset {
                        self.set_dirty(&mut flags, true);
                    }
                    return;
                }
                phase => {
                    log::trace!("Ignoring content change for {} in {:?}", self.file, phase);
                    return;
                }
            }
            flags.generation += 1;
            if is_reset {
                flags.reset_pending = true;
            } else {
                self.set_dirty(&mut flags, true);
            }
            is_reset || autosave
        };

        if save && !self.spawn_save() {
            let mut flags = self.flags();
            self.set_dirty(&mut flags, true);
        }
    }

    /// Starts a save in the background. Returns false if the session is not
    /// loaded or there is no runtime to run it on.
    fn spawn_save(self: &Arc<Self>) -> bool {
        if self.flags().phase != Phase::Loaded {
            return false;
        }
        let Some(runtime) = &self.runtime else {
            log::warn!("No async runtime, cannot save {} in the background", self.file);
            return false;
        };

        let inner = Arc::clone(self);
        let task = runtime.spawn(async move {
            if let Err(e) = inner.admit() {
                log::debug!("Background save of {} skipped: {}", inner.file, e);
                return;
            }
            if inner.write_through().await.is_err() {
                let mut flags = inner.flags();
                inner.set_dirty(&mut flags, true);
            }
        });

        let mut pending = self.pending();
        pending.retain(|task| !task.is_finished());
        pending.push(task);
        true
    }

    async fn write_through(self: &Arc<Self>) -> Result<SaveOutcome, SessionError> {
        let (generation, reset) = {
            let mut flags = self.flags();
            (flags.generation, std::mem::take(&mut flags.reset_pending))
        };
        let buffer = Arc::clone(&self.buffer);
        let file = self.file.clone();

        let result = self
            .arbiter
            .try_save(|| async move { buffer.write(&file).await })
            .await;

        match result {
            Ok(SaveOutcome::Saved) => {
                let follow_up = {
                    let mut flags = self.flags();
                    flags.saved_generation = flags.saved_generation.max(generation);
                    if flags.generation == generation {
                        self.set_dirty(&mut flags, false);
                        false
                    } else {
                        // Edits made meanwhile already set `dirty`; resets did not
                        flags.phase == Phase::Loaded
                            && (flags.reset_pending || self.settings.autosave_enabled())
                    }
                };
                log::info!("Saved {}", self.file);
                if follow_up {
                    log::debug!("{} changed while saving, saving again", self.file);
                    self.spawn_save();
                }
                Ok(SaveOutcome::Saved)
            }
            Ok(SaveOutcome::AlreadySaving) => {
                // The running write may predate the reset
                if reset {
                    self.flags().reset_pending = true;
                }
                Ok(SaveOutcome::AlreadySaving)
            }
            Err(e) => {
                log::warn!("Failed to save {}: {}", self.file, e);
                let _ = self.events.send(SessionEvent::SaveFailed(e.to_string()));
                Err(SessionError::Write(e))
            }
        }
    }

    async fn flush(&self) {
        loop {
            let tasks: Vec<JoinHandle<()>> = std::mem::take(&mut *self.pending());
            if tasks.is_empty() {
                break;
            }
            for task in tasks {
                if let Err(e) = task.await {
                    log::warn!("Background save task for {} failed: {}", self.file, e);
                }
            }
        }
        self.arbiter.wait_idle().await;
    }

    async fn close(self: &Arc<Self>) -> CloseReport {
        let was_loaded = {
            let mut flags = self.flags();
            match flags.phase {
                Phase::Closing | Phase::Closed => {
                    log::debug!("{} is already closing", self.file);
                    return CloseReport::default();
                }
                phase => {
                    flags.phase = Phase::Closing;
                    phase == Phase::Loaded
                }
            }
        };
        log::info!("Closing {}", self.file);

        // Nothing may reach the session through the platform from here on
        self.detach_hooks();
        self.flush().await;

        let dirty = self.flags().dirty;
        let final_save = if was_loaded && dirty {
            let outcome = loop {
                match self.write_through().await {
                    Ok(SaveOutcome::AlreadySaving) => self.arbiter.wait_idle().await,
                    other => break other,
                }
            };
            if let Err(e) = &outcome {
                log::error!("Final save of {} failed, closing anyway: {}", self.file, e);
            }
            Some(outcome)
        } else {
            None
        };

        self.detach_hooks();
        self.buffer.set_content_listener(None);
        let unsaved_changes = {
            let mut flags = self.flags();
            flags.phase = Phase::Closed;
            was_loaded && flags.generation != flags.saved_generation
        };
        if unsaved_changes {
            log::warn!("{} changed after its last save, changes were not written", self.file);
        }
        let _ = self.events.send(SessionEvent::Closed);
        log::info!("Closed {}", self.file);
        CloseReport {
            final_save,
            unsaved_changes,
        }
    }

    fn decide_share_payload(&self) -> SharePayload {
        SharePayload::decide(self.buffer.as_ref(), &self.file)
    }
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        let subscriptions = self
            .subscriptions
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        if subscriptions.detach(&self.hooks) > 0 {
            log::warn!("{} dropped without closing, hooks detached", self.file);
        }
        log::debug!("Document session for {} has been destroyed", self.file);
    }
}
