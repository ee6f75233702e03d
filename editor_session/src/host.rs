//! Session host: one document session per open file, shown as tabs.

use crate::buffer::TextBuffer;
use crate::command::EditorCommand;
use crate::config::AppSettings;
use crate::error::HostError;
use crate::file::FileHandle;
use crate::hooks::PlatformHooks;
use crate::session::{CloseReport, CommandOutcome, DocumentSession};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Unique identifier for a session. Ids are never reused.
pub type SessionId = usize;

/// Builds the text buffer for a newly opened file.
pub type BufferFactory = Arc<dyn Fn(&FileHandle) -> Arc<dyn TextBuffer> + Send + Sync>;

const MAX_RECENT_FILES: usize = 10;

/// Information about a session tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabInfo {
    pub id: SessionId,
    /// Display name (file name or "Untitled").
    pub name: String,
    pub path: PathBuf,
    /// Whether the session has unsaved changes.
    pub is_dirty: bool,
    pub is_active: bool,
}

/// Owns the open sessions and decides which one is shown.
pub struct SessionHost {
    /// All sessions ever opened, indexed by id; closed slots are `None`.
    sessions: Vec<Option<DocumentSession>>,
    /// Order of tabs (session ids in display order).
    tab_order: Vec<SessionId>,
    active: Option<SessionId>,
    /// Recent files list (most recent first).
    recent_files: VecDeque<PathBuf>,
    settings: Arc<AppSettings>,
    hooks: PlatformHooks,
    buffers: BufferFactory,
    /// Set while the application is in the background.
    suspended: bool,
}

impl SessionHost {
    pub fn new(settings: Arc<AppSettings>, hooks: PlatformHooks, buffers: BufferFactory) -> Self {
        Self {
            sessions: Vec::new(),
            tab_order: Vec::new(),
            active: None,
            recent_files: VecDeque::new(),
            settings,
            hooks,
            buffers,
            suspended: false,
        }
    }

    pub fn settings(&self) -> &Arc<AppSettings> {
        &self.settings
    }

    /// Opens `path` in a new session and makes it active.
    ///
    /// An already open file is activated instead. A session whose load
    /// fails is closed again and the error returned.
    pub async fn open(&mut self, path: impl AsRef<Path>) -> Result<SessionId, HostError> {
        let path = path.as_ref();
        if !self.settings.is_supported(path) {
            log::warn!("Refusing to open unsupported file {}", path.display());
            return Err(HostError::UnsupportedFileType(path.to_path_buf()));
        }

        if let Some(existing) = self.find_by_path(path) {
            self.activate(existing).await?;
            return Ok(existing);
        }

        let file = FileHandle::new(path);
        let buffer = (self.buffers)(&file);
        let session = DocumentSession::new(
            file,
            buffer,
            self.settings.clone(),
            self.hooks.clone(),
        );

        if let Some(previous) = self.active_session() {
            previous.hide();
        }
        let loaded = if self.suspended {
            session.hide();
            session.load().await
        } else {
            session.show().await
        };
        if let Err(e) = loaded {
            session.close().await;
            self.show_active().await;
            return Err(e.into());
        }

        let id = self.sessions.len();
        self.sessions.push(Some(session));
        self.tab_order.push(id);
        self.active = Some(id);
        self.add_to_recent(path.to_path_buf());
        log::info!("Opened {} as session {}", path.display(), id);
        Ok(id)
    }

    /// Hides the current session and shows `id`.
    pub async fn activate(&mut self, id: SessionId) -> Result<(), HostError> {
        let session = self.session(id).cloned().ok_or(HostError::UnknownSession(id))?;
        if self.active != Some(id) {
            if let Some(previous) = self.active_session() {
                previous.hide();
            }
            self.active = Some(id);
        }
        if !self.suspended {
            session.show().await?;
        }
        Ok(())
    }

    /// The application moved to the background.
    pub fn suspend(&mut self) {
        self.suspended = true;
        if let Some(session) = self.active_session() {
            session.hide();
        }
    }

    /// The application returned to the foreground.
    pub async fn resume(&mut self) -> Result<(), HostError> {
        self.suspended = false;
        match self.active_session().cloned() {
            Some(session) => session.show().await.map_err(HostError::from),
            None => Ok(()),
        }
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    /// Forwards `command` to the active session.
    pub async fn dispatch(&self, command: EditorCommand) -> Result<CommandOutcome, HostError> {
        let session = self.active_session().ok_or(HostError::NoActiveSession)?;
        Ok(session.dispatch_command(command).await?)
    }

    /// Forwards a toolbar tag. Unknown tags are ignored and yield `None`.
    pub async fn dispatch_tag(&self, tag: &str) -> Result<Option<CommandOutcome>, HostError> {
        match EditorCommand::from_tag(tag) {
            Some(command) => self.dispatch(command).await.map(Some),
            None => {
                log::debug!("Ignoring unknown command tag {:?}", tag);
                Ok(None)
            }
        }
    }

    /// Closes a session and removes its tab. When it was active, the first
    /// remaining tab becomes active.
    pub async fn close(&mut self, id: SessionId) -> Result<CloseReport, HostError> {
        let session = self
            .sessions
            .get_mut(id)
            .and_then(Option::take)
            .ok_or(HostError::UnknownSession(id))?;
        self.tab_order.retain(|&tab| tab != id);

        let report = session.close().await;
        if !report.saved_cleanly() {
            log::warn!("Closed {} with unsaved changes", session.file());
        }

        if self.active == Some(id) {
            self.active = self.tab_order.first().copied();
            self.show_active().await;
        }
        Ok(report)
    }

    /// Closes the active session.
    pub async fn close_active(&mut self) -> Result<CloseReport, HostError> {
        let id = self.active.ok_or(HostError::NoActiveSession)?;
        self.close(id).await
    }

    /// Closes every session in tab order.
    pub async fn close_all(&mut self) -> Vec<(SessionId, CloseReport)> {
        let ids = std::mem::take(&mut self.tab_order);
        self.active = None;
        let mut reports = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(session) = self.sessions.get_mut(id).and_then(Option::take) {
                reports.push((id, session.close().await));
            }
        }
        log::info!("Closed {} session(s)", reports.len());
        reports
    }

    async fn show_active(&self) {
        if self.suspended {
            return;
        }
        if let Some(session) = self.active_session() {
            if let Err(e) = session.show().await {
                log::warn!("Failed to show {}: {}", session.file(), e);
            }
        }
    }

    fn find_by_path(&self, path: &Path) -> Option<SessionId> {
        self.tab_order.iter().copied().find(|&id| {
            self.session(id)
                .map(|session| session.file().path() == path)
                .unwrap_or(false)
        })
    }

    pub fn session(&self, id: SessionId) -> Option<&DocumentSession> {
        self.sessions.get(id).and_then(|slot| slot.as_ref())
    }

    pub fn active_id(&self) -> Option<SessionId> {
        self.active
    }

    pub fn active_session(&self) -> Option<&DocumentSession> {
        self.active.and_then(|id| self.session(id))
    }

    pub fn tab_count(&self) -> usize {
        self.tab_order.len()
    }

    pub fn tabs(&self) -> Vec<TabInfo> {
        self.tab_order
            .iter()
            .filter_map(|&id| {
                self.session(id).map(|session| TabInfo {
                    id,
                    name: session.file().name(),
                    path: session.file().path().to_path_buf(),
                    is_dirty: session.is_dirty(),
                    is_active: self.active == Some(id),
                })
            })
            .collect()
    }

    /// Checks if any session has unsaved changes.
    pub fn has_unsaved_changes(&self) -> bool {
        !self.dirty_sessions().is_empty()
    }

    /// Ids of all sessions with unsaved changes, in tab order.
    pub fn dirty_sessions(&self) -> Vec<SessionId> {
        self.tab_order
            .iter()
            .copied()
            .filter(|&id| self.session(id).map(|s| s.is_dirty()).unwrap_or(false))
            .collect()
    }

    fn add_to_recent(&mut self, path: PathBuf) {
        self.recent_files.retain(|p| p != &path);
        self.recent_files.push_front(path);
        self.recent_files.truncate(MAX_RECENT_FILES);
    }

    pub fn recent_files(&self) -> &VecDeque<PathBuf> {
        &self.recent_files
    }

    pub fn clear_recent_files(&mut self) {
        self.recent_files.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Preferences;
    use crate::error::SessionError;
    use crate::save::SaveOutcome;
    use crate::test_support::{MockBuffer, Platform};
    use std::collections::HashMap;
    use std::sync::atomic::Ordering;
    use std::sync::Mutex;

    type Buffers = Arc<Mutex<HashMap<PathBuf, Arc<MockBuffer>>>>;

    /// Host backed by mock buffers; paths containing "missing" fail to load.
    fn host(platform: &Platform) -> (SessionHost, Buffers) {
        let created: Buffers = Arc::default();
        let factory: BufferFactory = {
            let created = created.clone();
            Arc::new(move |file: &FileHandle| -> Arc<dyn TextBuffer> {
                let buffer = MockBuffer::new("text");
                if file.path().to_string_lossy().contains("missing") {
                    buffer.fail_load.store(true, Ordering::SeqCst);
                }
                created
                    .lock()
                    .unwrap()
                    .insert(file.path().to_path_buf(), buffer.clone());
                buffer
            })
        };
        let host = SessionHost::new(platform.settings.clone(), platform.hooks(), factory);
        (host, created)
    }

    fn buffer(buffers: &Buffers, path: &str) -> Arc<MockBuffer> {
        buffers.lock().unwrap()[Path::new(path)].clone()
    }

    #[tokio::test]
    async fn test_new_host() {
        let platform = Platform::new();
        let (host, _) = host(&platform);
        assert!(host.active_id().is_none());
        assert_eq!(host.tab_count(), 0);
        assert!(!host.has_unsaved_changes());
    }

    #[tokio::test]
    async fn test_open_shows_only_active_session() {
        let platform = Platform::new();
        let (mut host, _) = host(&platform);

        let a = host.open("a.txt").await.unwrap();
        let b = host.open("b.txt").await.unwrap();
        assert_ne!(a, b);
        assert_eq!(host.active_id(), Some(b));
        assert!(!host.session(a).unwrap().is_attached());
        assert!(host.session(b).unwrap().is_attached());
        assert_eq!(platform.input.handler_count(), 1);

        host.activate(a).await.unwrap();
        assert!(host.session(a).unwrap().is_attached());
        assert!(!host.session(b).unwrap().is_attached());
        assert_eq!(platform.input.handler_count(), 1);
    }

    #[tokio::test]
    async fn test_open_same_file_activates_it() {
        let platform = Platform::new();
        let (mut host, buffers) = host(&platform);
        let a = host.open("a.txt").await.unwrap();
        host.open("b.txt").await.unwrap();

        assert_eq!(host.open("a.txt").await.unwrap(), a);
        assert_eq!(host.tab_count(), 2);
        assert_eq!(host.active_id(), Some(a));
        assert_eq!(buffer(&buffers, "a.txt").loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unsupported_file_type() {
        let mut platform = Platform::new();
        platform.settings = Arc::new(AppSettings::from_preferences(Preferences {
            autosave: false,
            supported_file_types: vec![".txt".to_string()],
        }));
        let (mut host, _) = host(&platform);

        let result = host.open("image.png").await;
        assert!(matches!(result, Err(HostError::UnsupportedFileType(_))));
        assert_eq!(host.tab_count(), 0);
        assert!(host.open("notes.TXT").await.is_ok());
    }

    #[tokio::test]
    async fn test_failed_open_keeps_previous_active() {
        let platform = Platform::new();
        let (mut host, _) = host(&platform);
        let a = host.open("a.txt").await.unwrap();

        let result = host.open("missing.txt").await;
        assert!(matches!(result, Err(HostError::Session(SessionError::Load(_)))));
        assert_eq!(host.tab_count(), 1);
        assert_eq!(host.active_id(), Some(a));
        assert!(host.session(a).unwrap().is_attached());
        assert_eq!(platform.registrations(), 2);
        assert_eq!(host.recent_files().len(), 1);
    }

    #[tokio::test]
    async fn test_dispatch_to_active_session() {
        let platform = Platform::new();
        let (mut host, buffers) = host(&platform);
        assert!(matches!(
            host.dispatch(EditorCommand::Undo).await,
            Err(HostError::NoActiveSession)
        ));

        host.open("a.txt").await.unwrap();
        host.dispatch(EditorCommand::Undo).await.unwrap();
        assert_eq!(host.dispatch_tag("Bogus").await.unwrap(), None);
        assert_eq!(
            host.dispatch_tag("SelectAll").await.unwrap(),
            Some(CommandOutcome::Applied)
        );

        let a = buffer(&buffers, "a.txt");
        assert_eq!(a.undos.load(Ordering::SeqCst), 1);
        assert_eq!(a.select_alls.load(Ordering::SeqCst), 1);

        a.emit(false);
        assert_eq!(host.dirty_sessions(), vec![0]);
        assert_eq!(
            host.dispatch_tag("Save").await.unwrap(),
            Some(CommandOutcome::Save(SaveOutcome::Saved))
        );
        assert!(!host.has_unsaved_changes());
    }

    #[tokio::test]
    async fn test_close_active_promotes_first_tab() {
        let platform = Platform::new();
        let (mut host, buffers) = host(&platform);
        let a = host.open("a.txt").await.unwrap();
        let b = host.open("b.txt").await.unwrap();
        let c = host.open("c.txt").await.unwrap();
        buffer(&buffers, "c.txt").emit(false);

        let report = host.close(c).await.unwrap();
        assert!(matches!(report.final_save, Some(Ok(SaveOutcome::Saved))));
        assert_eq!(host.active_id(), Some(a));
        assert!(host.session(a).unwrap().is_attached());
        assert!(!host.session(b).unwrap().is_attached());
        assert_eq!(platform.input.handler_count(), 1);

        assert!(matches!(host.close(c).await, Err(HostError::UnknownSession(_))));
        let ids: Vec<SessionId> = host.tabs().iter().map(|tab| tab.id).collect();
        assert_eq!(ids, vec![a, b]);
    }

    #[tokio::test]
    async fn test_close_all() {
        let platform = Platform::new();
        let (mut host, buffers) = host(&platform);
        host.open("a.txt").await.unwrap();
        host.open("b.txt").await.unwrap();
        buffer(&buffers, "a.txt").emit(false);

        let reports = host.close_all().await;
        assert_eq!(reports.len(), 2);
        assert!(reports[0].1.final_save.is_some());
        assert!(reports[1].1.final_save.is_none());
        assert_eq!(host.tab_count(), 0);
        assert!(host.active_id().is_none());
        assert_eq!(platform.registrations(), 0);
        assert_eq!(buffer(&buffers, "a.txt").write_count(), 1);
    }

    #[tokio::test]
    async fn test_suspend_and_resume() {
        let platform = Platform::new();
        let (mut host, _) = host(&platform);
        let a = host.open("a.txt").await.unwrap();

        host.suspend();
        assert!(host.is_suspended());
        assert_eq!(platform.registrations(), 0);

        // Files opened in the background load without hooking in
        let b = host.open("b.txt").await.unwrap();
        assert!(host.session(b).unwrap().is_loaded());
        assert!(!host.session(b).unwrap().is_attached());

        host.resume().await.unwrap();
        assert!(host.session(b).unwrap().is_attached());
        assert!(!host.session(a).unwrap().is_attached());
    }

    #[tokio::test]
    async fn test_tabs_info() {
        let platform = Platform::new();
        let (mut host, buffers) = host(&platform);
        host.open("dir/a.txt").await.unwrap();
        host.open("b.txt").await.unwrap();
        buffer(&buffers, "dir/a.txt").emit(false);

        let tabs = host.tabs();
        assert_eq!(tabs.len(), 2);
        assert_eq!(tabs[0].name, "a.txt");
        assert_eq!(tabs[0].path, PathBuf::from("dir/a.txt"));
        assert!(tabs[0].is_dirty);
        assert!(!tabs[0].is_active);
        assert!(tabs[1].is_active);
    }

    #[tokio::test]
    async fn test_recent_files_are_bounded() {
        let platform = Platform::new();
        let (mut host, _) = host(&platform);
        for i in 0..12 {
            host.open(format!("file{}.txt", i)).await.unwrap();
        }
        host.open("file3.txt").await.unwrap();

        let recent = host.recent_files();
        assert_eq!(recent.len(), MAX_RECENT_FILES);
        assert_eq!(recent[0], PathBuf::from("file11.txt"));
        assert!(!recent.contains(&PathBuf::from("file0.txt")));

        host.clear_recent_files();
        assert!(host.recent_files().is_empty());
    }
}
