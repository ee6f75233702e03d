//! Develop - headless document session host.
//!
//! Usage: develop [--settings FILE] [FILE...]
//!
//! Commands are read from stdin, one per line; `help` lists them.

use develop_core::Selection;
use develop_session::{
    AppSettings, BufferFactory, EditorCommand, FileHandle, KeyChord, KeyEvent, LocalEventSource,
    PlatformHooks, RopeBuffer, SessionHost, SessionId, ShareRequest, TextBuffer,
};
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::io::{AsyncBufReadExt, BufReader};

const DEFAULT_SETTINGS: &str = "settings.json";

const HELP: &str = "\
open PATH            open a file in a new tab
switch ID            activate a tab
tabs                 list open tabs
recent               list recently opened files
insert TEXT          type TEXT over the selection
delete               delete the selection or previous character
select START END     select a character range
cmd TAG              run a toolbar command (Undo, Redo, SelectAll, ClearSelection, Save)
key CHORD            press a key, e.g. ctrl+z
share                request a share payload
autosave on|off      toggle autosave
dialog on|off        simulate a modal dialog
suspend | resume     move the application to the background and back
close [ID]           close a tab (the active one by default)
quit                 close everything and exit";

type Buffers = Arc<Mutex<HashMap<PathBuf, Arc<RopeBuffer>>>>;

struct Args {
    settings: PathBuf,
    files: Vec<PathBuf>,
}

fn parse_args() -> Args {
    let mut settings = PathBuf::from(DEFAULT_SETTINGS);
    let mut files = Vec::new();
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--settings" {
            match args.next() {
                Some(path) => settings = PathBuf::from(path),
                None => log::warn!("--settings needs a path, using {}", DEFAULT_SETTINGS),
            }
        } else {
            files.push(PathBuf::from(arg));
        }
    }
    Args { settings, files }
}

/// Line-oriented front end over a [`SessionHost`].
struct Shell {
    host: SessionHost,
    buffers: Buffers,
    input: Arc<LocalEventSource<KeyEvent>>,
    share: Arc<LocalEventSource<ShareRequest>>,
}

enum Flow {
    Continue,
    Quit,
}

impl Shell {
    fn new(settings: AppSettings) -> Self {
        let input = Arc::new(LocalEventSource::new());
        let share = Arc::new(LocalEventSource::new());
        let hooks = PlatformHooks::new(input.clone(), share.clone());

        let buffers: Buffers = Arc::default();
        let factory: BufferFactory = {
            let buffers = buffers.clone();
            Arc::new(move |file: &FileHandle| -> Arc<dyn TextBuffer> {
                let buffer = Arc::new(RopeBuffer::new());
                buffers
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(file.path().to_path_buf(), buffer.clone());
                buffer
            })
        };

        Self {
            host: SessionHost::new(Arc::new(settings), hooks, factory),
            buffers,
            input,
            share,
        }
    }

    fn active_buffer(&self) -> Option<Arc<RopeBuffer>> {
        let session = self.host.active_session()?;
        self.buffers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(session.file().path())
            .cloned()
    }

    async fn open(&mut self, path: &Path) {
        match self.host.open(path).await {
            Ok(id) => println!("[{}] {}", id, path.display()),
            Err(e) => {
                log::error!("Failed to open '{}': {}", path.display(), e);
                self.prune_buffers();
            }
        }
    }

    /// Drops buffers whose session is gone.
    fn prune_buffers(&self) {
        let open: Vec<PathBuf> = self.host.tabs().into_iter().map(|tab| tab.path).collect();
        self.buffers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|path, _| open.contains(path));
    }

    async fn close(&mut self, id: Option<SessionId>) {
        let result = match id {
            Some(id) => self.host.close(id).await,
            None => self.host.close_active().await,
        };
        if result.is_ok() {
            self.prune_buffers();
        }
        match result {
            Ok(report) if report.saved_cleanly() => println!("closed"),
            Ok(_) => println!("closed, unsaved changes were lost"),
            Err(e) => println!("{}", e),
        }
    }

    async fn run_line(&mut self, line: &str) -> Flow {
        let line = line.trim_start().trim_end_matches(['\r', '\n']);
        // `raw` keeps its whitespace for `insert`
        let (word, raw) = line.split_once(' ').unwrap_or((line, ""));
        let rest = raw.trim();

        match word {
            "" => {}
            "help" => print_help(),
            "quit" | "exit" => return Flow::Quit,
            "open" if !rest.is_empty() => self.open(Path::new(rest)).await,
            "switch" => match rest.parse::<SessionId>() {
                Ok(id) => {
                    if let Err(e) = self.host.activate(id).await {
                        println!("{}", e);
                    }
                }
                Err(_) => println!("usage: switch ID"),
            },
            "tabs" => {
                for tab in self.host.tabs() {
                    let marker = if tab.is_active { '*' } else { ' ' };
                    let dirty = if tab.is_dirty { " (modified)" } else { "" };
                    println!("{}[{}] {}{}", marker, tab.id, tab.name, dirty);
                }
            }
            "recent" => {
                for path in self.host.recent_files() {
                    println!("{}", path.display());
                }
            }
            "insert" => self.edit(word, raw),
            "delete" | "select" => self.edit(word, rest),
            "cmd" => match self.host.dispatch_tag(rest).await {
                Ok(Some(outcome)) => println!("{:?}", outcome),
                Ok(None) => println!("unknown command {:?}", rest),
                Err(e) => println!("{}", e),
            },
            "key" => match parse_chord(rest) {
                Some(chord) => {
                    let mut event = KeyEvent::key_down(chord);
                    self.input.emit(&mut event);
                    println!("{}", if event.handled { "handled" } else { "ignored" });
                }
                None => println!("usage: key [ctrl+]KEY"),
            },
            "share" => {
                let mut request = ShareRequest::new();
                self.share.emit(&mut request);
                match request.into_payload() {
                    Some(payload) => println!("{:?}", payload),
                    None => println!("nothing to share"),
                }
            }
            "autosave" | "dialog" => match parse_switch(rest) {
                Some(on) if word == "autosave" => self.host.settings().set_autosave(on),
                Some(on) => self.host.settings().set_dialog_shown(on),
                None => println!("usage: {} on|off", word),
            },
            "suspend" => self.host.suspend(),
            "resume" => {
                if let Err(e) = self.host.resume().await {
                    println!("{}", e);
                }
            }
            "close" if rest.is_empty() => self.close(None).await,
            "close" => match rest.parse::<SessionId>() {
                Ok(id) => self.close(Some(id)).await,
                Err(_) => println!("usage: close [ID]"),
            },
            _ => match EditorCommand::from_tag(word) {
                Some(command) => match self.host.dispatch(command).await {
                    Ok(outcome) => println!("{:?}", outcome),
                    Err(e) => println!("{}", e),
                },
                None => println!("unknown command, try help"),
            },
        }
        Flow::Continue
    }

    fn edit(&self, word: &str, rest: &str) {
        let Some(buffer) = self.active_buffer() else {
            println!("no open document");
            return;
        };
        match word {
            "insert" => buffer.insert(rest),
            "delete" => buffer.delete_backward(),
            _ => {
                let bounds: Vec<usize> = rest
                    .split_whitespace()
                    .filter_map(|n| n.parse().ok())
                    .collect();
                match bounds.as_slice() {
                    [start, end] => buffer.set_selection(Selection::with_range(*start, *end)),
                    _ => println!("usage: select START END"),
                }
            }
        }
    }

    async fn shutdown(&mut self) {
        for (id, report) in self.host.close_all().await {
            if !report.saved_cleanly() {
                log::warn!("Session {} closed with unsaved changes", id);
            }
        }
    }
}

fn print_help() {
    println!("{}", HELP);
    println!();
    for command in EditorCommand::ALL {
        let accelerator = command
            .accelerator()
            .map(|key| format!("ctrl+{}", key.to_ascii_lowercase()))
            .unwrap_or_default();
        println!("{:<16} {:<8} {}", command.tag(), accelerator, command.description());
    }
}

fn parse_chord(text: &str) -> Option<KeyChord> {
    let lower = text.to_ascii_lowercase();
    let (ctrl, key) = match lower.strip_prefix("ctrl+") {
        Some(key) => (true, key),
        None => (false, lower.as_str()),
    };
    let mut chars = key.chars();
    let key = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    Some(if ctrl {
        KeyChord::ctrl(key)
    } else {
        KeyChord::plain(key)
    })
}

fn parse_switch(text: &str) -> Option<bool> {
    match text {
        "on" | "true" => Some(true),
        "off" | "false" => Some(false),
        _ => None,
    }
}

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting Develop");

    let args = parse_args();
    let settings = match AppSettings::load(&args.settings).await {
        Ok(settings) => settings,
        Err(e) => {
            log::error!("{}, using defaults", e);
            AppSettings::default()
        }
    };

    let mut shell = Shell::new(settings);
    for path in &args.files {
        shell.open(path).await;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if let Flow::Quit = shell.run_line(&line).await {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                log::error!("Failed to read input: {}", e);
                break;
            }
        }
    }

    shell.shutdown().await;
    log::info!("Develop exited");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chord() {
        assert_eq!(parse_chord("ctrl+z"), Some(KeyChord::ctrl('z')));
        assert_eq!(parse_chord("Ctrl+S"), Some(KeyChord::ctrl('s')));
        assert_eq!(parse_chord("a"), Some(KeyChord::plain('a')));
        assert_eq!(parse_chord("ctrl+"), None);
        assert_eq!(parse_chord("ctrl+zz"), None);
    }

    #[test]
    fn test_parse_switch() {
        assert_eq!(parse_switch("on"), Some(true));
        assert_eq!(parse_switch("off"), Some(false));
        assert_eq!(parse_switch("maybe"), None);
    }

    #[tokio::test]
    async fn test_shell_edit_and_save() {
        let path = env::temp_dir().join(format!("develop-shell-{}.txt", std::process::id()));
        tokio::fs::write(&path, "hello").await.unwrap();

        let mut shell = Shell::new(AppSettings::default());
        shell.open(&path).await;
        assert_eq!(shell.host.tab_count(), 1);

        shell.run_line("select 5 5").await;
        // Everything after the first space is typed, leading spaces included
        shell.run_line("insert  world").await;
        assert!(shell.host.has_unsaved_changes());

        shell.run_line("key ctrl+s").await;
        if let Some(session) = shell.host.active_session() {
            session.flush().await;
        }
        assert!(!shell.host.has_unsaved_changes());
        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "hello world");

        shell.run_line("close").await;
        assert_eq!(shell.host.tab_count(), 0);
        assert!(shell.buffers.lock().unwrap().is_empty());
        let _ = tokio::fs::remove_file(&path).await;
    }
}
