// Source directory: index.html, style.css, script.js on disk

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::time::SystemTime;

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};

use playground_core::{SourceKind, SourceTriple};

#[derive(Debug)]
pub enum WorkspaceError {
    Io { path: PathBuf, message: String },
    /// Refusing to overwrite existing sources.
    AlreadyExists(PathBuf),
    /// None of the three source files exist.
    Empty(PathBuf),
}

impl fmt::Display for WorkspaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkspaceError::Io { path, message } => write!(f, "{}: {}", path.display(), message),
            WorkspaceError::AlreadyExists(path) => write!(f, "{} already contains sources", path.display()),
            WorkspaceError::Empty(path) => {
                write!(f, "{} has no index.html, style.css or script.js", path.display())
            }
        }
    }
}

impl std::error::Error for WorkspaceError {}

fn io_error(path: &Path, e: std::io::Error) -> WorkspaceError {
    WorkspaceError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

/// A directory mirroring the three buffers as files.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, kind: SourceKind) -> PathBuf {
        self.root.join(kind.file_name())
    }

    /// Whether any of the three files exists.
    pub fn has_sources(&self) -> bool {
        SourceKind::ALL.iter().any(|k| self.path(*k).is_file())
    }

    /// Read the triple. Missing files read as empty; at least one must exist.
    pub fn read(&self) -> Result<SourceTriple, WorkspaceError> {
        if !self.has_sources() {
            return Err(WorkspaceError::Empty(self.root.clone()));
        }
        Ok(SourceTriple::new(
            self.read_one(SourceKind::Markup)?,
            self.read_one(SourceKind::Style)?,
            self.read_one(SourceKind::Script)?,
        ))
    }

    pub fn read_one(&self, kind: SourceKind) -> Result<String, WorkspaceError> {
        let path = self.path(kind);
        match fs::read_to_string(&path) {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(io_error(&path, e)),
        }
    }

    /// Write all three files, creating the directory if needed.
    pub fn write(&self, triple: &SourceTriple) -> Result<(), WorkspaceError> {
        fs::create_dir_all(&self.root).map_err(|e| io_error(&self.root, e))?;
        for kind in SourceKind::ALL {
            let path = self.path(kind);
            fs::write(&path, triple.get(kind)).map_err(|e| io_error(&path, e))?;
        }
        Ok(())
    }

    /// Write sources into a fresh directory. Existing sources are only
    /// replaced with `force`.
    pub fn scaffold(&self, triple: &SourceTriple, force: bool) -> Result<(), WorkspaceError> {
        if self.has_sources() && !force {
            return Err(WorkspaceError::AlreadyExists(self.root.clone()));
        }
        self.write(triple)
    }

    /// Write an arbitrary file next to the sources.
    pub fn write_file(&self, name: &str, contents: &str) -> Result<PathBuf, WorkspaceError> {
        fs::create_dir_all(&self.root).map_err(|e| io_error(&self.root, e))?;
        let path = self.root.join(name);
        fs::write(&path, contents).map_err(|e| io_error(&path, e))?;
        Ok(path)
    }
}

/// What the filesystem watcher reported.
#[derive(Debug)]
enum WatchSignal {
    Changed(SourceKind),
    /// The backend lost track; every file is re-read.
    Rescan,
}

fn kind_for(path: &Path) -> Option<SourceKind> {
    let name = path.file_name()?;
    SourceKind::ALL.into_iter().find(|k| name == k.file_name())
}

fn slot(kind: SourceKind) -> usize {
    match kind {
        SourceKind::Markup => 0,
        SourceKind::Style => 1,
        SourceKind::Script => 2,
    }
}

/// Watch the directory itself (not the files) so editors that save by
/// renaming a temp file over the original are still seen.
fn start_fs_watcher(root: &Path) -> Result<(RecommendedWatcher, Receiver<WatchSignal>), String> {
    let (tx, rx) = mpsc::channel();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) => {
            if !(event.kind.is_create() || event.kind.is_modify()) {
                return;
            }
            for kind in event.paths.iter().filter_map(|p| kind_for(p)) {
                let _ = tx.send(WatchSignal::Changed(kind));
            }
        }
        Err(_) => {
            let _ = tx.send(WatchSignal::Rescan);
        }
    })
    .map_err(|e| format!("failed to initialize filesystem watcher: {e}"))?;

    watcher
        .watch(root, RecursiveMode::NonRecursive)
        .map_err(|e| format!("failed to watch {}: {e}", root.display()))?;

    Ok((watcher, rx))
}

/// Detects external edits to the three source files.
///
/// Event-driven through `notify`; when no watcher can be started (or it
/// dies) it falls back to comparing modification times on every poll.
/// Either way a file is only reported when its contents differ from what
/// was last seen or written.
#[derive(Debug)]
pub struct SourceWatcher {
    workspace: Workspace,
    events: Option<(RecommendedWatcher, Receiver<WatchSignal>)>,
    /// Contents last reported or written
    seen: [Option<String>; 3],
    /// Modification times, for the polling fallback
    mtimes: [Option<SystemTime>; 3],
}

impl SourceWatcher {
    /// Start watching; the current state of the files counts as seen.
    pub fn new(workspace: Workspace) -> Self {
        let events = match start_fs_watcher(workspace.root()) {
            Ok(events) => Some(events),
            Err(e) => {
                log::warn!("{}; polling for changes instead", e);
                None
            }
        };
        Self::with_events(workspace, events)
    }

    /// Modification-time polling only.
    pub fn polling(workspace: Workspace) -> Self {
        Self::with_events(workspace, None)
    }

    fn with_events(workspace: Workspace, events: Option<(RecommendedWatcher, Receiver<WatchSignal>)>) -> Self {
        let mut watcher = Self {
            workspace,
            events,
            seen: [None, None, None],
            mtimes: [None; 3],
        };
        watcher.mark_synced();
        watcher
    }

    pub fn is_event_driven(&self) -> bool {
        self.events.is_some()
    }

    fn mtime(&self, kind: SourceKind) -> Option<SystemTime> {
        fs::metadata(self.workspace.path(kind)).and_then(|m| m.modified()).ok()
    }

    fn current(&self, kind: SourceKind) -> Option<String> {
        if !self.workspace.path(kind).is_file() {
            return None;
        }
        match self.workspace.read_one(kind) {
            Ok(text) => Some(text),
            Err(e) => {
                log::warn!("Cannot read {}: {}", kind.file_name(), e);
                None
            }
        }
    }

    /// Record the files as they are now, e.g. after writing them ourselves.
    pub fn mark_synced(&mut self) {
        for kind in SourceKind::ALL {
            self.seen[slot(kind)] = self.current(kind);
            self.mtimes[slot(kind)] = self.mtime(kind);
        }
    }

    /// Files named by pending events, or None when no watcher is running.
    fn take_events(&mut self) -> Option<[bool; 3]> {
        let (_, rx) = self.events.as_ref()?;
        let mut dirty = [false; 3];
        loop {
            match rx.try_recv() {
                Ok(WatchSignal::Changed(kind)) => dirty[slot(kind)] = true,
                Ok(WatchSignal::Rescan) => dirty = [true; 3],
                Err(TryRecvError::Empty) => return Some(dirty),
                Err(TryRecvError::Disconnected) => break,
            }
        }
        log::warn!("Filesystem watcher stopped; polling for changes instead");
        self.events = None;
        None
    }

    /// Files whose modification time moved since the last sweep.
    fn sweep(&mut self) -> [bool; 3] {
        let mut dirty = [false; 3];
        for kind in SourceKind::ALL {
            let current = self.mtime(kind);
            if current.is_some() && current != self.mtimes[slot(kind)] {
                self.mtimes[slot(kind)] = current;
                dirty[slot(kind)] = true;
            }
        }
        dirty
    }

    /// Files whose contents changed since the last poll.
    ///
    /// A file that disappeared is not reported; its buffer keeps the last
    /// contents until the file comes back.
    pub fn poll(&mut self) -> Vec<(SourceKind, String)> {
        let dirty = match self.take_events() {
            Some(dirty) => dirty,
            None => self.sweep(),
        };
        let mut changed = Vec::new();
        for kind in SourceKind::ALL {
            if !dirty[slot(kind)] {
                continue;
            }
            let Some(text) = self.current(kind) else {
                continue;
            };
            if self.seen[slot(kind)].as_deref() == Some(text.as_str()) {
                continue;
            }
            self.seen[slot(kind)] = Some(text.clone());
            changed.push((kind, text));
        }
        changed
    }
}
