// Host controller: owns the buffers and drives scheduler, engine, relay
// and console from a single thread.

use std::time::Instant;

use playground_config::{HostShortcut, KeyCombo, KeyValueStore, Keybindings, ProjectStore, Settings};
use playground_core::{
    validate_project_name, ExternalLibrary, ExternalLibraryList, LibraryError, LibraryPreset, LogEntry, Project,
    ProjectError, RunId, RunState, SourceBuffers, SourceKind, SourceTriple, Template, PRESETS,
};
use playground_protocol::{ConsoleSnapshot, ConsoleView, PresetView};

use crate::console::ConsolePanel;
use crate::document::compose_export_document;
use crate::engine::{ExecuteOutcome, ExecutionEngine, Sandbox};
use crate::relay::RelayReceiver;
use crate::scheduler::{RunScheduler, SchedulerAction};

/// Modal dialog the host page should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialog {
    Save,
    Open,
}

impl Dialog {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialog::Save => "save",
            Dialog::Open => "open",
        }
    }
}

/// What one `tick` (or explicit run) did.
#[derive(Debug, Default)]
pub struct TickReport {
    /// Console entries received since the last tick
    pub entries: Vec<LogEntry>,
    /// Run the sandbox was rebuilt for, if any
    pub rebuilt: Option<RunId>,
    pub autosaved: bool,
}

pub struct Playground<K: KeyValueStore, S: Sandbox> {
    buffers: SourceBuffers,
    libraries: ExternalLibraryList,
    scheduler: RunScheduler,
    engine: ExecutionEngine,
    console: ConsolePanel,
    relay: RelayReceiver,
    projects: ProjectStore<K>,
    sandbox: S,
    keybindings: Keybindings,
    dialog: Option<Dialog>,
}

impl<K: KeyValueStore, S: Sandbox> Playground<K, S> {
    /// Restores the last active sources once; falls back to the starter
    /// template when nothing usable was autosaved.
    pub fn new(settings: &Settings, store: K, sandbox: S, relay: RelayReceiver) -> Self {
        let projects = ProjectStore::new(store);
        let triple = match projects.restore_last_active() {
            Some(triple) => {
                log::info!("Restored last active sources");
                triple
            }
            None => Template::starter().triple(),
        };
        Self {
            buffers: SourceBuffers::from_triple(triple),
            libraries: ExternalLibraryList::new(),
            scheduler: RunScheduler::new(settings.auto_run, settings.debounce(), settings.autosave_delay()),
            engine: ExecutionEngine::new(),
            console: ConsolePanel::with_view_len(settings.console_view_len),
            relay,
            projects,
            sandbox,
            keybindings: settings.keybindings(),
            dialog: None,
        }
    }

    /// Queue the initial render.
    pub fn start(&mut self, now: Instant) {
        self.scheduler.on_start(now);
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn buffers(&self) -> &SourceBuffers {
        &self.buffers
    }

    pub fn libraries(&self) -> &[ExternalLibrary] {
        self.libraries.as_slice()
    }

    pub fn console(&self) -> &ConsolePanel {
        &self.console
    }

    pub fn run_state(&self) -> &RunState {
        self.engine.state()
    }

    pub fn auto_run(&self) -> bool {
        self.scheduler.auto_run()
    }

    pub fn sandbox(&self) -> &S {
        &self.sandbox
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.next_deadline()
    }

    // ------------------------------------------------------------------
    // Editing and running
    // ------------------------------------------------------------------

    /// Replace one buffer. Returns false when the text is unchanged.
    pub fn edit(&mut self, kind: SourceKind, text: impl Into<String>, now: Instant) -> bool {
        let changed = self.buffers.set(kind, text);
        if changed {
            self.scheduler.on_edit(now);
        }
        changed
    }

    /// Explicit Run: clear, new run id, rebuild even if nothing changed.
    pub fn run_now(&mut self) -> TickReport {
        let mut report = TickReport::default();
        let actions = self.scheduler.on_manual_run(self.buffers.snapshot(), self.libraries.as_slice());
        self.apply(actions, &mut report);
        report
    }

    pub fn set_auto_run(&mut self, enabled: bool, now: Instant) {
        self.scheduler.on_auto_run_toggle(enabled, now);
    }

    /// Drain relayed console messages, then fire whatever timers are due.
    pub fn tick(&mut self, now: Instant) -> TickReport {
        let mut report = TickReport::default();

        let entries = self.relay.drain();
        self.console.extend(entries.iter().cloned());
        report.entries = entries;

        let actions = self.scheduler.poll(now, &self.buffers.snapshot(), self.libraries.as_slice());
        self.apply(actions, &mut report);
        report
    }

    fn apply(&mut self, actions: Vec<SchedulerAction>, report: &mut TickReport) {
        for action in actions {
            match action {
                SchedulerAction::ClearConsole => self.console.clear(),
                SchedulerAction::Commit(commit) => {
                    self.relay.begin_run(commit.run);
                    match self.engine.execute(&commit, &mut self.sandbox) {
                        Ok(ExecuteOutcome::Rebuilt { run }) => {
                            log::info!("Run {}: sandbox rebuilt", run);
                            self.scheduler.committed(&commit);
                            report.rebuilt = Some(run);
                        }
                        Ok(ExecuteOutcome::Skipped { run }) => {
                            // The running document still belongs to `run`.
                            self.scheduler.committed(&commit);
                            self.relay.begin_run(run);
                        }
                        Err(e) => {
                            log::warn!("Run {}: {}", commit.run, e);
                            self.relay.begin_run(self.engine.state().run);
                        }
                    }
                }
                SchedulerAction::Autosave(triple) => match self.projects.write_last_active(&triple) {
                    Ok(()) => report.autosaved = true,
                    Err(e) => log::warn!("Autosave failed: {}", e),
                },
            }
        }
    }

    pub fn clear_console(&mut self) {
        self.console.clear();
    }

    pub fn console_page_up(&mut self) {
        self.console.scroll_page_up();
    }

    pub fn console_page_down(&mut self) {
        self.console.scroll_page_down();
    }

    pub fn console_to_start(&mut self) {
        self.console.scroll_to_start();
    }

    /// Jump to the newest output and follow it again.
    pub fn console_to_end(&mut self) {
        self.console.scroll_to_end();
    }

    // ------------------------------------------------------------------
    // External libraries
    // ------------------------------------------------------------------

    pub fn add_library(&mut self, url: &str, now: Instant) -> Result<(), LibraryError> {
        let library = self.libraries.add(url)?;
        log::info!("Added library {}", library.url);
        self.scheduler.on_libraries_changed(now);
        Ok(())
    }

    pub fn add_preset(&mut self, name: &str, now: Instant) -> Result<(), LibraryError> {
        let library = self.libraries.add_preset(name)?;
        log::info!("Added preset library {}", library.url);
        self.scheduler.on_libraries_changed(now);
        Ok(())
    }

    pub fn remove_library(&mut self, index: usize, now: Instant) -> Result<ExternalLibrary, LibraryError> {
        let removed = self.libraries.remove(index)?;
        log::info!("Removed library {}", removed.url);
        self.scheduler.on_libraries_changed(now);
        Ok(removed)
    }

    pub fn presets(&self) -> Vec<PresetView> {
        PRESETS
            .iter()
            .map(|p: &LibraryPreset| PresetView {
                name: p.name.to_string(),
                added: self.libraries.preset_added(p.name),
            })
            .collect()
    }

    // ------------------------------------------------------------------
    // Templates and projects
    // ------------------------------------------------------------------

    /// Replace all three buffers with a built-in template.
    pub fn apply_template(&mut self, name: &str, now: Instant) -> Option<&'static Template> {
        let template = Template::find(name)?;
        self.replace_sources(&template.triple(), now);
        log::info!("Applied template '{}'", template.name);
        Some(template)
    }

    /// Overwrite the buffers, as if every one of them had been edited.
    pub fn replace_sources(&mut self, triple: &SourceTriple, now: Instant) {
        self.buffers.apply(triple);
        self.scheduler.on_edit(now);
    }

    pub fn save_project(&mut self, name: &str) -> Result<Project, ProjectError> {
        let project = self.projects.save(name, &self.buffers.snapshot())?;
        if self.dialog == Some(Dialog::Save) {
            self.dialog = None;
        }
        Ok(project)
    }

    /// Load a project into the buffers. Unsaved edits are discarded.
    pub fn load_project(&mut self, name: &str, now: Instant) -> Result<Project, ProjectError> {
        let project = self.projects.load(name)?;
        self.replace_sources(&project.triple, now);
        if self.dialog == Some(Dialog::Open) {
            self.dialog = None;
        }
        log::info!("Loaded project '{}'", project.name);
        Ok(project)
    }

    pub fn delete_project(&mut self, name: &str) -> Result<(), ProjectError> {
        self.projects.delete(name)
    }

    pub fn project_names(&self) -> &[String] {
        self.projects.names()
    }

    /// The standalone `project.html` for the current buffers.
    pub fn export(&self) -> String {
        compose_export_document(&self.buffers.snapshot(), self.libraries.as_slice())
    }

    // ------------------------------------------------------------------
    // Keyboard and dialogs
    // ------------------------------------------------------------------

    pub fn keybindings(&self) -> &Keybindings {
        &self.keybindings
    }

    /// Handle a key chord. Returns the shortcut it triggered, if reserved.
    pub fn handle_key(&mut self, combo: &KeyCombo) -> Option<HostShortcut> {
        let shortcut = self.keybindings.resolve(combo)?;
        match shortcut {
            HostShortcut::Run => {
                self.run_now();
            }
            HostShortcut::Save => self.open_save_dialog(),
            HostShortcut::Open => self.open_load_dialog(),
        }
        Some(shortcut)
    }

    pub fn dialog(&self) -> Option<Dialog> {
        self.dialog
    }

    pub fn open_save_dialog(&mut self) {
        self.dialog = Some(Dialog::Save);
    }

    /// Opens the load dialog with a freshly read project list.
    pub fn open_load_dialog(&mut self) {
        self.projects.refresh_names();
        self.dialog = Some(Dialog::Open);
    }

    /// The page dismissed whichever dialog was open.
    pub fn close_dialog(&mut self) {
        self.dialog = None;
    }

    /// Whether the save dialog's confirm action should be enabled.
    pub fn can_confirm_save(&self, name: &str) -> bool {
        validate_project_name(name).is_ok()
    }

    // ------------------------------------------------------------------
    // Host page state
    // ------------------------------------------------------------------

    pub fn console_snapshot(&self) -> ConsoleSnapshot {
        ConsoleSnapshot {
            run: self.relay.current_run().0,
            auto_run: self.scheduler.auto_run(),
            rows: self.console.rows(),
            view: ConsoleView {
                info: self.console.scroll_info(),
                can_page_up: self.console.can_scroll_up(),
                can_page_down: self.console.can_scroll_down(),
                pinned: self.console.is_pinned(),
            },
            errors: self.console.error_count(),
            warnings: self.console.warning_count(),
            libraries: self.libraries.iter().map(|l| l.url.clone()).collect(),
            presets: self.presets(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SandboxError;
    use crate::relay::relay_channel;
    use playground_config::MemoryStore;
    use playground_core::RunId;
    use playground_protocol::{MessageKind, RelayMessage};
    use std::cell::Cell;
    use std::rc::Rc;
    use std::time::Duration;

    #[derive(Default)]
    struct NullSandbox {
        runs: Vec<RunId>,
    }

    impl Sandbox for NullSandbox {
        fn replace_document(&mut self, run: RunId, _document: String) -> Result<(), SandboxError> {
            self.runs.push(run);
            Ok(())
        }
    }

    /// Fails every replace while `down` is set.
    struct FlakySandbox {
        down: Rc<Cell<bool>>,
        runs: Vec<RunId>,
    }

    impl Sandbox for FlakySandbox {
        fn replace_document(&mut self, run: RunId, _document: String) -> Result<(), SandboxError> {
            if self.down.get() {
                return Err(SandboxError::Unavailable("page closed".into()));
            }
            self.runs.push(run);
            Ok(())
        }
    }

    fn playground(store: MemoryStore) -> Playground<MemoryStore, NullSandbox> {
        let (_tx, rx) = relay_channel();
        Playground::new(&Settings::default(), store, NullSandbox::default(), rx)
    }

    #[test]
    fn test_starts_from_starter_template() {
        let pg = playground(MemoryStore::new());
        assert_eq!(pg.buffers().snapshot(), Template::starter().triple());
    }

    #[test]
    fn test_restores_last_active_once() {
        let mut store = MemoryStore::new();
        store
            .set("ide_last_project", r#"{"html":"<b>back</b>","css":"","js":""}"#.to_string())
            .unwrap();
        let pg = playground(store);
        assert_eq!(pg.buffers().get(SourceKind::Markup), "<b>back</b>");
    }

    #[test]
    fn test_save_confirm_gating() {
        let mut pg = playground(MemoryStore::new());
        pg.open_save_dialog();
        assert!(!pg.can_confirm_save("  "));
        assert!(pg.can_confirm_save("demo"));
        assert_eq!(pg.save_project(" ").unwrap_err(), ProjectError::BlankName);
        assert_eq!(pg.dialog(), Some(Dialog::Save));
        pg.save_project("demo").unwrap();
        assert_eq!(pg.dialog(), None);
    }

    #[test]
    fn test_reserved_keys() {
        let mut pg = playground(MemoryStore::new());
        let save = KeyCombo::parse("ctrl+s").unwrap();
        assert_eq!(pg.handle_key(&save), Some(HostShortcut::Save));
        assert_eq!(pg.dialog(), Some(Dialog::Save));

        let open = KeyCombo::parse("ctrl+o").unwrap();
        assert_eq!(pg.handle_key(&open), Some(HostShortcut::Open));
        assert_eq!(pg.dialog(), Some(Dialog::Open));

        let run = KeyCombo::parse("ctrl+enter").unwrap();
        assert_eq!(pg.handle_key(&run), Some(HostShortcut::Run));
        assert_eq!(pg.sandbox().runs, vec![RunId(1)]);

        assert_eq!(pg.handle_key(&KeyCombo::parse("ctrl+k").unwrap()), None);
    }

    #[test]
    fn test_preset_buttons_reflect_list() {
        let mut pg = playground(MemoryStore::new());
        let now = Instant::now();
        pg.add_preset("jquery", now).unwrap();
        let presets = pg.presets();
        assert!(presets.iter().any(|p| p.name == "jQuery" && p.added));
        assert!(presets.iter().filter(|p| p.added).count() == 1);
        assert!(matches!(pg.add_preset("jQuery", now), Err(LibraryError::DuplicatePreset(_))));
    }

    #[test]
    fn test_failed_rebuild_retried_on_next_debounce() {
        let down = Rc::new(Cell::new(true));
        let sandbox = FlakySandbox {
            down: Rc::clone(&down),
            runs: Vec::new(),
        };
        let (_tx, rx) = relay_channel();
        let mut pg = Playground::new(&Settings::default(), MemoryStore::new(), sandbox, rx);
        let t0 = Instant::now();

        pg.edit(SourceKind::Script, "same()", t0);
        assert_eq!(pg.tick(t0 + Duration::from_millis(800)).rebuilt, None);

        // Edit and revert: the content is what failed to run before.
        down.set(false);
        pg.edit(SourceKind::Script, "other()", t0 + Duration::from_millis(900));
        pg.edit(SourceKind::Script, "same()", t0 + Duration::from_millis(950));
        assert_eq!(pg.tick(t0 + Duration::from_millis(1750)).rebuilt, Some(RunId(2)));
        assert_eq!(pg.sandbox().runs, vec![RunId(2)]);
    }

    #[test]
    fn test_cancelled_dialog_is_forgotten() {
        let mut pg = playground(MemoryStore::new());
        pg.handle_key(&KeyCombo::parse("ctrl+o").unwrap());
        assert_eq!(pg.dialog(), Some(Dialog::Open));
        pg.close_dialog();
        assert_eq!(pg.dialog(), None);
    }

    #[test]
    fn test_console_paging_reaches_older_groups() {
        let settings = Settings {
            console_view_len: 2,
            ..Settings::default()
        };
        let (tx, rx) = relay_channel();
        let mut pg = Playground::new(&settings, MemoryStore::new(), NullSandbox::default(), rx);
        let t0 = Instant::now();
        pg.start(t0);
        pg.tick(t0);
        for i in 0..5 {
            tx.send(RunId(1), RelayMessage::new(MessageKind::Log, vec![i.to_string()]));
        }
        pg.tick(t0);

        let snap = pg.console_snapshot();
        assert_eq!(snap.rows.iter().map(|r| r.message[0].as_str()).collect::<Vec<_>>(), vec!["3", "4"]);
        assert_eq!(snap.view.info.as_deref(), Some("4-5 of 5"));
        assert!(snap.view.pinned && snap.view.can_page_up && !snap.view.can_page_down);

        pg.console_to_start();
        let snap = pg.console_snapshot();
        assert_eq!(snap.rows[0].message, vec!["0"]);
        assert!(!snap.view.pinned);

        pg.console_page_down();
        assert_eq!(pg.console_snapshot().rows[0].message, vec!["2"]);
        pg.console_page_up();
        assert_eq!(pg.console_snapshot().rows[0].message, vec!["0"]);

        pg.console_to_end();
        let snap = pg.console_snapshot();
        assert!(snap.view.pinned);
        assert_eq!(snap.rows.last().unwrap().message, vec!["4"]);
    }
}
