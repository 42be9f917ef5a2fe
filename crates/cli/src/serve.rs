// `playground serve`: the controller loop behind the preview host.
//
// One thread owns the Playground. The source directory is mirrored both
// ways: external edits are fed in as buffer edits, and buffer replacements
// (template, load) are written back out. The HTTP listener reaches the
// controller only through the preview bridge.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use playground_config::{KeyCombo, KeyValueStore, Settings};
use playground_core::{LogEntry, LogKind, TEMPLATES};
use playground_engine::{relay_channel, Playground, TickReport};
use playground_protocol::{CommandReply, HostCommand, ProjectList};

use crate::exit_codes::EXIT_PREVIEW_BIND;
use crate::preview::{
    render_host_page, PreviewBridgeHandle, PreviewRequest, PreviewSandbox, PreviewServer, PreviewServerConfig,
    SharedPreview,
};
use crate::workspace::{SourceWatcher, Workspace, WorkspaceError};
use crate::CliError;

pub struct ServeOptions {
    pub workspace: Workspace,
    pub host: String,
    pub port: u16,
    pub open_browser: bool,
}

/// Playground plus the on-disk mirror of its buffers.
pub struct Controller<K: KeyValueStore> {
    playground: Playground<K, PreviewSandbox>,
    workspace: Workspace,
    watcher: SourceWatcher,
    /// Buffer revision last known to match the files on disk
    synced_rev: u64,
    requests: mpsc::Receiver<PreviewRequest>,
}

impl<K: KeyValueStore> Controller<K> {
    /// Files already in the directory win over the autosaved sources;
    /// an empty directory is seeded from the buffers.
    pub fn new(
        settings: &Settings,
        store: K,
        workspace: Workspace,
        preview: SharedPreview,
        relay: playground_engine::RelayReceiver,
        requests: mpsc::Receiver<PreviewRequest>,
        now: Instant,
    ) -> Result<Self, WorkspaceError> {
        let mut playground = Playground::new(settings, store, PreviewSandbox::new(preview), relay);
        if workspace.has_sources() {
            let triple = workspace.read()?;
            playground.replace_sources(&triple, now);
            log::info!("Editing sources in {}", workspace.root().display());
        } else {
            workspace.write(&playground.buffers().snapshot())?;
            log::info!("Wrote starting sources to {}", workspace.root().display());
        }
        playground.start(now);

        let watcher = SourceWatcher::new(workspace.clone());
        let synced_rev = playground.buffers().revision();
        Ok(Self {
            playground,
            workspace,
            watcher,
            synced_rev,
            requests,
        })
    }

    pub fn playground(&self) -> &Playground<K, PreviewSandbox> {
        &self.playground
    }

    /// One pass of the loop: pick up file edits, answer the page, fire
    /// due timers, then mirror replaced buffers back to disk.
    pub fn step(&mut self, now: Instant) -> TickReport {
        for (kind, text) in self.watcher.poll() {
            if self.playground.edit(kind, text, now) {
                log::debug!("{} changed on disk", kind.file_name());
            }
        }
        self.synced_rev = self.playground.buffers().revision();

        while let Ok(request) = self.requests.try_recv() {
            self.answer(request, now);
        }

        let report = self.playground.tick(now);
        echo_entries(&report.entries);
        self.sync_files();
        report
    }

    /// How long the loop may sleep before the next step.
    pub fn idle_for(&self, now: Instant, poll: Duration) -> Duration {
        match self.playground.next_deadline() {
            Some(deadline) => deadline.saturating_duration_since(now).min(poll),
            None => poll,
        }
    }

    fn answer(&mut self, request: PreviewRequest, now: Instant) {
        // A failed send means the HTTP client gave up waiting.
        match request {
            PreviewRequest::Console { reply } => {
                let _ = reply.send(self.playground.console_snapshot());
            }
            PreviewRequest::Command { command, reply } => {
                let result = self.command(command, now);
                let _ = reply.send(result);
            }
            PreviewRequest::Projects { reply } => {
                let _ = reply.send(ProjectList {
                    projects: self.playground.project_names().to_vec(),
                    templates: TEMPLATES.iter().map(|t| t.name.to_string()).collect(),
                });
            }
            PreviewRequest::Export { reply } => {
                let _ = reply.send(self.playground.export());
            }
        }
    }

    fn command(&mut self, command: HostCommand, now: Instant) -> CommandReply {
        match command {
            HostCommand::Run => {
                self.playground.run_now();
                CommandReply::ok()
            }
            HostCommand::Clear => {
                self.playground.clear_console();
                CommandReply::ok()
            }
            HostCommand::SetAutoRun { enabled } => {
                self.playground.set_auto_run(enabled, now);
                CommandReply::ok()
            }
            HostCommand::Save { name } => match self.playground.save_project(&name) {
                Ok(_) => CommandReply::ok(),
                Err(e) => CommandReply::error(e.to_string()),
            },
            HostCommand::Load { name } => match self.playground.load_project(&name, now) {
                Ok(_) => CommandReply::ok(),
                Err(e) => CommandReply::error(e.to_string()),
            },
            HostCommand::Delete { name } => match self.playground.delete_project(&name) {
                Ok(()) => CommandReply::ok(),
                Err(e) => CommandReply::error(e.to_string()),
            },
            HostCommand::ApplyTemplate { name } => match self.playground.apply_template(&name, now) {
                Some(_) => CommandReply::ok(),
                None => CommandReply::error(format!("unknown template '{}'", name)),
            },
            HostCommand::AddLibrary { url } => match self.playground.add_library(&url, now) {
                Ok(()) => CommandReply::ok(),
                Err(e) => CommandReply::error(e.to_string()),
            },
            HostCommand::AddPreset { name } => match self.playground.add_preset(&name, now) {
                Ok(()) => CommandReply::ok(),
                Err(e) => CommandReply::error(e.to_string()),
            },
            HostCommand::RemoveLibrary { index } => match self.playground.remove_library(index, now) {
                Ok(_) => CommandReply::ok(),
                Err(e) => CommandReply::error(e.to_string()),
            },
            HostCommand::Key { combo } => {
                let combo = match KeyCombo::parse(&combo) {
                    Ok(c) => c,
                    Err(e) => return CommandReply::error(e.to_string()),
                };
                if self.playground.handle_key(&combo).is_none() {
                    return CommandReply::ok();
                }
                match self.playground.dialog() {
                    Some(dialog) => CommandReply::open_dialog(dialog.as_str()),
                    None => CommandReply::ok(),
                }
            }
            HostCommand::CloseDialog => {
                self.playground.close_dialog();
                CommandReply::ok()
            }
            HostCommand::ConsolePageUp => {
                self.playground.console_page_up();
                CommandReply::ok()
            }
            HostCommand::ConsolePageDown => {
                self.playground.console_page_down();
                CommandReply::ok()
            }
            HostCommand::ConsoleToStart => {
                self.playground.console_to_start();
                CommandReply::ok()
            }
            HostCommand::ConsoleToEnd => {
                self.playground.console_to_end();
                CommandReply::ok()
            }
        }
    }

    fn sync_files(&mut self) {
        let revision = self.playground.buffers().revision();
        if revision == self.synced_rev {
            return;
        }
        match self.workspace.write(&self.playground.buffers().snapshot()) {
            Ok(()) => self.watcher.mark_synced(),
            Err(e) => log::warn!("Cannot write sources: {}", e),
        }
        self.synced_rev = revision;
    }

    /// Send the page's pending requests away unanswered. Must run before
    /// the server is stopped.
    fn close(self) {
        drop(self.requests);
    }
}

/// Mirror console entries to the terminal.
fn echo_entries(entries: &[LogEntry]) {
    for entry in entries {
        match entry.kind {
            LogKind::Log => log::info!(target: "console", "[{}] {}", entry.timestamp, entry.text()),
            LogKind::Warn => log::warn!(target: "console", "[{}] {}", entry.timestamp, entry.text()),
            LogKind::Error => log::error!(target: "console", "[{}] {}", entry.timestamp, entry.text()),
        }
    }
}

/// Run the preview host until `shutdown` is set.
pub fn serve<K: KeyValueStore>(
    settings: &Settings,
    store: K,
    options: ServeOptions,
    shutdown: &AtomicBool,
) -> Result<(), CliError> {
    let (relay_tx, relay_rx) = relay_channel();
    let (request_tx, request_rx) = mpsc::channel();
    let preview = SharedPreview::new();

    let mut controller = Controller::new(
        settings,
        store,
        options.workspace,
        preview.clone(),
        relay_rx,
        request_rx,
        Instant::now(),
    )
    .map_err(CliError::workspace)?;

    let mut server = PreviewServer::new();
    let addr = server
        .start(PreviewServerConfig {
            host: options.host,
            port: options.port,
            page: render_host_page(&settings.keybindings(), settings.poll_ms),
            preview,
            relay: relay_tx,
            bridge: PreviewBridgeHandle::new(request_tx),
        })
        .map_err(|e| CliError {
            code: EXIT_PREVIEW_BIND,
            message: e.to_string(),
            hint: Some("pick another address with --port".to_string()),
        })?;

    let url = format!("http://{}/", addr);
    eprintln!("Preview at {}", url);
    if !controller.playground().auto_run() {
        log::info!("Auto-run is off; press Run to rebuild");
    }
    if controller.watcher.is_event_driven() {
        log::debug!("Watching {} for changes", controller.workspace.root().display());
    } else {
        log::info!("Polling {} for changes", controller.workspace.root().display());
    }
    if options.open_browser {
        if let Err(e) = open::that(&url) {
            log::warn!("Cannot open browser: {}", e);
        }
    }

    let poll = settings.poll_interval();
    while !shutdown.load(Ordering::SeqCst) {
        let now = Instant::now();
        controller.step(now);
        thread::sleep(controller.idle_for(Instant::now(), poll));
    }

    controller.close();
    server.stop();
    Ok(())
}
