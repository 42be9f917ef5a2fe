// Playground CLI - scaffold, build and export sources, manage saved
// projects, and host the live preview

mod exit_codes;
mod preview;
mod serve;
mod workspace;

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::AtomicBool;

use clap::{Parser, Subcommand};

use playground_config::{FileStore, KeyValueStore, MemoryStore, ProjectStore, Settings};
use playground_core::{ExternalLibraryList, LibraryError, ProjectError, RunId, Template, PRESETS, TEMPLATES};
use playground_engine::{compose_export_document, compose_sandbox_document, EXPORT_FILE_NAME};

use exit_codes::{library_exit_code, project_exit_code, workspace_exit_code, EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE};
use serve::{serve, ServeOptions};
use workspace::{Workspace, WorkspaceError};

/// Never set by the binary: `serve` runs until the process is interrupted.
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

#[derive(Parser)]
#[command(name = "playground")]
#[command(about = "Live HTML/CSS/JS playground")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Storage file for saved projects and the autosave slot
    #[arg(long, global = true, env = "PLAYGROUND_STORAGE", value_name = "FILE")]
    storage: Option<PathBuf>,

    /// Settings file (default: <config_dir>/playground/settings.json)
    #[arg(long, global = true, env = "PLAYGROUND_SETTINGS", value_name = "FILE")]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch a source directory and serve the live preview
    #[command(after_help = "\
Examples:
  playground serve
  playground serve site --port 8080 --no-open
  playground serve site --no-auto-run")]
    Serve {
        /// Directory holding index.html, style.css and script.js
        #[arg(default_value = ".")]
        dir: PathBuf,

        /// Address to bind
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (0 picks a free port)
        #[arg(long)]
        port: Option<u16>,

        /// Do not open a browser
        #[arg(long)]
        no_open: bool,

        /// Only rebuild on explicit Run
        #[arg(long)]
        no_auto_run: bool,

        /// Keep projects and autosave in memory only
        #[arg(long)]
        ephemeral: bool,
    },

    /// Create a source directory from a template
    #[command(after_help = "\
Examples:
  playground new site
  playground new site --template Blank
  playground new site --template Counter --force")]
    New {
        dir: PathBuf,

        /// Template name (see `playground templates`)
        #[arg(long, short = 't')]
        template: Option<String>,

        /// Overwrite existing sources
        #[arg(long)]
        force: bool,
    },

    /// List built-in templates
    Templates,

    /// List library presets
    Presets,

    /// Print the sandbox document (console shim and error wrapper included)
    Build {
        #[arg(default_value = ".")]
        dir: PathBuf,

        /// Output file (omit or - for stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        #[command(flatten)]
        libraries: LibraryArgs,
    },

    /// Write a standalone project.html
    #[command(after_help = "\
Examples:
  playground export site
  playground export site -o dist/index.html --preset jQuery
  playground export site -o - | wc -c")]
    Export {
        #[arg(default_value = ".")]
        dir: PathBuf,

        /// Output file (default: DIR/project.html, - for stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        #[command(flatten)]
        libraries: LibraryArgs,
    },

    /// Save a directory's sources as a named project
    Save {
        name: String,

        #[arg(default_value = ".")]
        dir: PathBuf,
    },

    /// Write a saved project into a directory
    Load {
        name: String,

        #[arg(default_value = ".")]
        dir: PathBuf,

        /// Overwrite existing sources
        #[arg(long)]
        force: bool,
    },

    /// Delete a saved project
    Delete { name: String },

    /// List saved projects
    List,
}

#[derive(clap::Args)]
struct LibraryArgs {
    /// External script or stylesheet URL. Repeatable.
    #[arg(long = "lib", value_name = "URL")]
    urls: Vec<String>,

    /// Library preset by name. Repeatable.
    #[arg(long = "preset", value_name = "NAME")]
    presets: Vec<String>,
}

impl LibraryArgs {
    /// Presets first, then freeform URLs, each in the order given.
    fn resolve(&self) -> Result<ExternalLibraryList, CliError> {
        let mut list = ExternalLibraryList::new();
        for name in &self.presets {
            list.add_preset(name).map_err(CliError::library)?;
        }
        for url in &self.urls {
            list.add(url).map_err(CliError::library)?;
        }
        Ok(list)
    }
}

fn long_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nbuild:   debug",
            "\ntarget:  ", env!("TARGET"),
            "\nprotocol: 1",
        )
    } else {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nbuild:   release",
            "\ntarget:  ", env!("TARGET"),
            "\nprotocol: 1",
        )
    }
}

/// Terminal logging. `log` records from the library crates reach the
/// subscriber through its tracing-log bridge.
fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    let settings = match &cli.settings {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    };

    let result = match cli.command {
        None => {
            // No subcommand = show help
            eprintln!("Usage: playground <command> [options]");
            eprintln!("       playground --help for more information");
            Ok(())
        }
        Some(Commands::Serve {
            dir,
            host,
            port,
            no_open,
            no_auto_run,
            ephemeral,
        }) => {
            let mut settings = settings;
            if no_auto_run {
                settings.auto_run = false;
            }
            let options = ServeOptions {
                workspace: Workspace::new(dir),
                host: host.unwrap_or_else(|| settings.host.clone()),
                port: port.unwrap_or(settings.port),
                open_browser: settings.open_browser && !no_open,
            };
            if ephemeral {
                serve(&settings, MemoryStore::new(), options, &SHUTDOWN)
            } else {
                serve(&settings, open_store(cli.storage), options, &SHUTDOWN)
            }
        }
        Some(Commands::New { dir, template, force }) => cmd_new(dir, template, force),
        Some(Commands::Templates) => cmd_templates(),
        Some(Commands::Presets) => cmd_presets(),
        Some(Commands::Build { dir, output, libraries }) => cmd_build(dir, output, libraries),
        Some(Commands::Export { dir, output, libraries }) => cmd_export(dir, output, libraries),
        Some(Commands::Save { name, dir }) => cmd_save(ProjectStore::new(open_store(cli.storage)), name, dir),
        Some(Commands::Load { name, dir, force }) => {
            cmd_load(ProjectStore::new(open_store(cli.storage)), name, dir, force)
        }
        Some(Commands::Delete { name }) => cmd_delete(ProjectStore::new(open_store(cli.storage)), name),
        Some(Commands::List) => cmd_list(ProjectStore::new(open_store(cli.storage))),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

fn open_store(path: Option<PathBuf>) -> FileStore {
    match path {
        Some(path) => FileStore::open(path),
        None => FileStore::open_default(),
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn usage(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn workspace(err: WorkspaceError) -> Self {
        let hint = match &err {
            WorkspaceError::AlreadyExists(_) => Some("pass --force to overwrite".to_string()),
            WorkspaceError::Empty(_) => Some("create one with `playground new DIR`".to_string()),
            WorkspaceError::Io { .. } => None,
        };
        Self { code: workspace_exit_code(&err), message: err.to_string(), hint }
    }

    pub fn project(err: ProjectError) -> Self {
        let hint = match &err {
            ProjectError::NotFound(_) => Some("see `playground list`".to_string()),
            _ => None,
        };
        Self { code: project_exit_code(&err), message: err.to_string(), hint }
    }

    pub fn library(err: LibraryError) -> Self {
        let hint = match &err {
            LibraryError::UnknownPreset(_) => Some("see `playground presets`".to_string()),
            _ => None,
        };
        Self { code: library_exit_code(&err), message: err.to_string(), hint }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

fn write_stdout(text: &str) -> Result<(), CliError> {
    let mut out = io::stdout().lock();
    out.write_all(text.as_bytes())
        .and_then(|_| out.flush())
        .map_err(|e| CliError {
            code: EXIT_ERROR,
            message: format!("cannot write stdout: {e}"),
            hint: None,
        })
}

// ============================================================================
// new / templates / presets
// ============================================================================

fn cmd_new(dir: PathBuf, template: Option<String>, force: bool) -> Result<(), CliError> {
    let template = match template {
        Some(name) => Template::find(&name).ok_or_else(|| {
            CliError::usage(format!("unknown template '{}'", name)).with_hint("see `playground templates`")
        })?,
        None => Template::starter(),
    };
    let workspace = Workspace::new(&dir);
    workspace.scaffold(&template.triple(), force).map_err(CliError::workspace)?;
    eprintln!("Created {} from '{}'", dir.display(), template.name);
    Ok(())
}

fn cmd_templates() -> Result<(), CliError> {
    let width = TEMPLATES.iter().map(|t| t.name.len()).max().unwrap_or(0);
    let mut text = String::new();
    for template in TEMPLATES {
        text.push_str(&format!("{:<width$}  {}\n", template.name, template.description, width = width));
    }
    write_stdout(&text)
}

fn cmd_presets() -> Result<(), CliError> {
    let width = PRESETS.iter().map(|p| p.name.len()).max().unwrap_or(0);
    let mut text = String::new();
    for preset in PRESETS {
        text.push_str(&format!("{:<width$}  {}\n", preset.name, preset.url, width = width));
    }
    write_stdout(&text)
}

// ============================================================================
// build / export
// ============================================================================

/// Write to `output`, or stdout when it is absent or `-`.
fn write_document(document: &str, output: Option<PathBuf>) -> Result<(), CliError> {
    let Some(path) = output.filter(|p| p.as_os_str() != "-") else {
        return write_stdout(document);
    };
    let (dir, name) = match (path.parent(), path.file_name()) {
        (Some(dir), Some(name)) => (dir.to_path_buf(), name.to_string_lossy().into_owned()),
        _ => return Err(CliError::usage(format!("invalid output path {}", path.display()))),
    };
    let written = Workspace::new(dir).write_file(&name, document).map_err(CliError::workspace)?;
    eprintln!("Wrote {}", written.display());
    Ok(())
}

fn cmd_build(dir: PathBuf, output: Option<PathBuf>, libraries: LibraryArgs) -> Result<(), CliError> {
    let triple = Workspace::new(dir).read().map_err(CliError::workspace)?;
    let libraries = libraries.resolve()?;
    // Standalone build: nothing relays its console, so it is never a live run.
    let document = compose_sandbox_document(RunId::default(), &triple, libraries.as_slice());
    write_document(&document, output)
}

fn cmd_export(dir: PathBuf, output: Option<PathBuf>, libraries: LibraryArgs) -> Result<(), CliError> {
    let workspace = Workspace::new(&dir);
    let triple = workspace.read().map_err(CliError::workspace)?;
    let libraries = libraries.resolve()?;
    let document = compose_export_document(&triple, libraries.as_slice());
    write_document(&document, Some(output.unwrap_or_else(|| dir.join(EXPORT_FILE_NAME))))
}

// ============================================================================
// save / load / delete / list
// ============================================================================

fn cmd_save<K: KeyValueStore>(mut store: ProjectStore<K>, name: String, dir: PathBuf) -> Result<(), CliError> {
    let triple = Workspace::new(dir).read().map_err(CliError::workspace)?;
    store.save(&name, &triple).map_err(CliError::project)?;
    Ok(())
}

fn cmd_load<K: KeyValueStore>(store: ProjectStore<K>, name: String, dir: PathBuf, force: bool) -> Result<(), CliError> {
    let project = store.load(&name).map_err(CliError::project)?;
    Workspace::new(&dir)
        .scaffold(&project.triple, force)
        .map_err(CliError::workspace)?;
    eprintln!("Loaded project '{}' into {}", project.name, dir.display());
    Ok(())
}

fn cmd_delete<K: KeyValueStore>(mut store: ProjectStore<K>, name: String) -> Result<(), CliError> {
    store.delete(&name).map_err(CliError::project)
}

fn cmd_list<K: KeyValueStore>(store: ProjectStore<K>) -> Result<(), CliError> {
    let mut text = String::new();
    for name in store.names() {
        let saved_at = store
            .load(name)
            .ok()
            .and_then(|p| p.saved_at)
            .map(|t| t.to_rfc3339())
            .unwrap_or_default();
        text.push_str(&format!("{}\t{}\n", name, saved_at));
    }
    write_stdout(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_args_resolve_in_order() {
        let args = LibraryArgs {
            urls: vec!["https://cdn.example.com/a.js".into()],
            presets: vec!["jquery".into()],
        };
        let list = args.resolve().unwrap();
        let urls: Vec<&str> = list.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(urls, vec!["https://code.jquery.com/jquery-3.7.1.min.js", "https://cdn.example.com/a.js"]);
    }

    #[test]
    fn test_bad_library_is_usage_error() {
        let args = LibraryArgs {
            urls: vec!["ftp://example.com/x.js".into()],
            presets: vec![],
        };
        assert_eq!(args.resolve().unwrap_err().code, EXIT_USAGE);
    }

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_save_load_through_memory_store() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        Workspace::new(&src)
            .write(&playground_core::SourceTriple::new("<p>x</p>", "p{}", "go()"))
            .unwrap();

        let mut store = ProjectStore::new(MemoryStore::new());
        store
            .save("demo", &Workspace::new(&src).read().unwrap())
            .unwrap();

        let dst = dir.path().join("dst");
        cmd_load(store, "demo".into(), dst.clone(), false).unwrap();
        assert_eq!(Workspace::new(&dst).read().unwrap().script, "go()");
    }
}
