// End-to-end tests for the `playground` binary.
//
// Every invocation gets its own storage and settings file so nothing
// touches the user's real data directory.
//
// Run with: cargo test -p playground-cli --test cli_tests

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

struct Env {
    dir: tempfile::TempDir,
}

impl Env {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn path(&self, rel: &str) -> std::path::PathBuf {
        self.dir.path().join(rel)
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut command = Command::new(env!("CARGO_BIN_EXE_playground"));
        command
            .args(args)
            .current_dir(self.dir.path())
            .env("PLAYGROUND_STORAGE", self.path("storage.json"))
            .env("PLAYGROUND_SETTINGS", self.path("settings.json"))
            .env("RUST_LOG", "warn");
        command
    }

    fn run(&self, args: &[&str]) -> Output {
        self.command(args).output().expect("run playground")
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn write_sources(dir: &Path, html: &str, css: &str, js: &str) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join("index.html"), html).unwrap();
    fs::write(dir.join("style.css"), css).unwrap();
    fs::write(dir.join("script.js"), js).unwrap();
}

// ===========================================================================
// new / templates / presets
// ===========================================================================

#[test]
fn new_scaffolds_starter_template() {
    let env = Env::new();
    let out = env.run(&["new", "site"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let html = fs::read_to_string(env.path("site/index.html")).unwrap();
    assert!(html.contains("Hello"), "starter markup: {}", html);
    assert!(env.path("site/style.css").is_file());
    assert!(env.path("site/script.js").is_file());
}

#[test]
fn new_refuses_to_overwrite_without_force() {
    let env = Env::new();
    assert!(env.run(&["new", "site"]).status.success());

    let out = env.run(&["new", "site", "--template", "Blank"]);
    assert_eq!(out.status.code(), Some(4));
    assert!(stderr(&out).contains("--force"));

    let out = env.run(&["new", "site", "--template", "Blank", "--force"]);
    assert!(out.status.success());
    assert_eq!(fs::read_to_string(env.path("site/index.html")).unwrap(), "");
}

#[test]
fn unknown_template_is_usage_error() {
    let env = Env::new();
    let out = env.run(&["new", "site", "--template", "Nope"]);
    assert_eq!(out.status.code(), Some(2));
}

#[cfg(target_os = "linux")]
#[test]
fn unwritable_stdout_is_general_error() {
    let env = Env::new();
    let full = fs::OpenOptions::new().write(true).open("/dev/full").unwrap();
    let status = env.command(&["templates"]).stdout(full).status().unwrap();
    assert_eq!(status.code(), Some(1));
}

#[test]
fn templates_and_presets_are_listed() {
    let env = Env::new();
    let templates = stdout(&env.run(&["templates"]));
    assert!(templates.lines().any(|l| l.starts_with("Blank")));

    let presets = stdout(&env.run(&["presets"]));
    assert!(presets.contains("https://code.jquery.com/jquery-3.7.1.min.js"));
}

// ===========================================================================
// build / export
// ===========================================================================

#[test]
fn build_prints_sandbox_document() {
    let env = Env::new();
    write_sources(&env.path("site"), "<p>hi</p>", "p{color:red}", "console.log('x')");
    let out = env.run(&["build", "site", "--preset", "jQuery"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    let doc = stdout(&out);
    let shim = doc.find("playground-console").unwrap();
    let library = doc.find("jquery-3.7.1.min.js").unwrap();
    let user = doc.find("console.log('x')").unwrap();
    assert!(shim < library && library < user);
}

#[test]
fn export_writes_project_html() {
    let env = Env::new();
    write_sources(&env.path("site"), "<p>hi</p>", "p{color:red}", "go()");
    let out = env.run(&["export", "site"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    let doc = fs::read_to_string(env.path("site/project.html")).unwrap();
    let style = doc.find("p{color:red}").unwrap();
    let markup = doc.find("<p>hi</p>").unwrap();
    let script = doc.find("go()").unwrap();
    assert!(style < markup && markup < script);
    assert!(!doc.contains("playground-console"));
}

#[test]
fn export_of_empty_directory_fails() {
    let env = Env::new();
    fs::create_dir_all(env.path("empty")).unwrap();
    let out = env.run(&["export", "empty", "-o", "-"]);
    assert_eq!(out.status.code(), Some(5));
}

#[test]
fn bad_library_url_is_rejected() {
    let env = Env::new();
    write_sources(&env.path("site"), "", "", "");
    let out = env.run(&["build", "site", "--lib", "not a url"]);
    assert_eq!(out.status.code(), Some(2));
}

// ===========================================================================
// save / load / list / delete
// ===========================================================================

#[test]
fn project_lifecycle() {
    let env = Env::new();
    write_sources(&env.path("site"), "<h1>A</h1>", "h1{}", "a()");

    assert!(env.run(&["save", "alpha", "site"]).status.success());
    let list = stdout(&env.run(&["list"]));
    assert!(list.starts_with("alpha\t"), "list: {}", list);

    let out = env.run(&["load", "alpha", "copy"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_eq!(fs::read_to_string(env.path("copy/script.js")).unwrap(), "a()");

    let stored: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(env.path("storage.json")).unwrap()).unwrap();
    let record: serde_json::Value = serde_json::from_str(stored["ide_project_alpha"].as_str().unwrap()).unwrap();
    assert_eq!(record["html"], "<h1>A</h1>");
    assert!(record["savedAt"].is_string());

    assert!(env.run(&["delete", "alpha"]).status.success());
    assert_eq!(stdout(&env.run(&["list"])), "");
}

#[test]
fn blank_name_and_missing_project() {
    let env = Env::new();
    write_sources(&env.path("site"), "", "", "");

    let out = env.run(&["save", "   ", "site"]);
    assert_eq!(out.status.code(), Some(10));

    let out = env.run(&["load", "ghost", "copy"]);
    assert_eq!(out.status.code(), Some(11));
    assert!(stderr(&out).contains("playground list"));

    let out = env.run(&["delete", "ghost"]);
    assert_eq!(out.status.code(), Some(11));
}
