//! Sandbox document composition and the standalone export artifact.
//!
//! Sandbox layout, in order: style, console shim, library tags (insertion
//! order), markup, then the script inside a try/catch wrapper. User text is
//! inserted verbatim except that closing `</script` / `</style` sequences are
//! escaped so user code cannot terminate its own element early.

use playground_core::{ExternalLibrary, LibraryKind, RunId, SourceTriple};

use crate::shim::console_shim;

/// File name of the exported single-page artifact.
pub const EXPORT_FILE_NAME: &str = "project.html";

/// Build the document executed in the sandbox for `run`. The run id is
/// baked into the console shim so every message names its document.
pub fn compose_sandbox_document(run: RunId, triple: &SourceTriple, libraries: &[ExternalLibrary]) -> String {
    let mut doc = String::new();
    doc.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    doc.push_str("<style>\n");
    doc.push_str(&escape_closing_tag(&triple.style, "style"));
    doc.push_str("\n</style>\n");
    doc.push_str("<script>\n");
    doc.push_str(&console_shim(run));
    doc.push_str("\n</script>\n");
    for library in libraries {
        doc.push_str(&library_tag(library));
        doc.push('\n');
    }
    doc.push_str("</head>\n<body>\n");
    doc.push_str(&triple.markup);
    doc.push_str("\n<script>\n");

    // The wrapper's two header lines precede the first user line.
    let script_line = doc.matches('\n').count() + 3;
    doc.push_str(&format!("window.__playgroundScriptLine = {};\n", script_line));
    doc.push_str("try {\n");
    doc.push_str(&escape_closing_tag(&triple.script, "script"));
    doc.push_str("\n} catch (err) {\n  window.__playgroundReport(err);\n}\n");
    doc.push_str("</script>\n</body>\n</html>\n");
    doc
}

/// Build the self-contained page written by export: style, markup, script.
///
/// No console shim and no error wrapper; the page runs as the user wrote it.
pub fn compose_export_document(triple: &SourceTriple, libraries: &[ExternalLibrary]) -> String {
    let mut doc = String::new();
    doc.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    doc.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    doc.push_str("<title>Playground Project</title>\n");
    for library in libraries {
        doc.push_str(&library_tag(library));
        doc.push('\n');
    }
    doc.push_str("<style>\n");
    doc.push_str(&escape_closing_tag(&triple.style, "style"));
    doc.push_str("\n</style>\n</head>\n<body>\n");
    doc.push_str(&triple.markup);
    doc.push_str("\n<script>\n");
    doc.push_str(&escape_closing_tag(&triple.script, "script"));
    doc.push_str("\n</script>\n</body>\n</html>\n");
    doc
}

/// `<script src>` or `<link rel="stylesheet">` for one library.
pub fn library_tag(library: &ExternalLibrary) -> String {
    let url = escape_attr(&library.url);
    match library.kind {
        LibraryKind::Script => format!("<script src=\"{}\"></script>", url),
        LibraryKind::Stylesheet => format!("<link rel=\"stylesheet\" href=\"{}\">", url),
    }
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Turn every case-insensitive `</tag` into `<\/tag`.
fn escape_closing_tag(text: &str, tag: &str) -> String {
    let needle = format!("</{}", tag);
    // ASCII lowercasing keeps byte offsets identical.
    let lower = text.to_ascii_lowercase();
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for (pos, _) in lower.match_indices(&needle) {
        out.push_str(&text[last..pos + 1]);
        out.push('\\');
        last = pos + 1;
    }
    out.push_str(&text[last..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lib(url: &str) -> ExternalLibrary {
        ExternalLibrary::parse(url).unwrap()
    }

    #[test]
    fn test_sandbox_document_order() {
        let triple = SourceTriple::new("<h1 id=\"t\">Hi</h1>", "h1{color:red}", "console.log('go')");
        let libs = [
            lib("https://cdn.example.com/a.js"),
            lib("https://cdn.example.com/b.css"),
        ];
        let doc = compose_sandbox_document(RunId(1), &triple, &libs);

        let style = doc.find("h1{color:red}").unwrap();
        let shim = doc.find("playground-console").unwrap();
        let lib_a = doc.find("<script src=\"https://cdn.example.com/a.js\"></script>").unwrap();
        let lib_b = doc.find("<link rel=\"stylesheet\" href=\"https://cdn.example.com/b.css\">").unwrap();
        let markup = doc.find("<h1 id=\"t\">Hi</h1>").unwrap();
        let script = doc.find("console.log('go')").unwrap();

        assert!(style < shim);
        assert!(shim < lib_a && lib_a < lib_b);
        assert!(lib_b < markup && markup < script);
        assert!(doc[..script].ends_with("try {\n"));
        assert!(doc[script..].contains("window.__playgroundReport(err)"));
    }

    #[test]
    fn test_document_names_its_run() {
        let triple = SourceTriple::new("", "", "go()");
        assert!(compose_sandbox_document(RunId(12), &triple, &[]).contains("var RUN = 12;"));
        assert!(compose_sandbox_document(RunId(13), &triple, &[]).contains("var RUN = 13;"));
    }

    #[test]
    fn test_script_line_marker_points_at_user_code() {
        let triple = SourceTriple::new("<p>a</p>\n<p>b</p>", "", "first();\nsecond();");
        let doc = compose_sandbox_document(RunId(1), &triple, &[]);
        let marker = doc
            .lines()
            .find_map(|l| l.strip_prefix("window.__playgroundScriptLine = "))
            .unwrap();
        let line: usize = marker.trim_end_matches(';').parse().unwrap();
        assert_eq!(doc.lines().nth(line - 1), Some("first();"));
    }

    #[test]
    fn test_closing_tags_escaped() {
        let triple = SourceTriple::new("", "a{}</STYLE>", "let s = '</script><b>';");
        let doc = compose_sandbox_document(RunId(1), &triple, &[]);
        assert!(doc.contains("a{}<\\/STYLE>"));
        assert!(doc.contains("let s = '<\\/script><b>';"));
        // Only the document's own elements close.
        assert_eq!(doc.matches("</style>").count(), 1);
    }

    #[test]
    fn test_library_url_attribute_escaped() {
        let tag = library_tag(&lib("https://cdn.example.com/x.js?a=1&b=\"2\""));
        assert_eq!(tag, "<script src=\"https://cdn.example.com/x.js?a=1&amp;b=&quot;2&quot;\"></script>");
    }

    #[test]
    fn test_export_has_no_shim() {
        let triple = SourceTriple::new("<main></main>", "main{}", "run();");
        let doc = compose_export_document(&triple, &[lib("https://cdn.example.com/lib.js")]);
        assert!(!doc.contains("playground-console"));
        assert!(!doc.contains("__playgroundReport"));
        let style = doc.find("main{}").unwrap();
        let markup = doc.find("<main></main>").unwrap();
        let script = doc.find("run();").unwrap();
        assert!(style < markup && markup < script);
        assert!(doc.contains("https://cdn.example.com/lib.js"));
    }

    #[test]
    fn test_escape_handles_multibyte_text() {
        assert_eq!(escape_closing_tag("é</script>ü", "script"), "é<\\/script>ü");
        assert_eq!(escape_closing_tag("nothing here", "script"), "nothing here");
    }
}
