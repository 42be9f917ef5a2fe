//! Console interception shim injected ahead of user code.
//!
//! Runs inside the sandboxed document. Every `console.log/info/warn/error`
//! call is posted to the parent window as a tagged relay message and then
//! forwarded to the original console method. Arguments are serialized for
//! display: strings as-is, other primitives via `String()`, objects as JSON,
//! and anything `JSON.stringify` throws on becomes the placeholder.
//!
//! Uncaught errors and unhandled rejections are posted as `error` records
//! carrying line/column. The script wrapper reports synchronous throws
//! through `window.__playgroundReport`, so they are posted exactly once.
//!
//! Every post carries the document's run id and a per-document sequence
//! number. Arguments are clipped before posting so a huge value still
//! arrives as one (truncated) message.

use playground_core::RunId;
use playground_protocol::{
    MAX_ARGUMENTS_LEN, MAX_ARGUMENT_LEN, RELAY_SOURCE, TRUNCATED_MARKER, UNSERIALIZABLE_PLACEHOLDER,
};

const SHIM_TEMPLATE: &str = r#"(function () {
  var SOURCE = __SOURCE__;
  var PLACEHOLDER = __PLACEHOLDER__;
  var TRUNCATED = __TRUNCATED__;
  var MAX_ARGUMENT = __MAX_ARGUMENT__;
  var MAX_ARGUMENTS = __MAX_ARGUMENTS__;
  var RUN = __RUN__;
  var seq = 0;

  function clip(text, limit) {
    if (text.length <= limit) return text;
    return text.slice(0, Math.max(limit, 0)) + TRUNCATED;
  }

  function serialize(value) {
    if (typeof value === "string") return value;
    if (value === undefined) return "undefined";
    if (value === null || (typeof value !== "object" && typeof value !== "function")) {
      return String(value);
    }
    if (value instanceof Error) return describe(value);
    try {
      var json = JSON.stringify(value);
      return json === undefined ? String(value) : json;
    } catch (e) {
      return PLACEHOLDER;
    }
  }

  function post(type, args) {
    var message = [];
    var budget = MAX_ARGUMENTS;
    for (var i = 0; i < args.length; i++) {
      if (budget <= 0) {
        message.push(TRUNCATED.trim());
        break;
      }
      var text = clip(serialize(args[i]), Math.min(MAX_ARGUMENT, budget));
      budget -= text.length;
      message.push(text);
    }
    seq += 1;
    try {
      window.parent.postMessage({ source: SOURCE, type: type, message: message, run: RUN, seq: seq }, "*");
    } catch (e) {}
  }

  function describe(err) {
    if (err && typeof err === "object" && "message" in err) {
      return (err.name || "Error") + ": " + err.message;
    }
    return serialize(err);
  }

  // Line numbers inside the composed document, shifted so the first line
  // of the user's script is line 1.
  function position(line, column) {
    if (!line) return "";
    var first = window.__playgroundScriptLine || 1;
    if (line >= first) line = line - first + 1;
    return " (line " + line + ", column " + (column || 0) + ")";
  }

  function stackPosition(err) {
    var stack = err && err.stack ? String(err.stack) : "";
    var match = /:(\d+):(\d+)/.exec(stack);
    return match ? position(Number(match[1]), Number(match[2])) : "";
  }

  function wrap(name, type) {
    var original = console[name];
    console[name] = function () {
      post(type, arguments);
      if (original) original.apply(console, arguments);
    };
  }

  wrap("log", "log");
  wrap("info", "log");
  wrap("warn", "warn");
  wrap("error", "error");

  window.__playgroundReport = function (err) {
    post("error", ["Uncaught " + describe(err) + stackPosition(err)]);
  };

  window.addEventListener("error", function (event) {
    var text = event.error ? describe(event.error) : String(event.message);
    post("error", ["Uncaught " + text + position(event.lineno, event.colno)]);
  });

  window.addEventListener("unhandledrejection", function (event) {
    var reason = event.reason;
    post("error", ["Unhandled promise rejection: " + describe(reason) + stackPosition(reason)]);
  });
})();"#;

/// The shim source for a document composed for `run`.
pub fn console_shim(run: RunId) -> String {
    SHIM_TEMPLATE
        .replace("__SOURCE__", &js_string(RELAY_SOURCE))
        .replace("__PLACEHOLDER__", &js_string(UNSERIALIZABLE_PLACEHOLDER))
        .replace("__TRUNCATED__", &js_string(TRUNCATED_MARKER))
        .replace("__MAX_ARGUMENTS__", &MAX_ARGUMENTS_LEN.to_string())
        .replace("__MAX_ARGUMENT__", &MAX_ARGUMENT_LEN.to_string())
        .replace("__RUN__", &run.0.to_string())
}

/// Quote a string as a JavaScript literal.
fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}
