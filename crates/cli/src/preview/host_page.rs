// Host page served at `/`: sandboxed iframe, console panel, controls

use playground_config::Keybindings;
use playground_protocol::RELAY_SOURCE;

const HOST_PAGE: &str = include_str!("host_page.html");

/// Fill the page template with the relay tag, reserved key combos and
/// polling interval.
pub fn render_host_page(keys: &Keybindings, poll_ms: u64) -> String {
    let reserved = [&keys.run, &keys.save, &keys.open];
    let reserved_json = serde_json::to_string(&reserved).unwrap_or_else(|_| "[]".to_string());
    let source_json = serde_json::Value::String(RELAY_SOURCE.to_string()).to_string();
    HOST_PAGE
        .replace("__RELAY_SOURCE__", &source_json)
        .replace("__RESERVED_KEYS__", &reserved_json)
        .replace("__POLL_MS__", &poll_ms.max(1).to_string())
}
