//! HTTP listener for the preview host.
//!
//! Binds with tiny_http and serves requests sequentially on one thread,
//! polling a shutdown flag between accepts.

use std::io::Read;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde::Serialize;
use tiny_http::{Header, Method, Request, Response, Server};

use playground_engine::{RelaySender, EXPORT_FILE_NAME};
use playground_protocol::{CommandReply, HostCommand, ProjectList, RelayEnvelope, RelayRejection, MAX_PAYLOAD_SIZE};

use super::bridge::{BridgeError, PreviewBridgeHandle};
use super::SharedPreview;

/// Largest accepted request body: one relay payload plus envelope overhead.
/// Relay bodies within it are parsed and their text truncated as needed.
pub const MAX_BODY_SIZE: usize = MAX_PAYLOAD_SIZE + 1024;

/// How long one accept waits before re-checking the shutdown flag.
const ACCEPT_POLL: Duration = Duration::from_millis(100);

/// Everything the listener thread needs.
#[derive(Clone)]
pub struct PreviewServerConfig {
    pub host: String,
    pub port: u16,
    /// Rendered host page
    pub page: String,
    pub preview: SharedPreview,
    pub relay: RelaySender,
    pub bridge: PreviewBridgeHandle,
}

pub struct PreviewServer {
    listener_handle: Option<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
    bound_addr: Option<SocketAddr>,
}

impl Default for PreviewServer {
    fn default() -> Self {
        Self::new()
    }
}

impl PreviewServer {
    pub fn new() -> Self {
        Self {
            listener_handle: None,
            shutdown: Arc::new(AtomicBool::new(false)),
            bound_addr: None,
        }
    }

    /// Bind and spawn the listener thread. Port 0 picks a free port.
    pub fn start(&mut self, config: PreviewServerConfig) -> std::io::Result<SocketAddr> {
        if let (true, Some(addr)) = (self.is_running(), self.bound_addr) {
            return Ok(addr);
        }

        let server = Server::http((config.host.as_str(), config.port))
            .map_err(|e| std::io::Error::other(format!("cannot bind {}:{}: {}", config.host, config.port, e)))?;
        let addr = server
            .server_addr()
            .to_ip()
            .ok_or_else(|| std::io::Error::other("unable to determine bound address"))?;
        self.bound_addr = Some(addr);
        self.shutdown.store(false, Ordering::SeqCst);

        let shutdown = Arc::clone(&self.shutdown);
        self.listener_handle = Some(thread::spawn(move || {
            run_listener(server, shutdown, config);
        }));

        log::info!("Preview server listening on http://{}", addr);
        Ok(addr)
    }

    /// Stop the listener and wait for it.
    ///
    /// The caller must have dropped its `PreviewRequest` receiver first,
    /// otherwise a request blocked on a bridge reply never finishes.
    pub fn stop(&mut self) {
        if !self.is_running() {
            return;
        }
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(handle) = self.listener_handle.take() {
            let _ = handle.join();
        }
        self.bound_addr = None;
        log::info!("Preview server stopped");
    }

    pub fn is_running(&self) -> bool {
        self.listener_handle.is_some() && !self.shutdown.load(Ordering::SeqCst)
    }

    pub fn bound_addr(&self) -> Option<SocketAddr> {
        self.bound_addr
    }
}

impl Drop for PreviewServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_listener(server: Server, shutdown: Arc<AtomicBool>, config: PreviewServerConfig) {
    while !shutdown.load(Ordering::SeqCst) {
        match server.recv_timeout(ACCEPT_POLL) {
            Ok(Some(request)) => handle_request(request, &config),
            Ok(None) => {}
            Err(e) => {
                log::warn!("Preview server accept failed: {}", e);
                break;
            }
        }
    }
}

fn handle_request(mut request: Request, config: &PreviewServerConfig) {
    let method = request.method().clone();
    let url = request.url().to_string();

    let body = if method == Method::Post {
        // Bytes first: the size cut may split a multi-byte character.
        let mut body = Vec::new();
        let read = request
            .as_reader()
            .take(MAX_BODY_SIZE as u64 + 1)
            .read_to_end(&mut body);
        match read {
            Ok(n) if n > MAX_BODY_SIZE => {
                let size = request.body_length().unwrap_or(n);
                if request_path(&url).as_deref() == Some("/relay") {
                    // The console still shows that something was logged.
                    config.relay.report_oversized(size);
                }
                respond(request, Reply::text(413, RelayRejection::TooLarge { size }.to_string()));
                return;
            }
            Ok(_) => match String::from_utf8(body) {
                Ok(text) => Some(text),
                Err(e) => {
                    respond(request, Reply::text(400, format!("body is not UTF-8: {}", e)));
                    return;
                }
            },
            Err(e) => {
                respond(request, Reply::text(400, format!("unreadable body: {}", e)));
                return;
            }
        }
    } else {
        None
    };

    let reply = route(config, &method, &url, body.as_deref());
    log::trace!("{} {} -> {}", method, url, reply.status);
    respond(request, reply);
}

/// A response before it is bound to a tiny_http request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
    /// File name for `Content-Disposition: attachment`
    pub attachment: Option<&'static str>,
}

impl Reply {
    fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: "text/plain; charset=utf-8",
            body: body.into(),
            attachment: None,
        }
    }

    fn html(body: String) -> Self {
        Self {
            status: 200,
            content_type: "text/html; charset=utf-8",
            body,
            attachment: None,
        }
    }

    fn json<T: Serialize>(status: u16, value: &T) -> Self {
        match serde_json::to_string(value) {
            Ok(body) => Self {
                status,
                content_type: "application/json",
                body,
                attachment: None,
            },
            Err(e) => Self::text(500, format!("serialize error: {}", e)),
        }
    }

    fn no_content() -> Self {
        Self::text(204, "")
    }

    fn unavailable(err: BridgeError) -> Self {
        Self::text(503, err.to_string())
    }
}

fn respond(request: Request, reply: Reply) {
    let mut response = Response::from_string(reply.body).with_status_code(reply.status);
    if let Ok(header) = Header::from_bytes(&b"Content-Type"[..], reply.content_type.as_bytes()) {
        response = response.with_header(header);
    }
    if let Ok(header) = Header::from_bytes(&b"Cache-Control"[..], &b"no-store"[..]) {
        response = response.with_header(header);
    }
    if let Some(name) = reply.attachment {
        let value = format!("attachment; filename=\"{}\"", name);
        if let Ok(header) = Header::from_bytes(&b"Content-Disposition"[..], value.as_bytes()) {
            response = response.with_header(header);
        }
    }
    if let Err(e) = request.respond(response) {
        log::debug!("Preview client went away: {}", e);
    }
}

fn request_path(url: &str) -> Option<String> {
    url::Url::parse(&format!("http://localhost{}", url))
        .ok()
        .map(|u| u.path().to_string())
}

/// Dispatch one request. `body` is present for POST requests.
pub fn route(config: &PreviewServerConfig, method: &Method, url: &str, body: Option<&str>) -> Reply {
    let Some(path) = request_path(url) else {
        return Reply::text(400, "bad request");
    };

    match (method, path.as_str()) {
        (Method::Get, "/") => Reply::html(config.page.clone()),
        (Method::Get, "/state") => Reply::json(200, &config.preview.snapshot()),
        (Method::Post, "/relay") => relay(config, body.unwrap_or_default()),
        (Method::Get, "/console") => match config.bridge.console() {
            Ok(snapshot) => Reply::json(200, &snapshot),
            Err(e) => Reply::unavailable(e),
        },
        (Method::Post, "/command") => {
            let command: HostCommand = match serde_json::from_str(body.unwrap_or_default()) {
                Ok(c) => c,
                Err(e) => return Reply::json(400, &CommandReply::error(format!("invalid command: {}", e))),
            };
            match config.bridge.command(command) {
                Ok(reply) => Reply::json(200, &reply),
                Err(e) => Reply::unavailable(e),
            }
        }
        (Method::Get, "/projects") => match config.bridge.projects() {
            Ok(list) => Reply::json::<ProjectList>(200, &list),
            Err(e) => Reply::unavailable(e),
        },
        (Method::Get, "/export") => match config.bridge.export() {
            Ok(html) => Reply {
                attachment: Some(EXPORT_FILE_NAME),
                ..Reply::html(html)
            },
            Err(e) => Reply::unavailable(e),
        },
        (_, "/" | "/state" | "/relay" | "/console" | "/command" | "/projects" | "/export") => {
            Reply::text(405, "method not allowed")
        }
        _ => Reply::text(404, "not found"),
    }
}

/// Accept a relayed console message. Untagged traffic is acknowledged and
/// dropped; the page never needs to know.
fn relay(config: &PreviewServerConfig, body: &str) -> Reply {
    let envelope: RelayEnvelope = match serde_json::from_str(body) {
        Ok(e) => e,
        Err(e) => return Reply::text(400, RelayRejection::Malformed(e.to_string()).to_string()),
    };
    match config.relay.forward(envelope) {
        Ok(()) => Reply::no_content(),
        Err(rejection) if rejection.is_noise() => Reply::no_content(),
        Err(rejection) => {
            log::debug!("Rejected relay message: {}", rejection);
            Reply::text(400, rejection.to_string())
        }
    }
}
