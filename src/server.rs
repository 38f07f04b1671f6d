//! Development server with live reload.
//!
//! Serves the output directory as static files. HTML responses get a small
//! client script that opens a websocket to [`LIVERELOAD_PATH`] and reloads
//! the page whenever the server's reload version changes.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path as AxumPath, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Websocket endpoint the injected client connects to.
pub const LIVERELOAD_PATH: &str = "/__livereload";

/// Errors starting the dev server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listen address could not be bound
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address that was requested
        addr: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
    /// Other socket failure
    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reload signal shared between the watcher and connected browsers.
#[derive(Debug, Clone)]
pub struct LiveReload {
    version: Arc<AtomicU64>,
    tx: broadcast::Sender<u64>,
}

impl LiveReload {
    /// Create a signal with no subscribers.
    pub fn new() -> Self {
        Self { version: Arc::new(AtomicU64::new(0)), tx: broadcast::channel(16).0 }
    }

    /// Tell every connected client to reload.
    ///
    /// Returns the number of clients notified; zero when none are connected.
    pub fn reload(&self) -> usize {
        let version = self.version.fetch_add(1, Ordering::SeqCst) + 1;
        let notified = self.tx.send(version).unwrap_or(0);
        debug!(version, clients = notified, "reload signal");
        notified
    }

    /// Subscribe to reload versions.
    pub fn subscribe(&self) -> broadcast::Receiver<u64> {
        self.tx.subscribe()
    }

    /// Current reload version.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }
}

impl Default for LiveReload {
    fn default() -> Self {
        Self::new()
    }
}

/// A running dev server.
pub struct DevServer {
    /// Address actually bound (resolves port 0)
    pub local_addr: SocketAddr,
    /// Task driving the server
    pub handle: JoinHandle<()>,
}

#[derive(Clone)]
struct AppState {
    root: Arc<PathBuf>,
    reload: LiveReload,
}

/// Bind `bind_addr` and serve `root` in the background.
///
/// Must be called from inside a tokio runtime.
pub async fn start_dev_server(
    root: PathBuf,
    bind_addr: &str,
    reload: LiveReload,
) -> Result<DevServer, ServerError> {
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .map_err(|source| ServerError::Bind { addr: bind_addr.to_string(), source })?;
    let local_addr = listener.local_addr()?;

    let app = router(AppState { root: Arc::new(root), reload });

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("dev server stopped: {}", e);
        }
    });

    info!("serving on http://{}", local_addr);
    Ok(DevServer { local_addr, handle })
}

fn router(state: AppState) -> Router {
    Router::new()
        .route(LIVERELOAD_PATH, get(livereload_socket))
        .route("/", get(serve_index))
        .route("/{*path}", get(serve_path))
        .with_state(state)
}

async fn livereload_socket(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_reload_socket(socket, state.reload))
}

async fn handle_reload_socket(mut socket: WebSocket, reload: LiveReload) {
    let mut rx = reload.subscribe();

    if socket.send(Message::Text(reload.version().to_string().into())).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    _ => {}
                }
            }
            next = rx.recv() => {
                match next {
                    Ok(version) => {
                        if socket.send(Message::Text(version.to_string().into())).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }
}

async fn serve_index(State(state): State<AppState>) -> Response {
    serve_file(&state.root, "").await
}

async fn serve_path(AxumPath(path): AxumPath<String>, State(state): State<AppState>) -> Response {
    serve_file(&state.root, &path).await
}

async fn serve_file(root: &Path, raw_path: &str) -> Response {
    let Some(rel) = sanitize_rel_path(raw_path) else {
        return (StatusCode::BAD_REQUEST, "invalid path").into_response();
    };

    let mut full = root.join(rel);
    if full.is_dir() {
        full.push("index.html");
    }
    if !full.is_file() {
        return (StatusCode::NOT_FOUND, "not found").into_response();
    }

    let bytes = match tokio::fs::read(&full).await {
        Ok(bytes) => bytes,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("failed to read {}: {}", full.display(), e),
            )
                .into_response();
        }
    };

    let content_type = content_type(&full);
    if content_type.starts_with("text/html") {
        let html = String::from_utf8_lossy(&bytes).into_owned();
        return Html(inject_reload_script(html)).into_response();
    }

    let mut response = bytes.into_response();
    response.headers_mut().insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

/// Request path to a relative filesystem path; `None` if it escapes the root.
pub fn sanitize_rel_path(path: &str) -> Option<PathBuf> {
    let rel = PathBuf::from(path.trim_start_matches('/'));
    let escapes = rel
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)));
    if escapes {
        None
    } else {
        Some(rel)
    }
}

fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|s| s.to_str()).unwrap_or_default() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" => "application/javascript; charset=utf-8",
        "json" => "application/json; charset=utf-8",
        "map" => "application/json; charset=utf-8",
        "txt" => "text/plain; charset=utf-8",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "eot" => "application/vnd.ms-fontobject",
        _ => "application/octet-stream",
    }
}

const RELOAD_SCRIPT: &str = r#"<script>
(function(){
  var current = null;
  function connect(){
    var proto = location.protocol === 'https:' ? 'wss://' : 'ws://';
    var ws = new WebSocket(proto + location.host + '/__livereload');
    ws.onmessage = function(event){
      if (current === null) { current = event.data; return; }
      if (event.data !== current) { location.reload(); }
    };
    ws.onclose = function(){ setTimeout(connect, 1000); };
  }
  connect();
})();
</script>"#;

/// Insert the live-reload client before the last `</body>`, or append it.
pub fn inject_reload_script(mut html: String) -> String {
    if html.contains(LIVERELOAD_PATH) {
        return html;
    }
    match html.rfind("</body>") {
        Some(idx) => html.insert_str(idx, RELOAD_SCRIPT),
        None => html.push_str(RELOAD_SCRIPT),
    }
    html
}
