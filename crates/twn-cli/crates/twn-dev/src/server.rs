use crate::session::DevSession;
use crate::watcher;
use anyhow::{Context, Result};
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use futures_util::{SinkExt, StreamExt};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use twn_context::project::TwnProject;

#[derive(Clone)]
struct AppState {
    session: Arc<DevSession>,
    reload_tx: broadcast::Sender<u64>,
}

pub async fn run(port: u16) -> Result<()> {
    let project = TwnProject::load_cwd().context(
        "Failed to load project. Run `twn dev` from the directory containing package.json.",
    )?;
    let root = project.root.clone();
    let session = Arc::new(DevSession::start(project)?);

    let (reload_tx, _) = broadcast::channel::<u64>(16);
    let (change_tx, change_rx) = mpsc::unbounded_channel::<PathBuf>();

    // Dropping the watcher stops it
    let _watcher = watcher::start(&root, change_tx).context("Failed to start file watcher")?;
    tokio::spawn(apply_changes(session.clone(), change_rx, reload_tx.clone()));

    let state = AppState { session, reload_tx };

    let app = Router::new()
        .route("/__twn/classes", get(classes_handler))
        .route("/__twn/entry.css", get(entry_css_handler))
        .route("/__twn/ws", get(ws_handler))
        .with_state(state);

    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    eprintln!("  twn dev running at http://localhost:{port}");
    eprintln!("  Classes at http://localhost:{port}/__twn/classes");
    eprintln!("  Watching for file changes...");
    eprintln!();

    axum::serve(listener, app).await?;

    Ok(())
}

/// Drain watcher events one at a time and broadcast the new version
/// whenever the class set grows.
async fn apply_changes(
    session: Arc<DevSession>,
    mut rx: mpsc::UnboundedReceiver<PathBuf>,
    reload_tx: broadcast::Sender<u64>,
) {
    while let Some(path) = rx.recv().await {
        let worker = session.clone();
        let changed = path.clone();
        match tokio::task::spawn_blocking(move || worker.on_change(&changed)).await {
            Ok(Ok(true)) => {
                let version = session.version();
                tracing::info!(file = %path.display(), version, "New classes found");
                let _ = reload_tx.send(version);
            }
            Ok(Ok(false)) => {}
            Ok(Err(e)) => tracing::debug!("Skipping {}: {e:#}", path.display()),
            Err(e) => tracing::warn!("Transform task failed for {}: {e}", path.display()),
        }
    }
}

async fn classes_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.session.snapshot())
}

async fn entry_css_handler(State(state): State<AppState>) -> Response {
    let session = state.session.clone();
    let css = match tokio::task::spawn_blocking(move || session.entry_css()).await {
        Ok(css) => css,
        Err(e) => return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    };
    match css {
        Ok(Some(css)) => ([(header::CONTENT_TYPE, "text/css")], css).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            "No stylesheet importing tailwindcss was found under src/",
        )
            .into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}")).into_response(),
    }
}

async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state.reload_tx))
}

async fn handle_ws(socket: WebSocket, reload_tx: broadcast::Sender<u64>) {
    let mut rx = reload_tx.subscribe();
    let (mut sender, mut receiver) = socket.split();

    let send_task = tokio::spawn(async move {
        loop {
            let version = match rx.recv().await {
                Ok(version) => version,
                // A slow client only needs the latest version.
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            };
            let msg = Message::Text(format!("{{\"type\":\"reload\",\"version\":{version}}}").into());
            if sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    // Incoming messages are ignored; reading keeps close frames flowing.
    let recv_task = tokio::spawn(async move {
        while let Some(Ok(_)) = receiver.next().await {}
    });

    tokio::select! {
        _ = send_task => {}
        _ = recv_task => {}
    }
}
